use super::*;

#[test]
fn priority_orders_critical_first() {
    let mut ps = vec![
        Priority::Low,
        Priority::Critical,
        Priority::Medium,
        Priority::High,
    ];
    ps.sort_by(|a, b| b.cmp(a));
    assert_eq!(
        ps,
        vec![
            Priority::Critical,
            Priority::High,
            Priority::Medium,
            Priority::Low
        ]
    );
    assert_eq!(Priority::default(), Priority::Medium);
}

#[test]
fn quality_downgrade_saturates() {
    assert_eq!(Quality::High.downgrade(), Quality::Medium);
    assert_eq!(Quality::Medium.downgrade(), Quality::Low);
    assert_eq!(Quality::Low.downgrade(), Quality::Low);
}

#[test]
fn category_index_is_dense() {
    for (i, c) in Category::ALL.into_iter().enumerate() {
        assert_eq!(c.index(), i);
    }
}

#[test]
fn category_parses_case_insensitively() {
    assert_eq!("Hover".parse::<Category>().unwrap(), Category::Hover);
    assert_eq!(" complex ".parse::<Category>().unwrap(), Category::Complex);
    assert!("sparkle".parse::<Category>().is_err());
}

#[test]
fn serde_names_are_lowercase() {
    assert_eq!(
        serde_json::to_string(&Priority::Critical).unwrap(),
        "\"critical\""
    );
    assert_eq!(serde_json::to_string(&Quality::Medium).unwrap(), "\"medium\"");
    assert_eq!(
        serde_json::from_str::<Category>("\"scroll\"").unwrap(),
        Category::Scroll
    );
}

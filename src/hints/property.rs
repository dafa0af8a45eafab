use std::collections::BTreeSet;
use std::fmt;

/// CSS property named in a `will-change` hint.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum HintProperty {
    /// `transform`
    Transform,
    /// `opacity`
    Opacity,
    /// `filter`
    Filter,
    /// `contents` (layout containment)
    Contents,
    /// `scroll-position`
    ScrollPosition,
    /// Any other property, verbatim.
    Custom(String),
}

impl HintProperty {
    /// CSS spelling.
    pub fn as_css(&self) -> &str {
        match self {
            Self::Transform => "transform",
            Self::Opacity => "opacity",
            Self::Filter => "filter",
            Self::Contents => "contents",
            Self::ScrollPosition => "scroll-position",
            Self::Custom(s) => s,
        }
    }

    /// A custom property with no name; never hinted.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Custom(s) if s.trim().is_empty())
    }
}

impl From<&str> for HintProperty {
    fn from(s: &str) -> Self {
        match s.trim() {
            "transform" => Self::Transform,
            "opacity" => Self::Opacity,
            "filter" => Self::Filter,
            "contents" => Self::Contents,
            "scroll-position" => Self::ScrollPosition,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for HintProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_css())
    }
}

/// Eviction weight of a hint registration. Lower weights are evicted first.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HintPriority {
    /// Weight 1.
    Low,
    /// Weight 2.
    #[default]
    Medium,
    /// Weight 3.
    High,
}

impl HintPriority {
    /// Numeric eviction weight.
    pub fn weight(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

/// The browser-visible `will-change` value for a property set (`""` when empty).
pub fn format_hint(props: &BTreeSet<HintProperty>) -> String {
    let mut out = String::new();
    for (i, p) in props.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(p.as_css());
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/hints/property.rs"]
mod tests;

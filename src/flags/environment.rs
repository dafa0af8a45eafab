use crate::env::store::OverrideStore;
use crate::foundation::core::Category;
use crate::foundation::error::WobblazResult;

/// Store key holding the persisted [`EnvironmentOverrides`] JSON.
pub const OVERRIDE_KEY: &str = "wobblaz.animation-flags";

/// Prefix of the environment variables read by [`EnvironmentFlags::from_vars`].
pub const ENV_PREFIX: &str = "WOBBLAZ_";

/// Deployment-level animation switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EnvironmentFlags {
    /// Master switch; off disables every category.
    pub enable_all: bool,
    /// Per-category switch for [`Category::Micro`].
    pub micro: bool,
    /// Per-category switch for [`Category::Hover`].
    pub hover: bool,
    /// Per-category switch for [`Category::Transition`].
    pub transition: bool,
    /// Per-category switch for [`Category::Scroll`].
    pub scroll: bool,
    /// Per-category switch for [`Category::Complex`].
    pub complex: bool,
    /// Behave as if the user prefers reduced motion.
    pub force_reduced_motion: bool,
    /// Verbose flag logging.
    pub debug: bool,
}

impl Default for EnvironmentFlags {
    fn default() -> Self {
        Self {
            enable_all: true,
            micro: true,
            hover: true,
            transition: true,
            scroll: true,
            complex: true,
            force_reduced_motion: false,
            debug: false,
        }
    }
}

/// Partial [`EnvironmentFlags`]; `None` fields leave the base value alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentOverrides {
    /// See [`EnvironmentFlags::enable_all`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_all: Option<bool>,
    /// See [`EnvironmentFlags::micro`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micro: Option<bool>,
    /// See [`EnvironmentFlags::hover`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover: Option<bool>,
    /// See [`EnvironmentFlags::transition`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<bool>,
    /// See [`EnvironmentFlags::scroll`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll: Option<bool>,
    /// See [`EnvironmentFlags::complex`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complex: Option<bool>,
    /// See [`EnvironmentFlags::force_reduced_motion`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_reduced_motion: Option<bool>,
    /// See [`EnvironmentFlags::debug`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

fn parse_switch(key: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = raw, "ignoring unrecognized boolean switch");
            None
        }
    }
}

impl EnvironmentFlags {
    /// Defaults overlaid with `WOBBLAZ_*` variables from `vars`.
    ///
    /// Recognized keys: `ENABLE_ANIMATIONS`, `ENABLE_MICRO`, `ENABLE_HOVER`,
    /// `ENABLE_TRANSITION`, `ENABLE_SCROLL`, `ENABLE_COMPLEX`, `FORCE_REDUCED_MOTION`, `DEBUG`.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut o = EnvironmentOverrides::default();
        for (k, v) in vars {
            let key = k.as_ref();
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let slot = match name {
                "ENABLE_ANIMATIONS" => &mut o.enable_all,
                "ENABLE_MICRO" => &mut o.micro,
                "ENABLE_HOVER" => &mut o.hover,
                "ENABLE_TRANSITION" => &mut o.transition,
                "ENABLE_SCROLL" => &mut o.scroll,
                "ENABLE_COMPLEX" => &mut o.complex,
                "FORCE_REDUCED_MOTION" => &mut o.force_reduced_motion,
                "DEBUG" => &mut o.debug,
                _ => continue,
            };
            if let Some(b) = parse_switch(key, v.as_ref()) {
                *slot = Some(b);
            }
        }
        Self::default().with_overrides(&o)
    }

    /// [`from_vars`](Self::from_vars) over the process environment.
    pub fn from_process_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Copy with every `Some` field of `o` applied.
    pub fn with_overrides(mut self, o: &EnvironmentOverrides) -> Self {
        let pairs = [
            (&mut self.enable_all, o.enable_all),
            (&mut self.micro, o.micro),
            (&mut self.hover, o.hover),
            (&mut self.transition, o.transition),
            (&mut self.scroll, o.scroll),
            (&mut self.complex, o.complex),
            (&mut self.force_reduced_motion, o.force_reduced_motion),
            (&mut self.debug, o.debug),
        ];
        for (slot, value) in pairs {
            if let Some(v) = value {
                *slot = v;
            }
        }
        self
    }

    /// Per-category switch.
    pub fn category_enabled(&self, category: Category) -> bool {
        match category {
            Category::Micro => self.micro,
            Category::Hover => self.hover,
            Category::Transition => self.transition,
            Category::Scroll => self.scroll,
            Category::Complex => self.complex,
        }
    }
}

impl EnvironmentOverrides {
    /// Overlay `other` onto `self`; `other`'s `Some` fields win.
    pub fn merge(&mut self, other: &EnvironmentOverrides) {
        let pairs = [
            (&mut self.enable_all, other.enable_all),
            (&mut self.micro, other.micro),
            (&mut self.hover, other.hover),
            (&mut self.transition, other.transition),
            (&mut self.scroll, other.scroll),
            (&mut self.complex, other.complex),
            (&mut self.force_reduced_motion, other.force_reduced_motion),
            (&mut self.debug, other.debug),
        ];
        for (slot, value) in pairs {
            if value.is_some() {
                *slot = value;
            }
        }
    }

    /// `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parse the persisted JSON form.
    pub fn from_json(json: &str) -> WobblazResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read the persisted overrides from `store`.
    ///
    /// A missing entry, an unreadable store and malformed JSON all yield empty overrides;
    /// the latter two are logged.
    pub fn load(store: &dyn OverrideStore) -> Self {
        let raw = match store.load(OVERRIDE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read persisted animation flags");
                return Self::default();
            }
        };
        match Self::from_json(&raw) {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed persisted animation flags");
                Self::default()
            }
        }
    }

    /// Persist to `store` under [`OVERRIDE_KEY`].
    pub fn save(&self, store: &dyn OverrideStore) -> WobblazResult<()> {
        let json = serde_json::to_string(self)?;
        store.save(OVERRIDE_KEY, &json)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/flags/environment.rs"]
mod tests;

/// Result alias used by the fallible loading surfaces of this crate.
pub type WobblazResult<T> = Result<T, WobblazError>;

/// Errors raised while loading configuration or persisted state.
///
/// The scheduling, hint and flag operations themselves never fail; they report expected
/// negative outcomes through `bool`/`Option` returns instead.
#[derive(thiserror::Error, Debug)]
pub enum WobblazError {
    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),

    /// Device capability probe failed.
    #[error("probe error: {0}")]
    Probe(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Persisted-state I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else, with its source chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WobblazError {
    /// Build a [`WobblazError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`WobblazError::Probe`].
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Build a [`WobblazError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for WobblazError {
    fn from(e: serde_json::Error) -> Self {
        Self::serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

//! Capability-driven animation feature flags and instance admission.

pub(crate) mod admission;
pub(crate) mod config;
pub(crate) mod device;
pub(crate) mod environment;
pub(crate) mod governor;

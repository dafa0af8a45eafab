//! Budgeted `will-change` (GPU layer promotion) hints.

pub(crate) mod manager;
pub(crate) mod property;

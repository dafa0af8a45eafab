//! Host environment seam.
//!
//! Everything the core reads from its surroundings goes through the traits in this module:
//! a monotonic [`Clock`](crate::Clock), a one-shot [`DeviceProbe`](crate::DeviceProbe) and a
//! key/value [`OverrideStore`](crate::OverrideStore). Hosts wire them to the real platform;
//! tests and the CLI use the in-process implementations.

pub(crate) mod clock;
pub(crate) mod probe;
pub(crate) mod store;

//! Capability context and the callback registry.
//!
//! All effects flow through an explicit [`Cx`]; there is no ambient
//! authority. The registry is the driver-owned, insertion-ordered record of
//! every outstanding callback, tagged with the scope it was registered
//! under; cancellation sweeps it by scope prefix.

pub mod cx;
pub(crate) mod registry;

pub use cx::Cx;
pub(crate) use cx::DriverCore;
pub(crate) use registry::EntryId;

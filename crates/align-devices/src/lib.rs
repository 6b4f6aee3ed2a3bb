//! Device capability traits, command layout, and dispatch.
//!
//! This crate owns the seam between the alignment engine and the
//! physical hardware:
//! - capability traits for the external device drivers
//!   ([`Movable`], [`Readable`], [`ImageSource`]),
//! - the static [`CommandLayout`] partitioning the global command vector
//!   into per-device slices and DOF maps,
//! - the [`DeviceRegistry`] resolving devices to endpoints once at
//!   construction,
//! - command application with per-device outcome reporting
//!   ([`apply_full_command`], [`ApplyReport`]).
//!
//! Every device call is a blocking synchronous operation; execution is
//! strictly sequential.

/// Capability traits implemented by device drivers.
pub mod capability;
/// DOF index maps and global-vector partitioning.
pub mod layout;
/// Static device registration table.
pub mod registry;
/// Full-command application and outcome reporting.
pub mod apply;
/// Deterministic simulated bench for tests.
pub mod synthetic;

pub use apply::{apply_full_command, ApplyError, ApplyReport, DeviceOutcome, DeviceStatus};
pub use capability::{Actuator, ImageSource, Movable, Readable};
pub use layout::{CommandLayout, DofMap, LayoutError};
pub use registry::{DeviceHandle, DeviceRegistry, RegistryError};

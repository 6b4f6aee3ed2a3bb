//! High-level entry crate for the optical-alignment workspace.
//!
//! Closed-loop mechanical alignment of a multi-actuator optical
//! assembly: push-pull calibration of the interaction matrix,
//! pseudo-inverse correction of measured modal errors, and full-command
//! application across heterogeneous devices.
//!
//! ## Session API
//!
//! [`pipeline::Alignment`] sequences the whole loop against a device
//! set:
//!
//! ```ignore
//! use align::prelude::*;
//!
//! let mut alignment = Alignment::new(config, handles, imager, decomposer)?;
//! alignment.calibrate(&CalibrationOptions { amplitude: 0.1, ..Default::default() })?;
//! alignment.save_interaction(false)?;
//!
//! let correction = alignment.correct(&[0, 1, 2], &[0, 1, 2], &CorrectionOptions::default())?;
//! let report = alignment.apply(&correction)?;
//! assert!(report.all_ok());
//! ```
//!
//! ## Building blocks
//!
//! Every step stays available as a free function for custom loops:
//! [`pipeline::run_push_pull_cycle`], [`pipeline::calibrate_columns`],
//! [`pipeline::compute_correction`], and
//! [`devices::apply_full_command`].
//!
//! ## Module organization
//!
//! - **[`core`]**: value types (masked images, commands, templates) and
//!   pure algorithms (demodulation, arbitration, pseudo-inverse)
//! - **[`devices`]**: capability traits, command layout, device
//!   registry, and command application
//! - **[`pipeline`]**: calibration, correction, configuration, storage,
//!   and the [`Alignment`](pipeline::Alignment) facade
//! - **[`prelude`]**: convenient re-exports for common use cases
//!
//! ## Stability
//!
//! The `align` crate is the public compatibility boundary. Lower-level
//! crates are intended for advanced usage and may evolve more quickly.

/// Value types and pure algorithms.
pub mod core {
    pub use align_core::*;
}

/// Device capability traits, command layout, and dispatch.
pub mod devices {
    pub use align_devices::*;
}

/// Calibration, correction, and the session facade.
pub mod pipeline {
    pub use align_pipeline::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use align::prelude::*;` to get started quickly.
pub mod prelude {
    pub use crate::core::{
        arbitrate, demodulate, Command, Mask, MaskedImage, Matrix, PushPullTemplate, Real,
        Vector,
    };

    pub use crate::devices::{
        apply_full_command, Actuator, ApplyReport, CommandLayout, DeviceHandle, DeviceRegistry,
        DeviceStatus, DofMap, ImageSource, Movable, Readable,
    };

    pub use crate::pipeline::{
        Alignment, AlignmentConfig, CalibrationOptions, CalibrationResult, CorrectionCommand,
        CorrectionOptions, DeviceConfig, ModalDecomposer,
    };
}

//! Calibration and correction pipeline for optical alignment.
//!
//! The pipeline drives closed-loop mechanical alignment of a
//! multi-actuator optical assembly from modal wavefront measurements:
//!
//! 1. **Calibration** — push-pull excitation of every command-matrix
//!    column, demodulation, and modal decomposition assemble the
//!    interaction matrix ([`calibrate_columns`]).
//! 2. **Correction** — a selected sub-block of the interaction matrix is
//!    pseudo-inverted into a reconstruction matrix; multiplying the
//!    measured coefficients yields the full command that nulls the
//!    selected modal error ([`compute_correction`]).
//!
//! [`Alignment`] ties both together with the device registry, the
//! immutable configuration, and the storage collaborator.
//!
//! ```ignore
//! use align_pipeline::{Alignment, CalibrationOptions, CorrectionOptions};
//!
//! let mut alignment = Alignment::new(config, handles, imager, decomposer)?;
//! alignment.calibrate(CalibrationOptions { amplitude: 0.1, ..Default::default() })?;
//! let correction = alignment.correct(&[0, 1], &[0, 1], CorrectionOptions::default())?;
//! let report = alignment.apply(&correction)?;
//! ```
//!
//! Execution is single-threaded and strictly sequential: every device
//! move and image acquisition is a blocking call against external
//! hardware.

/// Immutable engine configuration.
pub mod config;
/// Array + mask persistence collaborator.
pub mod storage;
/// Modal decomposition seam.
pub mod modal;
/// One push-pull excitation cycle.
pub mod cycle;
/// Interaction-matrix calibration.
pub mod calibrate;
/// Pseudo-inverse correction.
pub mod correct;
/// Top-level alignment facade.
pub mod alignment;

pub use alignment::{Alignment, INTERACTION_FILE};
pub use calibrate::{calibrate_columns, CalibrationOptions, CalibrationResult};
pub use config::{AlignmentConfig, ConfigError, DeviceConfig};
pub use correct::{compute_correction, CorrectionCommand, CorrectionError, CorrectionOptions};
pub use cycle::run_push_pull_cycle;
pub use modal::{retain_coefficients, BasisProjectionDecomposer, ModalDecomposer};
pub use storage::{load, save, tracking_number, StorageError};

//! Core value types and pure algorithms for optical alignment.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vector`, `Matrix`),
//! - masked wavefront images ([`MaskedImage`]),
//! - command arbitration ([`Command`]),
//! - push-pull excitation templates ([`PushPullTemplate`]) and the pure
//!   demodulation routine ([`demodulate`]).
//!
//! Everything here is side-effect free; device dispatch and pipeline
//! orchestration live in the `align-devices` and `align-pipeline` crates.

/// Linear algebra type aliases and helpers.
pub mod math;
/// Masked 2D wavefront images.
pub mod image;
/// Immutable device commands and arbitration logic.
pub mod command;
/// Push-pull excitation templates.
pub mod template;
/// Push-pull demodulation.
pub mod demodulate;

pub use command::{arbitrate, Command, CommandError};
pub use demodulate::{demodulate, DemodulationError};
pub use image::{ImageError, Mask, MaskedImage};
pub use math::{pseudo_inverse, Matrix, PinvError, Real, Vector};
pub use template::{PushPullTemplate, TemplateError};

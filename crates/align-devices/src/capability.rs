//! Capability traits implemented by device drivers.
//!
//! The drivers themselves are external collaborators; the engine only
//! sees these traits. Cancellation and timeouts are the driver's
//! responsibility. Errors are surfaced as `anyhow::Error` so drivers can
//! attach whatever context their transport provides.

use align_core::{MaskedImage, Vector};
use anyhow::Result;

/// A device that accepts an absolute position command.
pub trait Movable {
    /// Move to the absolute target. Blocks until the motion completes.
    fn set_position(&mut self, target: &Vector) -> Result<()>;
}

/// A device whose current absolute position can be read back.
pub trait Readable {
    fn position(&self) -> Result<Vector>;
}

/// A wavefront sensor producing masked images.
pub trait ImageSource {
    /// Acquire `frames` frames and return their average.
    fn acquire(&mut self, frames: usize) -> Result<MaskedImage>;
}

/// A mechanical device: movable and readable.
pub trait Actuator: Movable + Readable {}

impl<T: Movable + Readable> Actuator for T {}

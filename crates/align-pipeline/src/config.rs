//! Immutable engine configuration.
//!
//! One structured value constructed once (typically deserialized) and
//! passed to [`Alignment::new`](crate::Alignment::new). There is no
//! process-wide configuration state, so independently configured engine
//! instances can coexist.

use std::ops::Range;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use align_core::PushPullTemplate;
use align_devices::{CommandLayout, DofMap, LayoutError};

/// Errors raised by configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("modes_to_retain must not be empty")]
    NoRetainedModes,
    #[error("frames_per_acquisition must be at least 1")]
    ZeroFrames,
}

/// Static description of one mechanical device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Display name; defaults to `"Device {index}"` when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Length of the command vector the device accepts.
    pub total_dof: usize,
    /// Device-vector index for each position of the global span.
    pub dof: Vec<usize>,
    /// Slice of the global command vector owned by this device.
    pub span: Range<usize>,
}

/// The engine's full configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    pub devices: Vec<DeviceConfig>,
    /// Default push-pull template used when a calibration call does not
    /// override it.
    #[serde(default)]
    pub template: PushPullTemplate,
    /// Indices of the decomposed modal coefficients retained for the
    /// interaction matrix, in row order.
    pub modes_to_retain: Vec<usize>,
    /// Stored command matrix (rows = global command dimension).
    pub command_matrix_path: PathBuf,
    /// Directory searched for a stored interaction matrix when no
    /// in-memory calibration exists.
    pub read_dir: PathBuf,
    /// Directory for saved results; each save gets a timestamped
    /// subdirectory.
    pub write_dir: PathBuf,
    /// Optional pre-existing region-of-interest mask (e.g. a calibrated
    /// parabola footprint).
    #[serde(default)]
    pub aux_mask_path: Option<PathBuf>,
    /// Frames averaged per image acquisition.
    #[serde(default = "default_frames")]
    pub frames_per_acquisition: usize,
}

fn default_frames() -> usize {
    15
}

impl AlignmentConfig {
    /// Build and validate the command layout described by the devices.
    pub fn layout(&self) -> Result<CommandLayout, ConfigError> {
        self.validate()?;
        let maps = self
            .devices
            .iter()
            .map(|d| DofMap {
                total_dof: d.total_dof,
                dof: d.dof.clone(),
                span: d.span.clone(),
            })
            .collect();
        Ok(CommandLayout::new(maps)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modes_to_retain.is_empty() {
            return Err(ConfigError::NoRetainedModes);
        }
        if self.frames_per_acquisition == 0 {
            return Err(ConfigError::ZeroFrames);
        }
        Ok(())
    }
}

//! Top-level alignment facade.
//!
//! [`Alignment`] owns the pieces one closed-loop session needs: the
//! validated configuration, the command layout, the resolved device
//! registry, the modal decomposition collaborator, and the command
//! matrix loaded at construction. It sequences calibration, measurement,
//! correction, and application; the underlying steps stay available as
//! free functions for callers that need finer control.
//!
//! A calibration performed through the facade is held in memory and
//! preferred by [`Alignment::correct`]; without one, the stored
//! interaction matrix under the configured read directory is used.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use tracing::info;

use align_core::{Mask, Matrix, Vector};
use align_devices::{
    apply_full_command, ApplyReport, CommandLayout, DeviceHandle, DeviceRegistry, ImageSource,
};

use crate::calibrate::{calibrate_columns, CalibrationOptions, CalibrationResult};
use crate::config::AlignmentConfig;
use crate::correct::{compute_correction, CorrectionCommand, CorrectionOptions};
use crate::modal::{retain_coefficients, ModalDecomposer};
use crate::storage;

/// File name of a persisted interaction matrix.
pub const INTERACTION_FILE: &str = "int_mat.json";

/// Closed-loop alignment session over one device set.
pub struct Alignment<D: ModalDecomposer> {
    config: AlignmentConfig,
    layout: CommandLayout,
    registry: DeviceRegistry,
    decomposer: D,
    command_matrix: Matrix,
    aux_mask: Option<Mask>,
    calibration: Option<CalibrationResult>,
}

impl<D: ModalDecomposer> Alignment<D> {
    /// Build a session: validate the configuration, resolve the devices,
    /// and load the command matrix (and auxiliary mask, when configured)
    /// from storage.
    ///
    /// Handle order must match the configured device order; names from
    /// the configuration override handle names.
    pub fn new(
        config: AlignmentConfig,
        handles: Vec<DeviceHandle>,
        imager: Box<dyn ImageSource>,
        decomposer: D,
    ) -> Result<Self> {
        let layout = config.layout()?;
        ensure!(
            handles.len() == config.devices.len(),
            "{} device handles for {} configured devices",
            handles.len(),
            config.devices.len()
        );
        let handles = handles
            .into_iter()
            .zip(&config.devices)
            .map(|(handle, device)| match &device.name {
                Some(name) => handle.with_name(name.clone()),
                None => handle,
            })
            .collect();
        let registry = DeviceRegistry::new(handles, imager, &layout)?;

        let (command_matrix, _) = storage::load(&config.command_matrix_path)
            .with_context(|| {
                format!(
                    "loading command matrix from {}",
                    config.command_matrix_path.display()
                )
            })?;
        ensure!(
            command_matrix.nrows() == layout.global_len(),
            "command matrix has {} rows, layout expects {}",
            command_matrix.nrows(),
            layout.global_len()
        );

        let aux_mask = match &config.aux_mask_path {
            Some(path) => Some(load_mask(path)?),
            None => None,
        };

        Ok(Self {
            config,
            layout,
            registry,
            decomposer,
            command_matrix,
            aux_mask,
            calibration: None,
        })
    }

    /// Calibrate the interaction matrix and hold the result in memory.
    ///
    /// Template and frame count fall back to the configured defaults
    /// when the options do not override them.
    pub fn calibrate(&mut self, opts: &CalibrationOptions) -> Result<&CalibrationResult> {
        let template = opts
            .template
            .clone()
            .unwrap_or_else(|| self.config.template.clone());
        let frames = opts.frames.unwrap_or(self.config.frames_per_acquisition);
        let result = calibrate_columns(
            &mut self.registry,
            &self.layout,
            &self.decomposer,
            self.aux_mask.as_ref(),
            &self.command_matrix,
            &self.config.modes_to_retain,
            &template,
            opts,
            frames,
        )?;
        info!(
            columns = result.interaction().ncols(),
            repetitions = result.repetitions(),
            "calibration complete"
        );
        Ok(self.calibration.insert(result))
    }

    /// Persist the in-memory interaction matrix (first repetition) under
    /// a fresh tracking number in the configured write directory.
    ///
    /// Returns the full path of the written file.
    pub fn save_interaction(&self, overwrite: bool) -> Result<PathBuf> {
        let calibration = self
            .calibration
            .as_ref()
            .context("no calibration to save; run calibrate first")?;
        let path = storage::save(
            &self.config.write_dir,
            INTERACTION_FILE,
            calibration.interaction(),
            None,
            overwrite,
        )?;
        info!(path = %path.display(), "interaction matrix saved");
        Ok(path)
    }

    /// Acquire one image and return the retained modal coefficients.
    pub fn measure(&mut self, frames: Option<usize>) -> Result<Vector> {
        let frames = frames.unwrap_or(self.config.frames_per_acquisition);
        let image = self
            .registry
            .acquire(frames)
            .context("measurement acquisition failed")?;
        let coeffs = self.decomposer.decompose(&image, self.aux_mask.as_ref())?;
        retain_coefficients(&coeffs, &self.config.modes_to_retain)
    }

    /// Measure the current error and compute the correction command over
    /// the selected modes and coefficient indices.
    ///
    /// Uses the in-memory calibration when present, otherwise the stored
    /// interaction matrix in the configured read directory. The command
    /// is returned for inspection, not applied.
    pub fn correct(
        &mut self,
        modes: &[usize],
        coefficients: &[usize],
        opts: &CorrectionOptions,
    ) -> Result<CorrectionCommand> {
        let interaction = match &self.calibration {
            Some(calibration) => calibration.interaction().clone(),
            None => {
                let path = self.config.read_dir.join(INTERACTION_FILE);
                info!(path = %path.display(), "using stored interaction matrix");
                storage::load(&path)
                    .with_context(|| {
                        format!("loading interaction matrix from {}", path.display())
                    })?
                    .0
            }
        };
        let measured = self.measure(opts.frames)?;
        Ok(compute_correction(
            &interaction,
            &self.command_matrix,
            modes,
            coefficients,
            &measured,
            opts,
        )?)
    }

    /// Apply a computed correction to the devices.
    pub fn apply(&mut self, correction: &CorrectionCommand) -> Result<ApplyReport> {
        let report = apply_full_command(&mut self.registry, &self.layout, &correction.full)?;
        if !report.all_ok() {
            for failure in report.failures() {
                info!(device = %failure.device, "device failed during correction");
            }
        }
        Ok(report)
    }

    /// Read and log every device's current position.
    pub fn read_positions(&self) -> Result<Vec<(String, Vector)>> {
        self.registry.read_positions()
    }

    /// Reload the auxiliary region-of-interest mask from a stored file.
    pub fn reload_aux_mask(&mut self, path: &Path) -> Result<()> {
        self.aux_mask = Some(load_mask(path)?);
        Ok(())
    }

    /// Swap in a new command matrix.
    ///
    /// Any held calibration is discarded: an interaction matrix is only
    /// meaningful against the command matrix it was measured with.
    pub fn replace_command_matrix(&mut self, matrix: Matrix) -> Result<()> {
        ensure!(
            matrix.nrows() == self.layout.global_len(),
            "command matrix has {} rows, layout expects {}",
            matrix.nrows(),
            self.layout.global_len()
        );
        self.command_matrix = matrix;
        self.calibration = None;
        Ok(())
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    pub fn layout(&self) -> &CommandLayout {
        &self.layout
    }

    pub fn command_matrix(&self) -> &Matrix {
        &self.command_matrix
    }

    /// The held calibration, if one was run this session.
    pub fn calibration(&self) -> Option<&CalibrationResult> {
        self.calibration.as_ref()
    }
}

/// Load a stored mask file: the primary plane is the mask, nonzero
/// meaning excluded.
fn load_mask(path: &Path) -> Result<Mask> {
    let (data, _) = storage::load(path)
        .with_context(|| format!("loading auxiliary mask from {}", path.display()))?;
    Ok(data.map(|v| v != 0.0))
}

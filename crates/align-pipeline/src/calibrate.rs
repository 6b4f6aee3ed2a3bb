//! Interaction-matrix calibration.
//!
//! Calibration empirically measures how each command-matrix column
//! affects the retained modal coefficients: one push-pull cycle per
//! column, modal decomposition of the demodulated image, and assembly of
//! the coefficient columns into the interaction matrix. Repetitions are
//! kept as separate matrices so raw repeatability data reaches the
//! caller; averaging — like persisting — is the caller's decision.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use align_core::{Mask, Matrix, PushPullTemplate, Real, Vector};
use align_devices::{CommandLayout, DeviceRegistry};

use crate::cycle::run_push_pull_cycle;
use crate::modal::{retain_coefficients, ModalDecomposer};

/// Options for one calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationOptions {
    /// Excitation amplitude scaling every template weight. Must be
    /// nonzero for a well-conditioned interaction matrix.
    pub amplitude: Real,
    /// Override the configured default template for this run.
    pub template: Option<PushPullTemplate>,
    /// Number of full repetitions; each produces its own matrix.
    pub repetitions: usize,
    /// Override the configured frames-per-acquisition for this run.
    pub frames: Option<usize>,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            template: None,
            repetitions: 1,
            frames: None,
        }
    }
}

/// The product of a calibration run.
///
/// Rows are indexed by retained modal coefficients, columns by
/// command-matrix columns. The template and amplitude that produced the
/// matrices are recorded; the result is only meaningful against the
/// command matrix, template, and device set it was measured with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub matrices: Vec<Matrix>,
    pub template: PushPullTemplate,
    pub amplitude: Real,
}

impl CalibrationResult {
    /// The interaction matrix of the first repetition.
    pub fn interaction(&self) -> &Matrix {
        &self.matrices[0]
    }

    pub fn repetitions(&self) -> usize {
        self.matrices.len()
    }
}

/// Run push-pull calibration over every command-matrix column.
///
/// Each demodulated image is decomposed, the retained coefficient subset
/// is divided by the template gain (so interaction columns are
/// per-unit-command responses), and the columns are assembled in
/// command-matrix order.
#[allow(clippy::too_many_arguments)]
pub fn calibrate_columns(
    registry: &mut DeviceRegistry,
    layout: &CommandLayout,
    decomposer: &dyn ModalDecomposer,
    roi: Option<&Mask>,
    command_matrix: &Matrix,
    retained: &[usize],
    template: &PushPullTemplate,
    opts: &CalibrationOptions,
    frames: usize,
) -> Result<CalibrationResult> {
    ensure!(opts.amplitude != 0.0, "excitation amplitude must be nonzero");
    ensure!(opts.repetitions >= 1, "need at least one repetition");
    ensure!(!retained.is_empty(), "no modal coefficients retained");
    ensure!(
        command_matrix.nrows() == layout.global_len(),
        "command matrix has {} rows, layout expects {}",
        command_matrix.nrows(),
        layout.global_len()
    );
    let gain = Real::from(template.gain());
    ensure!(gain != 0.0, "template has zero response gain");

    let mut matrices = Vec::with_capacity(opts.repetitions);
    for repetition in 0..opts.repetitions {
        info!(repetition, "calibration repetition");
        let mut columns: Vec<Vector> = Vec::with_capacity(command_matrix.ncols());
        for k in 0..command_matrix.ncols() {
            info!(column = k, "exciting command-matrix column");
            let column = command_matrix.column(k).into_owned();
            let image = run_push_pull_cycle(
                registry,
                layout,
                &column,
                template,
                opts.amplitude,
                frames,
            )
            .with_context(|| format!("push-pull cycle for column {k} failed"))?;
            let coeffs = decomposer
                .decompose(&image, roi)
                .with_context(|| format!("modal decomposition for column {k} failed"))?;
            columns.push(retain_coefficients(&coeffs, retained)? / gain);
        }
        matrices.push(Matrix::from_columns(&columns));
    }

    Ok(CalibrationResult {
        matrices,
        template: template.clone(),
        amplitude: opts.amplitude,
    })
}

//! Pseudo-inverse correction.
//!
//! Correction selects a sub-block of the interaction matrix — rows by
//! retained-coefficient index, columns by command-matrix column ("mode")
//! index — pseudo-inverts it into the reconstruction matrix, and maps
//! the measured coefficient subset into the full command that nulls the
//! selected modal error.
//!
//! No conditioning check is performed: pseudo-inverting an
//! ill-conditioned sub-block silently amplifies measurement noise. The
//! singular-value cutoff is exposed through [`CorrectionOptions`] so the
//! caller can at least pick the truncation point.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use align_core::{pseudo_inverse, Matrix, PinvError, Real, Vector};

/// Errors raised while computing a correction.
#[derive(Debug, Error, Clone)]
pub enum CorrectionError {
    #[error("no modes selected for correction")]
    EmptyModeSelection,
    #[error("no coefficients selected for correction")]
    EmptyCoefficientSelection,
    #[error("mode index {index} out of range for {columns} interaction columns")]
    ModeOutOfRange { index: usize, columns: usize },
    #[error("coefficient index {index} out of range for {rows} interaction rows")]
    CoefficientOutOfRange { index: usize, rows: usize },
    #[error("measured {got} coefficients, interaction matrix has {expected} rows")]
    MeasurementMismatch { expected: usize, got: usize },
    #[error("command matrix has {command_columns} columns, interaction matrix has {interaction_columns}")]
    ColumnCountMismatch {
        command_columns: usize,
        interaction_columns: usize,
    },
    #[error(transparent)]
    Pinv(#[from] PinvError),
}

/// Options for one correction computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionOptions {
    /// Singular values below this are truncated during pseudo-inversion.
    pub svd_cutoff: Real,
    /// Override the configured frames-per-acquisition when measuring.
    pub frames: Option<usize>,
}

impl Default for CorrectionOptions {
    fn default() -> Self {
        Self {
            svd_cutoff: 1e-10,
            frames: None,
        }
    }
}

/// A computed correction, ready for inspection or application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionCommand {
    /// The global command vector nulling the selected error.
    pub full: Vector,
    /// The command in the reduced mode space, before expansion through
    /// the command-matrix columns.
    pub reduced: Vector,
    /// The measured retained-coefficient vector the correction answers.
    pub measured: Vector,
}

/// Compute the full correction command from measured coefficients.
///
/// `measured` is the full retained-coefficient vector (one entry per
/// interaction-matrix row); `modes` and `coefficients` select the
/// sub-block to invert.
pub fn compute_correction(
    interaction: &Matrix,
    command_matrix: &Matrix,
    modes: &[usize],
    coefficients: &[usize],
    measured: &Vector,
    opts: &CorrectionOptions,
) -> Result<CorrectionCommand, CorrectionError> {
    if modes.is_empty() {
        return Err(CorrectionError::EmptyModeSelection);
    }
    if coefficients.is_empty() {
        return Err(CorrectionError::EmptyCoefficientSelection);
    }
    if measured.len() != interaction.nrows() {
        return Err(CorrectionError::MeasurementMismatch {
            expected: interaction.nrows(),
            got: measured.len(),
        });
    }
    if command_matrix.ncols() != interaction.ncols() {
        return Err(CorrectionError::ColumnCountMismatch {
            command_columns: command_matrix.ncols(),
            interaction_columns: interaction.ncols(),
        });
    }
    for &index in modes {
        if index >= interaction.ncols() {
            return Err(CorrectionError::ModeOutOfRange {
                index,
                columns: interaction.ncols(),
            });
        }
    }
    for &index in coefficients {
        if index >= interaction.nrows() {
            return Err(CorrectionError::CoefficientOutOfRange {
                index,
                rows: interaction.nrows(),
            });
        }
    }

    let reduced_interaction = interaction
        .select_rows(coefficients.iter())
        .select_columns(modes.iter());
    let reconstruction = pseudo_inverse(&reduced_interaction, opts.svd_cutoff)?;

    let measured_selected = Vector::from_iterator(
        coefficients.len(),
        coefficients.iter().map(|&i| measured[i]),
    );
    // Negated: the command opposes the measured error.
    let reduced = -(reconstruction * measured_selected);
    let full = command_matrix.select_columns(modes.iter()) * &reduced;

    Ok(CorrectionCommand {
        full,
        reduced,
        measured: measured.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_interaction_negates_the_error() {
        let interaction = Matrix::identity(2, 2);
        let command_matrix = Matrix::identity(2, 2);
        let measured = Vector::from_row_slice(&[2.0, 0.0]);

        let correction = compute_correction(
            &interaction,
            &command_matrix,
            &[0, 1],
            &[0, 1],
            &measured,
            &CorrectionOptions::default(),
        )
        .unwrap();

        assert!((correction.full[0] + 2.0).abs() < 1e-12);
        assert!(correction.full[1].abs() < 1e-12);
    }

    #[test]
    fn sub_block_correction_leaves_unselected_modes_untouched() {
        // Diagonal interaction with distinct gains.
        let interaction = Matrix::from_diagonal(&Vector::from_row_slice(&[2.0, 4.0]));
        let command_matrix = Matrix::identity(2, 2);
        let measured = Vector::from_row_slice(&[1.0, 8.0]);

        let correction = compute_correction(
            &interaction,
            &command_matrix,
            &[0],
            &[0],
            &measured,
            &CorrectionOptions::default(),
        )
        .unwrap();

        assert_eq!(correction.reduced.len(), 1);
        assert!((correction.full[0] + 0.5).abs() < 1e-12);
        assert_eq!(correction.full[1], 0.0);
    }

    #[test]
    fn scaled_interaction_is_inverted() {
        let interaction = Matrix::from_diagonal(&Vector::from_row_slice(&[0.5, 0.5]));
        let command_matrix = Matrix::identity(2, 2);
        let measured = Vector::from_row_slice(&[1.0, -1.0]);

        let correction = compute_correction(
            &interaction,
            &command_matrix,
            &[0, 1],
            &[0, 1],
            &measured,
            &CorrectionOptions::default(),
        )
        .unwrap();

        assert!((correction.full[0] + 2.0).abs() < 1e-12);
        assert!((correction.full[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn command_matrix_expands_reduced_commands() {
        // Two modes mixed into a 3-dimensional global command.
        let command_matrix =
            Matrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let interaction = Matrix::identity(2, 2);
        let measured = Vector::from_row_slice(&[1.0, 2.0]);

        let correction = compute_correction(
            &interaction,
            &command_matrix,
            &[0, 1],
            &[0, 1],
            &measured,
            &CorrectionOptions::default(),
        )
        .unwrap();

        assert_eq!(correction.full.len(), 3);
        assert!((correction.full[0] + 1.0).abs() < 1e-12);
        assert!((correction.full[1] + 2.0).abs() < 1e-12);
        assert!((correction.full[2] + 3.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_selections_are_rejected() {
        let interaction = Matrix::identity(2, 2);
        let command_matrix = Matrix::identity(2, 2);
        let measured = Vector::zeros(2);

        assert!(matches!(
            compute_correction(
                &interaction,
                &command_matrix,
                &[2],
                &[0],
                &measured,
                &CorrectionOptions::default(),
            ),
            Err(CorrectionError::ModeOutOfRange { index: 2, .. })
        ));
        assert!(matches!(
            compute_correction(
                &interaction,
                &command_matrix,
                &[0],
                &[5],
                &measured,
                &CorrectionOptions::default(),
            ),
            Err(CorrectionError::CoefficientOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn measurement_length_must_match_rows() {
        let interaction = Matrix::identity(2, 2);
        let command_matrix = Matrix::identity(2, 2);
        let measured = Vector::zeros(3);

        assert!(matches!(
            compute_correction(
                &interaction,
                &command_matrix,
                &[0],
                &[0],
                &measured,
                &CorrectionOptions::default(),
            ),
            Err(CorrectionError::MeasurementMismatch {
                expected: 2,
                got: 3
            })
        ));
    }
}

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

pub type Real = f64;

pub type Vector = DVector<Real>;
pub type Matrix = DMatrix<Real>;

/// Errors that can occur during pseudo-inversion.
#[derive(Debug, Error, Clone, Copy)]
pub enum PinvError {
    /// SVD decomposition failed.
    #[error("pseudo-inverse failed: {0}")]
    SvdFailed(&'static str),
}

/// Moore-Penrose pseudo-inverse via SVD.
///
/// Singular values below `eps` are treated as zero. No conditioning
/// check is performed; inverting a near-singular matrix amplifies noise
/// in whatever is multiplied by the result.
pub fn pseudo_inverse(m: &Matrix, eps: Real) -> Result<Matrix, PinvError> {
    m.clone().pseudo_inverse(eps).map_err(PinvError::SvdFailed)
}

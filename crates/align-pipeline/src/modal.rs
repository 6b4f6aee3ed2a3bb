//! Modal decomposition seam.
//!
//! The wavefront-to-coefficients routine is an external collaborator
//! consumed through [`ModalDecomposer`]. The engine never looks inside
//! it; it only slices the returned coefficient vector.

use anyhow::{ensure, Result};

use align_core::{Mask, MaskedImage, Real, Vector};

/// External modal decomposition (e.g. a Zernike fit).
pub trait ModalDecomposer {
    /// Decompose a wavefront image into modal coefficients.
    ///
    /// `roi`, when present, marks additional pixels to exclude from the
    /// fit (`true` = excluded), on top of the image's own mask.
    fn decompose(&self, image: &MaskedImage, roi: Option<&Mask>) -> Result<Vector>;
}

/// Least-squares projection onto a fixed image basis.
///
/// Public to allow use across workspace test suites; real deployments
/// plug in their own decomposer. With an orthogonal basis the projection
/// is exact.
pub struct BasisProjectionDecomposer {
    basis: Vec<MaskedImage>,
}

impl BasisProjectionDecomposer {
    pub fn new(basis: Vec<MaskedImage>) -> Result<Self> {
        ensure!(!basis.is_empty(), "basis must not be empty");
        let shape = basis[0].shape();
        ensure!(
            basis.iter().all(|b| b.shape() == shape),
            "basis images must share one shape"
        );
        Ok(Self { basis })
    }

    fn pixel_valid(image: &MaskedImage, roi: Option<&Mask>, r: usize, c: usize) -> bool {
        !image.is_invalid(r, c) && !roi.is_some_and(|m| m[(r, c)])
    }
}

impl ModalDecomposer for BasisProjectionDecomposer {
    fn decompose(&self, image: &MaskedImage, roi: Option<&Mask>) -> Result<Vector> {
        let shape = self.basis[0].shape();
        ensure!(
            image.shape() == shape,
            "image shape {:?} does not match basis shape {:?}",
            image.shape(),
            shape
        );
        let (nr, nc) = shape;
        let mut coeffs = Vector::zeros(self.basis.len());
        for (j, b) in self.basis.iter().enumerate() {
            let mut num = 0.0;
            let mut den = 0.0;
            for c in 0..nc {
                for r in 0..nr {
                    if Self::pixel_valid(image, roi, r, c) && !b.is_invalid(r, c) {
                        let bv = b.data()[(r, c)];
                        num += image.data()[(r, c)] * bv;
                        den += bv * bv;
                    }
                }
            }
            coeffs[j] = if den == 0.0 { 0.0 } else { num / den };
        }
        Ok(coeffs)
    }
}

/// Retain a subset of a decomposed coefficient vector, in index order.
pub fn retain_coefficients(coeffs: &Vector, retained: &[usize]) -> Result<Vector> {
    for &index in retained {
        ensure!(
            index < coeffs.len(),
            "retained coefficient index {index} out of range for {} fitted modes",
            coeffs.len()
        );
    }
    Ok(Vector::from_iterator(
        retained.len(),
        retained.iter().map(|&i| coeffs[i]),
    ))
}

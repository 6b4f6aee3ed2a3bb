//! Masked 2D wavefront images.
//!
//! A [`MaskedImage`] is a dense plane of real samples with an optional
//! per-pixel invalidity mask. Masked samples are excluded from every
//! numeric reduction. The mask is `true` where a pixel is *invalid*.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Real;

/// Per-pixel invalidity mask; `true` marks an invalid sample.
pub type Mask = DMatrix<bool>;

/// Errors that can occur when constructing or combining images.
#[derive(Debug, Error, Clone)]
pub enum ImageError {
    /// Operand shapes do not match.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
}

/// A 2D array of real samples with an optional validity mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedImage {
    data: DMatrix<Real>,
    mask: Option<Mask>,
}

impl MaskedImage {
    /// Image with every pixel valid.
    pub fn new(data: DMatrix<Real>) -> Self {
        Self { data, mask: None }
    }

    /// Image with a per-pixel invalidity mask.
    pub fn with_mask(data: DMatrix<Real>, mask: Mask) -> Result<Self, ImageError> {
        if data.shape() != mask.shape() {
            return Err(ImageError::ShapeMismatch {
                expected: data.shape(),
                got: mask.shape(),
            });
        }
        Ok(Self {
            data,
            mask: Some(mask),
        })
    }

    /// All-zero image of the given shape, every pixel valid.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::new(DMatrix::zeros(nrows, ncols))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    pub fn data(&self) -> &DMatrix<Real> {
        &self.data
    }

    pub fn mask(&self) -> Option<&Mask> {
        self.mask.as_ref()
    }

    /// Whether the pixel at `(r, c)` is flagged invalid.
    pub fn is_invalid(&self, r: usize, c: usize) -> bool {
        self.mask.as_ref().is_some_and(|m| m[(r, c)])
    }

    /// Accumulate `weight * other` into this image's data plane.
    ///
    /// Masks are not touched; combine them with [`union_mask`](Self::union_mask).
    pub fn add_scaled(&mut self, other: &MaskedImage, weight: Real) -> Result<(), ImageError> {
        if self.data.shape() != other.data.shape() {
            return Err(ImageError::ShapeMismatch {
                expected: self.data.shape(),
                got: other.data.shape(),
            });
        }
        self.data += &other.data * weight;
        Ok(())
    }

    /// Fold `other`'s invalid pixels into this image's mask.
    pub fn union_mask(&mut self, other: &MaskedImage) -> Result<(), ImageError> {
        if self.data.shape() != other.data.shape() {
            return Err(ImageError::ShapeMismatch {
                expected: self.data.shape(),
                got: other.data.shape(),
            });
        }
        match (&mut self.mask, &other.mask) {
            (_, None) => {}
            (Some(mine), Some(theirs)) => {
                *mine = mine.zip_map(theirs, |a, b| a || b);
            }
            (mine @ None, Some(theirs)) => {
                *mine = Some(theirs.clone());
            }
        }
        Ok(())
    }

    /// Multiply every sample by `factor`.
    pub fn scale(&mut self, factor: Real) {
        self.data *= factor;
    }
}

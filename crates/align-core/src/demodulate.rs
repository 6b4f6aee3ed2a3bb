//! Push-pull demodulation.
//!
//! Pure reduction of one excitation cycle's images into a single
//! response image. The acquired images `[reference, img_1, ..., img_n]`
//! are paired with the weights `[-1, t_1, ..., t_n]` in acquisition
//! order; reordering either corrupts the sign of the recovered response.

use thiserror::Error;

use crate::image::{ImageError, MaskedImage};
use crate::math::Real;
use crate::template::PushPullTemplate;

/// Errors that can occur during demodulation.
#[derive(Debug, Error, Clone)]
pub enum DemodulationError {
    /// Calibration with a zero amplitude cannot be demodulated.
    #[error("excitation amplitude must be nonzero")]
    ZeroAmplitude,
    /// Demodulation consumes exactly `len(template) + 1` images.
    #[error("expected {expected} images for the template, got {got}")]
    WrongImageCount { expected: usize, got: usize },
    /// Images in the cycle have inconsistent shapes.
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Demodulate one push-pull cycle.
///
/// Accumulates `sum(w_i * image_i)` with the weights
/// `template.with_reference()`, unions the invalidity masks of every
/// consecutive image pair into the result, and divides by `amplitude`.
///
/// The first image must be the reference acquired before any excitation.
pub fn demodulate(
    images: &[MaskedImage],
    template: &PushPullTemplate,
    amplitude: Real,
) -> Result<MaskedImage, DemodulationError> {
    if amplitude == 0.0 {
        return Err(DemodulationError::ZeroAmplitude);
    }
    let weights = template.with_reference();
    if images.len() != weights.len() {
        return Err(DemodulationError::WrongImageCount {
            expected: weights.len(),
            got: images.len(),
        });
    }

    let (nrows, ncols) = images[0].shape();
    let mut result = MaskedImage::zeros(nrows, ncols);
    for (image, &weight) in images.iter().zip(&weights) {
        result.add_scaled(image, Real::from(weight))?;
    }
    // Invalid pixels from any consecutive pair poison the result; the
    // union over pairs equals the union over all images.
    for pair in images.windows(2) {
        result.union_mask(&pair[0])?;
        result.union_mask(&pair[1])?;
    }
    result.scale(1.0 / amplitude);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Mask;
    use nalgebra::DMatrix;

    fn shape_image(shape: &DMatrix<Real>, factor: Real) -> MaskedImage {
        MaskedImage::new(shape * factor)
    }

    fn mode_shape() -> DMatrix<Real> {
        DMatrix::from_row_slice(2, 2, &[1.0, -0.5, 0.25, 2.0])
    }

    /// Images following the linear model `image = position * shape` for the
    /// cumulative positions walked by the template.
    fn cycle_images(template: &PushPullTemplate, amplitude: Real) -> Vec<MaskedImage> {
        let shape = mode_shape();
        let mut images = vec![shape_image(&shape, 0.0)];
        let mut position = 0;
        for &t in template.weights() {
            position += t;
            images.push(shape_image(&shape, amplitude * Real::from(position)));
        }
        images
    }

    #[test]
    fn recovers_mode_shape_scaled_by_gain() {
        let template = PushPullTemplate::default();
        let images = cycle_images(&template, 0.5);
        let result = demodulate(&images, &template, 0.5).unwrap();

        let expected = mode_shape() * Real::from(template.gain());
        assert!((result.data() - expected).norm() < 1e-12);
    }

    #[test]
    fn amplitude_normalization_is_consistent() {
        let template = PushPullTemplate::default();
        let small = demodulate(&cycle_images(&template, 1.0), &template, 1.0).unwrap();
        let large = demodulate(&cycle_images(&template, 2.0), &template, 2.0).unwrap();
        let rel = (small.data() - large.data()).norm() / small.data().norm();
        assert!(rel < 1e-9);
    }

    #[test]
    fn mask_propagates_from_any_image() {
        let template = PushPullTemplate::default();
        for poisoned in 0..4 {
            let mut images = cycle_images(&template, 1.0);
            let mut mask = Mask::from_element(2, 2, false);
            mask[(1, 0)] = true;
            let data = images[poisoned].data().clone();
            images[poisoned] = MaskedImage::with_mask(data, mask).unwrap();

            let result = demodulate(&images, &template, 1.0).unwrap();
            assert!(
                result.is_invalid(1, 0),
                "mask lost when image {poisoned} carried it"
            );
            assert!(!result.is_invalid(0, 0));
        }
    }

    #[test]
    fn wrong_image_count_is_rejected() {
        let template = PushPullTemplate::default();
        let images = cycle_images(&template, 1.0);
        assert!(matches!(
            demodulate(&images[..3], &template, 1.0),
            Err(DemodulationError::WrongImageCount {
                expected: 4,
                got: 3
            })
        ));
    }

    #[test]
    fn zero_amplitude_is_rejected() {
        let template = PushPullTemplate::default();
        let images = cycle_images(&template, 1.0);
        assert!(matches!(
            demodulate(&images, &template, 0.0),
            Err(DemodulationError::ZeroAmplitude)
        ));
    }
}

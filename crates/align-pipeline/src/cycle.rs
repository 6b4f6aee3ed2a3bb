//! One push-pull excitation cycle.
//!
//! A cycle drives a single command-matrix column: acquire the reference
//! image, then for every template weight scale the column, apply it as a
//! delta through the mapper/arbiter/registry path, and acquire again.
//! Acquisition immediately follows each commanded move, and the
//! demodulation weights are consumed in the same order the images were
//! acquired; reordering corrupts the sign of the recovered response.

use anyhow::{ensure, Context, Result};
use tracing::{debug, warn};

use align_core::{demodulate, MaskedImage, PushPullTemplate, Real, Vector};
use align_devices::{apply_full_command, CommandLayout, DeviceRegistry};

/// Execute one excitation cycle and return the demodulated image.
///
/// # Errors
///
/// - zero amplitude,
/// - layout/arbitration errors while applying the scaled column,
/// - acquisition failures.
///
/// Per-device move failures do not abort the cycle; they are logged and
/// the cycle continues, leaving the affected column measurement degraded.
pub fn run_push_pull_cycle(
    registry: &mut DeviceRegistry,
    layout: &CommandLayout,
    column: &Vector,
    template: &PushPullTemplate,
    amplitude: Real,
    frames: usize,
) -> Result<MaskedImage> {
    ensure!(amplitude != 0.0, "excitation amplitude must be nonzero");

    let mut images = Vec::with_capacity(template.len() + 1);
    images.push(
        registry
            .acquire(frames)
            .context("reference acquisition failed")?,
    );

    for &weight in template.weights() {
        let delta = column * (amplitude * Real::from(weight));
        debug!(weight, "applying push-pull excitation");
        let report = apply_full_command(registry, layout, &delta)?;
        if !report.all_ok() {
            for failure in report.failures() {
                warn!(device = %failure.device, "device failed during push-pull cycle");
            }
        }
        images.push(
            registry
                .acquire(frames)
                .with_context(|| format!("acquisition after weight {weight} failed"))?,
        );
    }

    Ok(demodulate(&images, template, amplitude)?)
}

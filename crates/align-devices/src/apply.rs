//! Full-command application and outcome reporting.
//!
//! Applying a global correction command means, per device: read the
//! current position fresh, combine it with the device's scattered delta
//! through the arbiter, and dispatch the move unless it is a redundant
//! no-op. Hardware failures are isolated per device so one unresponsive
//! device does not abort correction of the others; the caller receives
//! the full outcome mix in an [`ApplyReport`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use align_core::{Command, CommandError, Vector};

use crate::layout::{CommandLayout, LayoutError};
use crate::registry::DeviceRegistry;

/// Errors fatal to the whole application batch.
///
/// Per-device hardware failures are *not* errors at this level; they are
/// reported through [`DeviceStatus::Failed`].
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// What happened to one device during command application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// The absolute target was dispatched and the move returned.
    Applied,
    /// The arbiter flagged the command as a redundant no-op.
    Skipped,
    /// Reading the position or dispatching the move failed.
    Failed(String),
}

/// Per-device application outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceOutcome {
    pub device: String,
    pub status: DeviceStatus,
}

/// Aggregated outcomes of one command application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub outcomes: Vec<DeviceOutcome>,
}

impl ApplyReport {
    /// True if no device failed (skips are fine).
    pub fn all_ok(&self) -> bool {
        !self
            .outcomes
            .iter()
            .any(|o| matches!(o.status, DeviceStatus::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeviceOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DeviceStatus::Failed(_)))
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeviceStatus::Applied)
            .count()
    }
}

/// Apply a global correction command to every device.
///
/// Positions are read immediately before composing each device's
/// absolute target; nothing is cached across calls. Devices are handled
/// strictly in registration order.
///
/// # Errors
///
/// Shape and arbitration errors abort the batch. Hardware failures do
/// not; they land in the report.
pub fn apply_full_command(
    registry: &mut DeviceRegistry,
    layout: &CommandLayout,
    full: &Vector,
) -> Result<ApplyReport, ApplyError> {
    let deltas = layout.scatter(full)?;
    let mut outcomes = Vec::with_capacity(deltas.len());
    for (index, delta) in deltas.iter().enumerate() {
        let name = registry.name(index).to_owned();
        let position = match registry.read_position(index) {
            Ok(p) => p,
            Err(e) => {
                warn!(device = %name, error = %e, "position read failed");
                outcomes.push(DeviceOutcome {
                    device: name,
                    status: DeviceStatus::Failed(e.to_string()),
                });
                continue;
            }
        };
        let command = Command::combine(&position, delta)?;
        if command.ignore() {
            debug!(device = %name, "skipping null command");
            outcomes.push(DeviceOutcome {
                device: name,
                status: DeviceStatus::Skipped,
            });
            continue;
        }
        let status = match registry.move_device(index, command.vector()) {
            Ok(()) => {
                debug!(device = %name, target = ?command.vector().as_slice(), "command applied");
                DeviceStatus::Applied
            }
            Err(e) => {
                warn!(device = %name, error = %e, "device command failed");
                DeviceStatus::Failed(e.to_string())
            }
        };
        outcomes.push(DeviceOutcome {
            device: name,
            status,
        });
    }
    Ok(ApplyReport { outcomes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DofMap;
    use crate::registry::DeviceHandle;
    use crate::synthetic::{FailingActuator, SimBench};

    fn layout() -> CommandLayout {
        CommandLayout::new(vec![
            DofMap {
                total_dof: 1,
                dof: vec![0],
                span: 0..1,
            },
            DofMap {
                total_dof: 1,
                dof: vec![0],
                span: 1..2,
            },
        ])
        .unwrap()
    }

    fn sim_registry(layout: &CommandLayout) -> (SimBench, DeviceRegistry) {
        let bench = SimBench::new(layout, vec![]);
        let registry = DeviceRegistry::new(
            vec![
                DeviceHandle::new(Box::new(bench.actuator(0))),
                DeviceHandle::new(Box::new(bench.actuator(1))),
            ],
            Box::new(bench.sensor(1, 1)),
            layout,
        )
        .unwrap();
        (bench, registry)
    }

    #[test]
    fn null_deltas_are_skipped_nonzero_applied() {
        let layout = layout();
        let (bench, mut registry) = sim_registry(&layout);
        let full = Vector::from_row_slice(&[0.5, 0.0]);

        let report = apply_full_command(&mut registry, &layout, &full).unwrap();

        assert_eq!(report.outcomes[0].status, DeviceStatus::Applied);
        assert_eq!(report.outcomes[1].status, DeviceStatus::Skipped);
        assert_eq!(bench.position(0)[0], 0.5);
        assert_eq!(bench.position(1)[0], 0.0);
    }

    #[test]
    fn commands_accumulate_as_deltas() {
        let layout = layout();
        let (bench, mut registry) = sim_registry(&layout);
        let full = Vector::from_row_slice(&[1.0, -1.0]);

        apply_full_command(&mut registry, &layout, &full).unwrap();
        apply_full_command(&mut registry, &layout, &full).unwrap();

        assert_eq!(bench.position(0)[0], 2.0);
        assert_eq!(bench.position(1)[0], -2.0);
    }

    #[test]
    fn return_to_zero_is_dispatched() {
        let layout = layout();
        let (bench, mut registry) = sim_registry(&layout);
        bench.set_position(0, Vector::from_row_slice(&[1.5]));

        let full = Vector::from_row_slice(&[-1.5, 0.0]);
        let report = apply_full_command(&mut registry, &layout, &full).unwrap();

        assert_eq!(report.outcomes[0].status, DeviceStatus::Applied);
        assert_eq!(bench.position(0)[0], 0.0);
    }

    #[test]
    fn failure_does_not_abort_remaining_devices() {
        let layout = layout();
        let bench = SimBench::new(&layout, vec![]);
        let mut registry = DeviceRegistry::new(
            vec![
                DeviceHandle::named("Broken", Box::new(FailingActuator::new(1))),
                DeviceHandle::named("Healthy", Box::new(bench.actuator(1))),
            ],
            Box::new(bench.sensor(1, 1)),
            &layout,
        )
        .unwrap();

        let full = Vector::from_row_slice(&[1.0, 1.0]);
        let report = apply_full_command(&mut registry, &layout, &full).unwrap();

        assert!(!report.all_ok());
        assert!(matches!(
            report.outcomes[0].status,
            DeviceStatus::Failed(_)
        ));
        assert_eq!(report.outcomes[1].status, DeviceStatus::Applied);
        assert_eq!(report.applied_count(), 1);
        assert_eq!(bench.position(1)[0], 1.0);
    }

    #[test]
    fn wrong_command_length_is_fatal() {
        let layout = layout();
        let (_bench, mut registry) = sim_registry(&layout);
        let full = Vector::zeros(3);
        assert!(matches!(
            apply_full_command(&mut registry, &layout, &full),
            Err(ApplyError::Layout(_))
        ));
    }
}

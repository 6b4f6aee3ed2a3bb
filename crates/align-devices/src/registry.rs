//! Static device registration table.
//!
//! The registry resolves every device to its move/read endpoints once,
//! at construction. After that it is a pure lookup structure: no state
//! of its own, no caching of device positions (the hardware is a shared
//! external resource, so positions are re-read before every use).

use anyhow::Result;
use thiserror::Error;
use tracing::info;

use align_core::{MaskedImage, Vector};

use crate::capability::{Actuator, ImageSource};
use crate::layout::CommandLayout;

/// Errors raised while resolving devices at construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("layout describes {expected} devices, {got} were registered")]
    DeviceCountMismatch { expected: usize, got: usize },
    #[error("duplicate device name: {0}")]
    DuplicateName(String),
}

/// A named device with its resolved actuation endpoints.
pub struct DeviceHandle {
    name: Option<String>,
    actuator: Box<dyn Actuator>,
}

impl DeviceHandle {
    /// A handle without a configured display name; the registry assigns
    /// `"Device {index}"` at construction.
    pub fn new(actuator: Box<dyn Actuator>) -> Self {
        Self {
            name: None,
            actuator,
        }
    }

    pub fn named(name: impl Into<String>, actuator: Box<dyn Actuator>) -> Self {
        Self {
            name: Some(name.into()),
            actuator,
        }
    }

    /// Replace the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

struct ResolvedDevice {
    name: String,
    actuator: Box<dyn Actuator>,
}

/// Resolved per-device endpoints plus the shared image source.
pub struct DeviceRegistry {
    devices: Vec<ResolvedDevice>,
    imager: Box<dyn ImageSource>,
}

impl DeviceRegistry {
    /// Resolve handles against the layout.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DeviceCountMismatch`] if the handle count differs
    /// from the layout's device count; [`RegistryError::DuplicateName`]
    /// if two devices share a display name.
    pub fn new(
        handles: Vec<DeviceHandle>,
        imager: Box<dyn ImageSource>,
        layout: &CommandLayout,
    ) -> Result<Self, RegistryError> {
        if handles.len() != layout.device_count() {
            return Err(RegistryError::DeviceCountMismatch {
                expected: layout.device_count(),
                got: handles.len(),
            });
        }
        let mut devices = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let name = handle.name.unwrap_or_else(|| format!("Device {index}"));
            if devices.iter().any(|d: &ResolvedDevice| d.name == name) {
                return Err(RegistryError::DuplicateName(name));
            }
            devices.push(ResolvedDevice {
                name,
                actuator: handle.actuator,
            });
        }
        Ok(Self { devices, imager })
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.name.as_str())
    }

    pub fn name(&self, index: usize) -> &str {
        &self.devices[index].name
    }

    /// Read one device's current absolute position.
    pub fn read_position(&self, index: usize) -> Result<Vector> {
        self.devices[index].actuator.position()
    }

    /// Issue an absolute move to one device. Blocks until complete.
    pub fn move_device(&mut self, index: usize, target: &Vector) -> Result<()> {
        self.devices[index].actuator.set_position(target)
    }

    /// Acquire an averaged image from the shared sensor.
    pub fn acquire(&mut self, frames: usize) -> Result<MaskedImage> {
        self.imager.acquire(frames)
    }

    /// Read and log every device's current position, in registration order.
    ///
    /// Positions are always read fresh; nothing is cached across calls.
    pub fn read_positions(&self) -> Result<Vec<(String, Vector)>> {
        let mut positions = Vec::with_capacity(self.devices.len());
        for device in &self.devices {
            let position = device.actuator.position()?;
            info!(device = %device.name, position = ?position.as_slice(), "current position");
            positions.push((device.name.clone(), position));
        }
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DofMap;
    use crate::synthetic::SimBench;

    fn single_device_layout(n: usize) -> CommandLayout {
        CommandLayout::new(
            (0..n)
                .map(|i| DofMap {
                    total_dof: 1,
                    dof: vec![0],
                    span: i..i + 1,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn unnamed_devices_get_default_names() {
        let layout = single_device_layout(2);
        let bench = SimBench::new(&layout, vec![]);
        let registry = DeviceRegistry::new(
            vec![
                DeviceHandle::new(Box::new(bench.actuator(0))),
                DeviceHandle::new(Box::new(bench.actuator(1))),
            ],
            Box::new(bench.sensor(1, 1)),
            &layout,
        )
        .unwrap();
        let names: Vec<_> = registry.device_names().collect();
        assert_eq!(names, vec!["Device 0", "Device 1"]);
    }

    #[test]
    fn device_count_mismatch_is_rejected() {
        let layout = single_device_layout(2);
        let bench = SimBench::new(&layout, vec![]);
        let result = DeviceRegistry::new(
            vec![DeviceHandle::new(Box::new(bench.actuator(0)))],
            Box::new(bench.sensor(1, 1)),
            &layout,
        );
        assert!(matches!(
            result,
            Err(RegistryError::DeviceCountMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let layout = single_device_layout(2);
        let bench = SimBench::new(&layout, vec![]);
        let result = DeviceRegistry::new(
            vec![
                DeviceHandle::named("Parabola", Box::new(bench.actuator(0))),
                DeviceHandle::named("Parabola", Box::new(bench.actuator(1))),
            ],
            Box::new(bench.sensor(1, 1)),
            &layout,
        );
        assert!(matches!(result, Err(RegistryError::DuplicateName(_))));
    }
}

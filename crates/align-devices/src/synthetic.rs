//! Deterministic simulated bench for tests.
//!
//! This module is public to allow use across workspace test suites, but
//! is not intended for production use. It provides a shared-state bench:
//! actuators that hold their commanded positions, and a sensor whose
//! image responds linearly to the global command vector,
//! `image = sum(global_i * basis_i)`.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{bail, ensure, Result};

use align_core::{Mask, MaskedImage, Real, Vector};

use crate::capability::{ImageSource, Movable, Readable};
use crate::layout::CommandLayout;

struct SimState {
    layout: CommandLayout,
    positions: Vec<Vector>,
    basis: Vec<MaskedImage>,
    sensor_mask: Option<Mask>,
}

/// A simulated optical bench shared by its actuators and sensor.
#[derive(Clone)]
pub struct SimBench {
    state: Rc<RefCell<SimState>>,
}

impl SimBench {
    /// Bench with all actuators at zero.
    ///
    /// `basis` holds one response image per global command index; it may
    /// be empty, in which case the sensor produces flat zero images.
    pub fn new(layout: &CommandLayout, basis: Vec<MaskedImage>) -> Self {
        let positions = layout
            .maps()
            .iter()
            .map(|m| Vector::zeros(m.total_dof))
            .collect();
        Self {
            state: Rc::new(RefCell::new(SimState {
                layout: layout.clone(),
                positions,
                basis,
                sensor_mask: None,
            })),
        }
    }

    /// Fix an invalidity mask stamped onto every acquired image.
    pub fn set_sensor_mask(&self, mask: Option<Mask>) {
        self.state.borrow_mut().sensor_mask = mask;
    }

    /// Directly set one actuator's absolute position.
    pub fn set_position(&self, device: usize, position: Vector) {
        self.state.borrow_mut().positions[device] = position;
    }

    /// One actuator's current absolute position.
    pub fn position(&self, device: usize) -> Vector {
        self.state.borrow().positions[device].clone()
    }

    /// The global command vector implied by the current positions.
    pub fn global_position(&self) -> Vector {
        let state = self.state.borrow();
        state
            .layout
            .gather(&state.positions)
            .expect("positions match the layout by construction")
    }

    /// Handle to actuator `device`, implementing `Movable + Readable`.
    pub fn actuator(&self, device: usize) -> SimActuator {
        SimActuator {
            state: Rc::clone(&self.state),
            device,
        }
    }

    /// Sensor handle producing `nrows x ncols` images.
    pub fn sensor(&self, nrows: usize, ncols: usize) -> SimSensor {
        SimSensor {
            state: Rc::clone(&self.state),
            nrows,
            ncols,
        }
    }
}

/// A simulated actuator holding its commanded position.
pub struct SimActuator {
    state: Rc<RefCell<SimState>>,
    device: usize,
}

impl Movable for SimActuator {
    fn set_position(&mut self, target: &Vector) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let expected = state.positions[self.device].len();
        ensure!(
            target.len() == expected,
            "actuator {} takes {expected} DOF, got {}",
            self.device,
            target.len()
        );
        state.positions[self.device] = target.clone();
        Ok(())
    }
}

impl Readable for SimActuator {
    fn position(&self) -> Result<Vector> {
        Ok(self.state.borrow().positions[self.device].clone())
    }
}

/// A simulated sensor with a linear wavefront response.
pub struct SimSensor {
    state: Rc<RefCell<SimState>>,
    nrows: usize,
    ncols: usize,
}

impl ImageSource for SimSensor {
    fn acquire(&mut self, _frames: usize) -> Result<MaskedImage> {
        let state = self.state.borrow();
        let global = state
            .layout
            .gather(&state.positions)
            .expect("positions match the layout by construction");
        ensure!(
            state.basis.is_empty() || state.basis.len() == global.len(),
            "{} basis images for a global vector of {}",
            state.basis.len(),
            global.len()
        );

        let mut image = MaskedImage::zeros(self.nrows, self.ncols);
        for (shape, value) in state.basis.iter().zip(global.iter()) {
            image.add_scaled(shape, *value)?;
        }
        if let Some(mask) = &state.sensor_mask {
            let data = image.data().clone();
            image = MaskedImage::with_mask(data, mask.clone())?;
        }
        Ok(image)
    }
}

/// An actuator whose moves always fail; reads still succeed.
pub struct FailingActuator {
    position: Vector,
}

impl FailingActuator {
    pub fn new(total_dof: usize) -> Self {
        Self {
            position: Vector::zeros(total_dof),
        }
    }
}

impl Movable for FailingActuator {
    fn set_position(&mut self, _target: &Vector) -> Result<()> {
        bail!("link timeout")
    }
}

impl Readable for FailingActuator {
    fn position(&self) -> Result<Vector> {
        Ok(self.position.clone())
    }
}

//! Push-pull excitation templates.
//!
//! A template is an ordered sequence of signed integer weights, e.g.
//! `[+1, -2, +1]`. During a cycle each weight scales the excitation
//! column and is applied as a *delta*, so the assembly walks through the
//! cumulative positions `+1, -1, 0`. Demodulation prepends an implicit
//! `-1` weight for the reference image; [`PushPullTemplate::with_reference`]
//! builds that weighted sequence without touching the caller's template.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing a template.
#[derive(Debug, Error, Clone, Copy)]
pub enum TemplateError {
    /// A template must carry at least one weight.
    #[error("push-pull template must not be empty")]
    Empty,
}

/// An ordered sequence of signed push-pull weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPullTemplate(Vec<i32>);

impl PushPullTemplate {
    pub fn new(weights: Vec<i32>) -> Result<Self, TemplateError> {
        if weights.is_empty() {
            return Err(TemplateError::Empty);
        }
        Ok(Self(weights))
    }

    pub fn weights(&self) -> &[i32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The demodulation weight sequence `[-1, t_1, ..., t_n]`.
    ///
    /// Pure: returns a new sequence, the template is left untouched.
    pub fn with_reference(&self) -> Vec<i32> {
        let mut weights = Vec::with_capacity(self.0.len() + 1);
        weights.push(-1);
        weights.extend_from_slice(&self.0);
        weights
    }

    /// Response gain of the template: `sum(t_k * cumsum(t)_k)`.
    ///
    /// Weights are applied as deltas, so the image acquired after weight
    /// `t_k` samples the cumulative position. The demodulated image is
    /// `gain` times the per-unit-command response; calibration divides it
    /// back out.
    pub fn gain(&self) -> i32 {
        let mut position = 0;
        let mut gain = 0;
        for &t in &self.0 {
            position += t;
            gain += t * position;
        }
        gain
    }

    /// Net position offset left behind by a full cycle, in weight units.
    ///
    /// Zero for balanced templates such as `[+1, -2, +1]`.
    pub fn residual(&self) -> i32 {
        self.0.iter().sum()
    }
}

impl Default for PushPullTemplate {
    fn default() -> Self {
        Self(vec![1, -2, 1])
    }
}

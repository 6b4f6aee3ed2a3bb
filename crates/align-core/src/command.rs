//! Immutable device commands and arbitration logic.
//!
//! A [`Command`] is an absolute per-device target with an `ignore` flag
//! deciding whether the move is worth issuing. The flag is computed by
//! [`Command::combine`] from the null patterns of the current position
//! `P`, the incoming delta `C`, and their sum `S = P + C`:
//!
//! | S   | P null | C null | ignore |
//! |-----|--------|--------|--------|
//! | = 0 | no     | no     | no (explicit return-to-zero is issued) |
//! | = 0 | yes    | yes    | yes (nothing to do) |
//! | ≠ 0 | no     | yes    | yes (no actual change) |
//! | ≠ 0 | no     | no     | no |
//! | ≠ 0 | yes    | no     | no |
//!
//! The three remaining null patterns are outside the table and raise
//! [`CommandError::UnhandledCase`]; a nonzero delta is never silently
//! dropped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Vector;

/// Errors that can occur during command arbitration.
#[derive(Debug, Error, Clone)]
pub enum CommandError {
    /// Position and delta vectors have different lengths.
    #[error("shape mismatch: position has {position} elements, delta has {delta}")]
    ShapeMismatch { position: usize, delta: usize },
    /// The null pattern of (P, C, S) is outside the decision table.
    #[error(
        "unhandled arbitration case: position_null={position_null}, \
         delta_null={delta_null}, sum_null={sum_null}"
    )]
    UnhandledCase {
        position_null: bool,
        delta_null: bool,
        sum_null: bool,
    },
}

/// An absolute per-device command, produced fresh per decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    vector: Vector,
    ignore: bool,
}

impl Command {
    pub fn new(vector: Vector, ignore: bool) -> Self {
        Self { vector, ignore }
    }

    /// The absolute target vector.
    pub fn vector(&self) -> &Vector {
        &self.vector
    }

    /// Whether the move is a redundant no-op.
    pub fn ignore(&self) -> bool {
        self.ignore
    }

    /// Combine a current absolute position with an incoming delta.
    ///
    /// Returns the absolute target `S = P + C` with its `ignore` flag.
    ///
    /// # Errors
    ///
    /// - [`CommandError::ShapeMismatch`] if the operands differ in length.
    /// - [`CommandError::UnhandledCase`] if the null pattern falls outside
    ///   the decision table (arithmetically unreachable when `S` is
    ///   computed from `P` and `C`, but kept explicit).
    pub fn combine(position: &Vector, delta: &Vector) -> Result<Command, CommandError> {
        if position.len() != delta.len() {
            return Err(CommandError::ShapeMismatch {
                position: position.len(),
                delta: delta.len(),
            });
        }
        let sum = position + delta;
        let ignore = arbitrate(is_null(position), is_null(delta), is_null(&sum))?;
        Ok(Command::new(sum, ignore))
    }
}

fn is_null(v: &Vector) -> bool {
    v.iter().all(|x| *x == 0.0)
}

/// Decide the ignore flag from the null pattern of (P, C, S).
///
/// Exposed separately from [`Command::combine`] so the full truth table,
/// including the three invalid patterns, can be exercised directly.
pub fn arbitrate(
    position_null: bool,
    delta_null: bool,
    sum_null: bool,
) -> Result<bool, CommandError> {
    match (position_null, delta_null, sum_null) {
        // S = 0: either a genuine return-to-zero or nothing at all.
        (false, false, true) => Ok(false),
        (true, true, true) => Ok(true),
        // S != 0: a null delta leaves the device where it is.
        (false, true, false) => Ok(true),
        (false, false, false) => Ok(false),
        (true, false, false) => Ok(false),
        (position_null, delta_null, sum_null) => Err(CommandError::UnhandledCase {
            position_null,
            delta_null,
            sum_null,
        }),
    }
}

//! DOF index maps and global-vector partitioning.
//!
//! A [`CommandLayout`] describes how the global command vector splits
//! across devices. Each device owns a contiguous span of the global
//! vector; the spans partition it exactly (no gaps, no overlaps). The
//! device's DOF index list maps each span position onto the index it
//! occupies in the device's own command vector. DOFs a device exposes
//! but the layout does not list are left at zero, never read from the
//! global vector.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use align_core::Vector;

/// Errors raised by layout validation, scatter, and gather.
#[derive(Debug, Error, Clone)]
pub enum LayoutError {
    #[error("layout must describe at least one device")]
    Empty,
    /// Spans must be contiguous and start at zero.
    #[error("device {device}: span starts at {found}, expected {expected}")]
    NonContiguousSpan {
        device: usize,
        expected: usize,
        found: usize,
    },
    #[error("device {device}: span {start}..{end} is empty or reversed")]
    EmptySpan {
        device: usize,
        start: usize,
        end: usize,
    },
    #[error("device {device}: {dof_len} DOF indices for a span of length {span_len}")]
    DofLengthMismatch {
        device: usize,
        dof_len: usize,
        span_len: usize,
    },
    #[error("device {device}: DOF index {index} out of range for {total_dof} total DOF")]
    DofOutOfRange {
        device: usize,
        index: usize,
        total_dof: usize,
    },
    #[error("device {device}: duplicate DOF index {index}")]
    DuplicateDof { device: usize, index: usize },
    /// A full command of the wrong length cannot be scattered.
    #[error("full command has {got} elements, layout expects {expected}")]
    GlobalLengthMismatch { expected: usize, got: usize },
    #[error("expected {expected} per-device vectors, got {got}")]
    DeviceCountMismatch { expected: usize, got: usize },
    #[error("device {device}: vector has {got} elements, expected {expected}")]
    DeviceLengthMismatch {
        device: usize,
        expected: usize,
        got: usize,
    },
}

/// One device's share of the global command vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DofMap {
    /// Total DOF count of the device: the length of its command vector.
    pub total_dof: usize,
    /// Device-vector index for each position of the global span, in order.
    pub dof: Vec<usize>,
    /// Contiguous slice of the global command vector owned by the device.
    pub span: Range<usize>,
}

/// Validated partition of the global command vector across devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandLayout {
    maps: Vec<DofMap>,
    global_len: usize,
}

impl CommandLayout {
    /// Validate the partition and DOF-map invariants.
    ///
    /// # Errors
    ///
    /// Any violated invariant: non-contiguous or empty spans, DOF lists
    /// whose length differs from the span, out-of-range or duplicate DOF
    /// indices.
    pub fn new(maps: Vec<DofMap>) -> Result<Self, LayoutError> {
        if maps.is_empty() {
            return Err(LayoutError::Empty);
        }
        let mut cursor = 0usize;
        for (device, map) in maps.iter().enumerate() {
            if map.span.end <= map.span.start {
                return Err(LayoutError::EmptySpan {
                    device,
                    start: map.span.start,
                    end: map.span.end,
                });
            }
            if map.span.start != cursor {
                return Err(LayoutError::NonContiguousSpan {
                    device,
                    expected: cursor,
                    found: map.span.start,
                });
            }
            cursor = map.span.end;

            if map.dof.len() != map.span.len() {
                return Err(LayoutError::DofLengthMismatch {
                    device,
                    dof_len: map.dof.len(),
                    span_len: map.span.len(),
                });
            }
            let mut seen = vec![false; map.total_dof];
            for &index in &map.dof {
                if index >= map.total_dof {
                    return Err(LayoutError::DofOutOfRange {
                        device,
                        index,
                        total_dof: map.total_dof,
                    });
                }
                if seen[index] {
                    return Err(LayoutError::DuplicateDof { device, index });
                }
                seen[index] = true;
            }
        }
        Ok(Self {
            global_len: cursor,
            maps,
        })
    }

    pub fn device_count(&self) -> usize {
        self.maps.len()
    }

    /// Length of the global command vector.
    pub fn global_len(&self) -> usize {
        self.global_len
    }

    pub fn maps(&self) -> &[DofMap] {
        &self.maps
    }

    /// Scatter a full command into per-device delta vectors.
    ///
    /// Each device gets a zero vector of its total DOF length with the
    /// values of its global span scattered onto its DOF indices.
    pub fn scatter(&self, full: &Vector) -> Result<Vec<Vector>, LayoutError> {
        if full.len() != self.global_len {
            return Err(LayoutError::GlobalLengthMismatch {
                expected: self.global_len,
                got: full.len(),
            });
        }
        let mut commands = Vec::with_capacity(self.maps.len());
        for map in &self.maps {
            let mut cmd = Vector::zeros(map.total_dof);
            for (i, &dof_index) in map.dof.iter().enumerate() {
                cmd[dof_index] = full[map.span.start + i];
            }
            commands.push(cmd);
        }
        Ok(commands)
    }

    /// Gather per-device vectors back into a full command.
    ///
    /// Inverse of [`scatter`](Self::scatter) on mapped positions.
    pub fn gather(&self, per_device: &[Vector]) -> Result<Vector, LayoutError> {
        if per_device.len() != self.maps.len() {
            return Err(LayoutError::DeviceCountMismatch {
                expected: self.maps.len(),
                got: per_device.len(),
            });
        }
        let mut full = Vector::zeros(self.global_len);
        for (device, (map, vector)) in self.maps.iter().zip(per_device).enumerate() {
            if vector.len() != map.total_dof {
                return Err(LayoutError::DeviceLengthMismatch {
                    device,
                    expected: map.total_dof,
                    got: vector.len(),
                });
            }
            for (i, &dof_index) in map.dof.iter().enumerate() {
                full[map.span.start + i] = vector[dof_index];
            }
        }
        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The reference tower layout: parabola (3 of 6 DOF), reference
    /// mirror (2 of 6), exapod (2 of 6).
    fn tower_layout() -> CommandLayout {
        CommandLayout::new(vec![
            DofMap {
                total_dof: 6,
                dof: vec![2, 3, 4],
                span: 0..3,
            },
            DofMap {
                total_dof: 6,
                dof: vec![3, 4],
                span: 3..5,
            },
            DofMap {
                total_dof: 6,
                dof: vec![3, 4],
                span: 5..7,
            },
        ])
        .unwrap()
    }

    #[test]
    fn spans_partition_the_global_vector() {
        let layout = tower_layout();
        assert_eq!(layout.global_len(), 7);
        let mut covered = 0;
        for map in layout.maps() {
            assert_eq!(map.span.start, covered);
            covered = map.span.end;
        }
        assert_eq!(covered, layout.global_len());
    }

    #[test]
    fn gap_in_spans_is_rejected() {
        let result = CommandLayout::new(vec![
            DofMap {
                total_dof: 6,
                dof: vec![0, 1],
                span: 0..2,
            },
            DofMap {
                total_dof: 6,
                dof: vec![0],
                span: 3..4,
            },
        ]);
        assert!(matches!(
            result,
            Err(LayoutError::NonContiguousSpan {
                device: 1,
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn overlapping_spans_are_rejected() {
        let result = CommandLayout::new(vec![
            DofMap {
                total_dof: 6,
                dof: vec![0, 1],
                span: 0..2,
            },
            DofMap {
                total_dof: 6,
                dof: vec![0],
                span: 1..2,
            },
        ]);
        assert!(matches!(result, Err(LayoutError::NonContiguousSpan { .. })));
    }

    #[test]
    fn dof_out_of_range_is_rejected() {
        let result = CommandLayout::new(vec![DofMap {
            total_dof: 2,
            dof: vec![0, 2],
            span: 0..2,
        }]);
        assert!(matches!(
            result,
            Err(LayoutError::DofOutOfRange {
                device: 0,
                index: 2,
                total_dof: 2
            })
        ));
    }

    #[test]
    fn duplicate_dof_is_rejected() {
        let result = CommandLayout::new(vec![DofMap {
            total_dof: 4,
            dof: vec![1, 1],
            span: 0..2,
        }]);
        assert!(matches!(result, Err(LayoutError::DuplicateDof { .. })));
    }

    #[test]
    fn scatter_leaves_unmapped_dof_at_zero() {
        let layout = tower_layout();
        let full = Vector::from_row_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let commands = layout.scatter(&full).unwrap();

        assert_eq!(
            commands[0],
            Vector::from_row_slice(&[0.0, 0.0, 1.0, 2.0, 3.0, 0.0])
        );
        assert_eq!(
            commands[1],
            Vector::from_row_slice(&[0.0, 0.0, 0.0, 4.0, 5.0, 0.0])
        );
        assert_eq!(
            commands[2],
            Vector::from_row_slice(&[0.0, 0.0, 0.0, 6.0, 7.0, 0.0])
        );
    }

    #[test]
    fn scatter_then_gather_is_identity_on_mapped_positions() {
        let layout = tower_layout();
        let full = Vector::from_row_slice(&[0.1, -0.2, 0.3, -0.4, 0.5, -0.6, 0.7]);
        let commands = layout.scatter(&full).unwrap();
        let back = layout.gather(&commands).unwrap();
        assert_eq!(back, full);
    }

    #[test]
    fn scatter_rejects_wrong_length() {
        let layout = tower_layout();
        let full = Vector::zeros(6);
        assert!(matches!(
            layout.scatter(&full),
            Err(LayoutError::GlobalLengthMismatch {
                expected: 7,
                got: 6
            })
        ));
    }
}

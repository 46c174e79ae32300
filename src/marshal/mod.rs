//! # Buffer marshaling
//!
//! Conversion of ephemeris series into the flat `f64` buffers expected by the
//! cost kernel, and bookkeeping of every buffer placed in the foreign heap.
//!
//! ## Layout
//!
//! For a series of `N` samples:
//!
//! | buffer       | length | content                     |
//! |--------------|--------|-----------------------------|
//! | `dates`      | `N`    | julian days                 |
//! | `positions`  | `3N`   | `x0, y0, z0, x1, y1, z1, …` |
//! | `velocities` | `3N`   | `vx0, vy0, vz0, …`          |
//!
//! Outputs are three buffers of `N × M` values, departure index varying slowest.
//!
//! ## Structure
//!
//! ```text
//! marshal
//! ├── heap     ForeignHeap trait, HeapPtr, ArenaHeap
//! └── session  MarshalingSession: allocation registry with release-all
//! ```
use crate::ephemeris::EphemerisSeries;

use self::{heap::HeapPtr, session::MarshalError};

pub mod heap;
pub mod session;

/// Number of `f64` per sample in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentWidth {
    Scalar,
    Vector3,
}

impl ComponentWidth {
    pub fn width(&self) -> usize {
        match self {
            ComponentWidth::Scalar => 1,
            ComponentWidth::Vector3 => 3,
        }
    }
}

/// A series laid out as the kernel expects it, before it is copied to the heap.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatSeries {
    pub dates: Vec<f64>,
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
    pub count: usize,
}

impl FlatSeries {
    /// Flatten a series.
    ///
    /// Arguments
    /// -----------------
    /// * `series`: the parsed samples of one body.
    /// * `label`: name of the leg, used in error messages.
    ///
    /// Return
    /// ----------
    /// * The flat buffers, or [`MarshalError::EmptySeries`] for an empty series.
    pub fn flatten(series: &EphemerisSeries, label: &str) -> Result<Self, MarshalError> {
        if series.is_empty() {
            return Err(MarshalError::EmptySeries(label.into()));
        }
        let samples = series.samples();

        let flat = FlatSeries {
            dates: samples.iter().map(|s| s.date.jd).collect(),
            positions: samples
                .iter()
                .flat_map(|s| [s.position.x, s.position.y, s.position.z])
                .collect(),
            velocities: samples
                .iter()
                .flat_map(|s| [s.velocity.vx, s.velocity.vy, s.velocity.vz])
                .collect(),
            count: samples.len(),
        };
        flat.check(label)?;
        Ok(flat)
    }

    /// Check that every component holds `count × width` values.
    pub fn check(&self, label: &str) -> Result<(), MarshalError> {
        let components = [
            ("dates", &self.dates, ComponentWidth::Scalar),
            ("positions", &self.positions, ComponentWidth::Vector3),
            ("velocities", &self.velocities, ComponentWidth::Vector3),
        ];
        for (name, values, width) in components {
            let expected = self.count * width.width();
            if values.len() != expected {
                return Err(MarshalError::LengthMismatch {
                    key: format!("{label}.{name}"),
                    expected,
                    found: values.len(),
                });
            }
        }
        Ok(())
    }
}

/// A buffer living in the foreign heap, as recorded by its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferHandle {
    key: String,
    ptr: HeapPtr,
    count: usize,
    width: ComponentWidth,
}

impl BufferHandle {
    pub(crate) fn new(key: String, ptr: HeapPtr, count: usize, width: ComponentWidth) -> Self {
        BufferHandle {
            key,
            ptr,
            count,
            width,
        }
    }

    /// Registry key, e.g. `departure.positions`
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ptr(&self) -> HeapPtr {
        self.ptr
    }

    /// Number of samples (or cells) described by the buffer
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn width(&self) -> ComponentWidth {
        self.width
    }

    /// Number of `f64` in the buffer
    pub fn len(&self) -> usize {
        self.count * self.width.width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The three input buffers of one leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBuffers {
    pub dates: BufferHandle,
    pub positions: BufferHandle,
    pub velocities: BufferHandle,
    pub count: usize,
}

impl InputBuffers {
    pub fn handles(&self) -> [&BufferHandle; 3] {
        [&self.dates, &self.positions, &self.velocities]
    }
}

/// The three result buffers, `size = departure_count × arrival_count` cells each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBuffers {
    pub c3: BufferHandle,
    pub dv1: BufferHandle,
    pub total_dv: BufferHandle,
    pub departure_count: usize,
    pub arrival_count: usize,
    pub size: usize,
}

impl OutputBuffers {
    pub fn handles(&self) -> [&BufferHandle; 3] {
        [&self.c3, &self.dv1, &self.total_dv]
    }
}

#[cfg(test)]
mod marshal_test {
    use itertools::Itertools;

    use super::*;
    use crate::ephemeris::{
        EphemerisDate, EphemerisFrame, EphemerisSeries, Position, StateVector, Velocity,
    };

    fn sample(jd: f64, offset: f64) -> StateVector {
        StateVector {
            date: EphemerisDate {
                jd,
                calendar: String::new(),
                iso: None,
            },
            position: Position {
                x: offset + 1.0,
                y: offset + 2.0,
                z: offset + 3.0,
            },
            velocity: Velocity {
                vx: offset + 0.1,
                vy: offset + 0.2,
                vz: offset + 0.3,
            },
        }
    }

    #[test]
    fn test_flatten_regroups_by_stride() {
        let samples = vec![sample(2460676.5, 0.0), sample(2460677.5, 10.0)];
        let series = EphemerisSeries::new(EphemerisFrame::default(), samples.clone());
        let flat = FlatSeries::flatten(&series, "departure").unwrap();

        assert_eq!(flat.count, 2);
        assert_eq!(flat.dates, vec![2460676.5, 2460677.5]);
        assert_eq!(flat.positions.len(), 6);

        let positions: Vec<(f64, f64, f64)> = flat.positions.iter().copied().tuples().collect();
        let velocities: Vec<(f64, f64, f64)> =
            flat.velocities.iter().copied().tuples().collect();
        for (k, s) in samples.iter().enumerate() {
            assert_eq!(positions[k], (s.position.x, s.position.y, s.position.z));
            assert_eq!(velocities[k], (s.velocity.vx, s.velocity.vy, s.velocity.vz));
        }
    }

    #[test]
    fn test_flatten_empty_series() {
        let err = FlatSeries::flatten(&EphemerisSeries::default(), "arrival").unwrap_err();
        assert_eq!(err, MarshalError::EmptySeries("arrival".into()));
    }

    #[test]
    fn test_check_length_mismatch() {
        let flat = FlatSeries {
            dates: vec![1.0, 2.0],
            positions: vec![0.0; 6],
            velocities: vec![0.0; 5],
            count: 2,
        };
        assert_eq!(
            flat.check("departure"),
            Err(MarshalError::LengthMismatch {
                key: "departure.velocities".into(),
                expected: 6,
                found: 5,
            })
        );
    }
}

//! # Marshaling session
//!
//! One session per pipeline run. Every buffer placed in the foreign heap is
//! recorded under its key before it is handed out, and [`MarshalingSession::release_all`]
//! frees all of them at once. The session releases on drop as well, so leaving the
//! marshal → invoke → reshape scope early (`?`, panic) cannot leak a buffer.
//!
//! The session holds the heap by mutable borrow: two sessions cannot share a heap
//! at the same time and a session cannot outlive it.
use thiserror::Error;
use tracing::{debug, warn};

use crate::ephemeris::EphemerisSeries;

use super::{
    heap::{ForeignHeap, HeapError, ELEMENT_SIZE},
    BufferHandle, ComponentWidth, FlatSeries, InputBuffers, OutputBuffers,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    #[error("Empty {0} series")]
    EmptySeries(String),

    #[error("Buffer {key} holds {found} values, expected {expected}")]
    LengthMismatch {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("Buffer key {0} is already allocated")]
    DuplicateKey(String),

    #[error("Invalid result dimensions {departure} x {arrival}")]
    InvalidDimensions { departure: usize, arrival: usize },

    #[error("Heap error on {key}: {source}")]
    Heap { key: String, source: HeapError },

    #[error("Buffer {0} has been released")]
    Released(String),
}

/// Registry of the buffers allocated for one run.
pub struct MarshalingSession<'h> {
    heap: &'h mut dyn ForeignHeap,
    registry: Vec<BufferHandle>,
}

impl<'h> MarshalingSession<'h> {
    pub fn new(heap: &'h mut dyn ForeignHeap) -> Self {
        MarshalingSession {
            heap,
            registry: Vec::new(),
        }
    }

    /// Number of buffers currently recorded.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Keys of the recorded buffers, in allocation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.registry.iter().map(BufferHandle::key)
    }

    /// `true` if `handle` was allocated by this session and not yet released.
    pub fn is_live(&self, handle: &BufferHandle) -> bool {
        self.registry.iter().any(|h| h == handle) && self.heap.is_live(handle.ptr())
    }

    pub fn heap(&self) -> &dyn ForeignHeap {
        &*self.heap
    }

    pub fn heap_mut(&mut self) -> &mut dyn ForeignHeap {
        &mut *self.heap
    }

    /// Copy a flattened series into three fresh heap buffers.
    ///
    /// Arguments
    /// -----------------
    /// * `series`: the samples of one leg.
    /// * `label`: key prefix, the buffers are recorded as `{label}.dates`,
    ///   `{label}.positions` and `{label}.velocities`.
    ///
    /// Return
    /// ----------
    /// * The [`InputBuffers`] of the leg. On any failure every buffer of the
    ///   session, not only those of this call, is released before returning.
    pub fn allocate_inputs(
        &mut self,
        series: &EphemerisSeries,
        label: &str,
    ) -> Result<InputBuffers, MarshalError> {
        let result = FlatSeries::flatten(series, label).and_then(|flat| self.copy_inputs(&flat, label));
        self.release_on_error(result)
    }

    fn copy_inputs(&mut self, flat: &FlatSeries, label: &str) -> Result<InputBuffers, MarshalError> {
        let dates = self.allocate_with(format!("{label}.dates"), &flat.dates, ComponentWidth::Scalar)?;
        let positions = self.allocate_with(
            format!("{label}.positions"),
            &flat.positions,
            ComponentWidth::Vector3,
        )?;
        let velocities = self.allocate_with(
            format!("{label}.velocities"),
            &flat.velocities,
            ComponentWidth::Vector3,
        )?;
        debug!(label, count = flat.count, "input buffers allocated");
        Ok(InputBuffers {
            dates,
            positions,
            velocities,
            count: flat.count,
        })
    }

    /// Allocate the three zero-filled result buffers of a `departure × arrival` grid.
    pub fn allocate_outputs(
        &mut self,
        departure_count: usize,
        arrival_count: usize,
    ) -> Result<OutputBuffers, MarshalError> {
        let result = self.zeroed_outputs(departure_count, arrival_count);
        self.release_on_error(result)
    }

    fn zeroed_outputs(
        &mut self,
        departure_count: usize,
        arrival_count: usize,
    ) -> Result<OutputBuffers, MarshalError> {
        let invalid = MarshalError::InvalidDimensions {
            departure: departure_count,
            arrival: arrival_count,
        };
        if departure_count == 0 || arrival_count == 0 {
            return Err(invalid);
        }
        let size = departure_count
            .checked_mul(arrival_count)
            .filter(|size| size.checked_mul(ELEMENT_SIZE).is_some())
            .ok_or(invalid)?;

        let c3 = self.allocate_zeroed("result.c3".into(), size)?;
        let dv1 = self.allocate_zeroed("result.dv1".into(), size)?;
        let total_dv = self.allocate_zeroed("result.total_dv".into(), size)?;
        debug!(departure_count, arrival_count, size, "output buffers allocated");

        Ok(OutputBuffers {
            c3,
            dv1,
            total_dv,
            departure_count,
            arrival_count,
            size,
        })
    }

    /// Allocate a buffer, record it, then copy `values` into it.
    fn allocate_with(
        &mut self,
        key: String,
        values: &[f64],
        width: ComponentWidth,
    ) -> Result<BufferHandle, MarshalError> {
        if values.is_empty() || values.len() % width.width() != 0 {
            return Err(MarshalError::LengthMismatch {
                key,
                expected: values.len().next_multiple_of(width.width()).max(width.width()),
                found: values.len(),
            });
        }
        let handle = self.allocate_block(key, values.len(), width)?;
        self.heap
            .write(handle.ptr(), values)
            .map_err(|source| MarshalError::Heap {
                key: handle.key().into(),
                source,
            })?;
        Ok(handle)
    }

    /// Allocate a scalar buffer of `len` values, record it, then zero it in place.
    fn allocate_zeroed(&mut self, key: String, len: usize) -> Result<BufferHandle, MarshalError> {
        let handle = self.allocate_block(key, len, ComponentWidth::Scalar)?;
        self.heap
            .slice_mut(handle.ptr(), len)
            .map_err(|source| MarshalError::Heap {
                key: handle.key().into(),
                source,
            })?
            .fill(0.0);
        Ok(handle)
    }

    fn allocate_block(
        &mut self,
        key: String,
        len: usize,
        width: ComponentWidth,
    ) -> Result<BufferHandle, MarshalError> {
        if self.registry.iter().any(|h| h.key() == key) {
            return Err(MarshalError::DuplicateKey(key));
        }
        let ptr = match self.heap.malloc(len * ELEMENT_SIZE) {
            Ok(ptr) => ptr,
            Err(source) => return Err(MarshalError::Heap { key, source }),
        };
        let handle = BufferHandle::new(key, ptr, len / width.width(), width);
        self.registry.push(handle.clone());
        Ok(handle)
    }

    fn release_on_error<T>(&mut self, result: Result<T, MarshalError>) -> Result<T, MarshalError> {
        if let Err(err) = &result {
            warn!(error = %err, "marshaling failed, releasing session buffers");
            self.release_all();
        }
        result
    }

    /// Copy a live buffer out of the heap.
    pub fn read(&self, handle: &BufferHandle) -> Result<Vec<f64>, MarshalError> {
        if !self.is_live(handle) {
            return Err(MarshalError::Released(handle.key().into()));
        }
        self.heap
            .read(handle.ptr(), handle.len())
            .map_err(|source| MarshalError::Heap {
                key: handle.key().into(),
                source,
            })
    }

    /// Free every recorded buffer and clear the registry.
    ///
    /// Return
    /// ----------
    /// * The number of buffers freed; `0` on an empty or already released session.
    pub fn release_all(&mut self) -> usize {
        let mut freed = 0;
        for handle in self.registry.drain(..) {
            match self.heap.free(handle.ptr()) {
                Ok(()) => freed += 1,
                Err(err) => warn!(key = handle.key(), error = %err, "buffer release failed"),
            }
        }
        if freed > 0 {
            debug!(freed, "session buffers released");
        }
        freed
    }
}

impl Drop for MarshalingSession<'_> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod session_test {
    use super::*;
    use crate::{
        ephemeris::{EphemerisDate, EphemerisFrame, Position, StateVector, Velocity},
        marshal::heap::ArenaHeap,
    };

    fn series(count: usize) -> EphemerisSeries {
        let samples = (0..count)
            .map(|k| StateVector {
                date: EphemerisDate {
                    jd: 2460676.5 + k as f64,
                    calendar: String::new(),
                    iso: None,
                },
                position: Position {
                    x: k as f64,
                    y: 1.0,
                    z: 2.0,
                },
                velocity: Velocity {
                    vx: 3.0,
                    vy: 4.0,
                    vz: 5.0,
                },
            })
            .collect();
        EphemerisSeries::new(EphemerisFrame::default(), samples)
    }

    #[test]
    fn test_allocate_inputs() {
        let mut heap = ArenaHeap::new();
        let mut session = MarshalingSession::new(&mut heap);
        let inputs = session.allocate_inputs(&series(3), "departure").unwrap();

        assert_eq!(inputs.count, 3);
        assert_eq!(inputs.positions.len(), 9);
        assert_eq!(
            session.keys().collect::<Vec<_>>(),
            ["departure.dates", "departure.positions", "departure.velocities"]
        );
        assert_eq!(
            session.read(&inputs.dates).unwrap(),
            vec![2460676.5, 2460677.5, 2460678.5]
        );
        assert_eq!(
            session.read(&inputs.positions).unwrap()[..3],
            [0.0, 1.0, 2.0]
        );
    }

    #[test]
    fn test_outputs_are_zeroed() {
        let mut heap = ArenaHeap::new();
        let mut session = MarshalingSession::new(&mut heap);
        let outputs = session.allocate_outputs(3, 2).unwrap();
        assert_eq!(outputs.size, 6);
        for handle in outputs.handles() {
            assert_eq!(session.read(handle).unwrap(), vec![0.0; 6]);
        }
        assert!(matches!(
            session.allocate_outputs(0, 2),
            Err(MarshalError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_output_size_overflow() {
        let mut heap = ArenaHeap::new();
        let mut session = MarshalingSession::new(&mut heap);
        assert!(matches!(
            session.allocate_outputs(usize::MAX, 2),
            Err(MarshalError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_huge_outputs_fail_without_aborting() {
        let mut heap = ArenaHeap::new();
        let mut session = MarshalingSession::new(&mut heap);
        session.allocate_inputs(&series(2), "departure").unwrap();

        let err = session.allocate_outputs(1 << 30, 1 << 30).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::Heap {
                source: HeapError::OutOfMemory { .. },
                ..
            }
        ));
        assert!(session.is_empty());
        assert_eq!(session.heap().live_blocks(), 0);
    }

    #[test]
    fn test_release_all_is_idempotent() {
        let mut heap = ArenaHeap::new();
        {
            let mut session = MarshalingSession::new(&mut heap);
            assert_eq!(session.release_all(), 0);

            let inputs = session.allocate_inputs(&series(2), "arrival").unwrap();
            session.allocate_outputs(2, 2).unwrap();
            assert_eq!(session.len(), 6);

            assert_eq!(session.release_all(), 6);
            assert_eq!(session.release_all(), 0);
            assert!(session.is_empty());
            assert_eq!(session.heap().live_blocks(), 0);
            assert_eq!(
                session.read(&inputs.dates),
                Err(MarshalError::Released("arrival.dates".into()))
            );
        }
        assert_eq!(heap.live_blocks(), 0);
    }

    #[test]
    fn test_drop_releases() {
        let mut heap = ArenaHeap::new();
        {
            let mut session = MarshalingSession::new(&mut heap);
            session.allocate_inputs(&series(4), "departure").unwrap();
        }
        assert_eq!(heap.live_blocks(), 0);
        assert_eq!(heap.used_bytes(), 0);
    }

    #[test]
    fn test_duplicate_key_releases_everything() {
        let mut heap = ArenaHeap::new();
        let mut session = MarshalingSession::new(&mut heap);
        session.allocate_inputs(&series(2), "departure").unwrap();
        let err = session.allocate_inputs(&series(2), "departure").unwrap_err();
        assert_eq!(err, MarshalError::DuplicateKey("departure.dates".into()));
        assert!(session.is_empty());
        assert_eq!(session.heap().live_blocks(), 0);
    }

    #[test]
    fn test_allocation_failure_releases_everything() {
        // room for the 2-sample departure inputs (2 + 6 + 6 values) only
        let mut heap = ArenaHeap::with_capacity_limit(14 * ELEMENT_SIZE);
        let mut session = MarshalingSession::new(&mut heap);
        session.allocate_inputs(&series(2), "departure").unwrap();
        let err = session.allocate_outputs(2, 2).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::Heap {
                source: HeapError::OutOfMemory { .. },
                ..
            }
        ));
        assert!(session.is_empty());
        assert_eq!(session.heap().live_blocks(), 0);
    }

    #[test]
    fn test_empty_series_is_rejected() {
        let mut heap = ArenaHeap::new();
        let mut session = MarshalingSession::new(&mut heap);
        assert_eq!(
            session.allocate_inputs(&EphemerisSeries::default(), "arrival"),
            Err(MarshalError::EmptySeries("arrival".into()))
        );
    }

    #[test]
    fn test_foreign_handle_is_not_live() {
        let mut heap = ArenaHeap::new();
        let foreign = heap.malloc(8).unwrap();
        let mut session = MarshalingSession::new(&mut heap);
        let handle = BufferHandle::new("other".into(), foreign, 1, ComponentWidth::Scalar);
        assert!(!session.is_live(&handle));
        assert!(session.read(&handle).is_err());
        assert_eq!(session.release_all(), 0);
    }
}

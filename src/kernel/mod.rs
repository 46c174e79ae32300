//! # Cost kernel boundary
//!
//! The transfer-cost computation itself (Lambert solving for every departure /
//! arrival pair) is an external capability. This module fixes the contract of
//! that capability and the checks made before handing it foreign buffers.
//!
//! The kernel entry point has 16 parameters:
//!
//! ```text
//! computePorkchopPlot(mu,
//!                     depPositions[3N], depVelocities[3N],
//!                     arrPositions[3M], arrVelocities[3M],
//!                     depDates[N], arrDates[M], N, M,
//!                     depPlanetMu, arrPlanetMu, depOrbitRadius, arrOrbitRadius,
//!                     outC3[N*M], outDv1[N*M], outTotalDv[N*M])
//! ```
//!
//! Outputs are written at `k = i * M + j` for departure `i` and arrival `j`.
//! A negative value marks a pair without solution.
use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;
use tracing::{debug, error};

use crate::{
    marshal::{
        heap::{ForeignHeap, HeapError},
        session::MarshalingSession,
        BufferHandle, InputBuffers, OutputBuffers,
    },
    mission::TransferConstants,
};

#[cfg(feature = "extern-kernel")]
pub mod extern_kernel;

/// Declared shape of a kernel entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSignature {
    pub entry_point: &'static str,
    pub parameters: usize,
    pub outputs: usize,
}

/// The only entry point the pipeline knows how to call.
pub const PORKCHOP_KERNEL_SIGNATURE: KernelSignature = KernelSignature {
    entry_point: "computePorkchopPlot",
    parameters: 16,
    outputs: 3,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("Kernel signature mismatch: expected {expected:?}, found {found:?}")]
    SignatureMismatch {
        expected: KernelSignature,
        found: KernelSignature,
    },

    #[error("Null buffer handle for {0}")]
    NullHandle(String),

    #[error("Buffer {0} is not live in the session")]
    StaleHandle(String),

    #[error("Output size {found} does not match {departure} x {arrival}")]
    SizeMismatch {
        departure: usize,
        arrival: usize,
        found: usize,
    },

    #[error("Heap access failed: {0}")]
    Heap(#[from] HeapError),

    #[error("Kernel failed: {0}")]
    Failed(String),

    #[error("Kernel panicked: {0}")]
    Panicked(String),
}

/// Arguments of one kernel call: the constants and the handles of every buffer.
#[derive(Debug, Clone, Copy)]
pub struct KernelCall<'a> {
    pub constants: &'a TransferConstants,
    pub departure: &'a InputBuffers,
    pub arrival: &'a InputBuffers,
    pub outputs: &'a OutputBuffers,
}

/// Input buffers of a call, copied out of the heap.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelInputs {
    pub departure_positions: Vec<f64>,
    pub departure_velocities: Vec<f64>,
    pub arrival_positions: Vec<f64>,
    pub arrival_velocities: Vec<f64>,
    pub departure_dates: Vec<f64>,
    pub arrival_dates: Vec<f64>,
}

impl KernelCall<'_> {
    /// Copy the six input buffers out of the heap.
    pub fn read_inputs(&self, heap: &dyn ForeignHeap) -> Result<KernelInputs, KernelError> {
        let read = |handle: &BufferHandle| heap.read(handle.ptr(), handle.len());
        Ok(KernelInputs {
            departure_positions: read(&self.departure.positions)?,
            departure_velocities: read(&self.departure.velocities)?,
            arrival_positions: read(&self.arrival.positions)?,
            arrival_velocities: read(&self.arrival.velocities)?,
            departure_dates: read(&self.departure.dates)?,
            arrival_dates: read(&self.arrival.dates)?,
        })
    }

    /// Write the three result arrays, each `N × M` long, into the output buffers.
    pub fn write_outputs(
        &self,
        heap: &mut dyn ForeignHeap,
        c3: &[f64],
        dv1: &[f64],
        total_dv: &[f64],
    ) -> Result<(), KernelError> {
        for (handle, values) in self.outputs.handles().into_iter().zip([c3, dv1, total_dv]) {
            if values.len() != self.outputs.size {
                return Err(KernelError::SizeMismatch {
                    departure: self.outputs.departure_count,
                    arrival: self.outputs.arrival_count,
                    found: values.len(),
                });
            }
            heap.write(handle.ptr(), values)?;
        }
        Ok(())
    }
}

/// External transfer-cost capability.
///
/// Implementors read the input buffers and fill the three output buffers of the
/// call in place; they own nothing and must not free any buffer.
pub trait CostKernel {
    fn signature(&self) -> KernelSignature;

    fn compute(&self, heap: &mut dyn ForeignHeap, call: &KernelCall<'_>) -> Result<(), KernelError>;
}

/// Synchronous call boundary in front of a [`CostKernel`].
#[derive(Debug)]
pub struct KernelInvoker<K> {
    kernel: K,
}

impl<K: CostKernel> KernelInvoker<K> {
    /// Wrap a kernel after checking its declared signature.
    ///
    /// Return
    /// ----------
    /// * [`KernelError::SignatureMismatch`] if the kernel does not expose
    ///   [`PORKCHOP_KERNEL_SIGNATURE`].
    pub fn new(kernel: K) -> Result<Self, KernelError> {
        let found = kernel.signature();
        if found != PORKCHOP_KERNEL_SIGNATURE {
            return Err(KernelError::SignatureMismatch {
                expected: PORKCHOP_KERNEL_SIGNATURE,
                found,
            });
        }
        Ok(KernelInvoker { kernel })
    }

    /// Run the kernel once over the buffers of `session`.
    ///
    /// Every handle must be non-null and live in the session, and the output
    /// buffers must hold `departure.count × arrival.count` cells; otherwise the
    /// kernel is not called. A kernel error or panic is returned as a
    /// [`KernelError`]. Output values are not inspected.
    pub fn invoke(
        &self,
        session: &mut MarshalingSession<'_>,
        constants: &TransferConstants,
        departure: &InputBuffers,
        arrival: &InputBuffers,
        outputs: &OutputBuffers,
    ) -> Result<(), KernelError> {
        let handles = departure
            .handles()
            .into_iter()
            .chain(arrival.handles())
            .chain(outputs.handles());
        for handle in handles {
            if handle.ptr().is_null() {
                return Err(KernelError::NullHandle(handle.key().into()));
            }
            if !session.is_live(handle) {
                return Err(KernelError::StaleHandle(handle.key().into()));
            }
        }

        let expected = departure.count.checked_mul(arrival.count);
        if outputs.departure_count != departure.count
            || outputs.arrival_count != arrival.count
            || expected != Some(outputs.size)
            || outputs.handles().iter().any(|h| h.len() != outputs.size)
        {
            return Err(KernelError::SizeMismatch {
                departure: departure.count,
                arrival: arrival.count,
                found: outputs.size,
            });
        }

        let call = KernelCall {
            constants,
            departure,
            arrival,
            outputs,
        };
        debug!(
            departure = departure.count,
            arrival = arrival.count,
            entry_point = PORKCHOP_KERNEL_SIGNATURE.entry_point,
            "invoking cost kernel"
        );

        let heap = session.heap_mut();
        match catch_unwind(AssertUnwindSafe(|| self.kernel.compute(heap, &call))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                error!(%message, "cost kernel panicked");
                Err(KernelError::Panicked(message))
            }
        }
    }
}

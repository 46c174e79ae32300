//! Binding to a native `computePorkchopPlot` implementation.
//!
//! Enabled with the `extern-kernel` feature. The native library (`libporkchop_kernel`)
//! must be on the linker search path, e.g. `RUSTFLAGS="-L /path/to/lib"`.
use std::os::raw::c_int;

use crate::marshal::heap::ForeignHeap;

use super::{CostKernel, KernelCall, KernelError, KernelSignature, PORKCHOP_KERNEL_SIGNATURE};

#[link(name = "porkchop_kernel")]
extern "C" {
    #[link_name = "computePorkchopPlot"]
    fn compute_porkchop_plot(
        mu: f64,
        departure_positions: *const f64,
        departure_velocities: *const f64,
        arrival_positions: *const f64,
        arrival_velocities: *const f64,
        departure_dates: *const f64,
        arrival_dates: *const f64,
        departure_count: c_int,
        arrival_count: c_int,
        departure_planet_mu: f64,
        arrival_planet_mu: f64,
        departure_orbit_radius: f64,
        arrival_orbit_radius: f64,
        out_c3: *mut f64,
        out_dv1: *mut f64,
        out_total_dv: *mut f64,
    );
}

/// [`CostKernel`] calling the native library.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternKernel;

impl CostKernel for ExternKernel {
    fn signature(&self) -> KernelSignature {
        PORKCHOP_KERNEL_SIGNATURE
    }

    fn compute(&self, heap: &mut dyn ForeignHeap, call: &KernelCall<'_>) -> Result<(), KernelError> {
        let inputs = call.read_inputs(heap)?;
        let to_c_int = |count: usize| {
            c_int::try_from(count)
                .map_err(|_| KernelError::Failed(format!("{count} samples exceed the kernel limit")))
        };
        let departure_count = to_c_int(call.departure.count)?;
        let arrival_count = to_c_int(call.arrival.count)?;

        let size = call.outputs.size;
        let mut c3 = vec![0.0; size];
        let mut dv1 = vec![0.0; size];
        let mut total_dv = vec![0.0; size];
        let constants = call.constants;

        // SAFETY: every input holds the count × width values the kernel reads and
        // every output holds departure_count × arrival_count values; the vectors
        // outlive the call and the kernel keeps no pointer.
        unsafe {
            compute_porkchop_plot(
                constants.mu,
                inputs.departure_positions.as_ptr(),
                inputs.departure_velocities.as_ptr(),
                inputs.arrival_positions.as_ptr(),
                inputs.arrival_velocities.as_ptr(),
                inputs.departure_dates.as_ptr(),
                inputs.arrival_dates.as_ptr(),
                departure_count,
                arrival_count,
                constants.departure_planet_mu,
                constants.arrival_planet_mu,
                constants.departure_orbit_radius,
                constants.arrival_orbit_radius,
                c3.as_mut_ptr(),
                dv1.as_mut_ptr(),
                total_dv.as_mut_ptr(),
            );
        }

        call.write_outputs(heap, &c3, &dv1, &total_dv)
    }
}

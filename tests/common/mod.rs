#![allow(dead_code)]

use std::{
    collections::HashMap,
    fs,
    sync::atomic::{AtomicUsize, Ordering},
};

use porkchop::{
    ephemeris::horizons::{EphemerisRequest, EphemerisSource},
    kernel::{CostKernel, KernelCall, KernelError, KernelSignature, PORKCHOP_KERNEL_SIGNATURE},
    marshal::heap::{ArenaHeap, ForeignHeap, HeapError, HeapPtr},
    mission::{LegRequest, TransferRequest},
    porkchop_errors::PorkchopError,
    time::jd_to_date_label,
};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Horizons calendar string of a julian day at midnight, e.g. `2025-Jan-01 00:00:00.0000 TDB`.
pub fn horizons_calendar(jd: f64) -> String {
    let label = jd_to_date_label(jd).unwrap();
    let fields: Vec<&str> = label.split('-').collect();
    let month: usize = fields[1].parse().unwrap();
    format!(
        "{}-{}-{} 00:00:00.0000 TDB",
        fields[0],
        MONTHS[month - 1],
        fields[2]
    )
}

pub fn read_fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/data/{name}")).unwrap()
}

/// Horizons-like report with `count` daily samples starting at `first_jd`.
pub fn horizons_report(first_jd: f64, count: usize) -> String {
    let mut text = String::from("*******\n$$SOE\n");
    for k in 0..count {
        let jd = first_jd + k as f64;
        let x = 1.0e8 + 1.0e6 * k as f64;
        let calendar = horizons_calendar(jd);
        text.push_str(&format!(
            "{jd:.9} = A.D. {calendar}\n X ={x:.15E} Y = 2.5E+07 Z =-1.0E+04\n VX=-2.9E+01 VY= 5.0E+00 VZ= 1.0E-03\n"
        ));
    }
    text.push_str("$$EOE\n*******\n");
    text
}

/// Earth to Mars, 3 departure dates and 2 arrival dates.
pub fn earth_to_mars() -> TransferRequest {
    TransferRequest::new(
        "Sun",
        LegRequest::new("Earth", "2025-01-01", "2025-01-03"),
        LegRequest::new("Mars", "2025-08-01", "2025-08-02"),
    )
}

/// Serves canned reports by Horizons body id and counts the requests.
#[derive(Default)]
pub struct FakeSource {
    reports: HashMap<String, Result<String, u16>>,
    pub requests: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, command: &str, report: String) -> Self {
        self.reports.insert(command.into(), Ok(report));
        self
    }

    pub fn with_status(mut self, command: &str, status: u16) -> Self {
        self.reports.insert(command.into(), Err(status));
        self
    }

    /// Earth and Mars with 3 and 2 daily samples.
    pub fn earth_to_mars() -> Self {
        FakeSource::new()
            .with_report("399", horizons_report(2460676.5, 3))
            .with_report("499", horizons_report(2460888.5, 2))
    }
}

impl EphemerisSource for FakeSource {
    async fn fetch(&self, request: &EphemerisRequest) -> Result<String, PorkchopError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.reports.get(&request.command) {
            Some(Ok(report)) => Ok(report.clone()),
            Some(Err(status)) => Err(PorkchopError::FetchStatus {
                body: request.command.clone(),
                status: *status,
            }),
            None => Err(PorkchopError::InvalidHorizonsResponse(
                request.command.clone(),
            )),
        }
    }
}

/// Writes the same flat array in the three outputs.
pub struct FlatKernel(pub Vec<f64>);

impl CostKernel for FlatKernel {
    fn signature(&self) -> KernelSignature {
        PORKCHOP_KERNEL_SIGNATURE
    }

    fn compute(&self, heap: &mut dyn ForeignHeap, call: &KernelCall<'_>) -> Result<(), KernelError> {
        call.write_outputs(heap, &self.0, &self.0, &self.0)
    }
}

pub struct FailingKernel;

impl CostKernel for FailingKernel {
    fn signature(&self) -> KernelSignature {
        PORKCHOP_KERNEL_SIGNATURE
    }

    fn compute(&self, _: &mut dyn ForeignHeap, _: &KernelCall<'_>) -> Result<(), KernelError> {
        Err(KernelError::Failed("lambert iteration did not converge at 0x7f3a".into()))
    }
}

/// [`ArenaHeap`] counting every allocation ever made.
#[derive(Debug, Default)]
pub struct CountingHeap {
    inner: ArenaHeap,
    pub mallocs: usize,
}

impl CountingHeap {
    pub fn new() -> Self {
        CountingHeap {
            inner: ArenaHeap::new(),
            mallocs: 0,
        }
    }

    pub fn with_capacity_limit(capacity: usize) -> Self {
        CountingHeap {
            inner: ArenaHeap::with_capacity_limit(capacity),
            mallocs: 0,
        }
    }
}

impl ForeignHeap for CountingHeap {
    fn malloc(&mut self, bytes: usize) -> Result<HeapPtr, HeapError> {
        self.mallocs += 1;
        self.inner.malloc(bytes)
    }

    fn free(&mut self, ptr: HeapPtr) -> Result<(), HeapError> {
        self.inner.free(ptr)
    }

    fn is_live(&self, ptr: HeapPtr) -> bool {
        self.inner.is_live(ptr)
    }

    fn live_blocks(&self) -> usize {
        self.inner.live_blocks()
    }

    fn slice(&self, ptr: HeapPtr, len: usize) -> Result<&[f64], HeapError> {
        self.inner.slice(ptr, len)
    }

    fn slice_mut(&mut self, ptr: HeapPtr, len: usize) -> Result<&mut [f64], HeapError> {
        self.inner.slice_mut(ptr, len)
    }
}

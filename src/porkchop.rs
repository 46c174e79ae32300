//! # Porkchop: the pipeline façade
//!
//! [`Porkchop`] wires together an [`EphemerisSource`], a checked [`CostKernel`] and
//! the read-only [`SolarSystem`] table, and runs one request end to end:
//!
//! ```text
//! TransferRequest ─resolve─▶ Mission
//!     ─fetch (both legs concurrently)─▶ raw reports ─parse─▶ EphemerisSeries × 2
//!     ─marshal─▶ MarshalingSession ─invoke─▶ flat outputs ─reshape─▶ ResultGrid
//!     ─post-process─▶ VisualizationPayload ─figure─▶ renderer JSON
//! ```
//!
//! Foreign buffers only exist between marshal and reshape. That scope is held by a
//! [`MarshalingSession`]: buffers are released explicitly once the results are
//! copied out, and by the session's `Drop` on every early return.
//!
//! ## Typical usage
//!
//! ```rust, ignore
//! use porkchop::{
//!     env_state::PorkchopEnv,
//!     ephemeris::horizons::HorizonsClient,
//!     kernel::extern_kernel::ExternKernel,
//!     marshal::heap::ArenaHeap,
//!     mission::{LegRequest, TransferRequest},
//!     porkchop::Porkchop,
//!     solar_system::SolarSystem,
//! };
//!
//! let porkchop = Porkchop::new(
//!     HorizonsClient::new(PorkchopEnv::from_env()?),
//!     ExternKernel,
//!     SolarSystem::builtin()?,
//! )?;
//! let request = TransferRequest::new(
//!     "Sun",
//!     LegRequest::new("Earth", "2026-09-01", "2027-01-01"),
//!     LegRequest::new("Mars", "2027-03-01", "2027-12-01"),
//! );
//! let report = porkchop.run(&request, &mut ArenaHeap::new()).await?;
//! println!("{}", report.figure());
//! ```
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    ephemeris::{
        horizons::{EphemerisRequest, EphemerisSource},
        parser::parse_with_frame,
        EphemerisPair, EphemerisSeries, Leg,
    },
    grid::ResultGrid,
    kernel::{CostKernel, KernelInvoker},
    marshal::{heap::ForeignHeap, session::MarshalingSession},
    mission::{Mission, TransferConstants, TransferRequest},
    plot::{
        figure::figure,
        post_process::{process, VisualizationPayload},
    },
    porkchop_errors::PorkchopError,
    solar_system::SolarSystem,
};

/// Parsed series of both legs of a mission.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionEphemerides {
    pub departure: EphemerisSeries,
    pub arrival: EphemerisSeries,
}

impl MissionEphemerides {
    pub fn leg(&self, leg: Leg) -> &EphemerisSeries {
        match leg {
            Leg::Departure => &self.departure,
            Leg::Arrival => &self.arrival,
        }
    }

    /// `{ departure: { body, data }, arrival: { body, data } }`
    pub fn to_pair(&self, mission: &Mission) -> EphemerisPair {
        EphemerisPair::new(
            &mission.departure.body,
            &self.departure,
            &mission.arrival.body,
            &self.arrival,
        )
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PorkchopReport {
    pub mission: Mission,
    pub ephemerides: MissionEphemerides,
    pub grid: ResultGrid,
    pub payload: VisualizationPayload,
}

impl PorkchopReport {
    /// Renderer figure of the payload.
    pub fn figure(&self) -> Value {
        figure(&self.payload)
    }

    /// Everything returned to the caller: ephemerides, cost grids, payload and constants.
    pub fn to_json(&self) -> Value {
        json!({
            "ephemerides": self.ephemerides.to_pair(&self.mission),
            "constants": self.mission.constants,
            "results": self.grid.to_cost_grids(),
            "visualization": self.payload,
        })
    }
}

pub struct Porkchop<S, K> {
    source: S,
    invoker: KernelInvoker<K>,
    solar_system: SolarSystem,
}

impl<S, K> Porkchop<S, K>
where
    S: EphemerisSource,
    K: CostKernel,
{
    /// Build the pipeline, checking the kernel signature once.
    ///
    /// Arguments
    /// -----------------
    /// * `source`: where the raw ephemeris reports come from.
    /// * `kernel`: the transfer-cost capability.
    /// * `solar_system`: the body table requests are resolved against.
    ///
    /// Return
    /// ----------
    /// * The pipeline, or [`PorkchopError::Kernel`] if the kernel does not expose
    ///   the expected entry point.
    pub fn new(source: S, kernel: K, solar_system: SolarSystem) -> Result<Self, PorkchopError> {
        Ok(Porkchop {
            source,
            invoker: KernelInvoker::new(kernel)?,
            solar_system,
        })
    }

    pub fn solar_system(&self) -> &SolarSystem {
        &self.solar_system
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Validate a request against the solar-system table.
    pub fn resolve(&self, request: &TransferRequest) -> Result<Mission, PorkchopError> {
        request.resolve(&self.solar_system)
    }

    /// Fetch and parse both legs of a mission.
    ///
    /// Both reports are requested concurrently; the first failure aborts the other.
    /// A leg whose report holds no sample is a [`PorkchopError::NoEphemerisData`].
    pub async fn fetch_ephemerides(
        &self,
        mission: &Mission,
    ) -> Result<MissionEphemerides, PorkchopError> {
        let (departure_raw, arrival_raw) = tokio::try_join!(
            self.source.fetch(&mission.departure.request),
            self.source.fetch(&mission.arrival.request),
        )?;

        let departure = self.parse_leg(Leg::Departure, &departure_raw, &mission.departure.request)?;
        let arrival = self.parse_leg(Leg::Arrival, &arrival_raw, &mission.arrival.request)?;
        Ok(MissionEphemerides { departure, arrival })
    }

    fn parse_leg(
        &self,
        leg: Leg,
        raw: &str,
        request: &EphemerisRequest,
    ) -> Result<EphemerisSeries, PorkchopError> {
        let outcome = parse_with_frame(raw, self.source.frame());
        if outcome.skipped_lines > 0 {
            warn!(
                %leg,
                body = %request.command,
                skipped_lines = outcome.skipped_lines,
                "ephemeris lines ignored"
            );
        }
        if outcome.series.is_empty() {
            warn!(%leg, body = %request.command, markers_found = outcome.markers_found, "no ephemeris sample parsed");
            return Err(PorkchopError::NoEphemerisData(leg));
        }
        debug!(%leg, body = %request.command, samples = outcome.sample_count(), "ephemeris parsed");
        Ok(outcome.series)
    }

    /// Marshal both series, run the kernel and reshape its outputs.
    ///
    /// Every buffer allocated in `heap` is released before returning, whatever the outcome.
    pub fn compute_grid(
        &self,
        heap: &mut dyn ForeignHeap,
        constants: &TransferConstants,
        departure: &EphemerisSeries,
        arrival: &EphemerisSeries,
    ) -> Result<ResultGrid, PorkchopError> {
        let mut session = MarshalingSession::new(heap);

        let departure_inputs = session.allocate_inputs(departure, Leg::Departure.label())?;
        let arrival_inputs = session.allocate_inputs(arrival, Leg::Arrival.label())?;
        let outputs = session.allocate_outputs(departure_inputs.count, arrival_inputs.count)?;

        self.invoker.invoke(
            &mut session,
            constants,
            &departure_inputs,
            &arrival_inputs,
            &outputs,
        )?;

        let c3 = session.read(&outputs.c3)?;
        let dv1 = session.read(&outputs.dv1)?;
        let total_dv = session.read(&outputs.total_dv)?;
        let released = session.release_all();
        debug!(released, "kernel outputs copied, session released");

        ResultGrid::reshape(
            &c3,
            &dv1,
            &total_dv,
            departure_inputs.count,
            arrival_inputs.count,
        )
    }

    /// Run a request end to end.
    ///
    /// Arguments
    /// -----------------
    /// * `request`: the transfer to plot.
    /// * `heap`: foreign memory shared with the kernel; left with no block of this run.
    ///
    /// Return
    /// ----------
    /// * The [`PorkchopReport`]. A grid without any solution is reported, not an error.
    pub async fn run<H>(
        &self,
        request: &TransferRequest,
        heap: &mut H,
    ) -> Result<PorkchopReport, PorkchopError>
    where
        H: ForeignHeap,
    {
        let mission = self.resolve(request)?;
        info!(
            central = %mission.central_body,
            departure = %mission.departure.body,
            arrival = %mission.arrival.body,
            "porkchop request"
        );

        let ephemerides = self.fetch_ephemerides(&mission).await?;
        let grid = self.compute_grid(
            heap,
            &mission.constants,
            &ephemerides.departure,
            &ephemerides.arrival,
        )?;
        let payload = process(&grid, &ephemerides.departure, &ephemerides.arrival);

        match &payload.summary {
            Some(summary) => info!(
                departure = %summary.departure_date,
                arrival = %summary.arrival_date,
                total_dv = summary.total_dv,
                "optimal transfer found"
            ),
            None => warn!("no transfer solution in the requested windows"),
        }

        Ok(PorkchopReport {
            mission,
            ephemerides,
            grid,
            payload,
        })
    }
}

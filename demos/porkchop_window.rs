//! Fetch the ephemerides of an Earth → Mars window from JPL Horizons.
//!
//! ```text
//! cargo run --example porkchop_window -- [DEPARTURE_BODY] [ARRIVAL_BODY]
//! RUST_LOG=porkchop=debug cargo run --example porkchop_window
//! ```
//!
//! With the `extern-kernel` feature the full porkchop figure is computed and printed.
use porkchop::{
    env_state::PorkchopEnv,
    ephemeris::horizons::HorizonsClient,
    mission::{LegRequest, TransferRequest},
    porkchop_errors::PorkchopError,
    solar_system::SolarSystem,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    if let Err(err) = run().await {
        error!(error = %err, "porkchop window failed");
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }
}

async fn run() -> Result<(), PorkchopError> {
    let mut args = std::env::args().skip(1);
    let departure = args.next().unwrap_or_else(|| "Earth".into());
    let arrival = args.next().unwrap_or_else(|| "Mars".into());

    let request = TransferRequest::new(
        "Sun",
        LegRequest::new(&departure, "2026-09-01", "2027-01-31").with_altitude(200.0),
        LegRequest::new(&arrival, "2027-04-01", "2027-12-31"),
    );
    let env = PorkchopEnv::from_env()?;
    let system = SolarSystem::builtin()?;

    #[cfg(feature = "extern-kernel")]
    {
        use porkchop::{
            kernel::extern_kernel::ExternKernel, marshal::heap::ArenaHeap, porkchop::Porkchop,
        };

        let porkchop = Porkchop::new(HorizonsClient::new(env), ExternKernel, system)?;
        let report = porkchop.run(&request, &mut ArenaHeap::new()).await?;
        if let Some(summary) = &report.payload.summary {
            info!(?summary, "optimal transfer");
        }
        println!("{}", serde_json::to_string_pretty(&report.figure())?);
        Ok(())
    }

    #[cfg(not(feature = "extern-kernel"))]
    {
        use porkchop::ephemeris::{horizons::EphemerisSource, parser::parse, EphemerisPair, Leg};

        let mission = request.resolve(&system)?;
        let client = HorizonsClient::new(env);
        let (departure_raw, arrival_raw) = tokio::try_join!(
            client.fetch(&mission.departure.request),
            client.fetch(&mission.arrival.request),
        )?;

        let departure_series = parse(&departure_raw).series;
        let arrival_series = parse(&arrival_raw).series;
        if departure_series.is_empty() {
            return Err(PorkchopError::NoEphemerisData(Leg::Departure));
        }
        if arrival_series.is_empty() {
            return Err(PorkchopError::NoEphemerisData(Leg::Arrival));
        }
        info!(
            departure = departure_series.len(),
            arrival = arrival_series.len(),
            step = %mission.departure.request.step,
            "ephemerides fetched"
        );

        let pair = EphemerisPair::new(
            &mission.departure.body,
            &departure_series,
            &mission.arrival.body,
            &arrival_series,
        );
        println!("{}", serde_json::to_string_pretty(&pair)?);
        Ok(())
    }
}

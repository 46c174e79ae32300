//! # Transfer mission setup
//!
//! A [`TransferRequest`] names a central body, a departure body and an arrival
//! body, each with its date window, step and parking-orbit altitude. Resolving it
//! against the [`SolarSystem`] table gives the two Horizons requests and the
//! [`TransferConstants`] handed to the cost kernel.
//!
//! ## Example
//!
//! ```rust, no_run
//! use porkchop::mission::{LegRequest, TransferRequest};
//! use porkchop::solar_system::SolarSystem;
//!
//! let system = SolarSystem::builtin().unwrap();
//! let request = TransferRequest::new(
//!     "Sun",
//!     LegRequest::new("Earth", "2026-09-01", "2027-01-01").with_altitude(200.0),
//!     LegRequest::new("Mars", "2027-03-01", "2027-12-01"),
//! );
//! let mission = request.resolve(&system).unwrap();
//! assert_eq!(mission.departure.request.command, "399");
//! ```
use serde::Serialize;

use crate::{
    constants::{Kilometer, Mu},
    ephemeris::{
        horizons::EphemerisRequest,
        step::{auto_step, Step, StepSelection},
        Leg,
    },
    porkchop_errors::PorkchopError,
    solar_system::SolarSystem,
    time::{calendar_day_to_epoch, days_between},
};

/// One side of the transfer, as entered by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct LegRequest {
    /// Body name in the solar-system table, e.g. `Earth`
    pub body: String,
    /// Window start, `YYYY-MM-DD`
    pub start: String,
    /// Window end, `YYYY-MM-DD`
    pub end: String,
    pub step: StepSelection,
    /// Parking orbit altitude above the mean radius, km
    pub altitude_km: Kilometer,
}

impl LegRequest {
    pub fn new(body: &str, start: &str, end: &str) -> Self {
        LegRequest {
            body: body.into(),
            start: start.into(),
            end: end.into(),
            step: StepSelection::Auto,
            altitude_km: 0.0,
        }
    }

    pub fn with_step(mut self, step: StepSelection) -> Self {
        self.step = step;
        self
    }

    pub fn with_altitude(mut self, altitude_km: Kilometer) -> Self {
        self.altitude_km = altitude_km;
        self
    }

    /// Check the fields of the leg and return the window length in days.
    fn window_days(&self, leg: Leg) -> Result<f64, PorkchopError> {
        if self.body.trim().is_empty() {
            return Err(PorkchopError::InvalidRequest(format!("{leg} body is missing")));
        }
        if self.start.trim().is_empty() || self.end.trim().is_empty() {
            return Err(PorkchopError::InvalidRequest(format!(
                "{leg} window dates are missing"
            )));
        }
        if !(self.altitude_km.is_finite() && self.altitude_km >= 0.0) {
            return Err(PorkchopError::InvalidRequest(format!(
                "{leg} altitude must be a non-negative number"
            )));
        }

        let start = calendar_day_to_epoch(&self.start)?;
        let end = calendar_day_to_epoch(&self.end)?;
        let days = days_between(&start, &end);
        if days < 0.0 {
            return Err(PorkchopError::InvalidRequest(format!(
                "{leg} window ends before it starts ({} > {})",
                self.start, self.end
            )));
        }
        Ok(days)
    }
}

/// Full porkchop request: central body plus the two legs.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub central_body: String,
    pub departure: LegRequest,
    pub arrival: LegRequest,
}

/// Physical constants of one transfer, passed to the cost kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferConstants {
    /// Gravitational parameter of the central body
    pub mu: Mu,
    pub departure_planet_mu: Mu,
    pub arrival_planet_mu: Mu,
    /// Departure parking orbit radius (body radius + altitude), km
    pub departure_orbit_radius: Kilometer,
    pub arrival_orbit_radius: Kilometer,
}

/// A leg resolved against the solar-system table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLeg {
    pub body: String,
    pub request: EphemerisRequest,
}

/// A validated request, ready for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Mission {
    pub central_body: String,
    pub departure: ResolvedLeg,
    pub arrival: ResolvedLeg,
    pub constants: TransferConstants,
}

impl Mission {
    pub fn leg(&self, leg: Leg) -> &ResolvedLeg {
        match leg {
            Leg::Departure => &self.departure,
            Leg::Arrival => &self.arrival,
        }
    }
}

impl TransferRequest {
    pub fn new(central_body: &str, departure: LegRequest, arrival: LegRequest) -> Self {
        TransferRequest {
            central_body: central_body.into(),
            departure,
            arrival,
        }
    }

    /// Validate the request and resolve it against the solar-system table.
    ///
    /// Arguments
    /// -----------------
    /// * `system`: the read-only table of central bodies and their satellites.
    ///
    /// Return
    /// ----------
    /// * The [`Mission`] holding both Horizons requests and the kernel constants.
    ///   An `Auto` step resolves to [`auto_step`] over both windows.
    ///
    /// Errors
    /// ----------
    /// * [`PorkchopError::InvalidRequest`] for missing fields, malformed dates or a reversed window.
    /// * [`PorkchopError::UnknownCentralBody`] / [`PorkchopError::UnknownBody`] for names absent from the table.
    pub fn resolve(&self, system: &SolarSystem) -> Result<Mission, PorkchopError> {
        if self.central_body.trim().is_empty() {
            return Err(PorkchopError::InvalidRequest("central body is missing".into()));
        }

        let departure_days = self.departure.window_days(Leg::Departure)?;
        let arrival_days = self.arrival.window_days(Leg::Arrival)?;
        let auto = auto_step(departure_days, arrival_days);

        let central = system.central(&self.central_body)?;
        let departure_body = system.body(&self.central_body, &self.departure.body)?;
        let arrival_body = system.body(&self.central_body, &self.arrival.body)?;

        let constants = TransferConstants {
            mu: central.mu,
            departure_planet_mu: departure_body.mu,
            arrival_planet_mu: arrival_body.mu,
            departure_orbit_radius: orbit_radius(departure_body.radius, self.departure.altitude_km),
            arrival_orbit_radius: orbit_radius(arrival_body.radius, self.arrival.altitude_km),
        };

        Ok(Mission {
            central_body: self.central_body.clone(),
            departure: resolve_leg(&self.departure, &departure_body.id, auto),
            arrival: resolve_leg(&self.arrival, &arrival_body.id, auto),
            constants,
        })
    }
}

fn resolve_leg(leg: &LegRequest, command: &str, auto: Step) -> ResolvedLeg {
    ResolvedLeg {
        body: leg.body.clone(),
        request: EphemerisRequest {
            command: command.into(),
            start: leg.start.trim().into(),
            stop: leg.end.trim().into(),
            step: leg.step.resolve(auto),
        },
    }
}

/// Parking orbit radius, rounded to 0.1 km.
fn orbit_radius(radius: Kilometer, altitude: Kilometer) -> Kilometer {
    ((radius + altitude) * 10.0).round() / 10.0
}

#[cfg(test)]
mod mission_test {
    use approx::assert_relative_eq;

    use super::*;

    fn earth_to_mars() -> TransferRequest {
        TransferRequest::new(
            "Sun",
            LegRequest::new("Earth", "2026-09-01", "2027-01-01").with_altitude(200.0),
            LegRequest::new("Mars", "2027-03-01", "2027-12-01").with_altitude(300.0),
        )
    }

    #[test]
    fn test_resolve_earth_to_mars() {
        let system = SolarSystem::builtin().unwrap();
        let mission = earth_to_mars().resolve(&system).unwrap();

        assert_eq!(mission.departure.request.command, "399");
        assert_eq!(mission.arrival.request.command, "499");
        assert_eq!(mission.departure.request.step.to_string(), "1d");
        assert_eq!(mission.arrival.request.stop, "2027-12-01");

        let constants = mission.constants;
        assert_relative_eq!(constants.mu, 132712440018.0);
        assert_relative_eq!(constants.departure_planet_mu, 398600.4418);
        assert_relative_eq!(constants.departure_orbit_radius, 6578.1);
        assert_relative_eq!(constants.arrival_orbit_radius, 3696.2);
    }

    #[test]
    fn test_fixed_step_is_kept() {
        let system = SolarSystem::builtin().unwrap();
        let mut request = earth_to_mars();
        request.arrival = request
            .arrival
            .with_step(StepSelection::Fixed(Step::days(3).unwrap()));
        let mission = request.resolve(&system).unwrap();
        assert_eq!(mission.leg(Leg::Departure).request.step.to_string(), "1d");
        assert_eq!(mission.leg(Leg::Arrival).request.step.to_string(), "3d");
    }

    #[test]
    fn test_large_windows_use_coarser_auto_step() {
        let system = SolarSystem::builtin().unwrap();
        let request = TransferRequest::new(
            "Sun",
            LegRequest::new("Earth", "2026-01-01", "2028-01-01"),
            LegRequest::new("Mars", "2026-06-01", "2028-06-01"),
        );
        let mission = request.resolve(&system).unwrap();
        // 730 x 731 days
        assert_eq!(mission.departure.request.step.to_string(), "5d");
        assert_eq!(mission.arrival.request.step.to_string(), "5d");
    }

    #[test]
    fn test_invalid_requests() {
        let system = SolarSystem::builtin().unwrap();

        let mut reversed = earth_to_mars();
        reversed.departure.end = "2026-01-01".into();
        assert!(matches!(
            reversed.resolve(&system),
            Err(PorkchopError::InvalidRequest(_))
        ));

        let mut missing = earth_to_mars();
        missing.arrival.body = " ".into();
        assert!(matches!(
            missing.resolve(&system),
            Err(PorkchopError::InvalidRequest(_))
        ));

        let mut negative = earth_to_mars();
        negative.departure.altitude_km = -1.0;
        assert!(negative.resolve(&system).is_err());

        let mut unknown = earth_to_mars();
        unknown.arrival.body = "Vulcan".into();
        assert!(matches!(
            unknown.resolve(&system),
            Err(PorkchopError::UnknownBody { .. })
        ));

        let mut moon = earth_to_mars();
        moon.central_body = "Earth".into();
        assert!(moon.resolve(&system).is_err());
    }
}

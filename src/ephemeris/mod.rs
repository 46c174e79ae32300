//! # Ephemeris time series
//!
//! Typed state vectors parsed from a JPL Horizons vector table, and the
//! serializable containers handed back to the caller once both legs are fetched.
//!
//! ## Structure
//!
//! ```text
//! ephemeris
//! ├── parser    text block → EphemerisSeries (pure, never fails)
//! ├── horizons  EphemerisSource trait + reqwest client
//! └── step      STEP_SIZE values and the automatic step rule
//! ```
//!
//! A [`StateVector`] serializes with the field names of the public API:
//!
//! ```text
//! { "date": { "jd", "dateStr", "iso" }, "position": { "x", "y", "z" }, "velocity": { "vx", "vy", "vz" } }
//! ```
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::{JulianDay, Kilometer, KmPerSec, HORIZONS_CENTER, HORIZONS_OUT_UNITS, HORIZONS_REF_PLANE};

pub mod horizons;
pub mod parser;
pub mod step;

/// Which side of the transfer a series or buffer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    Departure,
    Arrival,
}

impl Leg {
    /// Prefix of the marshaling keys of this leg (e.g. `departure.positions`).
    pub fn label(&self) -> &'static str {
        match self {
            Leg::Departure => "departure",
            Leg::Arrival => "arrival",
        }
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Epoch of one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemerisDate {
    /// Julian day (TDB)
    pub jd: JulianDay,
    /// Calendar string as printed by Horizons, e.g. `2025-Jan-01 00:00:00.0000 TDB`
    #[serde(rename = "dateStr")]
    pub calendar: String,
    /// Normalized `YYYY-MM-DDTHH:MM:SSZ` timestamp, `None` when the calendar string is malformed
    pub iso: Option<String>,
}

impl EphemerisDate {
    /// Calendar day (`YYYY-MM-DD`) of the sample, from the normalized timestamp if any,
    /// otherwise from the julian day.
    pub fn day_label(&self) -> Option<String> {
        match self.iso.as_deref().and_then(|iso| iso.get(..10)) {
            Some(day) => Some(day.to_string()),
            None => crate::time::jd_to_date_label(self.jd),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: Kilometer,
    pub y: Kilometer,
    pub z: Kilometer,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: KmPerSec,
    pub vy: KmPerSec,
    pub vz: KmPerSec,
}

/// One ephemeris sample: position and velocity of a body at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub date: EphemerisDate,
    pub position: Position,
    pub velocity: Velocity,
}

impl StateVector {
    pub fn jd(&self) -> JulianDay {
        self.date.jd
    }

    pub fn position_vector(&self) -> Vector3<f64> {
        Vector3::new(self.position.x, self.position.y, self.position.z)
    }

    pub fn velocity_vector(&self) -> Vector3<f64> {
        Vector3::new(self.velocity.vx, self.velocity.vy, self.velocity.vz)
    }
}

/// Center, units and plane shared by every sample of a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemerisFrame {
    pub center: String,
    pub out_units: String,
    pub ref_plane: String,
}

impl Default for EphemerisFrame {
    fn default() -> Self {
        EphemerisFrame {
            center: HORIZONS_CENTER.into(),
            out_units: HORIZONS_OUT_UNITS.into(),
            ref_plane: HORIZONS_REF_PLANE.into(),
        }
    }
}

/// Chronologically ordered samples of one body over one request window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EphemerisSeries {
    frame: EphemerisFrame,
    samples: Vec<StateVector>,
}

impl EphemerisSeries {
    pub fn new(frame: EphemerisFrame, samples: Vec<StateVector>) -> Self {
        EphemerisSeries { frame, samples }
    }

    pub fn frame(&self) -> &EphemerisFrame {
        &self.frame
    }

    pub fn samples(&self) -> &[StateVector] {
        &self.samples
    }

    pub fn get(&self, index: usize) -> Option<&StateVector> {
        self.samples.get(index)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<StateVector> {
        self.samples
    }
}

/// Parsed samples of one body, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyEphemeris {
    pub body: String,
    pub data: Vec<StateVector>,
}

/// `{ departure: { body, data }, arrival: { body, data } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemerisPair {
    pub departure: BodyEphemeris,
    pub arrival: BodyEphemeris,
}

impl EphemerisPair {
    pub fn new(
        departure_body: &str,
        departure: &EphemerisSeries,
        arrival_body: &str,
        arrival: &EphemerisSeries,
    ) -> Self {
        EphemerisPair {
            departure: BodyEphemeris {
                body: departure_body.into(),
                data: departure.samples().to_vec(),
            },
            arrival: BodyEphemeris {
                body: arrival_body.into(),
                data: arrival.samples().to_vec(),
            },
        }
    }
}

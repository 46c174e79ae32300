//! # Reference solar-system data
//!
//! Gravitational parameters, radii and Horizons identifiers of the bodies a
//! transfer can be planned between, grouped by central body:
//!
//! ```json
//! { "Sun": { "mu": 132712440018.0, "bodies": { "Earth": { "id": "399", "mu": 398600.4418, "radius": 6378.137 } } } }
//! ```
//!
//! The table is loaded once (embedded copy of `data/celestial_data.json`, or a
//! user file) and passed around read-only.
use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    constants::{Kilometer, Mu},
    porkchop_errors::PorkchopError,
};

const BUILTIN_CELESTIAL_DATA: &str = include_str!("../data/celestial_data.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyData {
    /// Horizons `COMMAND` identifier
    pub id: String,
    /// Gravitational parameter, km³/s²
    pub mu: Mu,
    /// Mean equatorial radius, km
    pub radius: Kilometer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralSystem {
    pub mu: Mu,
    pub bodies: BTreeMap<String, BodyData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolarSystem {
    systems: BTreeMap<String, CentralSystem>,
}

impl SolarSystem {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, PorkchopError> {
        Self::from_json_str(BUILTIN_CELESTIAL_DATA)
    }

    pub fn from_json_str(json: &str) -> Result<Self, PorkchopError> {
        let system: SolarSystem = serde_json::from_str(json)?;
        system.validate()?;
        Ok(system)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PorkchopError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn central_names(&self) -> impl Iterator<Item = &str> {
        self.systems.keys().map(String::as_str)
    }

    pub fn central(&self, name: &str) -> Result<&CentralSystem, PorkchopError> {
        self.systems
            .get(name)
            .ok_or_else(|| PorkchopError::UnknownCentralBody(name.into()))
    }

    pub fn body(&self, central: &str, body: &str) -> Result<&BodyData, PorkchopError> {
        self.central(central)?
            .bodies
            .get(body)
            .ok_or_else(|| PorkchopError::UnknownBody {
                central: central.into(),
                body: body.into(),
            })
    }

    fn validate(&self) -> Result<(), PorkchopError> {
        if self.systems.is_empty() {
            return Err(PorkchopError::Config("solar-system table is empty".into()));
        }
        for (central_name, central) in &self.systems {
            if !(central.mu.is_finite() && central.mu > 0.0) {
                return Err(PorkchopError::Config(format!(
                    "{central_name}: mu must be positive"
                )));
            }
            for (name, body) in &central.bodies {
                if body.id.trim().is_empty()
                    || !(body.mu.is_finite() && body.mu > 0.0)
                    || !(body.radius.is_finite() && body.radius > 0.0)
                {
                    return Err(PorkchopError::Config(format!(
                        "{central_name}/{name}: id, mu and radius must be set"
                    )));
                }
            }
        }
        Ok(())
    }
}

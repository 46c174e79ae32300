//! # Porkchop environment state
//!
//! This module defines [`crate::env_state::PorkchopEnv`], the **shared environment object**
//! handed to the pipeline. It provides access to:
//!
//! - A persistent **HTTP client** used to query JPL Horizons.
//! - The **Horizons settings**: endpoint, reference center, output units and reference plane.
//!
//! The object is cheaply cloneable (`reqwest::Client` is reference counted) and is
//! built once at process start.
//!
//! ## Structure
//!
//! ```text
//! PorkchopEnv
//! ├── http_client  (reqwest::Client, global timeout)
//! └── horizons     (HorizonsSettings)
//! ```
//!
//! ## Configuration from the environment
//!
//! [`PorkchopEnv::from_env`] reads the optional variables
//!
//! - `PORKCHOP_HORIZONS_URL` -- Horizons endpoint (default [`HORIZONS_API_URL`])
//! - `PORKCHOP_HTTP_TIMEOUT_SECS` -- request timeout in seconds (default 10)
use std::time::Duration;

use reqwest::Client;

use crate::{
    constants::{
        DEFAULT_HTTP_TIMEOUT_SECS, HORIZONS_API_URL, HORIZONS_CENTER, HORIZONS_OUT_UNITS,
        HORIZONS_REF_PLANE,
    },
    ephemeris::EphemerisFrame,
    porkchop_errors::PorkchopError,
};

/// Fixed parameters of every Horizons vector request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizonsSettings {
    pub api_url: String,
    pub center: String,
    pub out_units: String,
    pub ref_plane: String,
    pub timeout: Duration,
}

impl Default for HorizonsSettings {
    fn default() -> Self {
        HorizonsSettings {
            api_url: HORIZONS_API_URL.into(),
            center: HORIZONS_CENTER.into(),
            out_units: HORIZONS_OUT_UNITS.into(),
            ref_plane: HORIZONS_REF_PLANE.into(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl HorizonsSettings {
    /// Frame of the vectors returned for these settings.
    pub fn frame(&self) -> EphemerisFrame {
        EphemerisFrame {
            center: self.center.clone(),
            out_units: self.out_units.clone(),
            ref_plane: self.ref_plane.clone(),
        }
    }
}

/// Environment passed to the pipeline.
///
/// # Fields
///
/// * `http_client` - A reqwest client with the configured global timeout
/// * `horizons` - The constants of the Horizons vector query
#[derive(Debug, Clone)]
pub struct PorkchopEnv {
    pub http_client: Client,
    pub horizons: HorizonsSettings,
}

impl PorkchopEnv {
    /// Create a new environment with the default Horizons settings.
    pub fn new() -> Result<Self, PorkchopError> {
        Self::with_settings(HorizonsSettings::default())
    }

    /// Create a new environment from explicit settings.
    ///
    /// Return
    /// ------
    /// * The environment, or a [`PorkchopError::ReqwestError`] if the TLS backend
    ///   cannot be initialized.
    pub fn with_settings(horizons: HorizonsSettings) -> Result<Self, PorkchopError> {
        let http_client = Client::builder().timeout(horizons.timeout).build()?;
        Ok(PorkchopEnv {
            http_client,
            horizons,
        })
    }

    /// Create a new environment, overriding the defaults with environment variables.
    pub fn from_env() -> Result<Self, PorkchopError> {
        let settings = settings_from_lookup(|key| std::env::var(key).ok())?;
        Self::with_settings(settings)
    }
}

fn settings_from_lookup<F>(lookup: F) -> Result<HorizonsSettings, PorkchopError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = HorizonsSettings::default();

    if let Some(url) = lookup("PORKCHOP_HORIZONS_URL") {
        if url.trim().is_empty() {
            return Err(PorkchopError::Config(
                "PORKCHOP_HORIZONS_URL is empty".into(),
            ));
        }
        settings.api_url = url;
    }

    if let Some(raw) = lookup("PORKCHOP_HTTP_TIMEOUT_SECS") {
        let secs: u64 = raw.trim().parse().map_err(|e| {
            PorkchopError::Config(format!("invalid PORKCHOP_HTTP_TIMEOUT_SECS: {e}"))
        })?;
        settings.timeout = Duration::from_secs(secs);
    }

    Ok(settings)
}

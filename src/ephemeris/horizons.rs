use std::future::Future;

use serde::Deserialize;
use tracing::debug;

use crate::{env_state::PorkchopEnv, porkchop_errors::PorkchopError};

use super::{step::Step, EphemerisFrame};

/// One vector-table request: a body over a date window at a fixed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemerisRequest {
    /// Horizons `COMMAND`, e.g. `399` for the Earth
    pub command: String,
    /// Window start, `YYYY-MM-DD`
    pub start: String,
    /// Window stop, `YYYY-MM-DD`
    pub stop: String,
    pub step: Step,
}

/// Source of raw ephemeris reports.
///
/// The pipeline only needs the text of the report; transport and envelope are
/// the implementor's business.
pub trait EphemerisSource {
    /// Frame of the vectors in the fetched reports. Parsed series are tagged with it.
    fn frame(&self) -> EphemerisFrame {
        EphemerisFrame::default()
    }

    fn fetch(
        &self,
        request: &EphemerisRequest,
    ) -> impl Future<Output = Result<String, PorkchopError>> + Send;
}

/// JSON envelope of the Horizons API.
#[derive(Debug, Deserialize)]
struct HorizonsEnvelope {
    result: Option<String>,
}

/// [`EphemerisSource`] backed by the JPL Horizons REST API.
#[derive(Debug, Clone)]
pub struct HorizonsClient {
    env: PorkchopEnv,
}

impl HorizonsClient {
    pub fn new(env: PorkchopEnv) -> Self {
        HorizonsClient { env }
    }

    async fn request_vectors(&self, request: &EphemerisRequest) -> Result<String, PorkchopError> {
        let params = horizons_params(&self.env, request);
        debug!(body = %request.command, start = %request.start, stop = %request.stop, step = %request.step, "requesting Horizons vectors");

        let response = self
            .env
            .http_client
            .get(&self.env.horizons.api_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PorkchopError::FetchStatus {
                body: request.command.clone(),
                status: status.as_u16(),
            });
        }

        let envelope: HorizonsEnvelope = response.json().await?;
        envelope
            .result
            .ok_or_else(|| PorkchopError::InvalidHorizonsResponse(request.command.clone()))
    }
}

impl EphemerisSource for HorizonsClient {
    fn frame(&self) -> EphemerisFrame {
        self.env.horizons.frame()
    }

    fn fetch(
        &self,
        request: &EphemerisRequest,
    ) -> impl Future<Output = Result<String, PorkchopError>> + Send {
        self.request_vectors(request)
    }
}

/// Query parameters of a heliocentric vector-table request.
///
/// Arguments
/// ---------
/// * `env`: the environment holding the fixed center / units / plane
/// * `request`: body, window and step
///
/// Return
/// ------
/// * the `(key, value)` pairs of the GET query string
fn horizons_params(env: &PorkchopEnv, request: &EphemerisRequest) -> [(&'static str, String); 9] {
    let settings = &env.horizons;
    [
        ("format", "json".into()),
        ("COMMAND", request.command.clone()),
        ("EPHEM_TYPE", "VECTORS".into()),
        ("CENTER", settings.center.clone()),
        ("START_TIME", request.start.clone()),
        ("STOP_TIME", request.stop.clone()),
        ("STEP_SIZE", request.step.to_string()),
        ("OUT_UNITS", settings.out_units.clone()),
        ("REF_PLANE", settings.ref_plane.clone()),
    ]
}

#[cfg(test)]
mod horizons_test {
    use super::*;
    use crate::env_state::HorizonsSettings;

    fn earth_request() -> EphemerisRequest {
        EphemerisRequest {
            command: "399".into(),
            start: "2026-10-01".into(),
            stop: "2026-12-31".into(),
            step: Step::days(1).unwrap(),
        }
    }

    #[test]
    fn test_horizons_params() {
        let env = PorkchopEnv::new().unwrap();
        let params = horizons_params(&env, &earth_request());
        assert_eq!(
            params,
            [
                ("format", "json".to_string()),
                ("COMMAND", "399".to_string()),
                ("EPHEM_TYPE", "VECTORS".to_string()),
                ("CENTER", "500@10".to_string()),
                ("START_TIME", "2026-10-01".to_string()),
                ("STOP_TIME", "2026-12-31".to_string()),
                ("STEP_SIZE", "1d".to_string()),
                ("OUT_UNITS", "KM-S".to_string()),
                ("REF_PLANE", "ECLIPTIC".to_string()),
            ]
        );
    }

    #[test]
    fn test_frame_follows_settings() {
        let settings = HorizonsSettings {
            center: "500@0".into(),
            ref_plane: "FRAME".into(),
            ..HorizonsSettings::default()
        };
        let client = HorizonsClient::new(PorkchopEnv::with_settings(settings).unwrap());
        let params = horizons_params(&client.env, &earth_request());

        let frame = client.frame();
        assert_eq!(frame.ref_plane, "FRAME");
        assert_eq!(frame.center, "500@0");
        assert_eq!(frame.out_units, "KM-S");
        assert!(params.contains(&("REF_PLANE", frame.ref_plane.clone())));
        assert!(params.contains(&("CENTER", frame.center.clone())));

        let default_client = HorizonsClient::new(PorkchopEnv::new().unwrap());
        assert_eq!(default_client.frame(), EphemerisFrame::default());
    }

    #[test]
    fn test_envelope_without_result() {
        let envelope: HorizonsEnvelope =
            serde_json::from_str(r#"{"error": "no such body"}"#).unwrap();
        assert!(envelope.result.is_none());
    }

    #[tokio::test]
    #[ignore]
    async fn test_horizons_request() {
        let client = HorizonsClient::new(PorkchopEnv::new().unwrap());
        let text = client.fetch(&earth_request()).await.unwrap();
        let outcome = crate::ephemeris::parser::parse(&text);
        assert_eq!(outcome.sample_count(), 92);
    }
}

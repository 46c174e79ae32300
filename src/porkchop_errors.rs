use thiserror::Error;

use crate::{ephemeris::Leg, kernel::KernelError, marshal::session::MarshalError};

#[derive(Error, Debug)]
pub enum PorkchopError {
    #[error("Invalid transfer request: {0}")]
    InvalidRequest(String),

    #[error("Invalid step size: {0}")]
    InvalidStepSize(String),

    #[error("Unknown central body: {0}")]
    UnknownCentralBody(String),

    #[error("Unknown body {body} in the {central} system")]
    UnknownBody { central: String, body: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Horizons request for {body} failed with status {status}")]
    FetchStatus { body: String, status: u16 },

    #[error("Invalid response from JPL Horizons for {0}")]
    InvalidHorizonsResponse(String),

    #[error("No {0} ephemeris data")]
    NoEphemerisData(Leg),

    #[error("Buffer marshaling failed: {0}")]
    Marshal(#[from] MarshalError),

    #[error("Cost kernel failed: {0}")]
    Kernel(#[from] KernelError),

    #[error("Result grid shape mismatch: {departure} x {arrival} expects {expected} cells, got {found}")]
    GridShape {
        departure: usize,
        arrival: usize,
        expected: usize,
        found: usize,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse failure class shown to the caller of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Request,
    Fetch,
    Data,
    Memory,
    Compute,
}

impl PorkchopError {
    pub fn class(&self) -> ErrorClass {
        use PorkchopError::*;
        match self {
            InvalidRequest(_) | InvalidStepSize(_) | UnknownCentralBody(_) | UnknownBody { .. } => {
                ErrorClass::Request
            }
            Config(_) | Json(_) | IoError(_) => ErrorClass::Request,
            ReqwestError(_) | FetchStatus { .. } | InvalidHorizonsResponse(_) => ErrorClass::Fetch,
            NoEphemerisData(_) | GridShape { .. } => ErrorClass::Data,
            Marshal(_) => ErrorClass::Memory,
            Kernel(_) => ErrorClass::Compute,
        }
    }

    /// Short diagnostic for end users.
    ///
    /// Kernel and heap messages are never forwarded verbatim.
    pub fn user_message(&self) -> String {
        match self {
            PorkchopError::NoEphemerisData(leg) => format!("No {leg} body data."),
            PorkchopError::GridShape { .. } => "Result data is inconsistent.".into(),
            PorkchopError::Config(_) | PorkchopError::Json(_) | PorkchopError::IoError(_) => {
                "Invalid configuration.".into()
            }
            other => match other.class() {
                ErrorClass::Request => format!("Invalid request: {other}"),
                ErrorClass::Fetch => "Failed to fetch Horizons data".into(),
                ErrorClass::Data => "Result data is inconsistent.".into(),
                ErrorClass::Memory => "Buffer allocation error.".into(),
                ErrorClass::Compute => "Porkchop computation error.".into(),
            },
        }
    }
}

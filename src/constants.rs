//! # Constants and type definitions for porkchop
//!
//! This module centralizes the **physical constants**, **conversion factors**, the
//! **Horizons query constants** and the **common type aliases** used throughout the
//! crate.
//!
//! ## Overview
//!
//! - Time conversions (seconds per day)
//! - Fixed parameters of the ephemeris request (center, units, reference plane)
//! - Rendering limits (axis ticks, contour levels)
//! - Core type aliases used across the crate

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

// -------------------------------------------------------------------------------------------------
// Ephemeris request constants
// -------------------------------------------------------------------------------------------------

/// JPL Horizons REST endpoint
pub const HORIZONS_API_URL: &str = "https://ssd.jpl.nasa.gov/api/horizons.api";

/// Heliocentric reference center (Sun body center)
pub const HORIZONS_CENTER: &str = "500@10";

/// Vector table output units
pub const HORIZONS_OUT_UNITS: &str = "KM-S";

/// Vector table reference plane
pub const HORIZONS_REF_PLANE: &str = "ECLIPTIC";

/// Marker opening the data block of a Horizons report
pub const START_OF_EPHEMERIS: &str = "$$SOE";

/// Marker closing the data block of a Horizons report
pub const END_OF_EPHEMERIS: &str = "$$EOE";

/// Default HTTP timeout for a Horizons request, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

// -------------------------------------------------------------------------------------------------
// Rendering constants
// -------------------------------------------------------------------------------------------------

/// Maximum number of labelled ticks on each date axis
pub const MAX_AXIS_TICKS: usize = 10;

/// Upper bound of the colour range, as a multiple of the minimum total delta-v
pub const COLOR_RANGE_FACTOR: f64 = 4.0;

/// Time-of-flight contour levels (start, end, step) in days
pub const TOF_CONTOUR_LEVELS: (f64, f64, f64) = (0.0, 900.0, 50.0);

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Distance in kilometers
pub type Kilometer = f64;
/// Velocity in kilometers per second
pub type KmPerSec = f64;
/// Gravitational parameter in km³/s²
pub type Mu = f64;
/// Julian day (TDB for Horizons output)
pub type JulianDay = f64;

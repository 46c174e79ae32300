//! # porkchop
//!
//! Transfer-cost grids ("porkchop plots") between two bodies of a planetary system.
//!
//! The crate fetches heliocentric state vectors of both bodies from JPL Horizons,
//! parses them, hands them to an external transfer-cost kernel through flat
//! buffers in a foreign heap, and turns the kernel output into grids and a
//! renderer-ready payload with the optimal departure / arrival pair.
//!
//! ## Modules
//!
//! - [`mission`] / [`solar_system`]: request validation and body constants
//! - [`ephemeris`]: Horizons client, report parser, step sizes
//! - [`marshal`]: foreign heap and buffer sessions
//! - [`kernel`]: the checked call boundary of the cost kernel
//! - [`grid`]: reshaping of the flat kernel outputs
//! - [`plot`]: post-processing and renderer figure
//! - [`porkchop`]: the pipeline façade
pub mod constants;
pub mod env_state;
pub mod ephemeris;
pub mod grid;
pub mod kernel;
pub mod marshal;
pub mod mission;
pub mod plot;
pub mod porkchop;
pub mod porkchop_errors;
pub mod solar_system;
pub mod time;

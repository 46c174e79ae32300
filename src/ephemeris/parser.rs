//! Parser for the vector table of a JPL Horizons report.
//!
//! The data block sits between the `$$SOE` and `$$EOE` markers. Each sample spans
//! three lines:
//!
//! ```text
//! 2460676.500000000 = A.D. 2025-Jan-01 00:00:00.0000 TDB
//!  X =-2.627192345936041E+07 Y = 1.446145061510015E+08 Z =-1.029283218738437E+04
//!  VX=-2.978861232478467E+01 VY=-5.339426744219604E+00 VZ= 1.154735813939442E-03
//! ```
//!
//! Horizons may print further lines per sample (e.g. `LT= RG= RR=`); the scanner
//! slides one line at a time until the next date line, so such lines and minor
//! corruption only cost the affected window.
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::constants::{END_OF_EPHEMERIS, START_OF_EPHEMERIS};

use super::{EphemerisDate, EphemerisFrame, EphemerisSeries, Position, StateVector, Velocity};

static DATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+\.[0-9]+)\s*=\s*A\.D\.\s*([0-9A-Za-z\-\s:\.]+)").expect("valid regex")
});

static POSITION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^X\s*=\s*([eE0-9\.\-\+]+)\s*Y\s*=\s*([eE0-9\.\-\+]+)\s*Z\s*=\s*([eE0-9\.\-\+]+)",
    )
    .expect("valid regex")
});

static VELOCITY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^VX\s*=\s*([eE0-9\.\-\+]+)\s*VY\s*=\s*([eE0-9\.\-\+]+)\s*VZ\s*=\s*([eE0-9\.\-\+]+)",
    )
    .expect("valid regex")
});

const MONTHS: [(&str, &str); 12] = [
    ("Jan", "01"),
    ("Feb", "02"),
    ("Mar", "03"),
    ("Apr", "04"),
    ("May", "05"),
    ("Jun", "06"),
    ("Jul", "07"),
    ("Aug", "08"),
    ("Sep", "09"),
    ("Oct", "10"),
    ("Nov", "11"),
    ("Dec", "12"),
];

/// Result of parsing one report: the samples plus what was dropped on the way.
///
/// Parsing never fails; an empty series is a legitimate outcome that the caller
/// decides how to escalate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseOutcome {
    pub series: EphemerisSeries,
    /// `false` when the start or end marker is missing
    pub markers_found: bool,
    /// Lines of the data block that did not belong to a complete sample
    pub skipped_lines: usize,
}

impl ParseOutcome {
    pub fn sample_count(&self) -> usize {
        self.series.len()
    }
}

/// Parse a raw Horizons report in the default heliocentric ecliptic km/s frame.
pub fn parse(raw: &str) -> ParseOutcome {
    parse_with_frame(raw, EphemerisFrame::default())
}

/// Parse a raw Horizons report, tagging the series with the frame of the request.
///
/// Arguments
/// -----------------
/// * `raw`: the `result` text of the Horizons response.
/// * `frame`: the center / units / plane the request asked for.
///
/// Return
/// ----------
/// * A [`ParseOutcome`] holding every complete sample found, in report order.
pub fn parse_with_frame(raw: &str, frame: EphemerisFrame) -> ParseOutcome {
    let Some(block) = data_block(raw) else {
        warn!("ephemeris markers not found, no samples parsed");
        return ParseOutcome {
            series: EphemerisSeries::new(frame, Vec::new()),
            markers_found: false,
            skipped_lines: 0,
        };
    };

    let lines: Vec<&str> = block.lines().map(str::trim).collect();
    let mut samples = Vec::with_capacity(lines.len() / 3);
    let mut skipped_lines = 0;

    let mut i = 0;
    while i + 2 < lines.len() {
        match parse_sample(lines[i], lines[i + 1], lines[i + 2]) {
            Some(sample) => {
                samples.push(sample);
                i += 3;
            }
            None => {
                skipped_lines += 1;
                i += 1;
            }
        }
    }
    skipped_lines += lines.len() - i;

    debug!(
        samples = samples.len(),
        skipped_lines, "parsed ephemeris block"
    );

    ParseOutcome {
        series: EphemerisSeries::new(frame, samples),
        markers_found: true,
        skipped_lines,
    }
}

/// Text strictly between the first start marker and the next end marker.
fn data_block(raw: &str) -> Option<&str> {
    let start = raw.find(START_OF_EPHEMERIS)? + START_OF_EPHEMERIS.len();
    let rest = &raw[start..];
    let end = rest.find(END_OF_EPHEMERIS)?;
    Some(rest[..end].trim())
}

fn parse_sample(date_line: &str, position_line: &str, velocity_line: &str) -> Option<StateVector> {
    let date_caps = DATE_LINE.captures(date_line)?;
    let jd: f64 = date_caps[1].parse().ok()?;
    let calendar = date_caps[2].trim().to_string();

    let [x, y, z] = capture_triple(&POSITION_LINE, position_line)?;
    let [vx, vy, vz] = capture_triple(&VELOCITY_LINE, velocity_line)?;

    Some(StateVector {
        date: EphemerisDate {
            jd,
            iso: calendar_to_iso(&calendar),
            calendar,
        },
        position: Position { x, y, z },
        velocity: Velocity { vx, vy, vz },
    })
}

fn capture_triple(regex: &Regex, line: &str) -> Option<[f64; 3]> {
    let caps = regex.captures(line)?;
    Some([
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ])
}

/// Convert a Horizons calendar string (`2025-Jan-01 00:00:00.0000 TDB`) into
/// `2025-01-01T00:00:00.0000Z`.
///
/// Return
/// ------
/// * `None` when the date segment is not `year-Mon-day` or the month is unknown.
pub fn calendar_to_iso(calendar: &str) -> Option<String> {
    let mut parts = calendar.split_whitespace();
    let date = parts.next()?;
    let time = parts.next().unwrap_or("00:00:00");

    let fields: Vec<&str> = date.split('-').collect();
    let [year, month, day] = fields.as_slice() else {
        return None;
    };

    if year.is_empty() || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if day.is_empty() || day.len() > 2 || !day.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let month = MONTHS
        .iter()
        .find(|(abbr, _)| abbr == month)
        .map(|(_, number)| *number)?;

    Some(format!("{year}-{month}-{day:0>2}T{time}Z"))
}

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::porkchop_errors::PorkchopError;

static STEP_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([dhm])$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepUnit {
    Days,
    Hours,
    Minutes,
}

/// Horizons `STEP_SIZE` value, e.g. `1d`, `12h`, `30m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    value: u32,
    unit: StepUnit,
}

impl Step {
    pub fn new(value: u32, unit: StepUnit) -> Result<Self, PorkchopError> {
        if value == 0 {
            return Err(PorkchopError::InvalidStepSize("step must be positive".into()));
        }
        Ok(Step { value, unit })
    }

    pub fn days(value: u32) -> Result<Self, PorkchopError> {
        Step::new(value, StepUnit::Days)
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn unit(&self) -> StepUnit {
        self.unit
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            StepUnit::Days => write!(f, "{}d", self.value),
            StepUnit::Hours => write!(f, "{}h", self.value),
            StepUnit::Minutes => write!(f, "{}m", self.value),
        }
    }
}

impl FromStr for Step {
    type Err = PorkchopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = STEP_SIZE
            .captures(s.trim())
            .ok_or_else(|| PorkchopError::InvalidStepSize(s.into()))?;
        let value: u32 = caps[1]
            .parse()
            .map_err(|_| PorkchopError::InvalidStepSize(s.into()))?;
        let unit = match &caps[2] {
            "d" => StepUnit::Days,
            "h" => StepUnit::Hours,
            _ => StepUnit::Minutes,
        };
        Step::new(value, unit)
    }
}

/// Step requested for one window: fixed, or derived from the size of the whole grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepSelection {
    #[default]
    Auto,
    Fixed(Step),
}

impl StepSelection {
    /// Resolve to a concrete step, using `auto` when no step was fixed.
    pub fn resolve(&self, auto: Step) -> Step {
        match self {
            StepSelection::Auto => auto,
            StepSelection::Fixed(step) => *step,
        }
    }
}

impl FromStr for StepSelection {
    type Err = PorkchopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(StepSelection::Auto)
        } else {
            s.parse().map(StepSelection::Fixed)
        }
    }
}

/// Pick a daily step so that the number of grid cells stays computable.
///
/// Arguments
/// -----------------
/// * `departure_days`: length of the departure window in days.
/// * `arrival_days`: length of the arrival window in days.
///
/// Return
/// ----------
/// * `1d` up to 100 000 cells, `2d` up to 400 000, `5d` up to 800 000, `10d` beyond.
///   Window lengths are rounded up to whole days.
pub fn auto_step(departure_days: f64, arrival_days: f64) -> Step {
    let cells = departure_days.abs().ceil() * arrival_days.abs().ceil();
    let days = if cells <= 100_000.0 {
        1
    } else if cells <= 400_000.0 {
        2
    } else if cells <= 800_000.0 {
        5
    } else {
        10
    };
    Step {
        value: days,
        unit: StepUnit::Days,
    }
}

#[cfg(test)]
mod step_test {
    use super::*;

    #[test]
    fn test_step() {
        let step_day = Step::days(1).unwrap();
        assert_eq!(step_day.to_string(), "1d");
        let step_hours = Step::new(50, StepUnit::Hours).unwrap();
        assert_eq!(step_hours.to_string(), "50h");
        let step_minute = Step::new(30, StepUnit::Minutes).unwrap();
        assert_eq!(step_minute.to_string(), "30m");
        assert!(Step::days(0).is_err());
    }

    #[test]
    fn test_parse_step() {
        assert_eq!("5d".parse::<Step>().unwrap(), Step::days(5).unwrap());
        assert_eq!(
            "12h".parse::<Step>().unwrap(),
            Step::new(12, StepUnit::Hours).unwrap()
        );
        assert!("5y".parse::<Step>().is_err());
        assert!("d".parse::<Step>().is_err());
        assert!("1.5d".parse::<Step>().is_err());
        assert!("0d".parse::<Step>().is_err());
    }

    #[test]
    fn test_step_selection() {
        assert_eq!("auto".parse::<StepSelection>().unwrap(), StepSelection::Auto);
        let fixed: StepSelection = "2d".parse().unwrap();
        assert_eq!(fixed.resolve(Step::days(10).unwrap()).to_string(), "2d");
        assert_eq!(
            StepSelection::Auto.resolve(Step::days(10).unwrap()).to_string(),
            "10d"
        );
    }

    #[test]
    fn test_auto_step() {
        assert_eq!(auto_step(100.0, 1000.0).to_string(), "1d");
        assert_eq!(auto_step(316.2, 316.2).to_string(), "2d");
        assert_eq!(auto_step(400.0, 1000.0).to_string(), "2d");
        assert_eq!(auto_step(800.0, 1000.0).to_string(), "5d");
        assert_eq!(auto_step(900.0, 1000.0).to_string(), "10d");
    }
}

//! Post-processing of the total delta-v grid for display.
//!
//! Everything here is derived from the [`ResultGrid`] and the two date series:
//! the filtered surface, the optimal cell, the colour range, the time-of-flight
//! matrix, the hover text of every cell and the down-sampled axis ticks.
use itertools::iproduct;
use serde::Serialize;
use tracing::debug;

use crate::{
    constants::{COLOR_RANGE_FACTOR, MAX_AXIS_TICKS},
    ephemeris::EphemerisSeries,
    grid::ResultGrid,
};

/// Stops of the colour scale used whenever the grid has at least one valid cell.
pub const DELTA_V_COLOR_STOPS: [(f64, &str); 11] = [
    (0.0, "rgb(0, 0, 100)"),
    (0.1, "rgb(0, 50, 180)"),
    (0.2, "rgb(0, 100, 200)"),
    (0.3, "rgb(0, 150, 220)"),
    (0.4, "rgb(0, 180, 180)"),
    (0.5, "rgb(0, 220, 150)"),
    (0.6, "rgb(80, 220, 100)"),
    (0.7, "rgb(150, 220, 50)"),
    (0.8, "rgb(220, 180, 0)"),
    (0.9, "rgb(220, 100, 0)"),
    (1.0, "rgb(200, 0, 0)"),
];

/// Fallback scale name when there is nothing to colour.
pub const DEFAULT_COLOR_SCALE: &str = "Viridis";

/// Multiples of the minimum shown on the colour bar, before the upper bound.
const COLOR_BAR_MULTIPLES: [f64; 6] = [1.0, 1.25, 1.5, 2.0, 2.5, 3.0];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColorScale {
    Named(&'static str),
    Stops(Vec<(f64, &'static str)>),
}

/// Colour range of the heatmap: `[min, min(max, 4 min)]` and its tick values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorBar {
    pub zmin: f64,
    pub zmax: f64,
    pub ticks: Vec<f64>,
}

/// Cell holding the smallest total delta-v.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridOptimum {
    /// Row of the cell
    pub arrival_index: usize,
    /// Column of the cell
    pub departure_index: usize,
    pub total_dv: f64,
}

/// Labelled ticks of one date axis: grid indices and their calendar labels.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AxisTicks {
    pub values: Vec<usize>,
    pub labels: Vec<String>,
}

/// Human-readable description of the optimal transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimalTransfer {
    pub departure_date: String,
    pub arrival_date: String,
    pub total_dv: f64,
    pub time_of_flight_days: Option<i64>,
    pub min_total_dv: f64,
    pub max_total_dv: f64,
}

/// Everything the renderer needs, grid-shaped fields indexed `[arrival][departure]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationPayload {
    /// Total delta-v with the no-solution cells removed
    pub surface: Vec<Vec<Option<f64>>>,
    pub optimum: Option<GridOptimum>,
    /// Largest valid total delta-v
    pub max_total_dv: Option<f64>,
    pub color_scale: ColorScale,
    pub color_bar: Option<ColorBar>,
    /// Rounded days between the arrival and departure dates of each cell
    pub time_of_flight: Vec<Vec<Option<i64>>>,
    pub hover_text: Vec<Vec<String>>,
    pub departure_labels: Vec<String>,
    pub arrival_labels: Vec<String>,
    pub departure_axis: AxisTicks,
    pub arrival_axis: AxisTicks,
    pub summary: Option<OptimalTransfer>,
}

impl VisualizationPayload {
    pub fn has_solution(&self) -> bool {
        self.optimum.is_some()
    }
}

/// Build the visualization payload of a result grid.
///
/// Arguments
/// -----------------
/// * `grid`: the reshaped kernel output.
/// * `departure`: departure samples, one per grid column.
/// * `arrival`: arrival samples, one per grid row.
///
/// Return
/// ----------
/// * The payload. A grid without any valid cell is not an error: the payload
///   has no optimum and uses [`DEFAULT_COLOR_SCALE`].
pub fn process(
    grid: &ResultGrid,
    departure: &EphemerisSeries,
    arrival: &EphemerisSeries,
) -> VisualizationPayload {
    let surface = filter_sentinels(grid);
    let (optimum, max_total_dv) = find_optimum(&surface);

    let departure_labels = date_labels(departure, grid.departure_count());
    let arrival_labels = date_labels(arrival, grid.arrival_count());
    let time_of_flight = time_of_flight(departure, arrival, grid);
    let hover_text = hover_text(&surface, &time_of_flight, &departure_labels, &arrival_labels);

    let (color_scale, color_bar) = match (optimum, max_total_dv) {
        (Some(optimum), Some(max)) => (
            ColorScale::Stops(DELTA_V_COLOR_STOPS.to_vec()),
            Some(color_bar(optimum.total_dv, max)),
        ),
        _ => (ColorScale::Named(DEFAULT_COLOR_SCALE), None),
    };

    let summary = optimum.zip(max_total_dv).map(|(optimum, max)| OptimalTransfer {
        departure_date: departure_labels[optimum.departure_index].clone(),
        arrival_date: arrival_labels[optimum.arrival_index].clone(),
        total_dv: optimum.total_dv,
        time_of_flight_days: time_of_flight[optimum.arrival_index][optimum.departure_index],
        min_total_dv: optimum.total_dv,
        max_total_dv: max,
    });

    debug!(
        rows = surface.len(),
        optimum = ?optimum,
        "post-processed total delta-v grid"
    );

    VisualizationPayload {
        departure_axis: axis_ticks(&departure_labels, MAX_AXIS_TICKS),
        arrival_axis: axis_ticks(&arrival_labels, MAX_AXIS_TICKS),
        surface,
        optimum,
        max_total_dv,
        color_scale,
        color_bar,
        time_of_flight,
        hover_text,
        departure_labels,
        arrival_labels,
        summary,
    }
}

/// Negative and non-finite cells become `None`.
pub fn filter_sentinels(grid: &ResultGrid) -> Vec<Vec<Option<f64>>> {
    grid.total_dv()
        .row_iter()
        .map(|row| {
            row.iter()
                .map(|&value| (value.is_finite() && value >= 0.0).then_some(value))
                .collect()
        })
        .collect()
}

/// Scan the surface row by row for the minimum and maximum valid values.
///
/// The first cell holding the minimum wins: earliest arrival, then earliest departure.
pub fn find_optimum(surface: &[Vec<Option<f64>>]) -> (Option<GridOptimum>, Option<f64>) {
    let columns = surface.first().map_or(0, Vec::len);
    let mut optimum: Option<GridOptimum> = None;
    let mut max: Option<f64> = None;

    for (row, col) in iproduct!(0..surface.len(), 0..columns) {
        let Some(value) = surface[row].get(col).copied().flatten() else {
            continue;
        };
        if optimum.map_or(true, |best| value < best.total_dv) {
            optimum = Some(GridOptimum {
                arrival_index: row,
                departure_index: col,
                total_dv: value,
            });
        }
        if max.map_or(true, |m| value > m) {
            max = Some(value);
        }
    }
    (optimum, max)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Colour range `[min, min(max, 4 min)]` with ticks at fixed multiples of the minimum.
pub fn color_bar(min: f64, max: f64) -> ColorBar {
    let zmax = max.min(min * COLOR_RANGE_FACTOR);
    let ticks = COLOR_BAR_MULTIPLES
        .iter()
        .map(|factor| round2(min * factor))
        .chain(std::iter::once(round2(zmax)))
        .collect();
    ColorBar {
        zmin: min,
        zmax,
        ticks,
    }
}

/// Calendar labels of the first `count` samples; missing samples get an empty label.
pub fn date_labels(series: &EphemerisSeries, count: usize) -> Vec<String> {
    (0..count)
        .map(|k| {
            series
                .get(k)
                .and_then(|sample| sample.date.day_label())
                .unwrap_or_default()
        })
        .collect()
}

/// `round(arrival JD - departure JD)` for every cell.
pub fn time_of_flight(
    departure: &EphemerisSeries,
    arrival: &EphemerisSeries,
    grid: &ResultGrid,
) -> Vec<Vec<Option<i64>>> {
    (0..grid.arrival_count())
        .map(|j| {
            (0..grid.departure_count())
                .map(|i| {
                    let departure_jd = departure.get(i)?.jd();
                    let arrival_jd = arrival.get(j)?.jd();
                    let days = (arrival_jd - departure_jd).round();
                    days.is_finite().then_some(days as i64)
                })
                .collect()
        })
        .collect()
}

/// Hover text of every valid cell, empty for absent cells.
pub fn hover_text(
    surface: &[Vec<Option<f64>>],
    time_of_flight: &[Vec<Option<i64>>],
    departure_labels: &[String],
    arrival_labels: &[String],
) -> Vec<Vec<String>> {
    surface
        .iter()
        .enumerate()
        .map(|(j, row)| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| match cell {
                    None => String::new(),
                    Some(dv) => {
                        let mut text = format!(
                            "Departure: {}<br>Arrival: {}<br>Delta-V: {dv:.2} km/s",
                            departure_labels.get(i).map_or("", String::as_str),
                            arrival_labels.get(j).map_or("", String::as_str),
                        );
                        if let Some(days) = time_of_flight.get(j).and_then(|r| r.get(i)).copied().flatten() {
                            text.push_str(&format!("<br>Time of Flight: {days} days"));
                        }
                        text
                    }
                })
                .collect()
        })
        .collect()
}

/// Pick at most `max_ticks` evenly spaced labels, always keeping the first and last.
pub fn axis_ticks(labels: &[String], max_ticks: usize) -> AxisTicks {
    let len = labels.len();
    let values: Vec<usize> = if len <= max_ticks.max(2) {
        (0..len).collect()
    } else {
        let step = (len - 1).div_ceil(max_ticks.max(2) - 1);
        (0..len - 1)
            .step_by(step)
            .chain(std::iter::once(len - 1))
            .collect()
    };
    AxisTicks {
        labels: values.iter().map(|&k| labels[k].clone()).collect(),
        values,
    }
}

//! Renderer figure: the heatmap, the time-of-flight contour and the layout as JSON.
//!
//! The structure follows the usual `{ data: [traces], layout }` shape of web
//! charting libraries. The contour trace comes first so that the heatmap is
//! drawn on top of it and keeps the hover.
use serde_json::{json, Value};

use crate::constants::TOF_CONTOUR_LEVELS;

use super::post_process::VisualizationPayload;

pub const PLOT_TITLE: &str = "Porkchop Plot - Optimal Transfer Orbit";

/// Complete figure of a payload.
pub fn figure(payload: &VisualizationPayload) -> Value {
    json!({
        "data": [contour_trace(payload), heatmap_trace(payload)],
        "layout": layout(payload),
    })
}

/// Total delta-v heatmap, with the hover text of every cell.
pub fn heatmap_trace(payload: &VisualizationPayload) -> Value {
    let mut trace = json!({
        "type": "heatmap",
        "z": payload.surface,
        "colorscale": payload.color_scale,
        "text": payload.hover_text,
        "hoverinfo": "text",
    });

    if let Some(bar) = &payload.color_bar {
        trace["zmin"] = json!(bar.zmin);
        trace["zmax"] = json!(bar.zmax);
        trace["zauto"] = json!(false);
        trace["colorbar"] = json!({
            "title": "Delta-V (km/s)",
            "tickmode": "array",
            "tickvals": bar.ticks,
        });
    }
    trace
}

/// Time-of-flight iso-lines, unfilled, every 50 days up to 900.
pub fn contour_trace(payload: &VisualizationPayload) -> Value {
    let (start, end, size) = TOF_CONTOUR_LEVELS;
    json!({
        "type": "contour",
        "z": payload.time_of_flight,
        "contours": {
            "coloring": "none",
            "showlabels": true,
            "start": start,
            "end": end,
            "size": size,
        },
        "line": { "color": "gray", "width": 1, "dash": "dot" },
        "showscale": false,
        "hoverinfo": "skip",
    })
}

pub fn layout(payload: &VisualizationPayload) -> Value {
    json!({
        "title": { "text": PLOT_TITLE },
        "xaxis": {
            "title": { "text": "Departure Date" },
            "tickmode": "array",
            "tickvals": payload.departure_axis.values,
            "ticktext": payload.departure_axis.labels,
        },
        "yaxis": {
            "title": { "text": "Arrival Date" },
            "tickmode": "array",
            "tickvals": payload.arrival_axis.values,
            "ticktext": payload.arrival_axis.labels,
            "automargin": true,
        },
        "hovermode": "closest",
    })
}

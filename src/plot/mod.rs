//! # Porkchop plot data
//!
//! ```text
//! plot
//! ├── post_process  ResultGrid + date series → VisualizationPayload
//! └── figure        VisualizationPayload → renderer JSON
//! ```
pub mod figure;
pub mod post_process;

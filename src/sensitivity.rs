//! Sensitivity of project economics to changes in the inputs.
//!
//! Two analyses are provided: a tornado analysis, which re-runs the DCF engine for each perturbed
//! parameter, and a grid analysis, which approximates BCR and NPV over a table of CapEx and
//! benefit levels.
pub mod grid;
pub mod tornado;

pub use grid::{GridSensitivity, grid_sensitivity};
pub use tornado::{TornadoAnalysis, run_tornado_analysis};

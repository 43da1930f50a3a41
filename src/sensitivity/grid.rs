//! Grid sensitivity of BCR and NPV to CapEx and benefit levels.
//!
//! This is a fast approximation for a dense table: costs are scaled linearly with the CapEx ratio
//! instead of re-running the DCF engine for each cell. Use the tornado analysis for exact
//! per-parameter results.
use crate::economics::FinancialResults;
use serde::Serialize;
use serde_string_enum::SerializeLabeledStringEnum;

/// Benefit multipliers for the columns of the grid
pub const BENEFIT_MULTIPLIERS: [f64; 7] = [0.7, 0.8, 0.9, 1.0, 1.1, 1.2, 1.3];

/// Share of PV costs assumed to scale with battery CapEx
const CAPEX_COST_SHARE: f64 = 0.7;

/// Lowest CapEx level in the grid and smallest step between levels ($/kWh)
const MIN_CAPEX_LEVEL: f64 = 10.0;

/// Number of CapEx steps either side of the base level
const CAPEX_STEPS: i32 = 3;

/// Index of the row for the base CapEx level
pub const BASE_ROW: usize = CAPEX_STEPS as usize;

/// How attractive a project is at a given BCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum)]
pub enum Recommendation {
    /// BCR of at least 1.5
    #[string = "strong"]
    Strong,
    /// BCR of at least 1.0
    #[string = "marginal"]
    Marginal,
    /// BCR below 1.0
    #[string = "not cost-effective"]
    NotCostEffective,
}

impl Recommendation {
    /// Classify a BCR
    pub fn from_bcr(bcr: f64) -> Self {
        if bcr >= 1.5 {
            Self::Strong
        } else if bcr >= 1.0 {
            Self::Marginal
        } else {
            Self::NotCostEffective
        }
    }
}

/// One cell of the grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    /// Battery CapEx ($/kWh)
    pub capex_per_kwh: f64,
    /// Multiplier applied to PV benefits
    pub benefit_multiplier: f64,
    /// Approximate NPV ($)
    pub npv: f64,
    /// Approximate BCR
    pub bcr: f64,
    /// Classification of the BCR
    pub recommendation: Recommendation,
}

/// BCR and NPV over a grid of CapEx levels (rows) and benefit multipliers (columns)
#[derive(Debug, Clone, PartialEq)]
pub struct GridSensitivity {
    /// CapEx level for each row ($/kWh); the base level is at [`BASE_ROW`]
    pub capex_levels: Vec<f64>,
    /// Cells in row-major order
    pub cells: Vec<GridCell>,
}

impl GridSensitivity {
    /// The cells in one row of the grid
    pub fn row(&self, row: usize) -> &[GridCell] {
        let width = BENEFIT_MULTIPLIERS.len();
        &self.cells[row * width..(row + 1) * width]
    }
}

/// CapEx levels centred on `base_capex`, in steps of about 10% rounded to the nearest $10/kWh
pub fn capex_levels(base_capex: f64) -> Vec<f64> {
    let step = ((base_capex * 0.1 / 10.0).round() * 10.0).max(MIN_CAPEX_LEVEL);
    (-CAPEX_STEPS..=CAPEX_STEPS)
        .map(|offset| {
            (base_capex + f64::from(offset) * step)
                .round()
                .max(MIN_CAPEX_LEVEL)
        })
        .collect()
}

/// Approximate BCR and NPV over the grid from a project's baseline results
pub fn grid_sensitivity(base_capex: f64, results: &FinancialResults) -> GridSensitivity {
    let capex_levels = capex_levels(base_capex);
    let cells = capex_levels
        .iter()
        .flat_map(|&capex| {
            let capex_ratio = if base_capex > 0.0 {
                capex / base_capex
            } else {
                1.0
            };
            let adjusted_costs = results.pv_costs * (1.0 + (capex_ratio - 1.0) * CAPEX_COST_SHARE);

            BENEFIT_MULTIPLIERS.iter().map(move |&multiplier| {
                let adjusted_benefits = results.pv_benefits * multiplier;
                let bcr = if adjusted_costs > 0.0 {
                    adjusted_benefits / adjusted_costs
                } else {
                    0.0
                };

                GridCell {
                    capex_per_kwh: capex,
                    benefit_multiplier: multiplier,
                    npv: adjusted_benefits - adjusted_costs,
                    bcr,
                    recommendation: Recommendation::from_bcr(bcr),
                }
            })
        })
        .collect();

    GridSensitivity {
        capex_levels,
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economics::compute_economics;
    use crate::fixture::project;
    use crate::project::Project;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(160.0, &[100.0, 120.0, 140.0, 160.0, 180.0, 200.0, 220.0])]
    #[case(300.0, &[210.0, 240.0, 270.0, 300.0, 330.0, 360.0, 390.0])]
    #[case(20.0, &[10.0, 10.0, 10.0, 20.0, 30.0, 40.0, 50.0])]
    fn test_capex_levels(#[case] base: f64, #[case] expected: &[f64]) {
        assert_eq!(capex_levels(base), expected);
    }

    #[rstest]
    #[case(2.0, Recommendation::Strong)]
    #[case(1.5, Recommendation::Strong)]
    #[case(1.2, Recommendation::Marginal)]
    #[case(0.99, Recommendation::NotCostEffective)]
    fn test_recommendation(#[case] bcr: f64, #[case] expected: Recommendation) {
        assert_eq!(Recommendation::from_bcr(bcr), expected);
    }

    #[rstest]
    fn test_grid_base_cell_matches_results(project: Project) {
        let results = compute_economics(&project).unwrap();
        let grid = grid_sensitivity(160.0, &results);
        assert_eq!(grid.cells.len(), 49);

        let base = &grid.row(BASE_ROW)[3];
        assert_eq!(base.capex_per_kwh, 160.0);
        assert_eq!(base.benefit_multiplier, 1.0);
        assert_approx_eq!(f64, base.bcr, results.bcr, epsilon = 1e-12);
        assert_approx_eq!(f64, base.npv, results.npv, epsilon = 1e-6);
    }

    #[rstest]
    fn test_grid_linear_cost_scaling(project: Project) {
        let results = compute_economics(&project).unwrap();
        let grid = grid_sensitivity(160.0, &results);

        // First row is 100 $/kWh
        let cell = &grid.row(0)[0];
        let costs = results.pv_costs * (1.0 + (100.0 / 160.0 - 1.0) * 0.7);
        assert_approx_eq!(
            f64,
            cell.npv,
            results.pv_benefits * 0.7 - costs,
            epsilon = 1e-6
        );

        // BCR rises down each column as CapEx falls and along each row as benefits rise
        assert!(grid.row(0)[3].bcr > grid.row(6)[3].bcr);
        assert!(grid.row(3)[6].bcr > grid.row(3)[0].bcr);
    }
}

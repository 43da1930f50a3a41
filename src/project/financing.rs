//! Capital structure inputs.
use super::check_in_range;
use anyhow::{Result, ensure};
use serde::Deserialize;

/// The capital structure of the project.
///
/// When present, the WACC replaces the project discount rate for all present-value calculations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinancingInputs {
    /// Share of capital raised as debt, between 0 and 1
    pub debt_percent: f64,
    /// Interest rate on debt, between 0 and 0.20
    pub interest_rate: f64,
    /// Loan tenor (years)
    pub loan_term_years: u32,
    /// Required return on equity, between 0 and 0.30
    pub cost_of_equity: f64,
    /// Corporate income tax rate, between 0 and 0.50
    pub tax_rate: f64,
}

impl Default for FinancingInputs {
    fn default() -> Self {
        Self {
            debt_percent: 0.60,
            interest_rate: 0.05,
            loan_term_years: 15,
            cost_of_equity: 0.10,
            tax_rate: 0.21,
        }
    }
}

impl FinancingInputs {
    /// Weighted average cost of capital, with the tax shield on debt
    pub fn wacc(&self) -> f64 {
        (1.0 - self.debt_percent) * self.cost_of_equity
            + self.debt_percent * self.interest_rate * (1.0 - self.tax_rate)
    }

    /// Check that all values are within their valid ranges
    pub fn validate(&self) -> Result<()> {
        check_in_range("debt_percent", self.debt_percent, 0.0..=1.0)?;
        check_in_range("interest_rate", self.interest_rate, 0.0..=0.20)?;
        ensure!(self.loan_term_years >= 1, "loan_term_years must be at least 1");
        check_in_range("cost_of_equity", self.cost_of_equity, 0.0..=0.30)?;
        check_in_range("tax_rate", self.tax_rate, 0.0..=0.50)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.10)] // All equity
    #[case(1.0, 0.05 * 0.79)] // All debt
    #[case(0.6, 0.0637)]
    fn test_wacc(#[case] debt_percent: f64, #[case] expected: f64) {
        let financing = FinancingInputs {
            debt_percent,
            ..Default::default()
        };
        assert_approx_eq!(f64, financing.wacc(), expected, epsilon = 1e-12);
    }

    #[rstest]
    #[case(FinancingInputs { debt_percent: 1.1, ..Default::default() })]
    #[case(FinancingInputs { interest_rate: 0.25, ..Default::default() })]
    #[case(FinancingInputs { loan_term_years: 0, ..Default::default() })]
    #[case(FinancingInputs { cost_of_equity: 0.35, ..Default::default() })]
    #[case(FinancingInputs { tax_rate: -0.1, ..Default::default() })]
    fn test_invalid_financing(#[case] financing: FinancingInputs) {
        assert!(financing.validate().is_err());
    }
}

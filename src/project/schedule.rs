//! Phased build-out and T&D deferral schedules.
use super::{check_in_range, check_non_negative, check_positive};
use crate::finance::td_deferral_value;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Earliest commercial operation year accepted for a tranche
const MIN_COD_YEAR: u32 = 2020;

/// Latest commercial operation year accepted for a tranche
const MAX_COD_YEAR: u32 = 2060;

/// A block of capacity entering commercial operation in a given year
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildTranche {
    /// Calendar year of commercial operation
    pub cod_year: u32,
    /// Power capacity of the tranche (MW)
    pub capacity_mw: f64,
}

/// The order in which the project capacity is built
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSchedule {
    /// The tranches making up the project
    pub tranches: Vec<BuildTranche>,
}

impl BuildSchedule {
    /// Check every tranche
    pub fn validate(&self) -> Result<()> {
        for (idx, tranche) in self.tranches.iter().enumerate() {
            check_in_range(
                "cod_year",
                tranche.cod_year as f64,
                MIN_COD_YEAR as f64..=MAX_COD_YEAR as f64,
            )
            .and_then(|()| check_positive("capacity_mw", tranche.capacity_mw))
            .with_context(|| format!("Invalid tranche {}", idx + 1))?;
        }

        Ok(())
    }
}

/// A T&D investment deferred because the battery serves load growth
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TdDeferralTranche {
    /// Capital cost of the deferred investment ($)
    pub deferred_capital_cost: f64,
    /// Annual load growth driving the need, between 0 and 0.20
    pub load_growth_rate: f64,
    /// Years by which the investment is deferred
    pub deferral_years: u32,
}

impl TdDeferralTranche {
    /// PV of deferring this investment
    pub fn present_value(&self, discount_rate: f64) -> f64 {
        td_deferral_value(
            self.deferred_capital_cost,
            self.load_growth_rate,
            discount_rate,
            self.deferral_years,
        )
    }
}

/// T&D investments deferred by the project
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TdDeferralSchedule {
    /// The deferred investments
    pub tranches: Vec<TdDeferralTranche>,
}

impl TdDeferralSchedule {
    /// Total PV of all deferrals
    pub fn total_pv(&self, discount_rate: f64) -> f64 {
        self.tranches
            .iter()
            .map(|tranche| tranche.present_value(discount_rate))
            .sum()
    }

    /// Check every tranche
    pub fn validate(&self) -> Result<()> {
        for (idx, tranche) in self.tranches.iter().enumerate() {
            check_non_negative("deferred_capital_cost", tranche.deferred_capital_cost)
                .and_then(|()| {
                    check_in_range("load_growth_rate", tranche.load_growth_rate, 0.0..=0.20)
                })
                .with_context(|| format!("Invalid T&D deferral tranche {}", idx + 1))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_invalid_cod_year() {
        let schedule = BuildSchedule {
            tranches: vec![
                BuildTranche {
                    cod_year: 2027,
                    capacity_mw: 50.0,
                },
                BuildTranche {
                    cod_year: 2070,
                    capacity_mw: 50.0,
                },
            ],
        };
        assert_error!(schedule.validate(), "Invalid tranche 2");
    }

    #[test]
    fn test_td_deferral_total_pv() {
        let tranche = TdDeferralTranche {
            deferred_capital_cost: 10e6,
            load_growth_rate: 0.02,
            deferral_years: 5,
        };
        let schedule = TdDeferralSchedule {
            tranches: vec![
                tranche.clone(),
                TdDeferralTranche {
                    deferral_years: 0,
                    ..tranche.clone()
                },
            ],
        };
        assert_approx_eq!(
            f64,
            schedule.total_pv(0.07),
            tranche.present_value(0.07),
            epsilon = 1e-9
        );
        assert!(tranche.present_value(0.07) > 0.0);
    }
}

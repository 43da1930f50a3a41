//! Comparison of traditional wires infrastructure against a storage non-wires alternative (NWA).
//!
//! Both sides are run through the revenue requirement engine and levelised with the real economic
//! carrying charge (RECC) method, so that assets with different lives and tax treatment can be
//! compared on an equivalent annual basis.
use crate::finance::{deferral_value, recc};
use crate::project::{check_in_range, check_non_negative};
use crate::rate_base::{
    CostOfCapital, MacrsClass, RateBaseInputs, compute_revenue_requirement,
};
use anyhow::{Context, Result, ensure};
use log::debug;
use serde::Serialize;

/// A traditional poles-and-wires solution
#[derive(Debug, Clone, PartialEq)]
pub struct WiresAlternative {
    /// Total capital cost ($). If absent, calculated from `cost_per_kw` and `capacity_kw`.
    pub total_cost: Option<f64>,
    /// Capital cost per kW of need addressed ($/kW)
    pub cost_per_kw: f64,
    /// Capacity of need addressed (kW)
    pub capacity_kw: f64,
    /// Book life (years)
    pub book_life_years: u32,
    /// Years from approval to in-service
    pub lead_time_years: u32,
    /// Annual O&M ($)
    pub annual_om: f64,
    /// Tax depreciation class
    pub macrs_class: MacrsClass,
}

impl Default for WiresAlternative {
    fn default() -> Self {
        Self {
            total_cost: None,
            cost_per_kw: 500.0,
            capacity_kw: 100_000.0,
            book_life_years: 40,
            lead_time_years: 5,
            annual_om: 0.0,
            macrs_class: MacrsClass::TwentyYear,
        }
    }
}

impl WiresAlternative {
    /// Total capital cost of the wires solution ($)
    pub fn total_cost(&self) -> f64 {
        self.total_cost
            .unwrap_or(self.cost_per_kw * self.capacity_kw)
    }

    fn validate(&self) -> Result<()> {
        if let Some(total_cost) = self.total_cost {
            check_non_negative("total_cost", total_cost)?;
        }
        check_non_negative("cost_per_kw", self.cost_per_kw)?;
        check_non_negative("capacity_kw", self.capacity_kw)?;
        check_non_negative("annual_om", self.annual_om)?;
        ensure!(self.book_life_years >= 1, "book_life_years must be at least 1");

        Ok(())
    }
}

/// A storage project proposed as a non-wires alternative
#[derive(Debug, Clone, PartialEq)]
pub struct NwaParameters {
    /// Years by which the storage project defers the wires investment
    pub deferral_years: u32,
    /// Whether to count only revenue requirement above the avoided costs storage provides anyway
    pub incrementality: bool,
    /// Storage plant in service ($)
    pub bess_gross_plant: f64,
    /// Storage book life (years)
    pub bess_book_life_years: u32,
    /// Storage tax depreciation class
    pub bess_macrs_class: MacrsClass,
    /// Storage annual O&M ($)
    pub bess_annual_om: f64,
    /// Storage ITC rate
    pub bess_itc_rate: f64,
    /// Baseline avoided costs provided by the storage project ($/year)
    pub avoided_cost_annual: f64,
}

impl Default for NwaParameters {
    fn default() -> Self {
        Self {
            deferral_years: 5,
            incrementality: true,
            bess_gross_plant: 0.0,
            bess_book_life_years: 20,
            bess_macrs_class: MacrsClass::SevenYear,
            bess_annual_om: 0.0,
            bess_itc_rate: 0.30,
            avoided_cost_annual: 0.0,
        }
    }
}

impl NwaParameters {
    fn validate(&self) -> Result<()> {
        check_non_negative("bess_gross_plant", self.bess_gross_plant)?;
        check_non_negative("bess_annual_om", self.bess_annual_om)?;
        check_in_range("bess_itc_rate", self.bess_itc_rate, 0.0..=1.0)?;
        check_non_negative("avoided_cost_annual", self.avoided_cost_annual)?;

        Ok(())
    }
}

/// Outcome of a wires vs NWA comparison
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    /// Levelised annual revenue requirement of the wires solution ($/year)
    pub wires_recc: f64,
    /// Levelised annual revenue requirement of the NWA ($/year)
    pub nwa_recc: f64,
    /// Wires revenue requirement over the analysis period ($)
    pub wires_total_rr: f64,
    /// NWA revenue requirement over the analysis period, after incrementality ($)
    pub nwa_total_rr: f64,
    /// Difference between wires and NWA RECC ($/year)
    pub annual_savings: f64,
    /// Savings over the deferral period, or the whole analysis if shorter ($)
    pub total_savings: f64,
    /// Running total of annual savings
    pub cumulative_savings: Vec<f64>,
    /// Whether the NWA has a lower levelised cost than the wires solution
    pub nwa_is_economic: bool,
    /// PV benefit of deferring the wires investment ($)
    pub deferral_value: f64,
    /// Annual wires revenue requirement
    pub wires_annual_rr: Vec<f64>,
    /// Annual NWA revenue requirement, after incrementality
    pub nwa_annual_rr: Vec<f64>,
}

/// One year of a wires vs NWA comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    /// Year of the analysis (1-based)
    pub year: u32,
    /// Wires revenue requirement
    pub wires_rr: f64,
    /// NWA revenue requirement
    pub nwa_rr: f64,
    /// Wires less NWA revenue requirement
    pub savings: f64,
    /// Running total of savings
    pub cumulative_savings: f64,
}

impl ComparisonResult {
    /// The annual schedules as rows
    pub fn rows(&self) -> impl Iterator<Item = ComparisonRow> + '_ {
        self.wires_annual_rr
            .iter()
            .zip(&self.nwa_annual_rr)
            .zip(&self.cumulative_savings)
            .enumerate()
            .map(|(idx, ((&wires_rr, &nwa_rr), &cumulative_savings))| ComparisonRow {
                year: idx as u32 + 1,
                wires_rr,
                nwa_rr,
                savings: wires_rr - nwa_rr,
                cumulative_savings,
            })
    }
}

/// Compare a wires solution against a storage NWA over `analysis_years`.
///
/// The wires solution receives no ITC. The storage project receives its ITC with the depreciable
/// basis reduced by half the credit.
pub fn compare_wires_vs_alternative(
    wires: &WiresAlternative,
    nwa: &NwaParameters,
    cost_of_capital: &CostOfCapital,
    analysis_years: u32,
) -> Result<ComparisonResult> {
    wires.validate().context("Invalid wires alternative")?;
    nwa.validate().context("Invalid NWA parameters")?;
    let ror = cost_of_capital.ror;

    let wires_total_cost = wires.total_cost();
    let wires_rr = compute_revenue_requirement(&RateBaseInputs {
        gross_plant: wires_total_cost,
        book_life_years: wires.book_life_years,
        macrs_class: wires.macrs_class,
        itc_rate: 0.0,
        itc_basis_reduction: false,
        cost_of_capital: cost_of_capital.clone(),
        annual_om: wires.annual_om,
        analysis_years,
        bonus_depreciation_pct: 0.0,
    })
    .context("Failed to calculate wires revenue requirement")?;
    let wires_annual = wires_rr.annual_revenue_requirements();

    let nwa_rr = compute_revenue_requirement(&RateBaseInputs {
        gross_plant: nwa.bess_gross_plant,
        book_life_years: nwa.bess_book_life_years,
        macrs_class: nwa.bess_macrs_class,
        itc_rate: nwa.bess_itc_rate,
        itc_basis_reduction: true,
        cost_of_capital: cost_of_capital.clone(),
        annual_om: nwa.bess_annual_om,
        analysis_years,
        bonus_depreciation_pct: 0.0,
    })
    .context("Failed to calculate NWA revenue requirement")?;
    let mut nwa_annual = nwa_rr.annual_revenue_requirements();

    if nwa.incrementality && nwa.avoided_cost_annual > 0.0 {
        for rr in &mut nwa_annual {
            *rr = (*rr - nwa.avoided_cost_annual).max(0.0);
        }
    }

    let nwa_total_rr: f64 = nwa_annual.iter().sum();
    let wires_recc = wires_rr.levelized_revenue_requirement;
    let nwa_recc = recc(nwa_total_rr, analysis_years, ror);

    let savings: Vec<f64> = wires_annual
        .iter()
        .zip(&nwa_annual)
        .map(|(wires, nwa)| wires - nwa)
        .collect();
    let cumulative_savings = savings
        .iter()
        .scan(0.0, |total, savings| {
            *total += savings;
            Some(*total)
        })
        .collect();
    let compare_years = nwa.deferral_years.min(analysis_years) as usize;
    let total_savings = savings.iter().take(compare_years).sum();

    debug!("Wires RECC: {wires_recc:.0} $/year, NWA RECC: {nwa_recc:.0} $/year");

    Ok(ComparisonResult {
        wires_recc,
        nwa_recc,
        wires_total_rr: wires_rr.total_revenue_requirement,
        nwa_total_rr,
        annual_savings: wires_recc - nwa_recc,
        total_savings,
        cumulative_savings,
        nwa_is_economic: nwa_recc < wires_recc,
        deferral_value: deferral_value(wires_total_cost, nwa.deferral_years, ror),
        wires_annual_rr: wires_annual,
        nwa_annual_rr: nwa_annual,
    })
}

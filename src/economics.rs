//! The discounted cash-flow engine.
//!
//! Annual arrays run over analysis years 0..=N, where year 0 is the construction year. Costs are
//! built up per cohort of capacity (a single cohort unless the project has a phased build
//! schedule) and benefits are added from the project's benefit streams and special benefits.
use crate::finance::{bcr, discount_factor, irr, lcos, payback_years, present_value};
use crate::project::benefit::{
    RELIABILITY_BENEFIT_NAME, SAFETY_BENEFIT_NAME, SPEED_BENEFIT_NAME,
};
use crate::project::{BuildTranche, Project};
use anyhow::Result;
use indexmap::IndexMap;
use log::debug;

pub mod cohort;
use cohort::{capacity_ratios, cohort_cash_flows};

/// The outcome of an economic evaluation of a project
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialResults {
    /// PV of all benefits ($)
    pub pv_benefits: f64,
    /// PV of all costs ($)
    pub pv_costs: f64,
    /// Net present value ($)
    pub npv: f64,
    /// Benefit-cost ratio
    pub bcr: f64,
    /// Internal rate of return, if one exists
    pub irr: Option<f64>,
    /// Years until cumulative net cash flow turns non-negative, if it ever does
    pub payback_years: Option<f64>,
    /// Levelised cost of storage ($/MWh)
    pub lcos_per_mwh: f64,
    /// Battery CapEx at which BCR would be exactly 1 ($/kWh)
    pub breakeven_capex_per_kwh: f64,
    /// Share of PV benefits from each benefit category (%), in project order
    pub benefit_breakdown: IndexMap<String, f64>,
    /// Costs in each year ($)
    pub annual_costs: Vec<f64>,
    /// Benefits in each year ($)
    pub annual_benefits: Vec<f64>,
    /// Benefits less costs in each year ($)
    pub annual_net: Vec<f64>,
    /// Energy discharged in each year (MWh)
    pub annual_discharge_mwh: Vec<f64>,
    /// Discount rate used for all PV calculations
    pub effective_discount_rate: f64,
    /// Saving from phasing the build rather than building everything at once ($)
    pub flexibility_value: f64,
    /// PV of deferred T&D investment ($), reported separately from benefits
    pub td_deferral_pv: f64,
    /// Battery CapEx paid for each tranche ($/kWh)
    pub cohort_capex_per_kwh: Vec<f64>,
    /// Number of tranches in which capacity is built
    pub num_tranches: usize,
}

/// Costs and discharged energy summed over all cohorts
struct CostStream {
    costs: Vec<f64>,
    discharge_mwh: Vec<f64>,
    cohort_capex_per_kwh: Vec<f64>,
}

/// Sum the cash flows of cohorts built according to `tranches`
fn cost_stream(
    project: &Project,
    tranches: &[BuildTranche],
    year_0: u32,
    apply_learning: bool,
) -> CostStream {
    let n = project.analysis_years() as usize;
    let mut stream = CostStream {
        costs: vec![0.0; n + 1],
        discharge_mwh: vec![0.0; n + 1],
        cohort_capex_per_kwh: Vec::with_capacity(tranches.len()),
    };

    for tranche in tranches {
        let Some(cohort) = cohort_cash_flows(project, tranche, year_0, apply_learning) else {
            continue;
        };

        for (total, cost) in stream.costs.iter_mut().zip(&cohort.costs) {
            *total += cost;
        }
        for (total, mwh) in stream.discharge_mwh.iter_mut().zip(&cohort.discharge_mwh) {
            *total += mwh;
        }
        stream.cohort_capex_per_kwh.push(cohort.capex_per_kwh);
    }

    stream
}

/// Earliest COD among the tranches
fn first_cod_year(project: &Project, tranches: &[BuildTranche]) -> u32 {
    tranches
        .iter()
        .map(|tranche| tranche.cod_year)
        .min()
        .unwrap_or(project.basics().in_service_year)
}

/// Add a benefit to the annual benefit stream and return its PV
fn add_benefit(
    annual_benefits: &mut [f64],
    values: impl Iterator<Item = (usize, f64)>,
    rate: f64,
) -> f64 {
    values
        .map(|(year, value)| {
            annual_benefits[year] += value;
            value * discount_factor(rate, year)
        })
        .sum()
}

/// Run the discounted cash-flow analysis for a project.
///
/// Fails if the PV of costs is not positive, as the BCR is then undefined.
pub fn compute_economics(project: &Project) -> Result<FinancialResults> {
    let basics = project.basics();
    let technology = project.technology();
    let n = project.analysis_years() as usize;
    let rate = project.discount_rate();
    let tranches = project.tranches();
    let is_multi = project.is_multi_tranche();
    let year_0 = first_cod_year(project, &tranches);
    debug!(
        "Evaluating '{}' at a discount rate of {rate:.4} with {} tranche(s)",
        basics.name,
        tranches.len()
    );

    let CostStream {
        costs: annual_costs,
        discharge_mwh: annual_discharge_mwh,
        cohort_capex_per_kwh,
    } = cost_stream(project, &tranches, year_0, is_multi);

    // Single-tranche projects use benefit values as given; phased projects scale them by online
    // capacity
    let ratios = if is_multi {
        capacity_ratios(project, &tranches, year_0)
    } else {
        let mut ratios = vec![1.0; n + 1];
        ratios[0] = 0.0;
        ratios
    };

    let mut annual_benefits = vec![0.0; n + 1];
    let mut benefit_pvs = IndexMap::new();
    for benefit in project.benefits() {
        let values = benefit
            .annual_values
            .iter()
            .enumerate()
            .map(|(idx, value)| (idx + 1, value * ratios[idx + 1]));
        let pv = add_benefit(&mut annual_benefits, values, rate);
        benefit_pvs.insert(benefit.name.clone(), pv);
    }

    if let Some(special) = project.special_benefits() {
        if special.reliability_enabled {
            let base = special.reliability_annual(basics.capacity_mwh());
            let values = (1..=n).map(|year| {
                let factor = if is_multi {
                    ratios[year]
                } else {
                    technology.degradation_factor(year as u32)
                };
                (year, base * factor)
            });
            let pv = add_benefit(&mut annual_benefits, values, rate);
            benefit_pvs.insert(RELIABILITY_BENEFIT_NAME.to_string(), pv);
        }

        if special.safety_enabled {
            let annual = special.safety_annual(basics.capacity_mw);
            let pv = add_benefit(&mut annual_benefits, (1..=n).map(|year| (year, annual)), rate);
            benefit_pvs.insert(SAFETY_BENEFIT_NAME.to_string(), pv);
        }

        if special.speed_enabled {
            let one_time = special.speed_one_time(basics.capacity_kw());
            let pv = add_benefit(&mut annual_benefits, std::iter::once((1, one_time)), rate);
            benefit_pvs.insert(SPEED_BENEFIT_NAME.to_string(), pv);
        }
    }

    let pv_costs = present_value(&annual_costs, rate);
    let pv_benefits = present_value(&annual_benefits, rate);
    let bcr = bcr(pv_benefits, pv_costs)?;

    let annual_net: Vec<f64> = annual_benefits
        .iter()
        .zip(&annual_costs)
        .map(|(benefit, cost)| benefit - cost)
        .collect();

    // Hold everything except the year-0 outlay fixed
    let pv_other_costs = pv_costs - annual_costs[0];
    let breakeven_capex_per_kwh = (pv_benefits - pv_other_costs) / basics.capacity_kwh();

    let benefit_breakdown = if pv_benefits > 0.0 {
        benefit_pvs
            .into_iter()
            .map(|(name, pv)| (name, pv / pv_benefits * 100.0))
            .collect()
    } else {
        IndexMap::new()
    };

    Ok(FinancialResults {
        pv_benefits,
        pv_costs,
        npv: pv_benefits - pv_costs,
        bcr,
        irr: irr(&annual_net),
        payback_years: payback_years(&annual_net),
        lcos_per_mwh: lcos(&annual_costs, &annual_discharge_mwh, rate),
        breakeven_capex_per_kwh,
        benefit_breakdown,
        annual_costs,
        annual_benefits,
        annual_net,
        annual_discharge_mwh,
        effective_discount_rate: rate,
        flexibility_value: flexibility_value(project),
        td_deferral_pv: project
            .td_deferral()
            .map_or(0.0, |schedule| schedule.total_pv(rate)),
        cohort_capex_per_kwh,
        num_tranches: tranches.len(),
    })
}

/// The saving from phasing the build: PV of costs if all capacity were built at the earliest COD,
/// less PV of costs for the actual schedule.
///
/// Both scenarios apply the learning curve to battery CapEx. Zero for single-tranche projects.
pub fn flexibility_value(project: &Project) -> f64 {
    if !project.is_multi_tranche() {
        return 0.0;
    }

    let rate = project.discount_rate();
    let tranches = project.tranches();
    let year_0 = first_cod_year(project, &tranches);
    let upfront = [BuildTranche {
        cod_year: year_0,
        capacity_mw: tranches.iter().map(|tranche| tranche.capacity_mw).sum(),
    }];

    let pv_upfront = present_value(&cost_stream(project, &upfront, year_0, true).costs, rate);
    let pv_phased = present_value(&cost_stream(project, &tranches, year_0, true).costs, rate);

    pv_upfront - pv_phased
}

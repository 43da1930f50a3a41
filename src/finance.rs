//! General functions related to finance.
//!
//! All rates are decimal fractions and all cash-flow series are indexed by year, with index 0 being
//! the construction year (undiscounted).
use anyhow::{Result, ensure};
use log::debug;

/// Lowest rate considered when searching for an IRR (a rate of -100% is undefined)
const IRR_MIN_RATE: f64 = -0.99;

/// Highest rate considered when searching for an IRR
const IRR_MAX_RATE: f64 = 10.0;

/// Spacing of the grid used to bracket sign changes of NPV
const IRR_GRID_STEP: f64 = 0.01;

/// Width of bracket at which bisection is considered to have converged
const IRR_TOLERANCE: f64 = 1e-12;

/// Upper limit on bisection iterations for a single bracket
const IRR_MAX_ITERATIONS: u32 = 200;

/// The factor by which a value `year` years in the future is multiplied to get its present value
pub fn discount_factor(discount_rate: f64, year: usize) -> f64 {
    (1.0 + discount_rate).powi(year as i32).recip()
}

/// Present value of an annual series, discounting index `t` by `(1 + r)^t`.
pub fn present_value(values: &[f64], discount_rate: f64) -> f64 {
    values
        .iter()
        .enumerate()
        .map(|(year, value)| value * discount_factor(discount_rate, year))
        .sum()
}

/// Net present value of a net cash-flow series.
///
/// With a discount rate of zero this is exactly the sum of the cash flows.
pub fn npv(cash_flows: &[f64], discount_rate: f64) -> f64 {
    present_value(cash_flows, discount_rate)
}

/// Benefit-cost ratio.
///
/// Fails if `pv_costs` is not positive, as the ratio is then meaningless.
pub fn bcr(pv_benefits: f64, pv_costs: f64) -> Result<f64> {
    ensure!(
        pv_costs > 0.0,
        "PV of costs must be positive to calculate BCR, got {pv_costs}"
    );

    Ok(pv_benefits / pv_costs)
}

/// Internal rate of return of a net cash-flow series.
///
/// Candidate rates between -99% and 1000% are scanned on a 1% grid for sign changes of NPV. Each
/// bracketing interval is refined by bisection until its width falls below 1e-12 (or after 200
/// iterations). If several roots exist, the one closest to zero is returned.
///
/// # Returns
///
/// `None` if no root could be found, e.g. because all cash flows have the same sign.
pub fn irr(cash_flows: &[f64]) -> Option<f64> {
    let has_inflow = cash_flows.iter().any(|&cf| cf > 0.0);
    let has_outflow = cash_flows.iter().any(|&cf| cf < 0.0);
    if !(has_inflow && has_outflow) {
        debug!("IRR undetermined: cash flows do not change sign");
        return None;
    }

    let npv_at = |rate| npv(cash_flows, rate);
    let num_steps = ((IRR_MAX_RATE - IRR_MIN_RATE) / IRR_GRID_STEP).round() as usize;

    let mut best: Option<f64> = None;
    let mut lo = IRR_MIN_RATE;
    let mut npv_lo = npv_at(lo);
    for step in 1..=num_steps {
        let hi = IRR_MIN_RATE + step as f64 * IRR_GRID_STEP;
        let npv_hi = npv_at(hi);

        let root = if npv_lo == 0.0 {
            Some(lo)
        } else if npv_lo.is_finite() && npv_hi.is_finite() && npv_lo.signum() != npv_hi.signum()
        {
            Some(bisect(npv_at, lo, hi))
        } else {
            None
        };

        if let Some(root) = root {
            if best.is_none_or(|best| root.abs() < best.abs()) {
                best = Some(root);
            }
        }

        lo = hi;
        npv_lo = npv_hi;
    }

    if best.is_none() {
        debug!("IRR undetermined: no root found between {IRR_MIN_RATE} and {IRR_MAX_RATE}");
    }

    best
}

/// Find a root of `f` in `[lo, hi]`, where `f(lo)` and `f(hi)` have opposite signs
fn bisect<F>(f: F, mut lo: f64, mut hi: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let mut f_lo = f(lo);
    for _ in 0..IRR_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 || hi - lo < IRR_TOLERANCE {
            return mid;
        }

        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    0.5 * (lo + hi)
}

/// Levelised cost of storage: PV of costs divided by PV of discharged energy.
///
/// Defined as zero when PV of energy is not positive.
pub fn lcos(annual_costs: &[f64], annual_energy_mwh: &[f64], discount_rate: f64) -> f64 {
    let pv_energy = present_value(annual_energy_mwh, discount_rate);
    if pv_energy <= 0.0 {
        return 0.0;
    }

    present_value(annual_costs, discount_rate) / pv_energy
}

/// Simple payback period in years, interpolated linearly within the year of payback.
///
/// # Returns
///
/// The (fractional) number of years until cumulative net cash flow first goes from negative to
/// non-negative, zero if it is never negative, or `None` if it never becomes non-negative.
pub fn payback_years(annual_net: &[f64]) -> Option<f64> {
    let mut cumulative = 0.0;
    for (year, &net) in annual_net.iter().enumerate() {
        let previous = cumulative;
        cumulative += net;
        if cumulative < 0.0 {
            continue;
        }

        if year == 0 {
            return Some(0.0);
        }

        if previous < 0.0 {
            return Some((year - 1) as f64 + (-previous / net));
        }
    }

    None
}

/// Present value of an annuity paying 1 per year for `years` years (first payment after one year).
///
/// For non-positive rates this degenerates to the undiscounted number of payments.
pub fn annuity_factor(years: u32, discount_rate: f64) -> f64 {
    if discount_rate <= 0.0 {
        return years as f64;
    }

    (1.0 - (1.0 + discount_rate).powi(-(years as i32))) / discount_rate
}

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualise capital costs over the lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: f64) -> f64 {
    if lifetime == 0 {
        return 0.0;
    }
    if discount_rate <= 0.0 {
        return 1.0 / lifetime as f64;
    }
    let factor = (1.0 + discount_rate).powi(lifetime as i32);
    (discount_rate * factor) / (factor - 1.0)
}

/// Real economic carrying charge: a total spread as a level annual amount over `years`.
pub fn recc(total: f64, years: u32, discount_rate: f64) -> f64 {
    total * capital_recovery_factor(years.max(1), discount_rate)
}

/// Levelise an annual series whose first element falls in year 1.
///
/// This is the PV of the series divided by the annuity factor, or the simple mean if the rate is
/// not positive.
pub fn levelise(annual: &[f64], discount_rate: f64) -> f64 {
    if annual.is_empty() {
        return 0.0;
    }

    let years = annual.len() as u32;
    if discount_rate <= 0.0 {
        return annual.iter().sum::<f64>() / years as f64;
    }

    let pv: f64 = annual
        .iter()
        .enumerate()
        .map(|(idx, value)| value * discount_factor(discount_rate, idx + 1))
        .sum();
    pv / annuity_factor(years, discount_rate)
}

/// Value of deferring a capital outlay by `years` years.
pub fn deferral_value(capital_cost: f64, years: u32, discount_rate: f64) -> f64 {
    if years == 0 || discount_rate <= 0.0 {
        return 0.0;
    }

    capital_cost * (1.0 - discount_factor(discount_rate, years as usize))
}

/// PV of deferring a T&D investment whose need grows with load.
///
/// Calculated as `K × [1 − ((1 + g) / (1 + r))^n]`.
pub fn td_deferral_value(
    deferred_capital_cost: f64,
    load_growth_rate: f64,
    discount_rate: f64,
    years: u32,
) -> f64 {
    if deferred_capital_cost == 0.0 || years == 0 {
        return 0.0;
    }

    let ratio = (1.0 + load_growth_rate) / (1.0 + discount_rate);
    deferred_capital_cost * (1.0 - ratio.powi(years as i32))
}

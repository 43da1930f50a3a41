//! Rate base and revenue requirement for utility-owned assets.
//!
//! The revenue requirement in each year is the return on the net rate base, plus book
//! depreciation, income taxes (grossed up on the equity return), property tax and O&M. Tax
//! depreciation follows the MACRS tables with the half-year convention, and the timing difference
//! between book and tax depreciation accumulates as deferred income taxes (ADIT), which reduce the
//! rate base.
use crate::finance::levelise;
use crate::project::{check_in_range, check_non_negative};
use anyhow::{Context, Result, bail, ensure};
use log::debug;
use serde::{Deserialize, Serialize};

/// Tolerance when checking that capital structure ratios sum to one
const CAPITAL_STRUCTURE_TOLERANCE: f64 = 1e-3;

/// Share of the ITC by which the depreciable tax basis is reduced
const ITC_BASIS_REDUCTION_SHARE: f64 = 0.5;

/// A MACRS property class (IRS Publication 946, Table A-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u32")]
pub enum MacrsClass {
    /// 5-year property
    FiveYear,
    /// 7-year property (typical for batteries)
    SevenYear,
    /// 15-year property
    FifteenYear,
    /// 20-year property (typical for T&D)
    TwentyYear,
}

impl MacrsClass {
    /// Fraction of the depreciable basis deducted in each tax year
    pub fn schedule(self) -> &'static [f64] {
        match self {
            Self::FiveYear => &[0.2000, 0.3200, 0.1920, 0.1152, 0.1152, 0.0576],
            Self::SevenYear => &[
                0.1429, 0.2449, 0.1749, 0.1249, 0.0893, 0.0892, 0.0893, 0.0446,
            ],
            Self::FifteenYear => &[
                0.0500, 0.0950, 0.0855, 0.0770, 0.0693, 0.0623, 0.0590, 0.0590, 0.0591, 0.0590,
                0.0591, 0.0590, 0.0591, 0.0590, 0.0591, 0.0295,
            ],
            Self::TwentyYear => &[
                0.0375, 0.0722, 0.0668, 0.0618, 0.0571, 0.0528, 0.0489, 0.0452, 0.0447, 0.0447,
                0.0446, 0.0446, 0.0446, 0.0446, 0.0446, 0.0446, 0.0446, 0.0446, 0.0446, 0.0446,
                0.0223,
            ],
        }
    }

    /// The class life in years
    pub fn years(self) -> u32 {
        match self {
            Self::FiveYear => 5,
            Self::SevenYear => 7,
            Self::FifteenYear => 15,
            Self::TwentyYear => 20,
        }
    }
}

impl TryFrom<u32> for MacrsClass {
    type Error = anyhow::Error;

    fn try_from(value: u32) -> Result<Self> {
        Ok(match value {
            5 => Self::FiveYear,
            7 => Self::SevenYear,
            15 => Self::FifteenYear,
            20 => Self::TwentyYear,
            _ => bail!("Unsupported MACRS class: {value} (supported classes are 5, 7, 15 and 20)"),
        })
    }
}

/// Authorised cost of capital for a regulated utility.
///
/// Defaults are from CPUC Decision D.25-12-003 (SCE, 2026-2028).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostOfCapital {
    /// Authorised return on equity
    pub roe: f64,
    /// Embedded cost of long-term debt
    pub cost_of_debt: f64,
    /// Cost of preferred stock
    pub cost_of_preferred: f64,
    /// Common equity share of the capital structure
    pub equity_ratio: f64,
    /// Long-term debt share of the capital structure
    pub debt_ratio: f64,
    /// Preferred stock share of the capital structure
    pub preferred_ratio: f64,
    /// Authorised rate of return on rate base
    pub ror: f64,
    /// Federal income tax rate
    pub federal_tax_rate: f64,
    /// State income tax rate
    pub state_tax_rate: f64,
    /// Property tax rate on net plant
    pub property_tax_rate: f64,
}

impl Default for CostOfCapital {
    fn default() -> Self {
        Self {
            roe: 0.1003,
            cost_of_debt: 0.0471,
            cost_of_preferred: 0.0548,
            equity_ratio: 0.52,
            debt_ratio: 0.4347,
            preferred_ratio: 0.0453,
            ror: 0.0759,
            federal_tax_rate: 0.21,
            state_tax_rate: 0.0884,
            property_tax_rate: 0.01,
        }
    }
}

impl CostOfCapital {
    /// Combined tax rate, with state tax deductible for federal purposes
    pub fn composite_tax_rate(&self) -> f64 {
        self.state_tax_rate + self.federal_tax_rate * (1.0 - self.state_tax_rate)
    }

    /// Rate of return implied by the capital structure
    pub fn weighted_rate_of_return(&self) -> f64 {
        self.equity_ratio * self.roe
            + self.debt_ratio * self.cost_of_debt
            + self.preferred_ratio * self.cost_of_preferred
    }

    /// Check that all values are within their valid ranges
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("roe", self.roe),
            ("cost_of_debt", self.cost_of_debt),
            ("cost_of_preferred", self.cost_of_preferred),
            ("ror", self.ror),
        ] {
            check_in_range(name, value, 0.0..=0.30)?;
        }
        for (name, value) in [
            ("equity_ratio", self.equity_ratio),
            ("debt_ratio", self.debt_ratio),
            ("preferred_ratio", self.preferred_ratio),
        ] {
            check_in_range(name, value, 0.0..=1.0)?;
        }

        let total_ratio = self.equity_ratio + self.debt_ratio + self.preferred_ratio;
        ensure!(
            (total_ratio - 1.0).abs() <= CAPITAL_STRUCTURE_TOLERANCE,
            "Capital structure ratios must sum to 1, got {total_ratio}"
        );

        check_in_range("federal_tax_rate", self.federal_tax_rate, 0.0..=0.60)?;
        check_in_range("state_tax_rate", self.state_tax_rate, 0.0..=0.60)?;
        check_in_range("property_tax_rate", self.property_tax_rate, 0.0..=0.10)?;

        Ok(())
    }
}

/// Inputs for a revenue requirement calculation
#[derive(Debug, Clone, PartialEq)]
pub struct RateBaseInputs {
    /// Plant in service ($)
    pub gross_plant: f64,
    /// Straight-line book life (years)
    pub book_life_years: u32,
    /// Tax depreciation class
    pub macrs_class: MacrsClass,
    /// Investment tax credit rate
    pub itc_rate: f64,
    /// Whether the ITC reduces the depreciable tax basis (by half the credit)
    pub itc_basis_reduction: bool,
    /// Authorised cost of capital
    pub cost_of_capital: CostOfCapital,
    /// Annual O&M expense ($)
    pub annual_om: f64,
    /// Length of the schedule (years)
    pub analysis_years: u32,
    /// Share of the tax basis expensed in year 1, between 0 and 1
    pub bonus_depreciation_pct: f64,
}

impl RateBaseInputs {
    /// Check that all values are within their valid ranges
    pub fn validate(&self) -> Result<()> {
        check_non_negative("gross_plant", self.gross_plant)?;
        ensure!(self.book_life_years >= 1, "book_life_years must be at least 1");
        ensure!(self.analysis_years >= 1, "analysis_years must be at least 1");
        check_in_range("itc_rate", self.itc_rate, 0.0..=1.0)?;
        check_non_negative("annual_om", self.annual_om)?;
        check_in_range(
            "bonus_depreciation_pct",
            self.bonus_depreciation_pct,
            0.0..=1.0,
        )?;
        self.cost_of_capital
            .validate()
            .context("Invalid cost of capital")?;

        Ok(())
    }
}

/// One year of the revenue requirement schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualRateBase {
    /// Year of service (1-based)
    pub year: u32,
    /// Plant in service
    pub gross_plant: f64,
    /// Straight-line book depreciation
    pub book_depreciation: f64,
    /// Cumulative book depreciation
    pub accumulated_book_depreciation: f64,
    /// MACRS (plus bonus) tax depreciation
    pub tax_depreciation: f64,
    /// Cumulative tax depreciation
    pub accumulated_tax_depreciation: f64,
    /// Tax effect of this year's book/tax timing difference
    pub deferred_tax_expense: f64,
    /// Accumulated deferred income taxes
    pub adit: f64,
    /// Gross plant less accumulated book depreciation and ADIT
    pub net_rate_base: f64,
    /// Net rate base times the authorised rate of return
    pub return_on_rate_base: f64,
    /// Income tax on the equity return, net of deferred tax expense
    pub income_tax_expense: f64,
    /// Property tax on net plant
    pub property_tax_expense: f64,
    /// O&M expense
    pub om_expense: f64,
    /// Total revenue requirement
    pub revenue_requirement: f64,
}

/// The full revenue requirement schedule and summary values
#[derive(Debug, Clone, PartialEq)]
pub struct RateBaseResults {
    /// One entry per year of the analysis
    pub annual: Vec<AnnualRateBase>,
    /// Sum of annual revenue requirements
    pub total_revenue_requirement: f64,
    /// Annuity-equivalent revenue requirement at the authorised rate of return
    pub levelized_revenue_requirement: f64,
    /// Investment tax credit ($)
    pub itc_amount: f64,
    /// Book depreciation over the analysis period
    pub total_book_depreciation: f64,
    /// Tax depreciation over the analysis period
    pub total_tax_depreciation: f64,
}

impl RateBaseResults {
    /// The revenue requirement in each year
    pub fn annual_revenue_requirements(&self) -> Vec<f64> {
        self.annual.iter().map(|row| row.revenue_requirement).collect()
    }
}

/// Straight-line book depreciation for each year of the analysis (zero after the book life)
pub fn book_depreciation_schedule(gross_plant: f64, book_life: u32, years: u32) -> Vec<f64> {
    if book_life == 0 {
        return vec![0.0; years as usize];
    }

    let annual = gross_plant / book_life as f64;
    (1..=years)
        .map(|year| if year <= book_life { annual } else { 0.0 })
        .collect()
}

/// Tax depreciation for each year of the analysis.
///
/// Bonus depreciation is taken in year 1 and the remaining basis follows the MACRS table. The
/// schedule is truncated or zero-padded to `years`.
pub fn tax_depreciation_schedule(
    depreciable_basis: f64,
    macrs_class: MacrsClass,
    years: u32,
    bonus_pct: f64,
) -> Vec<f64> {
    let mut schedule = vec![0.0; years as usize];
    let bonus = depreciable_basis * bonus_pct;
    let remaining = depreciable_basis - bonus;
    if let Some(first) = schedule.first_mut() {
        *first = bonus;
    }

    for (value, pct) in schedule.iter_mut().zip(macrs_class.schedule()) {
        *value += remaining * pct;
    }

    schedule
}

/// Accumulated deferred income taxes at the end of each year, floored at zero
pub fn adit_schedule(book: &[f64], tax: &[f64], composite_tax_rate: f64) -> Vec<f64> {
    let mut cumulative = 0.0;
    book.iter()
        .zip(tax)
        .map(|(book, tax)| {
            cumulative += (tax - book) * composite_tax_rate;
            cumulative.max(0.0)
        })
        .collect()
}

/// Calculate the revenue requirement schedule for a capital asset
pub fn compute_revenue_requirement(inputs: &RateBaseInputs) -> Result<RateBaseResults> {
    inputs.validate()?;

    let coc = &inputs.cost_of_capital;
    let years = inputs.analysis_years;
    let gross_plant = inputs.gross_plant;
    let itc_amount = gross_plant * inputs.itc_rate;
    let tax_basis = if inputs.itc_basis_reduction {
        gross_plant - itc_amount * ITC_BASIS_REDUCTION_SHARE
    } else {
        gross_plant
    };

    let book = book_depreciation_schedule(gross_plant, inputs.book_life_years, years);
    let tax = tax_depreciation_schedule(
        tax_basis,
        inputs.macrs_class,
        years,
        inputs.bonus_depreciation_pct,
    );
    let composite_tax = coc.composite_tax_rate();
    let adit = adit_schedule(&book, &tax, composite_tax);
    debug!(
        "Revenue requirement for ${gross_plant:.0} plant over {years} years \
        (composite tax rate {composite_tax:.4})"
    );

    let mut annual = Vec::with_capacity(years as usize);
    let mut accumulated_book = 0.0;
    let mut accumulated_tax = 0.0;
    for (idx, ((&book, &tax), &adit)) in book.iter().zip(&tax).zip(&adit).enumerate() {
        accumulated_book += book;
        accumulated_tax += tax;

        let net_rate_base = (gross_plant - accumulated_book - adit).max(0.0);
        let return_on_rate_base = net_rate_base * coc.ror;

        let equity_return = net_rate_base * coc.equity_ratio * coc.roe;
        let deferred_tax_expense = (tax - book) * composite_tax;
        let income_tax_expense = if composite_tax < 1.0 {
            equity_return * composite_tax / (1.0 - composite_tax)
        } else {
            0.0
        } - deferred_tax_expense;

        let property_tax_expense =
            (gross_plant - accumulated_book).max(0.0) * coc.property_tax_rate;
        let om_expense = inputs.annual_om;
        let revenue_requirement =
            return_on_rate_base + book + income_tax_expense + property_tax_expense + om_expense;

        annual.push(AnnualRateBase {
            year: idx as u32 + 1,
            gross_plant,
            book_depreciation: book,
            accumulated_book_depreciation: accumulated_book,
            tax_depreciation: tax,
            accumulated_tax_depreciation: accumulated_tax,
            deferred_tax_expense,
            adit,
            net_rate_base,
            return_on_rate_base,
            income_tax_expense,
            property_tax_expense,
            om_expense,
            revenue_requirement,
        });
    }

    let requirements: Vec<f64> = annual.iter().map(|row| row.revenue_requirement).collect();
    Ok(RateBaseResults {
        total_revenue_requirement: requirements.iter().sum(),
        levelized_revenue_requirement: levelise(&requirements, coc.ror),
        itc_amount,
        total_book_depreciation: book.iter().sum(),
        total_tax_depreciation: tax.iter().sum(),
        annual,
    })
}

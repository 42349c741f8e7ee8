use chrono::NaiveDate;
use serde::Serialize;

/// Everything a single projection needs. One value in, one plan out; nothing
/// persists between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetirementInput {
    pub birth_date: NaiveDate,
    pub retirement_age: u32,
    /// Optional explicit retirement year. When it disagrees with
    /// `birth_date + retirement_age` the plan carries a [`YearMismatch`]
    /// advisory instead of failing.
    pub retirement_year: Option<i32>,
    /// Annual return as a fraction (0.06 = 6%). Floored at -1.0.
    pub annual_return_rate: f64,
    /// Candidate monthly contribution scenarios, evaluated independently and
    /// reported in this order.
    pub monthly_contributions: Vec<f64>,
    pub initial_savings: f64,
    /// The "now" instant the whole projection is relative to. Explicit so
    /// identical inputs always produce identical plans.
    pub reference_now: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    /// Index into `RetirementInput::monthly_contributions`; stable per input order.
    pub id: usize,
    pub monthly_contribution: f64,
    pub future_value: f64,
    pub total_contributed: f64,
    pub interest_earned: f64,
}

/// Advisory carried on the plan when the caller-supplied retirement year
/// disagrees with the year implied by birth date + retirement age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearMismatch {
    pub expected: i32,
    pub provided: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementPlan {
    pub target_date: NaiveDate,
    pub expected_retirement_year: i32,
    pub months_to_retirement: u32,
    pub duration_years: u32,
    pub duration_months: u32,
    pub monthly_rate: f64,
    pub current_age: i32,
    pub year_mismatch: Option<YearMismatch>,
    pub scenarios: Vec<ScenarioResult>,
}

/// One month on the balance trajectory used for charting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub month_index: u32,
    pub date: NaiveDate,
    pub balance: f64,
    pub contributed_to_date: f64,
    pub is_retirement_month: bool,
}

/// One row of the quick calculator: a fixed-rate projection at a milestone age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneProjection {
    pub age: u32,
    pub target_date: NaiveDate,
    pub months_remaining: u32,
    pub future_value: f64,
    pub total_contributed: f64,
    pub interest_earned: f64,
}

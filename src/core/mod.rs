mod calendar;
mod error;
mod projection;
mod types;

pub use calendar::{
    add_months, add_years, age_in_years, checked_add_years, days_in_month, is_leap_year,
    months_between, parse_date, year_to_age,
};
pub use error::PlanError;
pub use projection::{
    MAX_RETIREMENT_AGE, QUICK_ANNUAL_RATE, QUICK_MILESTONE_AGES, annual_to_monthly_rate,
    build_timeline, future_value_of_annuity, quick_milestones, simulate_plan,
};
pub use types::{
    MilestoneProjection, RetirementInput, RetirementPlan, ScenarioResult, TimelinePoint,
    YearMismatch,
};

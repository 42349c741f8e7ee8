use thiserror::Error;

/// Everything that can make a retirement projection non-simulatable.
///
/// Validation walks every input field in one pass and reports the complete
/// list, so a caller can surface all problems at once.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("date must match YYYY-MM-DD and be a real calendar date: {0}")]
    MalformedDate(String),

    #[error("birth date {birth} is after the reference date {reference}")]
    FutureBirthDate {
        birth: chrono::NaiveDate,
        reference: chrono::NaiveDate,
    },

    #[error(
        "retirement age {age} must be greater than the current age {current_age} and at most {}",
        super::projection::MAX_RETIREMENT_AGE
    )]
    InvalidAge { age: u32, current_age: i32 },

    #[error("retirement year {year} precedes the earliest allowed year {min_year}")]
    InvalidYear { year: i32, min_year: i32 },

    #[error("annual return rate {0} must be finite and at least -100%")]
    InvalidRate(f64),

    #[error("monthly contribution {value} (scenario {index}) must be a positive finite amount")]
    InvalidContribution { index: usize, value: f64 },

    #[error("no monthly contribution scenarios were supplied")]
    NoContributions,

    #[error("initial savings {0} must be finite and non-negative")]
    InvalidInitialSavings(f64),

    #[error("computed retirement date {target} is not after the reference date {reference}")]
    PastTargetDate {
        target: chrono::NaiveDate,
        reference: chrono::NaiveDate,
    },

    #[error("scenario index {index} is out of range for {count} scenarios")]
    ScenarioOutOfRange { index: usize, count: usize },
}

impl PlanError {
    /// Stable machine-readable tag, used by the JSON API error list.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::MalformedDate(_) => "malformedDate",
            PlanError::FutureBirthDate { .. } => "futureBirthDate",
            PlanError::InvalidAge { .. } => "invalidAge",
            PlanError::InvalidYear { .. } => "invalidYear",
            PlanError::InvalidRate(_) => "invalidRate",
            PlanError::InvalidContribution { .. } => "invalidContribution",
            PlanError::NoContributions => "invalidContribution",
            PlanError::InvalidInitialSavings(_) => "invalidInitialSavings",
            PlanError::PastTargetDate { .. } => "pastTargetDate",
            PlanError::ScenarioOutOfRange { .. } => "scenarioOutOfRange",
        }
    }
}

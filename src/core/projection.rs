use chrono::{Datelike, NaiveDate};

use super::calendar::{add_months, add_years, age_in_years, checked_add_years, months_between};
use super::error::PlanError;
use super::types::{
    MilestoneProjection, RetirementInput, RetirementPlan, ScenarioResult, TimelinePoint,
    YearMismatch,
};

/// Fixed annual rate used by the quick calculator.
pub const QUICK_ANNUAL_RATE: f64 = 0.10;

/// Milestone ages evaluated by the quick calculator.
pub const QUICK_MILESTONE_AGES: [u32; 4] = [50, 55, 60, 65];

/// Ceiling on an acceptable retirement age. Anything above it is a typo, and
/// bounding it keeps every derived target year representable as a date.
pub const MAX_RETIREMENT_AGE: u32 = 150;

/// Convert an annual rate to the equivalent monthly compounding rate via the
/// geometric conversion `(1 + annual)^(1/12) - 1`.
///
/// Zero and small negative annual rates are fine; anything non-finite or
/// below the -100% floor is rejected.
pub fn annual_to_monthly_rate(annual_rate: f64) -> Result<f64, PlanError> {
    if !annual_rate.is_finite() || annual_rate < -1.0 {
        return Err(PlanError::InvalidRate(annual_rate));
    }
    Ok((1.0 + annual_rate).powf(1.0 / 12.0) - 1.0)
}

/// Future value of an ordinary annuity: `periods` end-of-month payments of
/// `payment`, each compounding at `monthly_rate` for the months that remain
/// after it is made.
///
/// A zero rate degenerates to `payment * periods` (the compound formula has a
/// division-by-zero singularity there). Zero periods yields 0: no time left
/// to save is a result, not an error.
pub fn future_value_of_annuity(payment: f64, monthly_rate: f64, periods: u32) -> f64 {
    if periods == 0 {
        return 0.0;
    }
    if monthly_rate == 0.0 {
        return payment * f64::from(periods);
    }
    payment * ((1.0 + monthly_rate).powi(periods as i32) - 1.0) / monthly_rate
}

/// Run the full projection: validate, derive the target date, and evaluate
/// every contribution scenario.
///
/// Validation is one pass over all fields; the complete list of problems
/// comes back at once. A returned plan is always fully populated, never a
/// partial success.
pub fn simulate_plan(input: &RetirementInput) -> Result<RetirementPlan, Vec<PlanError>> {
    let errors = validate(input);
    if !errors.is_empty() {
        return Err(errors);
    }

    let target_date = add_years(input.birth_date, input.retirement_age as i32);
    let months_to_retirement = months_between(input.reference_now, target_date);
    let expected_retirement_year = target_date.year();

    let year_mismatch = input.retirement_year.and_then(|provided| {
        (provided != expected_retirement_year).then_some(YearMismatch {
            expected: expected_retirement_year,
            provided,
        })
    });

    // Cannot fail: the rate was vetted during validation.
    let monthly_rate = annual_to_monthly_rate(input.annual_return_rate).map_err(|e| vec![e])?;

    let scenarios = input
        .monthly_contributions
        .iter()
        .enumerate()
        .map(|(id, &monthly_contribution)| {
            let future_value =
                future_value_of_annuity(monthly_contribution, monthly_rate, months_to_retirement);
            let total_contributed = monthly_contribution * f64::from(months_to_retirement);
            ScenarioResult {
                id,
                monthly_contribution,
                future_value,
                total_contributed,
                interest_earned: future_value - total_contributed,
            }
        })
        .collect();

    Ok(RetirementPlan {
        target_date,
        expected_retirement_year,
        months_to_retirement,
        duration_years: months_to_retirement / 12,
        duration_months: months_to_retirement % 12,
        monthly_rate,
        current_age: age_in_years(input.reference_now, input.birth_date),
        year_mismatch,
        scenarios,
    })
}

/// Month-by-month balance trajectory for one scenario of an already-computed
/// plan, for charting.
///
/// Month 0 is the reference date holding `initial_savings`; each later month
/// compounds the balance and then adds the end-of-month contribution. The
/// month equal to `months_to_retirement` is tagged as the retirement month.
pub fn build_timeline(
    input: &RetirementInput,
    plan: &RetirementPlan,
    scenario: usize,
) -> Result<Vec<TimelinePoint>, PlanError> {
    let Some(result) = plan.scenarios.get(scenario) else {
        return Err(PlanError::ScenarioOutOfRange {
            index: scenario,
            count: plan.scenarios.len(),
        });
    };

    let contribution = result.monthly_contribution;
    let mut balance = input.initial_savings;
    let mut contributed_to_date = 0.0;
    let mut points = Vec::with_capacity(plan.months_to_retirement as usize + 1);

    for month_index in 0..=plan.months_to_retirement {
        if month_index > 0 {
            balance = balance * (1.0 + plan.monthly_rate) + contribution;
            contributed_to_date += contribution;
        }
        points.push(TimelinePoint {
            month_index,
            date: add_months(input.reference_now, month_index),
            balance,
            contributed_to_date,
            is_retirement_month: month_index == plan.months_to_retirement,
        });
    }

    Ok(points)
}

/// The "quick calculator": one contribution amount projected at a fixed 10%
/// annual return to the fixed milestone ages 50/55/60/65.
///
/// A degenerate special case of the general engine, so it is built from the
/// same calendar and annuity primitives rather than its own math. Milestones
/// already reached project to a future value of 0.
pub fn quick_milestones(
    birth_date: NaiveDate,
    reference_now: NaiveDate,
    monthly_contribution: f64,
) -> Result<Vec<MilestoneProjection>, Vec<PlanError>> {
    let mut errors = Vec::new();
    if birth_date > reference_now {
        errors.push(PlanError::FutureBirthDate {
            birth: birth_date,
            reference: reference_now,
        });
    }
    if !monthly_contribution.is_finite() || monthly_contribution <= 0.0 {
        errors.push(PlanError::InvalidContribution {
            index: 0,
            value: monthly_contribution,
        });
    }
    let last_age = QUICK_MILESTONE_AGES[QUICK_MILESTONE_AGES.len() - 1];
    if checked_add_years(birth_date, last_age as i32).is_none() {
        errors.push(PlanError::InvalidAge {
            age: last_age,
            current_age: age_in_years(reference_now, birth_date),
        });
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let monthly_rate = annual_to_monthly_rate(QUICK_ANNUAL_RATE).map_err(|e| vec![e])?;

    Ok(QUICK_MILESTONE_AGES
        .iter()
        .map(|&age| {
            let target_date = add_years(birth_date, age as i32);
            let months_remaining = months_between(reference_now, target_date);
            let future_value =
                future_value_of_annuity(monthly_contribution, monthly_rate, months_remaining);
            let total_contributed = monthly_contribution * f64::from(months_remaining);
            MilestoneProjection {
                age,
                target_date,
                months_remaining,
                future_value,
                total_contributed,
                interest_earned: future_value - total_contributed,
            }
        })
        .collect())
}

fn validate(input: &RetirementInput) -> Vec<PlanError> {
    let mut errors = Vec::new();

    if input.birth_date > input.reference_now {
        errors.push(PlanError::FutureBirthDate {
            birth: input.birth_date,
            reference: input.reference_now,
        });
    }

    let current_age = age_in_years(input.reference_now, input.birth_date);
    if input.retirement_age == 0
        || input.retirement_age > MAX_RETIREMENT_AGE
        || i64::from(input.retirement_age) <= i64::from(current_age)
    {
        errors.push(PlanError::InvalidAge {
            age: input.retirement_age,
            current_age,
        });
    }

    if let Some(year) = input.retirement_year {
        let min_year = input.birth_date.year().max(input.reference_now.year());
        if year < min_year {
            errors.push(PlanError::InvalidYear { year, min_year });
        }
    }

    if !input.annual_return_rate.is_finite() || input.annual_return_rate < -1.0 {
        errors.push(PlanError::InvalidRate(input.annual_return_rate));
    }

    if input.monthly_contributions.is_empty() {
        errors.push(PlanError::NoContributions);
    }
    for (index, &value) in input.monthly_contributions.iter().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            errors.push(PlanError::InvalidContribution { index, value });
        }
    }

    if !input.initial_savings.is_finite() || input.initial_savings < 0.0 {
        errors.push(PlanError::InvalidInitialSavings(input.initial_savings));
    }

    // Only meaningful once the age itself passed; otherwise a bogus age would
    // drag a second, derived error along with it.
    if errors.is_empty() {
        match checked_add_years(input.birth_date, input.retirement_age as i32) {
            Some(target_date) if months_between(input.reference_now, target_date) == 0 => {
                errors.push(PlanError::PastTargetDate {
                    target: target_date,
                    reference: input.reference_now,
                });
            }
            Some(_) => {}
            // Birth dates near the edge of the representable range can still
            // push a bounded age past it.
            None => errors.push(PlanError::InvalidAge {
                age: input.retirement_age,
                current_age,
            }),
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn sample_input() -> RetirementInput {
        RetirementInput {
            birth_date: date(1990, 6, 15),
            retirement_age: 65,
            retirement_year: None,
            annual_return_rate: 0.06,
            monthly_contributions: vec![200.0, 500.0, 1_000.0],
            initial_savings: 10_000.0,
            reference_now: date(2024, 6, 15),
        }
    }

    #[test]
    fn monthly_rate_geometric_conversion() {
        assert_approx(annual_to_monthly_rate(0.0).expect("valid rate"), 0.0);
        let rate = annual_to_monthly_rate(0.06).expect("valid rate");
        assert_approx_tol(rate, 0.004868, 1e-6);
        // Twelve months of compounding recovers the annual rate.
        assert_approx((1.0 + rate).powi(12) - 1.0, 0.06);
        // Negative rates above the floor are allowed.
        assert!(annual_to_monthly_rate(-0.05).expect("valid rate") < 0.0);
    }

    #[test]
    fn monthly_rate_rejects_non_finite_and_below_floor() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -1.5] {
            assert!(matches!(
                annual_to_monthly_rate(bad),
                Err(PlanError::InvalidRate(_))
            ));
        }
    }

    #[test]
    fn annuity_zero_rate_degenerates_to_sum_of_payments() {
        assert_approx(future_value_of_annuity(500.0, 0.0, 120), 60_000.0);
        assert_approx(future_value_of_annuity(1.0, 0.0, 1), 1.0);
    }

    #[test]
    fn annuity_zero_periods_is_zero() {
        assert_approx(future_value_of_annuity(500.0, 0.005, 0), 0.0);
        assert_approx(future_value_of_annuity(500.0, 0.0, 0), 0.0);
        assert_approx(future_value_of_annuity(0.0, -0.001, 0), 0.0);
    }

    #[test]
    fn annuity_compound_formula() {
        // One period: a single end-of-period payment earns no interest.
        assert_approx(future_value_of_annuity(100.0, 0.01, 1), 100.0);
        // Two periods: the first payment compounds once.
        assert_approx(future_value_of_annuity(100.0, 0.01, 2), 100.0 * 1.01 + 100.0);
    }

    #[test]
    fn plan_matches_worked_example() {
        // birth 1990-06-15, reference 2024-06-15, age 65.
        let plan = simulate_plan(&sample_input()).expect("valid input");
        assert_eq!(plan.current_age, 34);
        assert_eq!(plan.target_date, date(2055, 6, 15));
        assert_eq!(plan.expected_retirement_year, 2055);
        assert_eq!(plan.months_to_retirement, 372);
        assert_eq!(plan.duration_years, 31);
        assert_eq!(plan.duration_months, 0);
        assert_eq!(plan.year_mismatch, None);
        assert_eq!(plan.scenarios.len(), 3);
    }

    #[test]
    fn plan_zero_rate_scenario_earns_no_interest() {
        let mut input = sample_input();
        input.annual_return_rate = 0.0;
        input.monthly_contributions = vec![500.0];
        input.retirement_age = 44; // 120 months from the reference date
        let plan = simulate_plan(&input).expect("valid input");
        assert_eq!(plan.months_to_retirement, 120);
        assert_approx(plan.scenarios[0].future_value, 60_000.0);
        assert_approx(plan.scenarios[0].total_contributed, 60_000.0);
        assert_approx(plan.scenarios[0].interest_earned, 0.0);
    }

    #[test]
    fn plan_six_percent_thirty_years() {
        // 300/month at 6% annual for 360 months, geometric monthly rate.
        let input = RetirementInput {
            birth_date: date(1994, 6, 15),
            retirement_age: 60,
            retirement_year: None,
            annual_return_rate: 0.06,
            monthly_contributions: vec![300.0],
            initial_savings: 0.0,
            reference_now: date(2024, 6, 15),
        };
        let plan = simulate_plan(&input).expect("valid input");
        assert_eq!(plan.months_to_retirement, 360);
        assert_approx_tol(plan.monthly_rate, 0.004868, 1e-6);

        let scenario = &plan.scenarios[0];
        let expected_fv = 300.0 * (1.06_f64.powi(30) - 1.0) / plan.monthly_rate;
        assert_approx_tol(scenario.future_value, expected_fv, 1e-6);
        assert_approx_tol(scenario.future_value, 292_352.0, 50.0);
        assert_approx(scenario.total_contributed, 108_000.0);
        assert_approx(
            scenario.interest_earned,
            scenario.future_value - 108_000.0,
        );
    }

    #[test]
    fn plan_year_mismatch_is_advisory() {
        let mut input = sample_input();
        input.birth_date = date(1986, 5, 20);
        input.retirement_age = 65; // implies 2051
        input.retirement_year = Some(2050);
        let plan = simulate_plan(&input).expect("mismatch must not fail");
        assert_eq!(
            plan.year_mismatch,
            Some(YearMismatch {
                expected: 2051,
                provided: 2050,
            })
        );
    }

    #[test]
    fn plan_matching_year_carries_no_advisory() {
        let mut input = sample_input();
        input.retirement_year = Some(2055);
        let plan = simulate_plan(&input).expect("valid input");
        assert_eq!(plan.year_mismatch, None);
    }

    #[test]
    fn plan_is_deterministic() {
        let input = sample_input();
        let first = simulate_plan(&input).expect("valid input");
        let second = simulate_plan(&input).expect("valid input");
        assert_eq!(first, second);
    }

    #[test]
    fn target_date_equal_to_reference_is_rejected() {
        // Exactly on the 65th birthday: no months remain, and the retirement
        // age is no longer strictly ahead of the current age. Never a
        // degenerate zero-month success.
        let mut input = sample_input();
        input.reference_now = date(2055, 6, 15);
        let errors = simulate_plan(&input).expect_err("must reject");
        assert!(!errors.is_empty());
        assert!(errors.iter().all(|e| matches!(
            e,
            PlanError::InvalidAge { .. } | PlanError::PastTargetDate { .. }
        )));
    }

    #[test]
    fn absurd_retirement_age_is_rejected() {
        // Well-typed but nonsensical ages must come back as errors, not blow
        // up computing a target year no date can hold.
        let mut input = sample_input();
        input.retirement_age = 500_000;
        let errors = simulate_plan(&input).expect_err("must reject");
        assert_eq!(
            errors,
            vec![PlanError::InvalidAge {
                age: 500_000,
                current_age: 34,
            }]
        );

        input.retirement_age = MAX_RETIREMENT_AGE + 1;
        assert!(simulate_plan(&input).is_err());
        input.retirement_age = MAX_RETIREMENT_AGE;
        assert!(simulate_plan(&input).is_ok());
    }

    #[test]
    fn birth_date_at_calendar_edge_is_rejected() {
        // A bounded age can still push the target year past what NaiveDate
        // represents when the birth date itself sits at the edge.
        let mut input = sample_input();
        input.birth_date = NaiveDate::MAX;
        input.reference_now = NaiveDate::MAX;
        let errors = simulate_plan(&input).expect_err("must reject");
        assert!(errors
            .iter()
            .any(|e| matches!(e, PlanError::InvalidAge { .. })));

        let errors = quick_milestones(NaiveDate::MAX, NaiveDate::MAX, 400.0)
            .expect_err("must reject");
        assert!(errors
            .iter()
            .any(|e| matches!(e, PlanError::InvalidAge { age: 65, .. })));
    }

    #[test]
    fn past_target_date_without_other_errors() {
        // Age 35 is above the current age 34, but the target lands within the
        // same month as the reference, so no whole month remains.
        let input = RetirementInput {
            birth_date: date(1990, 6, 20),
            retirement_age: 35,
            retirement_year: None,
            annual_return_rate: 0.05,
            monthly_contributions: vec![100.0],
            initial_savings: 0.0,
            reference_now: date(2025, 5, 25),
        };
        let errors = simulate_plan(&input).expect_err("must reject");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], PlanError::PastTargetDate { .. }));
    }

    #[test]
    fn validation_reports_every_problem_at_once() {
        let input = RetirementInput {
            birth_date: date(2050, 1, 1),
            retirement_age: 0,
            retirement_year: Some(1900),
            annual_return_rate: f64::NAN,
            monthly_contributions: vec![0.0, -5.0, f64::INFINITY],
            initial_savings: -1.0,
            reference_now: date(2024, 6, 15),
        };
        let errors = simulate_plan(&input).expect_err("must reject");
        let kinds: Vec<&str> = errors.iter().map(PlanError::kind).collect();
        assert!(kinds.contains(&"futureBirthDate"));
        assert!(kinds.contains(&"invalidAge"));
        assert!(kinds.contains(&"invalidYear"));
        assert!(kinds.contains(&"invalidRate"));
        assert!(kinds.contains(&"invalidInitialSavings"));
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, PlanError::InvalidContribution { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn empty_contribution_list_is_rejected() {
        let mut input = sample_input();
        input.monthly_contributions = Vec::new();
        let errors = simulate_plan(&input).expect_err("must reject");
        assert_eq!(errors, vec![PlanError::NoContributions]);
    }

    #[test]
    fn timeline_shape_and_retirement_tag() {
        let input = sample_input();
        let plan = simulate_plan(&input).expect("valid input");
        let timeline = build_timeline(&input, &plan, 1).expect("scenario exists");

        assert_eq!(timeline.len(), plan.months_to_retirement as usize + 1);
        assert_eq!(timeline[0].month_index, 0);
        assert_eq!(timeline[0].date, input.reference_now);
        assert_approx(timeline[0].balance, input.initial_savings);
        assert_approx(timeline[0].contributed_to_date, 0.0);
        assert!(!timeline[0].is_retirement_month);

        let last = timeline.last().expect("non-empty");
        assert_eq!(last.month_index, plan.months_to_retirement);
        assert_eq!(last.date, plan.target_date);
        assert!(last.is_retirement_month);
        assert!(timeline.iter().filter(|p| p.is_retirement_month).count() == 1);
    }

    #[test]
    fn timeline_zero_rate_is_linear() {
        let mut input = sample_input();
        input.annual_return_rate = 0.0;
        input.monthly_contributions = vec![500.0];
        let plan = simulate_plan(&input).expect("valid input");
        let timeline = build_timeline(&input, &plan, 0).expect("scenario exists");

        for point in &timeline {
            let months = f64::from(point.month_index);
            assert_approx(point.balance, input.initial_savings + 500.0 * months);
            assert_approx(point.contributed_to_date, 500.0 * months);
        }
        let last = timeline.last().expect("non-empty");
        assert_approx(
            last.balance,
            input.initial_savings + plan.scenarios[0].future_value,
        );
    }

    #[test]
    fn timeline_rejects_out_of_range_scenario() {
        let input = sample_input();
        let plan = simulate_plan(&input).expect("valid input");
        assert!(matches!(
            build_timeline(&input, &plan, 3),
            Err(PlanError::ScenarioOutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn quick_milestones_cover_fixed_ages() {
        let milestones =
            quick_milestones(date(1990, 6, 15), date(2024, 6, 15), 400.0).expect("valid");
        assert_eq!(
            milestones.iter().map(|m| m.age).collect::<Vec<_>>(),
            vec![50, 55, 60, 65]
        );
        // 10% annual, geometric monthly rate, evaluated with the same annuity.
        let rate = annual_to_monthly_rate(QUICK_ANNUAL_RATE).expect("valid rate");
        for m in &milestones {
            assert_approx_tol(
                m.future_value,
                future_value_of_annuity(400.0, rate, m.months_remaining),
                1e-9,
            );
            assert!(m.months_remaining > 0);
        }
        // Future values grow with the horizon.
        assert!(milestones[0].future_value < milestones[3].future_value);
    }

    #[test]
    fn quick_milestones_past_age_projects_to_zero() {
        // Born 1970: ages 50 and 55 are already behind a 2024 reference.
        let milestones =
            quick_milestones(date(1970, 1, 10), date(2024, 6, 15), 400.0).expect("valid");
        assert_approx(milestones[0].future_value, 0.0);
        assert_approx(milestones[1].future_value, 0.0);
        assert!(milestones[2].future_value > 0.0);
        assert!(milestones[3].future_value > 0.0);
    }

    #[test]
    fn quick_milestones_validates_inputs() {
        let errors = quick_milestones(date(2050, 1, 1), date(2024, 6, 15), -5.0)
            .expect_err("must reject");
        assert_eq!(errors.len(), 2);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn scenario_order_mirrors_input_order(
            contributions in proptest::collection::vec(1.0f64..10_000.0, 1..8),
        ) {
            let mut input = sample_input();
            input.monthly_contributions = contributions.clone();
            let plan = simulate_plan(&input).expect("valid input");
            prop_assert_eq!(plan.scenarios.len(), contributions.len());
            for (i, scenario) in plan.scenarios.iter().enumerate() {
                prop_assert_eq!(scenario.id, i);
                prop_assert_eq!(scenario.monthly_contribution, contributions[i]);
            }
        }

        #[test]
        fn zero_rate_annuity_equals_payment_times_periods(
            payment in 0.01f64..100_000.0,
            periods in 1u32..1_200,
        ) {
            let fv = future_value_of_annuity(payment, 0.0, periods);
            let expected = payment * f64::from(periods);
            prop_assert!((fv - expected).abs() <= expected * 1e-12);
        }

        #[test]
        fn interest_earned_is_the_residual(
            payment in 1.0f64..5_000.0,
            annual_rate in -0.2f64..0.3,
        ) {
            let mut input = sample_input();
            input.annual_return_rate = annual_rate;
            input.monthly_contributions = vec![payment];
            let plan = simulate_plan(&input).expect("valid input");
            let s = &plan.scenarios[0];
            prop_assert_eq!(s.interest_earned, s.future_value - s.total_contributed);
        }
    }
}

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Datelike, NaiveDate, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    MilestoneProjection, PlanError, RetirementInput, RetirementPlan, TimelinePoint,
    build_timeline, parse_date, quick_milestones, simulate_plan, year_to_age,
};

/// Request body/query for `/api/simulate`.
///
/// `monthly_contributions` is the JSON-friendly list; `contributions` is the
/// query-string-friendly alternative, a `;`-separated list of amounts that
/// accepts either decimal separator ("250;500,50").
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulatePayload {
    #[serde(alias = "birth_date")]
    birth_date: String,
    #[serde(alias = "retirement_age")]
    retirement_age: Option<u32>,
    #[serde(alias = "retirement_year")]
    retirement_year: Option<i32>,
    #[serde(alias = "annual_return_percent")]
    annual_return_percent: f64,
    #[serde(alias = "monthly_contributions")]
    monthly_contributions: Option<Vec<f64>>,
    contributions: Option<String>,
    #[serde(alias = "initial_savings")]
    initial_savings: Option<f64>,
    #[serde(alias = "reference_date")]
    reference_date: Option<String>,
    #[serde(alias = "include_timelines")]
    include_timelines: Option<bool>,
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Retirement savings projector (annuity future value + monthly timeline)"
)]
struct Cli {
    #[arg(long, help = "Birth date as YYYY-MM-DD")]
    birth_date: String,
    #[arg(long, help = "Target retirement age; derived from --retirement-year when omitted")]
    retirement_age: Option<u32>,
    #[arg(long, help = "Target retirement year; advisory when it disagrees with the age")]
    retirement_year: Option<i32>,
    #[arg(
        long,
        help = "Expected annual return in percent, e.g. 6 or 5,5 (comma or dot decimals)"
    )]
    annual_return_rate: String,
    #[arg(
        long = "monthly-contribution",
        required = true,
        help = "Candidate monthly contribution; repeat the flag for multiple scenarios"
    )]
    monthly_contribution: Vec<String>,
    #[arg(long, default_value = "0", help = "Savings already set aside today")]
    initial_savings: String,
    #[arg(
        long,
        help = "Override the reference date (YYYY-MM-DD); defaults to today in UTC"
    )]
    reference_date: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg quick",
    about = "Quick calculator: fixed 10% return projected to ages 50/55/60/65"
)]
struct QuickCli {
    #[arg(long, help = "Birth date as YYYY-MM-DD")]
    birth_date: String,
    #[arg(long, help = "Monthly contribution (comma or dot decimals)")]
    monthly: String,
    #[arg(
        long,
        help = "Override the reference date (YYYY-MM-DD); defaults to today in UTC"
    )]
    reference_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioTimeline {
    scenario: usize,
    points: Vec<TimelinePoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    #[serde(flatten)]
    plan: RetirementPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    timelines: Option<Vec<ScenarioTimeline>>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    errors: Vec<ErrorDetail>,
}

/// Parse a user-supplied amount, accepting both `1234.56` and `1234,56`.
fn parse_amount(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Resolve the retirement age: explicit age wins, otherwise derive it from
/// the explicit retirement year.
fn resolve_retirement_age(
    birth_date: NaiveDate,
    age: Option<u32>,
    year: Option<i32>,
    errors: &mut Vec<PlanError>,
) -> u32 {
    if let Some(age) = age {
        return age;
    }
    if let Some(year) = year {
        if let Some(derived) = year_to_age(birth_date, year) {
            if let Ok(age) = u32::try_from(derived) {
                return age;
            }
        }
        errors.push(PlanError::InvalidYear {
            year,
            min_year: birth_date.year(),
        });
        return 0;
    }
    errors.push(PlanError::InvalidAge {
        age: 0,
        current_age: 0,
    });
    0
}

fn input_from_payload(payload: &SimulatePayload) -> Result<RetirementInput, Vec<PlanError>> {
    let mut errors = Vec::new();

    let birth_date = parse_date(&payload.birth_date).unwrap_or_else(|| {
        errors.push(PlanError::MalformedDate(payload.birth_date.clone()));
        NaiveDate::default()
    });

    let reference_now = match &payload.reference_date {
        Some(text) => parse_date(text).unwrap_or_else(|| {
            errors.push(PlanError::MalformedDate(text.clone()));
            NaiveDate::default()
        }),
        None => today_utc(),
    };

    let mut monthly_contributions = payload.monthly_contributions.clone().unwrap_or_default();
    if let Some(list) = &payload.contributions {
        let base = monthly_contributions.len();
        for (index, piece) in list.split(';').enumerate() {
            match parse_amount(piece) {
                Some(value) => monthly_contributions.push(value),
                None => errors.push(PlanError::InvalidContribution {
                    index: base + index,
                    value: f64::NAN,
                }),
            }
        }
    }

    let retirement_age = resolve_retirement_age(
        birth_date,
        payload.retirement_age,
        payload.retirement_year,
        &mut errors,
    );

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(RetirementInput {
        birth_date,
        retirement_age,
        retirement_year: payload.retirement_year,
        annual_return_rate: payload.annual_return_percent / 100.0,
        monthly_contributions,
        initial_savings: payload.initial_savings.unwrap_or(0.0),
        reference_now,
    })
}

fn input_from_cli(cli: &Cli) -> Result<RetirementInput, Vec<PlanError>> {
    let mut errors = Vec::new();

    let birth_date = parse_date(&cli.birth_date).unwrap_or_else(|| {
        errors.push(PlanError::MalformedDate(cli.birth_date.clone()));
        NaiveDate::default()
    });

    let reference_now = match &cli.reference_date {
        Some(text) => parse_date(text).unwrap_or_else(|| {
            errors.push(PlanError::MalformedDate(text.clone()));
            NaiveDate::default()
        }),
        None => today_utc(),
    };

    let annual_return_rate = match parse_amount(&cli.annual_return_rate) {
        Some(percent) => percent / 100.0,
        None => {
            errors.push(PlanError::InvalidRate(f64::NAN));
            0.0
        }
    };

    let mut monthly_contributions = Vec::with_capacity(cli.monthly_contribution.len());
    for (index, text) in cli.monthly_contribution.iter().enumerate() {
        match parse_amount(text) {
            Some(value) => monthly_contributions.push(value),
            None => errors.push(PlanError::InvalidContribution {
                index,
                value: f64::NAN,
            }),
        }
    }

    let initial_savings = match parse_amount(&cli.initial_savings) {
        Some(value) => value,
        None => {
            errors.push(PlanError::InvalidInitialSavings(f64::NAN));
            0.0
        }
    };

    let retirement_age = resolve_retirement_age(
        birth_date,
        cli.retirement_age,
        cli.retirement_year,
        &mut errors,
    );

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(RetirementInput {
        birth_date,
        retirement_age,
        retirement_year: cli.retirement_year,
        annual_return_rate,
        monthly_contributions,
        initial_savings,
        reference_now,
    })
}

// ── currency / table rendering ──────────────────────────────────────

/// Two-decimal currency with thousands separators: 1234567.891 → "1,234,567.89".
///
/// Magnitudes whose cent count does not fit an `i64` (and non-finite values,
/// which extreme rates can produce) fall back to scientific notation instead
/// of printing a saturated figure.
fn format_currency(value: f64) -> String {
    if !value.is_finite() || value.abs() >= 9.0e16 {
        return format!("{value:.3e}");
    }
    let total_cents = (value.abs() * 100.0).round() as i64;
    let units = total_cents / 100;
    let cents = total_cents % 100;

    let units_str = units.to_string();
    let mut grouped = String::new();
    for (i, c) in units_str.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if value < 0.0 && total_cents > 0 {
        format!("-{grouped}.{cents:02}")
    } else {
        format!("{grouped}.{cents:02}")
    }
}

fn render_plan_table(plan: &RetirementPlan) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Current age {}, retiring {} ({} months: {} years, {} months)\n",
        plan.current_age,
        plan.target_date,
        plan.months_to_retirement,
        plan.duration_years,
        plan.duration_months
    ));
    if let Some(mismatch) = plan.year_mismatch {
        out.push_str(&format!(
            "Note: requested retirement year {} differs from the computed year {}\n",
            mismatch.provided, mismatch.expected
        ));
    }
    out.push('\n');
    out.push_str(&format!(
        "{:<10} {:>16} {:>20} {:>20} {:>18}\n",
        "Scenario", "Monthly", "Total contributed", "Projected capital", "Interest earned"
    ));
    for scenario in &plan.scenarios {
        out.push_str(&format!(
            "{:<10} {:>16} {:>20} {:>20} {:>18}\n",
            format!("#{}", scenario.id + 1),
            format_currency(scenario.monthly_contribution),
            format_currency(scenario.total_contributed),
            format_currency(scenario.future_value),
            format_currency(scenario.interest_earned),
        ));
    }
    out
}

fn render_quick_table(milestones: &[MilestoneProjection]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<8} {:>12} {:>10} {:>20} {:>20} {:>18}\n",
        "Age", "Target", "Months", "Total contributed", "Projected capital", "Interest earned"
    ));
    for m in milestones {
        out.push_str(&format!(
            "{:<8} {:>12} {:>10} {:>20} {:>20} {:>18}\n",
            m.age,
            m.target_date.to_string(),
            m.months_remaining,
            format_currency(m.total_contributed),
            format_currency(m.future_value),
            format_currency(m.interest_earned),
        ));
    }
    out
}

fn report_errors(errors: &[PlanError]) {
    for error in errors {
        eprintln!("error[{}]: {error}", error.kind());
    }
}

/// Batch CLI entry point: parse flags, run one simulation, print the summary
/// table. Exits non-zero with the complete error list on invalid input.
pub fn run_plan_command(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            // clap renders its own usage/help output.
            let _ = e.print();
            return if e.use_stderr() { 2 } else { 0 };
        }
    };

    let input = match input_from_cli(&cli) {
        Ok(input) => input,
        Err(errors) => {
            report_errors(&errors);
            return 1;
        }
    };
    match simulate_plan(&input) {
        Ok(plan) => {
            print!("{}", render_plan_table(&plan));
            0
        }
        Err(errors) => {
            report_errors(&errors);
            1
        }
    }
}

/// Quick calculator entry point: fixed 10% rate, milestone ages 50/55/60/65.
pub fn run_quick_command(args: &[String]) -> i32 {
    let cli = match QuickCli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { 2 } else { 0 };
        }
    };

    let mut errors = Vec::new();
    let birth_date = parse_date(&cli.birth_date).unwrap_or_else(|| {
        errors.push(PlanError::MalformedDate(cli.birth_date.clone()));
        NaiveDate::default()
    });
    let reference_now = match &cli.reference_date {
        Some(text) => parse_date(text).unwrap_or_else(|| {
            errors.push(PlanError::MalformedDate(text.clone()));
            NaiveDate::default()
        }),
        None => today_utc(),
    };
    let monthly = match parse_amount(&cli.monthly) {
        Some(value) => value,
        None => {
            errors.push(PlanError::InvalidContribution {
                index: 0,
                value: f64::NAN,
            });
            0.0
        }
    };
    if !errors.is_empty() {
        report_errors(&errors);
        return 1;
    }

    match quick_milestones(birth_date, reference_now, monthly) {
        Ok(milestones) => {
            print!("{}", render_quick_table(&milestones));
            0
        }
        Err(errors) => {
            report_errors(&errors);
            1
        }
    }
}

// ── HTTP surface ────────────────────────────────────────────────────

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("nestegg HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn index_handler() -> Response {
    json_response(
        StatusCode::OK,
        serde_json::json!({
            "service": "nestegg",
            "endpoints": ["/api/simulate"],
        }),
    )
}

async fn not_found_handler() -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        ErrorResponse {
            errors: vec![ErrorDetail {
                kind: "notFound",
                message: "Not found".to_string(),
            }],
        },
    )
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let input = match input_from_payload(&payload) {
        Ok(input) => input,
        Err(errors) => return errors_response(&errors),
    };
    let plan = match simulate_plan(&input) {
        Ok(plan) => plan,
        Err(errors) => return errors_response(&errors),
    };

    let timelines = if payload.include_timelines.unwrap_or(false) {
        let mut all = Vec::with_capacity(plan.scenarios.len());
        for scenario in 0..plan.scenarios.len() {
            match build_timeline(&input, &plan, scenario) {
                Ok(points) => all.push(ScenarioTimeline { scenario, points }),
                Err(error) => return errors_response(&[error]),
            }
        }
        Some(all)
    } else {
        None
    };

    json_response(StatusCode::OK, SimulateResponse { plan, timelines })
}

fn errors_response(errors: &[PlanError]) -> Response {
    json_response(
        StatusCode::BAD_REQUEST,
        ErrorResponse {
            errors: errors
                .iter()
                .map(|e| ErrorDetail {
                    kind: e.kind(),
                    message: e.to_string(),
                })
                .collect(),
        },
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

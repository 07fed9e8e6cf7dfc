use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{Scenario, TargetQuantity, solve};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliTarget {
    FinalCapital,
    StartingCapital,
    InterestRate,
    Duration,
    MonthlyContribution,
}

impl From<CliTarget> for TargetQuantity {
    fn from(value: CliTarget) -> Self {
        match value {
            CliTarget::FinalCapital => TargetQuantity::FinalCapital,
            CliTarget::StartingCapital => TargetQuantity::StartingCapital,
            CliTarget::InterestRate => TargetQuantity::InterestRate,
            CliTarget::Duration => TargetQuantity::Duration,
            CliTarget::MonthlyContribution => TargetQuantity::MonthlyContribution,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiTarget {
    #[serde(alias = "finalCapital", alias = "final_capital")]
    FinalCapital,
    #[serde(alias = "startingCapital", alias = "starting_capital")]
    StartingCapital,
    #[serde(alias = "interestRate", alias = "interest_rate")]
    InterestRate,
    Duration,
    #[serde(alias = "monthlyContribution", alias = "monthly_contribution")]
    MonthlyContribution,
}

impl From<ApiTarget> for TargetQuantity {
    fn from(value: ApiTarget) -> Self {
        match value {
            ApiTarget::FinalCapital => TargetQuantity::FinalCapital,
            ApiTarget::StartingCapital => TargetQuantity::StartingCapital,
            ApiTarget::InterestRate => TargetQuantity::InterestRate,
            ApiTarget::Duration => TargetQuantity::Duration,
            ApiTarget::MonthlyContribution => TargetQuantity::MonthlyContribution,
        }
    }
}

impl From<TargetQuantity> for ApiTarget {
    fn from(value: TargetQuantity) -> Self {
        match value {
            TargetQuantity::FinalCapital => ApiTarget::FinalCapital,
            TargetQuantity::StartingCapital => ApiTarget::StartingCapital,
            TargetQuantity::InterestRate => ApiTarget::InterestRate,
            TargetQuantity::Duration => ApiTarget::Duration,
            TargetQuantity::MonthlyContribution => ApiTarget::MonthlyContribution,
        }
    }
}

/// A numeric field that also accepts text with `,` as the decimal separator,
/// the way the original form did for German input.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DecimalInput {
    Number(f64),
    Text(String),
}

impl DecimalInput {
    fn value(&self, name: &str) -> Result<f64, String> {
        match self {
            DecimalInput::Number(v) => Ok(*v),
            DecimalInput::Text(raw) => parse_decimal(raw, name),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    target: Option<ApiTarget>,
    #[serde(alias = "starting_capital")]
    starting_capital: Option<DecimalInput>,
    #[serde(alias = "interest_rate")]
    interest_rate: Option<DecimalInput>,
    duration: Option<DecimalInput>,
    #[serde(alias = "final_capital")]
    final_capital: Option<DecimalInput>,
    #[serde(alias = "monthly_contribution")]
    monthly_contribution: Option<DecimalInput>,
}

#[derive(Parser, Debug)]
#[command(
    name = "zinsrechner",
    about = "Compound interest calculator: solves one of the five savings-plan quantities from the other four"
)]
struct Cli {
    #[arg(long, value_enum, help = "Quantity to solve for")]
    target: CliTarget,
    #[arg(
        long,
        default_value = "1000",
        help = "Starting capital in €; ',' is accepted as decimal separator"
    )]
    starting_capital: String,
    #[arg(long, default_value = "5", help = "Annual interest rate in percent")]
    interest_rate: String,
    #[arg(long, default_value = "10", help = "Duration in years")]
    duration: String,
    #[arg(long, help = "Final capital in €; required unless it is the target")]
    final_capital: Option<String>,
    #[arg(long, default_value = "50", help = "Monthly contribution in €")]
    monthly_contribution: String,
}

#[derive(Debug, Clone, Copy)]
struct SolveRequest {
    target: TargetQuantity,
    scenario: Scenario,
}

#[derive(Debug, Default, Clone, Copy)]
struct FieldValues {
    starting_capital: Option<f64>,
    interest_rate: Option<f64>,
    duration: Option<f64>,
    final_capital: Option<f64>,
    monthly_contribution: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    target: ApiTarget,
    value: Option<f64>,
    formatted: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn parse_decimal(raw: &str, name: &str) -> Result<f64, String> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| format!("invalid value '{raw}' for {name}"))
}

fn resolve_input(
    target: TargetQuantity,
    quantity: TargetQuantity,
    value: Option<f64>,
    default: Option<f64>,
    name: &str,
) -> Result<f64, String> {
    // The target's own field is ignored by the dispatch.
    if target == quantity {
        return Ok(0.0);
    }
    value
        .or(default)
        .ok_or_else(|| format!("{name} is required when it is not the target"))
}

fn build_request(target: TargetQuantity, fields: FieldValues) -> Result<SolveRequest, String> {
    let scenario = Scenario {
        starting_capital: resolve_input(
            target,
            TargetQuantity::StartingCapital,
            fields.starting_capital,
            Some(1000.0),
            "starting capital",
        )?,
        annual_rate_pct: resolve_input(
            target,
            TargetQuantity::InterestRate,
            fields.interest_rate,
            Some(5.0),
            "interest rate",
        )?,
        duration_years: resolve_input(
            target,
            TargetQuantity::Duration,
            fields.duration,
            Some(10.0),
            "duration",
        )?,
        final_capital: resolve_input(
            target,
            TargetQuantity::FinalCapital,
            fields.final_capital,
            None,
            "final capital",
        )?,
        monthly_contribution: resolve_input(
            target,
            TargetQuantity::MonthlyContribution,
            fields.monthly_contribution,
            Some(50.0),
            "monthly contribution",
        )?,
    };

    let request = SolveRequest { target, scenario };
    validate_request(&request)?;
    Ok(request)
}

fn validate_request(request: &SolveRequest) -> Result<(), String> {
    let scenario = &request.scenario;
    for (name, value) in [
        ("starting capital", scenario.starting_capital),
        ("interest rate", scenario.annual_rate_pct),
        ("duration", scenario.duration_years),
        ("final capital", scenario.final_capital),
        ("monthly contribution", scenario.monthly_contribution),
    ] {
        if !value.is_finite() {
            return Err(format!("{name} must be a finite number"));
        }
    }

    if scenario.starting_capital < 0.0 {
        return Err("starting capital must be >= 0".to_string());
    }
    if scenario.duration_years < 0.0 {
        return Err("duration must be >= 0".to_string());
    }
    if scenario.monthly_contribution < 0.0 {
        return Err("monthly contribution must be >= 0".to_string());
    }

    Ok(())
}

fn format_result(target: TargetQuantity, value: f64) -> String {
    match target {
        TargetQuantity::FinalCapital => format!("Final capital: €{value:.2}"),
        TargetQuantity::StartingCapital => format!("Starting capital: €{value:.2}"),
        TargetQuantity::InterestRate => format!("Interest rate: {value:.4}% p.a."),
        TargetQuantity::Duration => format!("Duration: {value:.1} years"),
        TargetQuantity::MonthlyContribution => format!("Monthly contribution: €{value:.2}"),
    }
}

fn not_found_message(target: TargetQuantity) -> &'static str {
    match target {
        TargetQuantity::InterestRate => {
            "The interest rate could not be determined within the 0-100% search range."
        }
        TargetQuantity::Duration => {
            "The duration could not be determined within the 200-year search horizon."
        }
        _ => "No solution found.",
    }
}

fn request_from_cli(cli: Cli) -> Result<SolveRequest, String> {
    let target: TargetQuantity = cli.target.into();
    let fields = FieldValues {
        starting_capital: Some(parse_decimal(&cli.starting_capital, "starting capital")?),
        interest_rate: Some(parse_decimal(&cli.interest_rate, "interest rate")?),
        duration: Some(parse_decimal(&cli.duration, "duration")?),
        final_capital: cli
            .final_capital
            .as_deref()
            .map(|raw| parse_decimal(raw, "final capital"))
            .transpose()?,
        monthly_contribution: Some(parse_decimal(
            &cli.monthly_contribution,
            "monthly contribution",
        )?),
    };
    build_request(target, fields)
}

pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let request = request_from_cli(cli)?;

    match solve(request.target, &request.scenario) {
        Some(value) => {
            println!("{}", format_result(request.target, value));
            Ok(())
        }
        None => Err(not_found_message(request.target).to_string()),
    }
}

fn request_from_payload(payload: SolvePayload) -> Result<SolveRequest, String> {
    let target: TargetQuantity = payload
        .target
        .ok_or_else(|| "missing 'target'".to_string())?
        .into();

    let fields = FieldValues {
        starting_capital: decimal_field(payload.starting_capital.as_ref(), "starting capital")?,
        interest_rate: decimal_field(payload.interest_rate.as_ref(), "interest rate")?,
        duration: decimal_field(payload.duration.as_ref(), "duration")?,
        final_capital: decimal_field(payload.final_capital.as_ref(), "final capital")?,
        monthly_contribution: decimal_field(
            payload.monthly_contribution.as_ref(),
            "monthly contribution",
        )?,
    };
    build_request(target, fields)
}

fn decimal_field(value: Option<&DecimalInput>, name: &str) -> Result<Option<f64>, String> {
    value.map(|v| v.value(name)).transpose()
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/solve", get(solve_get_handler).post(solve_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Zinsrechner HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/solve");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn solve_get_handler(Query(payload): Query<SolvePayload>) -> Response {
    solve_handler_impl(payload).await
}

async fn solve_post_handler(Json(payload): Json<SolvePayload>) -> Response {
    solve_handler_impl(payload).await
}

async fn solve_handler_impl(payload: SolvePayload) -> Response {
    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let outcome = solve(request.target, &request.scenario);
    let response = SolveResponse {
        target: request.target.into(),
        value: outcome,
        formatted: outcome.map(|value| format_result(request.target, value)),
        message: match outcome {
            Some(_) => None,
            None => Some(not_found_message(request.target).to_string()),
        },
    };
    json_response(StatusCode::OK, response)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn solve_request_from_json(json: &str) -> Result<SolveRequest, String> {
    let payload = serde_json::from_str::<SolvePayload>(json)
        .map_err(|e| format!("Invalid JSON payload: {e}"))?;
    request_from_payload(payload)
}

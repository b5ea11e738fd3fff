use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    FeeImpactError, Result, ScenarioInputs, SummaryMetrics, YearPoint, simulate, summarize,
    validate,
};
use crate::report::{key_takeaways, render_summary, render_table};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

/// Longest horizon accepted from the command line or the HTTP API.
pub const MAX_YEARS: u32 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_investment: Option<f64>,
    market_return: Option<f64>,
    index_expense_ratio: Option<f64>,
    active_expense_ratio: Option<f64>,
    aum_fee: Option<f64>,
    years: Option<u32>,
}

/// Scenario flags. Rates are given in percent, as on the dashboard sliders.
#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(
        long,
        default_value_t = 100000.0,
        help = "Starting balance invested in both strategies"
    )]
    pub initial_investment: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        allow_hyphen_values = true,
        help = "Expected annual market return in percent"
    )]
    pub market_return: f64,
    #[arg(
        long,
        default_value_t = 0.03,
        help = "Index fund expense ratio in percent"
    )]
    pub index_expense_ratio: f64,
    #[arg(
        long,
        default_value_t = 0.5,
        help = "Active fund expense ratio in percent"
    )]
    pub active_expense_ratio: f64,
    #[arg(long, default_value_t = 1.5, help = "Advisor AUM fee in percent")]
    pub aum_fee: f64,
    #[arg(long, default_value_t = 30, help = "Investment duration in years")]
    pub years: u32,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[arg(long, help = "Print the full JSON response instead of a table")]
    pub json: bool,
    #[arg(
        long,
        default_value_t = 5,
        help = "Show every Nth year in the table (the final year is always shown)"
    )]
    pub every: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    inputs: ScenarioInputs,
    summary: SummaryMetrics,
    takeaways: Vec<String>,
    timeline: Vec<YearPoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(args: ScenarioArgs) -> Result<ScenarioInputs> {
    if args.years > MAX_YEARS {
        return Err(FeeImpactError::invalid(format!("--years must be <= {MAX_YEARS}")));
    }

    let percents = [
        ("--market-return", args.market_return),
        ("--index-expense-ratio", args.index_expense_ratio),
        ("--active-expense-ratio", args.active_expense_ratio),
        ("--aum-fee", args.aum_fee),
    ];
    for (flag, value) in percents {
        if !value.is_finite() {
            return Err(FeeImpactError::invalid(format!("{flag} must be a finite number")));
        }
    }

    let inputs = ScenarioInputs {
        initial_investment: args.initial_investment,
        market_return: args.market_return / 100.0,
        index_expense_ratio: args.index_expense_ratio / 100.0,
        active_expense_ratio: args.active_expense_ratio / 100.0,
        aum_fee: args.aum_fee / 100.0,
        years: args.years,
    };
    validate(&inputs)?;
    Ok(inputs)
}

/// Runs the `compare` command and returns the text to print.
pub fn run_compare(args: CompareArgs) -> Result<String> {
    let inputs = build_inputs(args.scenario)?;
    let response = build_simulate_response(inputs);

    if args.json {
        return Ok(serde_json::to_string_pretty(&response)?);
    }

    let mut out = render_summary(&response.inputs, &response.summary);
    out.push('\n');
    out.push_str(&render_table(&response.timeline, args.every));
    Ok(out)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "fee impact HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    payload: std::result::Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_handler_impl(payload),
        Err(rejection) => malformed_request(&rejection.body_text()),
    }
}

async fn simulate_post_handler(
    payload: std::result::Result<Json<SimulatePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_handler_impl(payload),
        Err(rejection) => malformed_request(&rejection.body_text()),
    }
}

fn malformed_request(detail: &str) -> Response {
    warn!(detail, "malformed simulation request");
    error_response(
        StatusCode::BAD_REQUEST,
        &format!("Invalid simulation request: {detail}"),
    )
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(e) => {
            warn!(error = %e, "rejected simulation request");
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    debug!(
        initial_investment = inputs.initial_investment,
        market_return = inputs.market_return,
        years = inputs.years,
        "running simulation"
    );
    json_response(StatusCode::OK, build_simulate_response(inputs))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
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
fn inputs_from_json(json: &str) -> Result<ScenarioInputs> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| FeeImpactError::invalid(format!("Invalid API JSON payload: {e}")))?;
    inputs_from_payload(payload)
}

fn inputs_from_payload(payload: SimulatePayload) -> Result<ScenarioInputs> {
    let mut args = default_args_for_api();

    if let Some(v) = payload.initial_investment {
        args.initial_investment = v;
    }
    if let Some(v) = payload.market_return {
        args.market_return = v;
    }
    if let Some(v) = payload.index_expense_ratio {
        args.index_expense_ratio = v;
    }
    if let Some(v) = payload.active_expense_ratio {
        args.active_expense_ratio = v;
    }
    if let Some(v) = payload.aum_fee {
        args.aum_fee = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }

    build_inputs(args)
}

fn default_args_for_api() -> ScenarioArgs {
    ScenarioArgs {
        initial_investment: 100_000.0,
        market_return: 8.0,
        index_expense_ratio: 0.03,
        active_expense_ratio: 0.5,
        aum_fee: 1.5,
        years: 30,
    }
}

fn build_simulate_response(inputs: ScenarioInputs) -> SimulateResponse {
    let timeline = simulate(&inputs);
    let summary = summarize(&timeline);
    SimulateResponse {
        takeaways: key_takeaways(&inputs, &summary),
        inputs,
        summary,
        timeline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> ScenarioArgs {
        default_args_for_api()
    }

    #[test]
    fn build_inputs_converts_percent_flags() {
        let inputs = build_inputs(sample_args()).expect("valid inputs");

        assert_approx(inputs.initial_investment, 100_000.0);
        assert_approx(inputs.market_return, 0.08);
        assert_approx(inputs.index_expense_ratio, 0.0003);
        assert_approx(inputs.active_expense_ratio, 0.005);
        assert_approx(inputs.aum_fee, 0.015);
        assert_eq!(inputs.years, 30);
    }

    #[test]
    fn api_defaults_match_core_defaults() {
        let inputs = build_inputs(sample_args()).expect("valid inputs");
        let core = ScenarioInputs::default();

        assert_approx(inputs.market_return, core.market_return);
        assert_approx(inputs.index_expense_ratio, core.index_expense_ratio);
        assert_approx(inputs.active_expense_ratio, core.active_expense_ratio);
        assert_approx(inputs.aum_fee, core.aum_fee);
        assert_eq!(inputs.years, core.years);
    }

    #[test]
    fn build_inputs_rejects_zero_years() {
        let mut args = sample_args();
        args.years = 0;

        let err = build_inputs(args).expect_err("must reject zero years");
        assert!(err.to_string().contains("years must be >= 1"));
    }

    #[test]
    fn build_inputs_rejects_horizon_beyond_limit() {
        let mut args = sample_args();
        args.years = MAX_YEARS + 1;

        let err = build_inputs(args).expect_err("must reject long horizon");
        assert!(err.to_string().contains("--years"));
    }

    #[test]
    fn build_inputs_rejects_non_positive_investment() {
        let mut args = sample_args();
        args.initial_investment = 0.0;

        let err = build_inputs(args).expect_err("must reject zero investment");
        assert!(err.to_string().contains("initial investment"));
    }

    #[test]
    fn build_inputs_rejects_non_finite_rate() {
        let mut args = sample_args();
        args.market_return = f64::NAN;

        let err = build_inputs(args).expect_err("must reject NaN");
        assert!(err.to_string().contains("--market-return"));
    }

    #[test]
    fn inputs_from_json_overlays_web_keys() {
        let json = r#"{
          "initialInvestment": 250000,
          "marketReturn": 6.5,
          "aumFee": 1,
          "years": 40
        }"#;
        let inputs = inputs_from_json(json).expect("json should parse");

        assert_approx(inputs.initial_investment, 250_000.0);
        assert_approx(inputs.market_return, 0.065);
        assert_approx(inputs.aum_fee, 0.01);
        assert_approx(inputs.index_expense_ratio, 0.0003);
        assert_approx(inputs.active_expense_ratio, 0.005);
        assert_eq!(inputs.years, 40);
    }

    #[test]
    fn inputs_from_json_rejects_bad_payload() {
        let err = inputs_from_json(r#"{"years": "many"}"#).expect_err("must reject");
        assert!(err.to_string().contains("Invalid API JSON payload"));
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let response = build_simulate_response(ScenarioInputs::default());
        assert_eq!(response.timeline.len(), 31);

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"timeline\""));
        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"indexValue\""));
        assert!(json.contains("\"activeFeesCumulative\""));
        assert!(json.contains("\"percentDifference\""));
        assert!(json.contains("\"feeDelta\""));
        assert!(json.contains("\"aumFee\""));
    }

    #[test]
    fn undefined_percent_serializes_as_null() {
        let inputs = ScenarioInputs {
            initial_investment: 1_000.0,
            market_return: -1.0,
            index_expense_ratio: 0.0,
            active_expense_ratio: 0.0,
            aum_fee: 0.0,
            years: 1,
        };
        let json = serde_json::to_string(&build_simulate_response(inputs))
            .expect("response should serialize");
        assert!(json.contains("\"percentDifference\":null"));
    }

    #[test]
    fn run_compare_renders_table_and_summary() {
        let args = CompareArgs {
            scenario: sample_args(),
            json: false,
            every: 10,
        };
        let out = run_compare(args).expect("valid run");

        assert!(out.contains("After 30 years"));
        assert!(out.contains("Active fees"));
        assert!(out.lines().any(|line| line.trim_start().starts_with("30 ")));
    }

    #[test]
    fn run_compare_json_is_parseable() {
        let args = CompareArgs {
            scenario: sample_args(),
            json: true,
            every: 5,
        };
        let out = run_compare(args).expect("valid run");
        let value: serde_json::Value = serde_json::from_str(&out).expect("valid json");

        assert_eq!(value["timeline"].as_array().map(Vec::len), Some(31));
        assert_eq!(value["summary"]["years"], 30);
    }

    struct RouterReply {
        status: StatusCode,
        cache_control: Option<String>,
        content_type: Option<String>,
        body: String,
    }

    async fn send(request: Request<Body>) -> RouterReply {
        let response = router()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let header_text = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let cache_control = header_text(header::CACHE_CONTROL);
        let content_type = header_text(header::CONTENT_TYPE);
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        RouterReply {
            status,
            cache_control,
            content_type,
            body: String::from_utf8(bytes.to_vec()).expect("utf-8 body"),
        }
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request")
    }

    fn post_json(uri: &str, json: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("valid request")
    }

    fn json_body(reply: &RouterReply) -> serde_json::Value {
        serde_json::from_str(&reply.body).expect("body should be JSON")
    }

    #[tokio::test]
    async fn router_get_simulate_returns_timeline() {
        let reply = send(get_request(
            "/api/simulate?initialInvestment=50000&marketReturn=7&years=20",
        ))
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.cache_control.as_deref(), Some("no-store"));
        assert_eq!(reply.content_type.as_deref(), Some("application/json"));
        let value = json_body(&reply);
        assert_eq!(value["timeline"].as_array().map(Vec::len), Some(21));
        assert_eq!(value["inputs"]["initialInvestment"], 50_000.0);
        assert_eq!(value["takeaways"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn router_post_simulate_overlays_defaults() {
        let reply = send(post_json("/api/simulate", r#"{"years": 10, "aumFee": 1}"#)).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.cache_control.as_deref(), Some("no-store"));
        let value = json_body(&reply);
        assert_eq!(value["summary"]["years"], 10);
        assert_eq!(value["inputs"]["aumFee"], 0.01);
    }

    #[tokio::test]
    async fn router_rejects_invalid_value_as_json() {
        let reply = send(get_request("/api/simulate?years=0")).await;

        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.cache_control.as_deref(), Some("no-store"));
        let value = json_body(&reply);
        assert_eq!(value["error"], "Invalid input: years must be >= 1");
    }

    #[tokio::test]
    async fn router_rejects_empty_query_field_as_json() {
        let reply = send(get_request(
            "/api/simulate?initialInvestment=&marketReturn=8&years=30",
        ))
        .await;

        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.cache_control.as_deref(), Some("no-store"));
        assert_eq!(reply.content_type.as_deref(), Some("application/json"));
        let value = json_body(&reply);
        let error = value["error"].as_str().expect("error message");
        assert!(error.starts_with("Invalid simulation request"));
    }

    #[tokio::test]
    async fn router_rejects_mistyped_json_body_as_json() {
        let reply = send(post_json("/api/simulate", r#"{"years": "many"}"#)).await;

        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.cache_control.as_deref(), Some("no-store"));
        let value = json_body(&reply);
        assert!(value["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn router_unknown_path_is_json_not_found() {
        let reply = send(get_request("/nope")).await;

        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.cache_control.as_deref(), Some("no-store"));
        assert_eq!(json_body(&reply)["error"], "Not found");
    }

    #[tokio::test]
    async fn router_serves_static_assets() {
        let index = send(get_request("/")).await;
        assert_eq!(index.status, StatusCode::OK);
        assert_eq!(index.cache_control.as_deref(), Some("no-store"));
        assert!(index.body.contains("Fee Impact Calculator"));

        let script = send(get_request("/app.js")).await;
        assert_eq!(
            script.content_type.as_deref(),
            Some("application/javascript; charset=utf-8")
        );

        let styles = send(get_request("/styles.css")).await;
        assert_eq!(
            styles.content_type.as_deref(),
            Some("text/css; charset=utf-8")
        );
    }
}

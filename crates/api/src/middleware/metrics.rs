//! Prometheus exporter, HTTP request metrics and invite-code counters.

use std::sync::OnceLock;
use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const HTTP_REQUESTS: &str = "sri_http_requests_total";
const HTTP_DURATION: &str = "sri_http_request_duration_seconds";

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Counts every request by route template, method and status class, and
/// times it.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = method_label(req.method());
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());

    let response = next.run(req).await;
    let class = status_class(response.status());

    histogram!(HTTP_DURATION, "method" => method, "route" => route.clone())
        .record(started.elapsed().as_secs_f64());
    counter!(HTTP_REQUESTS, "method" => method, "route" => route, "status" => class)
        .increment(1);

    response
}

fn method_label(method: &Method) -> &'static str {
    [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ]
    .iter()
    .zip(["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
    .find_map(|(m, label)| (m == method).then_some(label))
    .unwrap_or("OTHER")
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

pub fn record_invite_codes_created(count: usize) {
    counter!("sri_invite_codes_created_total").increment(count as u64);
}

pub fn record_invite_code_consumption(consumed: bool) {
    let outcome = if consumed { "consumed" } else { "rejected" };
    counter!("sri_invite_code_consumptions_total", "outcome" => outcome).increment(1);
}

pub fn record_admin_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("sri_admin_logins_total", "outcome" => outcome).increment(1);
}

/// GET /metrics
pub async fn metrics_handler() -> Response {
    let Some(handle) = RECORDER.get() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response();
    };
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response()
}

/// Installs the global recorder once; repeated calls return `Ok`.
pub fn init_metrics() -> Result<(), BuildError> {
    if RECORDER.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_DURATION.to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("query_duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
        )?
        .install_recorder()?;

    let _ = RECORDER.set(handle);
    Ok(())
}

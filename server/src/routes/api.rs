use std::fmt::Write as _;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use choropleth_shared::{IndicatorType, RecordKey};

use crate::catalog::{self, Resource};
use crate::config::MAX_SLUG_LEN;
use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "data_dir_present": state.data_dir.is_dir(),
        "cached_payloads": state.payload_cache.len(),
        "started_at": state.started_at.to_rfc3339(),
        "observability": {
            "data_requests_total": observability.data_requests_total,
            "cache_hits_total": observability.cache_hits_total,
            "cache_misses_total": observability.cache_misses_total,
            "not_found_total": observability.not_found_total,
            "bad_requests_total": observability.bad_requests_total,
            "read_failures_total": observability.read_failures_total,
        }
    }))
}

pub async fn get_indicators(
    State(state): State<AppState>,
    Path(indicator_type): Path<String>,
) -> Result<Response, StatusCode> {
    state.observability.record_data_request();
    let indicator_type = checked_slug(&state, &indicator_type)?;
    serve(
        &state,
        Resource::Indicators(IndicatorType::from_slug(indicator_type)),
    )
    .await
}

pub async fn get_record(
    State(state): State<AppState>,
    Path((period, region, indicator)): Path<(String, String, String)>,
) -> Result<Response, StatusCode> {
    state.observability.record_data_request();
    let key = RecordKey::new(
        checked_slug(&state, &period)?,
        checked_slug(&state, &region)?,
        checked_slug(&state, &indicator)?,
    );
    serve(&state, Resource::Record(key)).await
}

pub async fn get_geometry(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Result<Response, StatusCode> {
    state.observability.record_data_request();
    let region = checked_slug(&state, &region)?;
    serve(&state, Resource::Geometry(region.to_string())).await
}

pub async fn get_children(
    State(state): State<AppState>,
    Path(parent): Path<String>,
) -> Result<Response, StatusCode> {
    state.observability.record_data_request();
    let parent = checked_slug(&state, &parent)?;
    serve(&state, Resource::Children(parent.to_string())).await
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus_metrics(
        state.payload_cache.len(),
        state.data_dir.is_dir(),
        state.observability.snapshot(),
    );

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

async fn serve(state: &AppState, resource: Resource) -> Result<Response, StatusCode> {
    let body = catalog::load(state, &resource).await?;
    Ok(json_bytes_response(body, resource.cache_control()))
}

fn render_prometheus_metrics(
    cached_payloads: usize,
    data_dir_present: bool,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP choropleth_cached_payloads Current number of payloads held in memory."
    );
    let _ = writeln!(body, "# TYPE choropleth_cached_payloads gauge");
    let _ = writeln!(body, "choropleth_cached_payloads {cached_payloads}");

    let _ = writeln!(
        body,
        "# HELP choropleth_data_dir_present Whether the data directory exists (1 or 0)."
    );
    let _ = writeln!(body, "# TYPE choropleth_data_dir_present gauge");
    let _ = writeln!(
        body,
        "choropleth_data_dir_present {}",
        u8::from(data_dir_present)
    );

    let counters = [
        (
            "choropleth_data_requests_total",
            "Total requests to the data endpoints.",
            observability.data_requests_total,
        ),
        (
            "choropleth_cache_hits_total",
            "Total payloads served from memory.",
            observability.cache_hits_total,
        ),
        (
            "choropleth_cache_misses_total",
            "Total payloads looked up on disk.",
            observability.cache_misses_total,
        ),
        (
            "choropleth_not_found_total",
            "Total lookups for payloads that do not exist.",
            observability.not_found_total,
        ),
        (
            "choropleth_bad_requests_total",
            "Total requests rejected for malformed path segments.",
            observability.bad_requests_total,
        ),
        (
            "choropleth_read_failures_total",
            "Total payloads that could not be read or decoded.",
            observability.read_failures_total,
        ),
    ];
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }

    body
}

fn checked_slug<'a>(state: &AppState, slug: &'a str) -> Result<&'a str, StatusCode> {
    normalize_slug(slug).inspect_err(|_| state.observability.record_bad_request())
}

/// Path segments become file names under the data directory, so anything that could escape it is refused.
fn normalize_slug(slug: &str) -> Result<&str, StatusCode> {
    let trimmed = slug.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_SLUG_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    if trimmed == "." || trimmed.contains("..") {
        return Err(StatusCode::BAD_REQUEST);
    }

    if trimmed
        .chars()
        .any(|ch| ch.is_control() || matches!(ch, '/' | '\\'))
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    Ok(trimmed)
}

fn json_bytes_response(body: Bytes, cache_control: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    response
}

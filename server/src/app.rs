use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let map_images = Router::new()
        .fallback_service(ServeDir::new(state.maps_dir()))
        .layer(middleware::from_fn(set_map_cache_control));

    let app = Router::new()
        .route(
            "/api/malaria/indicators/{indicator_type}",
            axum::routing::get(routes::api::get_indicators),
        )
        .route(
            "/api/data/{period}/{region}/{indicator}",
            axum::routing::get(routes::api::get_record),
        )
        .route(
            "/api/malaria/geojson/{region}",
            axum::routing::get(routes::api::get_geometry),
        )
        .route(
            "/api/entities/getchildren/{parent}",
            axum::routing::get(routes::api::get_children),
        )
        .route("/api/health", axum::routing::get(routes::api::health))
        .route("/api/metrics", axum::routing::get(routes::api::metrics))
        .nest_service("/maps", map_images)
        .layer(CompressionLayer::new());

    let app = if state.cors_allow_any {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
    } else {
        app
    };

    app.with_state(state)
}

async fn set_map_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

/// Exported map images are regenerated under the same name, so they only get a day.
fn cache_control_for_path(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension().and_then(|ext| ext.to_str())?;
    if ext.eq_ignore_ascii_case("png") {
        return Some(crate::config::MAP_IMAGE_CACHE_CONTROL);
    }
    None
}

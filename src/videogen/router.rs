use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    app_state::AppState,
    config::{AppConfig, StorageMode},
    consts::REQUEST_BODY_LIMIT,
    videogen::handlers,
};

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "VideoGen", description = "Text-to-video generation API"),
    )
)]
struct ApiDoc;

/// Generation, status and health routes
pub fn videogen_router<S>(state: Arc<AppState>) -> OpenApiRouter<S> {
    OpenApiRouter::new()
        .routes(routes!(handlers::generate_video))
        .routes(routes!(handlers::get_video_status))
        .routes(routes!(handlers::health_check))
        .layer(RequestBodyLimitLayer::new(REQUEST_BODY_LIMIT))
        .with_state(state)
}

/// Full HTTP surface: API routes at the root and under `/api`, swagger,
/// and the generated-video directory in file mode.
pub fn app_router(state: Arc<AppState>) -> Router {
    let (api_router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(videogen_router(state.clone()))
        .nest("/api", videogen_router(state.clone()))
        .split_for_parts();

    let mut router = Router::new()
        .route("/", get(handlers::service_info))
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api));

    if state.config.storage_mode == StorageMode::File {
        let prefix = state.config.static_url_prefix.trim_end_matches('/');
        let files = ServeDir::new(&state.config.static_dir);
        router = if prefix.is_empty() {
            router.fallback_service(files)
        } else {
            router.nest_service(prefix, files)
        };
    }

    router.layer(cors_layer(&state.config))
}

fn cors_layer(conf: &AppConfig) -> CorsLayer {
    if conf.cors_allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = conf
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

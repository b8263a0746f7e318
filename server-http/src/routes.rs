use crate::handlers::{self, Endpoint};
use crate::state::AppState;
use axum::{
    Router,
    http::HeaderValue,
    routing::{MethodRouter, get},
};
use shared::config::Config;
use tower::Layer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build and configure the application router
pub fn build_router(state: AppState, config: &Config) -> Router {
    let mut router = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/up", get(handlers::up));

    // Lookup routes
    for endpoint in Endpoint::ALL {
        let mut method_router: MethodRouter<AppState> = match endpoint {
            Endpoint::Countries => get(handlers::list_countries),
            Endpoint::Regions => get(handlers::list_regions),
            Endpoint::Cities => get(handlers::list_cities),
            Endpoint::TimeTable => get(handlers::list_time_table),
        };
        if config.allow_invalidation {
            method_router = method_router.delete(handlers::invalidate_entry);
        }
        router = router.route(endpoint.path(), method_router);
    }

    router
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

/// Router wrapped so trailing slashes are trimmed before routing
pub fn build_app(state: AppState, config: &Config) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state, config))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}

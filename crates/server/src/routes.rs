//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let database_routes = Router::new()
        .route(
            "/api/database/databases",
            get(handlers::list_datasets).post(handlers::create_dataset),
        )
        .route("/api/database/append-rows", post(handlers::append_rows))
        .route(
            "/api/database/upload-csv",
            post(handlers::upload_csv).layer(DefaultBodyLimit::max(
                state.config.server.max_upload_bytes,
            )),
        )
        .route(
            "/api/database/confirm-password",
            post(handlers::confirm_password),
        )
        .route("/api/database/{sheet_id}", get(handlers::get_tab_data));

    let api_routes = Router::new()
        .route("/api", get(handlers::hello))
        // Health check (unauthenticated for load balancers)
        .route("/api/health", get(handlers::health_check))
        .route("/api/auth/login", post(handlers::login))
        // Department administration (requires a verified identity)
        .route(
            "/api/super-admin/departments",
            get(handlers::list_departments),
        )
        .route(
            "/api/super-admin/department/{id}",
            put(handlers::rename_department),
        );

    let mut router = Router::new().merge(api_routes).merge(database_routes);

    // SECURITY: When enabled, this endpoint MUST be network-restricted.
    // See crate::metrics module documentation for details.
    if state.config.server.metrics_enabled {
        let metrics_routes = Router::new().route("/metrics", get(metrics_handler));
        router = router.merge(metrics_routes);
    }

    router
        // Auth middleware (verifies bearer tokens and sets AuthenticatedIdentity)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

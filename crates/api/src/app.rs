use axum::{
    extract::DefaultBodyLimit,
    http::HeaderName,
    middleware,
    routing::{get, patch, post},
    Router,
};
use shared::session::SessionSigner;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::extractors::client_id::CLIENT_ID_HEADER;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{admin, admin_invite_codes, health, invite_codes};
use crate::services::BackendSelector;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backends: Arc<BackendSelector>,
    pub sessions: SessionSigner,
    /// Present only when the remote backend is connected
    pub pool: Option<PgPool>,
}

pub fn create_app(
    config: Config,
    backends: BackendSelector,
    sessions: SessionSigner,
    pool: Option<PgPool>,
) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        config: config.clone(),
        backends: Arc::new(backends),
        sessions,
        pool,
    };

    let exposed = [HeaderName::from_static(CLIENT_ID_HEADER)];
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed)
    };

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler))
        .route(
            "/api/v1/invite-codes/validate",
            post(invite_codes::validate_invite_code),
        )
        .route(
            "/api/v1/invite-codes/consume",
            post(invite_codes::consume_invite_code),
        )
        .route("/api/v1/invite-codes/mine", get(invite_codes::my_invite_code));

    // Admin account routes; login and setup are unauthenticated, the rest use AdminAuth
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/setup",
            get(admin::setup_status).post(admin::setup_first_admin),
        )
        .route("/api/v1/admin/login", post(admin::login))
        .route("/api/v1/admin/logout", post(admin::logout))
        .route("/api/v1/admin/session", get(admin::current_session))
        .route("/api/v1/admin/users", post(admin::create_admin_user));

    // Invite code management (AdminAuth extractor on every handler)
    let admin_invite_code_routes = Router::new()
        .route(
            "/api/v1/admin/invite-codes",
            get(admin_invite_codes::list_invite_codes)
                .post(admin_invite_codes::create_invite_code),
        )
        .route(
            "/api/v1/admin/invite-codes/batch",
            post(admin_invite_codes::batch_create_invite_codes),
        )
        .route(
            "/api/v1/admin/invite-codes/stats",
            get(admin_invite_codes::invite_code_stats),
        )
        .route(
            "/api/v1/admin/invite-codes/export",
            get(admin_invite_codes::export_invite_codes),
        )
        .route(
            "/api/v1/admin/invite-codes/generate",
            get(admin_invite_codes::generate_code),
        )
        .route(
            "/api/v1/admin/invite-codes/:id",
            get(admin_invite_codes::get_invite_code)
                .delete(admin_invite_codes::delete_invite_code),
        )
        .route(
            "/api/v1/admin/invite-codes/:id/status",
            patch(admin_invite_codes::update_invite_code_status),
        )
        .route(
            "/api/v1/admin/invite-codes/:id/usages",
            get(admin_invite_codes::invite_code_usages),
        );

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(admin_invite_code_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}

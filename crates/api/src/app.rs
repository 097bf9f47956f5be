use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_manager_session, require_operator_session,
    security_headers_middleware, trace_id,
};
use crate::routes::{auth, churches, health, manager, operators, public};
use crate::services::auth::{LoginFlow, ManagerCredentials, OperatorCredentials};
use crate::services::otp::InMemoryOtpStore;
use crate::services::rate_limit::InMemoryRateLimitStore;
use crate::services::{ChurchService, EmailService, MediaService, OperatorService};
use persistence::repositories::{ChurchRepository, OperatorRepository};

/// In-memory login state shared between the app and the cleanup job.
///
/// Each identity domain keeps its own code store; rate windows share one
/// table under domain-prefixed keys.
pub struct AuthStores {
    pub operator_otp: Arc<InMemoryOtpStore>,
    pub manager_otp: Arc<InMemoryOtpStore>,
    pub rate_limits: Arc<InMemoryRateLimitStore>,
}

impl AuthStores {
    pub fn new() -> Self {
        Self {
            operator_otp: Arc::new(InMemoryOtpStore::new()),
            manager_otp: Arc::new(InMemoryOtpStore::new()),
            rate_limits: Arc::new(InMemoryRateLimitStore::new()),
        }
    }
}

impl Default for AuthStores {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub operator_flow: LoginFlow,
    pub manager_flow: LoginFlow,
    pub operator_repo: OperatorRepository,
    pub operator_service: OperatorService,
    pub church_service: ChurchService,
    pub email_service: EmailService,
}

pub fn create_app(config: Config, pool: PgPool, stores: &AuthStores) -> Router {
    let config = Arc::new(config);

    let operator_repo = OperatorRepository::new(pool.clone());
    let church_repo = ChurchRepository::new(pool.clone());

    let email_service = EmailService::new(config.email.clone());
    let media_service = MediaService::new(config.media.clone());

    let operator_flow = LoginFlow::new(
        "operator",
        &config.auth.operator,
        stores.operator_otp.clone(),
        stores.rate_limits.clone(),
        Arc::new(OperatorCredentials::new(operator_repo.clone())),
        email_service.clone(),
    );
    let manager_flow = LoginFlow::new(
        "manager",
        &config.auth.manager,
        stores.manager_otp.clone(),
        stores.rate_limits.clone(),
        Arc::new(ManagerCredentials::new(church_repo.clone())),
        email_service.clone(),
    );

    let operator_service = OperatorService::new(
        operator_repo.clone(),
        email_service.clone(),
        &config.auth.primary_operator_email,
    );
    let church_service = ChurchService::new(church_repo, media_service);

    let state = AppState {
        pool,
        config: config.clone(),
        operator_flow,
        manager_flow,
        operator_repo,
        operator_service,
        church_service,
        email_service,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
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
    };

    // Operator-only routes (Bearer session token from the operator domain)
    let operator_routes = Router::new()
        .route("/api/churches", get(churches::list).post(churches::create))
        .route(
            "/api/churches/:id",
            get(churches::get)
                .put(churches::update)
                .delete(churches::delete),
        )
        .route("/api/churches/:id/logo", post(churches::upload_logo))
        .route(
            "/api/operators",
            get(operators::list).post(operators::create),
        )
        .route("/api/operators/invite", post(operators::invite))
        .route("/api/operators/:id", delete(operators::delete))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_operator_session,
        ));

    // Manager-only routes (Bearer session token from the manager domain)
    let manager_routes = Router::new()
        .route("/api/manager/churches", get(manager::list_churches))
        .route(
            "/api/manager/churches/:id",
            get(manager::get_church).put(manager::update_church),
        )
        .route("/api/manager/churches/:id/logo", post(manager::upload_logo))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_manager_session,
        ));

    // Login, setup and invite redemption (no session yet by definition)
    let auth_routes = Router::new()
        .route("/api/auth/setup", get(auth::setup_status).post(auth::setup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify-otp", post(auth::verify_otp))
        .route("/api/manager/login", post(manager::login))
        .route("/api/manager/verify-otp", post(manager::verify_otp))
        .route("/api/operators/invite/check", get(operators::check_invite))
        .route(
            "/api/operators/accept-invite",
            post(operators::accept_invite),
        );

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/public/churches/:public_id", get(public::get_church))
        .route("/api/get-started", post(public::get_started))
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(operator_routes)
        .merge(manager_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware)) // Security headers
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .with_state(state)
}

/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasqar_api::{app::AppState, config::Config};
/// use tasqar_shared::email::LogMailer;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(LogMailer));
/// let app = tasqar_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::security::{add_security_headers, SecurityHeaders},
    routes,
};
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn_with_state, map_response_with_state},
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tasqar_shared::{
    auth::middleware::{jwt_auth_middleware, JwtSecret},
    email::DynMailer,
    services::invitation_service::InvitationSettings,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

/// Request span with the path only; the query string may hold `?token=`
pub fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version()
    )
}

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// JWT signing secret, also handed to the auth middleware
    pub jwt_secret: JwtSecret,

    /// Outgoing email transport
    pub mailer: DynMailer,

    /// Invitation link base URL and lifetime
    pub invitations: Arc<InvitationSettings>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, mailer: DynMailer) -> Self {
        let invitations = InvitationSettings {
            app_base_url: config.api.app_base_url.clone(),
            ttl: chrono::Duration::hours(config.invitations.ttl_hours),
        };

        Self {
            db,
            jwt_secret: JwtSecret::new(config.jwt.secret.as_str()),
            config: Arc::new(config),
            mailer,
            invitations: Arc::new(invitations),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret.as_str()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /api/
///     ├── /auth/                       # public
///     │   ├── POST /register
///     │   ├── POST /login
///     │   └── POST /refresh
///     ├── GET  /invitations/:token     # public, sign-up page lookup
///     ├── /users/                      # everything below needs a JWT
///     │   ├── GET|PATCH /me
///     │   └── GET /search?q=
///     ├── /tasks/
///     │   ├── GET|POST /
///     │   ├── PUT /reorder
///     │   └── GET|PATCH|DELETE /:id
///     ├── /projects/
///     │   ├── GET|POST /
///     │   └── GET|PATCH|DELETE /:id
///     ├── /connections/
///     │   ├── GET|POST /
///     │   ├── POST /:id/accept
///     │   └── DELETE /:id
///     ├── /notifications/
///     │   ├── GET /
///     │   ├── GET /sse                 # Server-Sent Events
///     │   ├── POST /read-all
///     │   ├── PATCH /:id/read
///     │   └── DELETE /:id
///     └── /invitations/
///         └── GET|POST /
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (protected routes only; Bearer header or `?token=`)
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/invitations/:token", get(routes::invitations::preview_invitation));

    let protected_routes = Router::new()
        .route(
            "/users/me",
            get(routes::users::get_me).patch(routes::users::update_me),
        )
        .route("/users/search", get(routes::users::search_users))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/tasks/reorder", put(routes::tasks::reorder_tasks))
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:id",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/connections",
            get(routes::connections::list_connections)
                .post(routes::connections::request_connection),
        )
        .route(
            "/connections/:id",
            delete(routes::connections::remove_connection),
        )
        .route(
            "/connections/:id/accept",
            post(routes::connections::accept_connection),
        )
        .route("/notifications", get(routes::notifications::list_notifications))
        .route("/notifications/sse", get(routes::notifications::notification_stream))
        .route(
            "/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route("/notifications/:id/read", patch(routes::notifications::mark_read))
        .route(
            "/notifications/:id",
            delete(routes::notifications::delete_notification),
        )
        .route(
            "/invitations",
            get(routes::invitations::list_invitations).post(routes::invitations::create_invitation),
        )
        .route_layer(from_fn_with_state(
            state.jwt_secret.clone(),
            jwt_auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.cors_is_permissive() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(map_response_with_state(
            SecurityHeaders::new(production),
            add_security_headers,
        ))
        .with_state(state)
}

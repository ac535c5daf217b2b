//! HTTP API for the barangay crime-report dashboard.
//!
//! # Modules
//!
//! - [`auth`]: Login, one-time code verification, logout, registration
//! - [`admin`]: Account administration
//! - [`reports`]: Crime reports and their audit trail
//! - [`audit`]: Audit log review
//! - [`tips`]: Public crime tips
//! - [`settings`]: Feature flags
//! - [`middleware`]: Session cookie resolution
//! - [`request_id`]: Request correlation, access logs and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET  /health` - Server health status
//! - `POST /auth/login` - Password login, may require a one-time code
//! - `POST /auth/verify-2fa` - Redeem the one-time code
//! - `GET  /auth/logout` - Clear the session cookie
//! - `POST /auth/register` - Bootstrap the head-admin, or create an admin (head-admin session)
//! - `POST /tips` - Submit an anonymous tip
//!
//! ## Session required (`jwt` cookie)
//! - `GET  /auth/me`, `POST /auth/change-password`
//! - `POST /admin/deleteAdmin`, `GET /admin/getAllAdmin`, `POST /admin/changeAdminEnableTwoFa`
//! - `POST /report/changeStatus`, `POST /report/create`, `GET /report/list`,
//!   `GET /report/{id}`, `POST /report/delete`, `GET /report/{id}/history`
//! - `GET  /audit/logs?limit&offset`
//! - `GET  /tips`
//! - `GET  /settings/ai`, `POST /settings/ai`
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod admin;
pub mod audit;
pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod reports;
pub mod request_id;
pub mod settings;
pub mod tips;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use barangay_watch::{
    AuditLogger, AuthManager, ReportManager, SettingsService, TipManager,
    auth::ChallengeDelivery,
    db::{
        AuditLogRepository, Database, InMemoryAuditLogRepository, InMemoryFeatureSettings,
        InMemoryReportRepository, InMemoryTipRepository, InMemoryUserRepository,
        PgAuditLogRepository, PgFeatureSettings, PgReportRepository, PgTipRepository,
        PgUserRepository, ReportRepository, TipRepository, UserRepository,
    },
    settings::FeatureSettings,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;

/// Storage behind the managers
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub audit_logs: Arc<dyn AuditLogRepository>,
    pub tips: Arc<dyn TipRepository>,
    pub settings: Arc<dyn FeatureSettings>,
}

impl Repositories {
    /// In-process storage; everything is lost on restart
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            reports: Arc::new(InMemoryReportRepository::new()),
            audit_logs: Arc::new(InMemoryAuditLogRepository::new()),
            tips: Arc::new(InMemoryTipRepository::new()),
            settings: Arc::new(InMemoryFeatureSettings::default()),
        }
    }

    /// PostgreSQL-backed storage sharing one pool
    pub fn postgres(database: &Database) -> Self {
        let pool = database.pool();
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            reports: Arc::new(PgReportRepository::new(pool.clone())),
            audit_logs: Arc::new(PgAuditLogRepository::new(pool.clone())),
            tips: Arc::new(PgTipRepository::new(pool.clone())),
            settings: Arc::new(PgFeatureSettings::new(pool.clone())),
        }
    }
}

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    pub report_manager: Arc<ReportManager>,
    pub tip_manager: Arc<TipManager>,
    pub settings: Arc<SettingsService>,
    /// `None` when running on in-memory storage
    pub database: Option<Arc<Database>>,
    pub cookie_secure: bool,
}

impl AppState {
    /// Wire the managers over `repositories` using `config`
    pub fn new(
        config: &ServerConfig,
        repositories: Repositories,
        database: Option<Arc<Database>>,
        delivery: Arc<dyn ChallengeDelivery>,
    ) -> Self {
        let auth_manager = AuthManager::with_settings(
            repositories.users,
            config.security.password_pepper.clone(),
            config.security.jwt_secret.clone(),
            config.auth.clone(),
        )
        .with_delivery(delivery);

        let audit = AuditLogger::new(repositories.audit_logs, config.audit_log_empty_updates);

        Self {
            auth_manager: Arc::new(auth_manager),
            report_manager: Arc::new(ReportManager::new(repositories.reports, audit)),
            tip_manager: Arc::new(TipManager::new(repositories.tips)),
            settings: Arc::new(SettingsService::new(repositories.settings)),
            database,
            cookie_secure: config.cookie_secure,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use bw_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify-2fa", post(auth::verify_two_factor))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/register", post(auth::register))
        .route("/tips", post(tips::submit_tip));

    // route_layer keeps unknown paths at 404 instead of 401
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        .route("/admin/deleteAdmin", post(admin::delete_admin))
        .route("/admin/getAllAdmin", get(admin::get_all_admin))
        .route(
            "/admin/changeAdminEnableTwoFa",
            post(admin::change_admin_enable_two_fa),
        )
        .route("/report/changeStatus", post(reports::change_status))
        .route("/report/create", post(reports::create_report))
        .route("/report/list", get(reports::list_reports))
        .route("/report/delete", post(reports::delete_report))
        .route("/report/{id}", get(reports::get_report))
        .route("/report/{id}/history", get(reports::report_history))
        .route("/audit/logs", get(audit::list_audit_logs))
        .route("/tips", get(tips::list_tips))
        .route(
            "/settings/ai",
            get(settings::get_ai_setting).post(settings::set_ai_setting),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"1.0.0","database":"connected","timestamp":"2026-01-05T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (healthy, database) = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(()) => (true, "connected"),
            Err(e) => {
                tracing::error!("Database health check failed: {}", e);
                (false, "disconnected")
            }
        },
        None => (true, "in-memory"),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

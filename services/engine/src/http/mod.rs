//! HTTP API
//!
//! Everything is served under `/api`. Authenticated routes read a bearer
//! token from the `Authorization` header; admin routes additionally require
//! the admin role.

mod error;
mod extract;
mod routes;

pub use error::ApiError;
pub use extract::{AdminUser, CurrentUser};

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::admin::AdminService;
use crate::auth::AuthService;
use crate::records::RecordManager;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub records: Arc<RecordManager>,
    pub admin: Arc<AdminService>,
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health))
        .route("/auth/register", post(routes::register))
        .route("/auth/login", post(routes::login))
        .route("/auth/me", get(routes::me))
        .route(
            "/dns/records",
            get(routes::list_records).post(routes::create_record),
        )
        .route(
            "/dns/records/:id",
            put(routes::update_record).delete(routes::delete_record),
        )
        .route("/admin/users", get(routes::admin_users))
        .route("/admin/stats", get(routes::admin_stats))
        .route("/admin/users/:id", delete(routes::admin_delete_user))
        .route("/admin/users/:id/plan", put(routes::admin_set_plan))
        .route("/admin/users/:id/records", get(routes::admin_user_records))
        .route("/admin/records/:id", delete(routes::admin_delete_record));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Permissive when `origins` is empty or contains `*`, otherwise an allow-list
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::permissive());
    }

    let allowed = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any))
}

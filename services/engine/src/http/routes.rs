//! Route handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::extract::{AdminUser, CurrentUser};
use super::AppState;
use crate::admin::Stats;
use crate::auth::{Credentials, Plan, PublicUser, Role, Session};
use crate::records::{NewRecord, Record, RecordChanges};

pub(super) async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "ddns-engine",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============================================================================
// Accounts
// ============================================================================

pub(super) async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(credentials) = payload?;
    Ok(Json(state.auth.register(&credentials).await?))
}

pub(super) async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(credentials) = payload?;
    Ok(Json(state.auth.login(&credentials).await?))
}

/// Account details with current usage; `record_limit` is -1 when unlimited
#[derive(Debug, Serialize)]
pub(super) struct Profile {
    id: String,
    email: String,
    plan: Plan,
    role: Role,
    record_count: usize,
    record_limit: i64,
}

pub(super) async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Profile>, ApiError> {
    let usage = state.records.usage(&user).await?;
    Ok(Json(Profile {
        id: user.id,
        email: user.email,
        plan: user.plan,
        role: user.role,
        record_count: usage.record_count,
        record_limit: usage.record_limit.map_or(-1, |limit| limit as i64),
    }))
}

// ============================================================================
// DNS Records
// ============================================================================

pub(super) async fn list_records(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let records = state.records.list_records(&user.id).await?;
    Ok(Json(json!({ "records": records })))
}

pub(super) async fn create_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NewRecord>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.records.create_record(&user, request).await?))
}

pub(super) async fn update_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(record_id): Path<String>,
    payload: Result<Json<RecordChanges>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    let Json(changes) = payload?;
    let record = state
        .records
        .update_record(&user.id, &record_id, changes)
        .await?;
    Ok(Json(record))
}

pub(super) async fn delete_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(record_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.records.delete_record(&user.id, &record_id).await?;
    Ok(Json(json!({ "message": "Record deleted successfully" })))
}

// ============================================================================
// Administration
// ============================================================================

pub(super) async fn admin_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Value>, ApiError> {
    let users = state.admin.list_users().await?;
    Ok(Json(json!({ "users": users })))
}

pub(super) async fn admin_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Stats>, ApiError> {
    Ok(Json(state.admin.stats().await?))
}

#[derive(Debug, Deserialize)]
pub(super) struct PlanChange {
    plan: Plan,
}

pub(super) async fn admin_set_plan(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
    payload: Result<Json<PlanChange>, JsonRejection>,
) -> Result<Json<PublicUser>, ApiError> {
    let Json(change) = payload?;
    Ok(Json(state.admin.set_plan(&user_id, change.plan).await?))
}

pub(super) async fn admin_delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = state.admin.delete_user(&user_id).await?;
    Ok(Json(json!({
        "message": "User deleted",
        "records_removed": removed
    })))
}

pub(super) async fn admin_user_records(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let records = state.admin.user_records(&user_id).await?;
    Ok(Json(json!({ "records": records })))
}

pub(super) async fn admin_delete_record(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(record_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.admin.delete_record(&record_id).await?;
    Ok(Json(json!({ "message": "Record deleted successfully" })))
}

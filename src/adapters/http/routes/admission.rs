use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, middleware::AdminUser},
    app_error::{AppError, AppResult},
    application::use_cases::admission_ledger::PaymentIntentProfile,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MemberPayload {
    user_id: Option<Uuid>,
}

impl MemberPayload {
    fn user_id(payload: Result<Json<Self>, JsonRejection>) -> AppResult<Uuid> {
        let Json(payload) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
        payload
            .user_id
            .ok_or_else(|| AppError::InvalidInput("userId is required".into()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdmitResponse {
    activated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    raised_capacity_to: Option<i32>,
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Serialize)]
struct ListResponse<T> {
    items: Vec<T>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{event_id}/members",
            axum::routing::post(admit_member).delete(remove_member),
        )
        .route("/{event_id}/seats", get(seat_summary))
        .route("/{event_id}/reconciliations", get(list_reconciliations))
}

/// POST /api/admin/events/{event_id}/members
async fn admit_member(
    State(app_state): State<AppState>,
    admin: AdminUser,
    Path(event_id): Path<Uuid>,
    payload: Result<Json<MemberPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let user_id = MemberPayload::user_id(payload)?;
    tracing::info!(admin_id = %admin.user_id, %event_id, %user_id, "Admin admitting member");

    let result = app_state
        .manual_admission_use_cases
        .admit(event_id, user_id)
        .await?;

    Ok(Json(AdmitResponse {
        activated: result.activated,
        raised_capacity_to: result.raised_capacity_to,
    }))
}

/// DELETE /api/admin/events/{event_id}/members
async fn remove_member(
    State(app_state): State<AppState>,
    admin: AdminUser,
    Path(event_id): Path<Uuid>,
    payload: Result<Json<MemberPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let user_id = MemberPayload::user_id(payload)?;
    tracing::info!(admin_id = %admin.user_id, %event_id, %user_id, "Admin removing member");

    app_state
        .manual_admission_use_cases
        .remove(event_id, user_id)
        .await?;

    Ok(Json(OkResponse { ok: true }))
}

/// GET /api/admin/events/{event_id}/seats
async fn seat_summary(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(event_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let summary = app_state
        .manual_admission_use_cases
        .seat_summary(event_id)
        .await?;
    Ok(Json(summary))
}

/// GET /api/admin/events/{event_id}/reconciliations
async fn list_reconciliations(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(event_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let items: Vec<PaymentIntentProfile> = app_state
        .manual_admission_use_cases
        .list_reconciliations(event_id)
        .await?;
    Ok(Json(ListResponse { items }))
}

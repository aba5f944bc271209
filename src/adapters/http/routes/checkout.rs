use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, middleware::ClientIp},
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::BuyerDetails,
        use_cases::checkout::CheckoutInput,
        validators::{is_valid_email, is_valid_merchant_oid, normalize_optional},
    },
    domain::entities::payment_intent::{PaymentIntentStatus, SeatStatus},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CheckoutPayload {
    user_id: Option<Uuid>,
    club_id: Option<Uuid>,
    event_id: Option<Uuid>,
    declared_amount: Option<i64>,
    buyer_email: Option<String>,
    buyer_name: Option<String>,
    buyer_address: Option<String>,
    buyer_phone: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutStatusResponse {
    merchant_oid: String,
    status: PaymentIntentStatus,
    seat_status: SeatStatus,
}

fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::InvalidInput(format!("{field} is required")))
}

impl CheckoutPayload {
    fn into_input(self, client_ip: String) -> AppResult<CheckoutInput> {
        let user_id = required(self.user_id, "userId")?;
        let club_id = required(self.club_id, "clubId")?;
        let event_id = required(self.event_id, "eventId")?;
        let declared_amount = required(self.declared_amount, "declaredAmount")?;
        let email = required(normalize_optional(self.buyer_email), "buyerEmail")?;

        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput("buyerEmail is not a valid email".into()));
        }

        Ok(CheckoutInput {
            user_id,
            club_id,
            event_id,
            declared_amount,
            buyer: BuyerDetails {
                email,
                name: normalize_optional(self.buyer_name),
                address: normalize_optional(self.buyer_address),
                phone: normalize_optional(self.buyer_phone),
            },
            client_ip,
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(initiate_checkout))
        .route("/checkout/{merchant_oid}", get(checkout_status))
}

/// POST /api/checkout
async fn initiate_checkout(
    State(app_state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    payload: Result<Json<CheckoutPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let input = payload.into_input(client_ip)?;

    app_state
        .rate_limiter
        .check(&input.client_ip, Some(&input.buyer.email))
        .await?;

    let session = app_state.checkout_use_cases.initiate(input).await?;
    Ok(Json(session))
}

/// GET /api/checkout/{merchant_oid}
async fn checkout_status(
    State(app_state): State<AppState>,
    Path(merchant_oid): Path<String>,
) -> AppResult<impl IntoResponse> {
    if !is_valid_merchant_oid(&merchant_oid) {
        return Err(AppError::NotFound("Checkout".into()));
    }

    let intent = app_state
        .checkout_use_cases
        .get_status(&merchant_oid)
        .await?;

    Ok(Json(CheckoutStatusResponse {
        merchant_oid: intent.merchant_oid,
        status: intent.status,
        seat_status: intent.seat_status,
    }))
}

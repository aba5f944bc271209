//! Gateway payment callback.
//!
//! The gateway retries until it reads a literal `OK`, so every outcome that a
//! retry cannot change is acknowledged; only transient failures surface as 5xx.

use std::collections::HashMap;

use axum::{
    Form, Router,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::post,
};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::use_cases::payment_callback::{CallbackOutcome, PaymentCallback},
};

const ACK: &str = "OK";

pub fn router() -> Router<AppState> {
    Router::new().route("/callback", post(payment_callback))
}

/// Collect posted fields whether the gateway sent urlencoded or multipart.
async fn read_fields(app_state: &AppState, request: Request) -> Option<HashMap<String, String>> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if !is_multipart {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(request, app_state)
            .await
            .map_err(|e| tracing::warn!(error = %e, "Unreadable payment callback body"))
            .ok()?;
        return Some(fields);
    }

    let mut multipart = Multipart::from_request(request, app_state)
        .await
        .map_err(|e| tracing::warn!(error = %e, "Unreadable multipart payment callback"))
        .ok()?;

    let mut fields = HashMap::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };
                match field.text().await {
                    Ok(value) => {
                        fields.insert(name, value);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, field = %name, "Unreadable multipart field");
                        return None;
                    }
                }
            }
            Ok(None) => return Some(fields),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed multipart payment callback");
                return None;
            }
        }
    }
}

fn to_callback(mut fields: HashMap<String, String>) -> Option<PaymentCallback> {
    Some(PaymentCallback {
        merchant_oid: fields.remove("merchant_oid")?,
        status: fields.remove("status")?,
        total_amount: fields.remove("total_amount")?,
        hash: fields.remove("hash")?,
    })
}

/// POST /api/payments/callback
async fn payment_callback(
    State(app_state): State<AppState>,
    request: Request,
) -> AppResult<impl IntoResponse> {
    let Some(callback) = read_fields(&app_state, request).await.and_then(to_callback) else {
        tracing::warn!("Payment callback missing required fields");
        return Ok(ACK);
    };

    let merchant_oid = callback.merchant_oid.clone();
    let result = app_state
        .payment_callback_use_cases
        .reconcile(callback)
        .await;

    acknowledge(&merchant_oid, result)
}

/// Map a reconcile result to the gateway reply. Errors a retry cannot fix are
/// logged and acknowledged.
fn acknowledge(
    merchant_oid: &str,
    result: AppResult<CallbackOutcome>,
) -> AppResult<&'static str> {
    match result {
        Ok(CallbackOutcome::OverCapacity) => {
            tracing::warn!(%merchant_oid, "Payment needs manual seat reconciliation");
            Ok(ACK)
        }
        Ok(_) => Ok(ACK),
        Err(e) if e.is_transient() => Err(e),
        Err(e) => {
            tracing::error!(%merchant_oid, error = %e, "Payment callback failed permanently");
            Ok(ACK)
        }
    }
}

pub mod admission;
pub mod checkout;
pub mod payment_callback;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(checkout::router())
        .nest("/payments", payment_callback::router())
        .nest("/admin/events", admission::router())
}

use std::sync::Arc;

use crate::{
    application::use_cases::{
        checkout::CheckoutUseCases, manual_admission::ManualAdmissionUseCases,
        payment_callback::PaymentCallbackUseCases,
    },
    infra::{RateLimiterTrait, config::AppConfig},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub checkout_use_cases: Arc<CheckoutUseCases>,
    pub payment_callback_use_cases: Arc<PaymentCallbackUseCases>,
    pub manual_admission_use_cases: Arc<ManualAdmissionUseCases>,
    pub rate_limiter: Arc<dyn RateLimiterTrait>,
}

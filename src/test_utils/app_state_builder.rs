//! Test app state builder for HTTP-level tests.
//!
//! `TestAppStateBuilder` creates an `AppState` whose use cases all share one
//! `InMemoryAdmissionStore`, so a route test can seed fixtures and inspect the
//! ledger afterwards through `store()`.

use std::{net::SocketAddr, sync::Arc};

use axum::http::HeaderValue;
use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        admission_ledger::{ClubProfile, EventProfile, PaymentIntentProfile},
        checkout::CheckoutUseCases,
        manual_admission::ManualAdmissionUseCases,
        payment_callback::PaymentCallbackUseCases,
    },
    infra::{RateLimiterTrait, config::AppConfig},
    test_utils::{
        InMemoryAdmissionStore, InMemoryRateLimiter, RecordingNotifier, RecordingPaymentGateway,
        TEST_ADMIN_SECRET, test_gateway_config,
    },
};

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let club = create_test_club(|_| {});
/// let event = create_test_event(club.id, |e| e.capacity = Some(1));
///
/// let builder = TestAppStateBuilder::new().with_event(club, event);
/// let store = builder.store();
/// let server = TestServer::new(router().with_state(builder.build())).unwrap();
/// ```
pub struct TestAppStateBuilder {
    store: Arc<InMemoryAdmissionStore>,
    notifier: Arc<RecordingNotifier>,
    gateway: Arc<RecordingPaymentGateway>,
    rate_limiter: Option<Arc<dyn RateLimiterTrait>>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryAdmissionStore::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            gateway: Arc::new(RecordingPaymentGateway::new()),
            rate_limiter: None,
        }
    }

    pub fn with_event(self, club: ClubProfile, event: EventProfile) -> Self {
        self.store.insert_event(club, event);
        self
    }

    pub fn with_intent(self, intent: PaymentIntentProfile) -> Self {
        self.store.insert_intent(intent);
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiterTrait>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Get the shared store for assertions after requests.
    pub fn store(&self) -> Arc<InMemoryAdmissionStore> {
        self.store.clone()
    }

    pub fn notifier(&self) -> Arc<RecordingNotifier> {
        self.notifier.clone()
    }

    pub fn gateway(&self) -> Arc<RecordingPaymentGateway> {
        self.gateway.clone()
    }

    pub fn build(self) -> AppState {
        let gateway_config = test_gateway_config();

        let checkout_use_cases = Arc::new(CheckoutUseCases::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.gateway,
        ));

        let payment_callback_use_cases = Arc::new(PaymentCallbackUseCases::new(
            self.store.clone(),
            self.notifier.clone(),
            gateway_config.credentials.clone(),
        ));

        let manual_admission_use_cases = Arc::new(ManualAdmissionUseCases::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.store,
            self.notifier,
        ));

        // Forwarded headers are trusted so tests can pick the client address.
        let config = Arc::new(AppConfig {
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            database_url: String::new(),
            redis_url: String::new(),
            rate_limit_window_secs: 60,
            rate_limit_per_ip: 60,
            rate_limit_per_email: 30,
            trust_proxy: true,
            admin_jwt_secret: SecretString::new(TEST_ADMIN_SECRET.into()),
            gateway: gateway_config,
            notify_url: None,
            notify_max_attempts: 1,
        });

        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(InMemoryRateLimiter::permissive()));

        AppState {
            config,
            checkout_use_cases,
            payment_callback_use_cases,
            manual_admission_use_cases,
            rate_limiter,
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

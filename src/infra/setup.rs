use crate::{
    adapters::{gateway::HostedCheckoutGateway, http::app_state::AppState},
    application::{
        ports::notifier::AdmissionNotifier,
        use_cases::{
            admission_ledger::{AdmissionStore, CatalogRepo, MembershipRepo, PaymentIntentRepo},
            checkout::CheckoutUseCases,
            manual_admission::ManualAdmissionUseCases,
            payment_callback::PaymentCallbackUseCases,
        },
    },
    infra::{
        InfraError, RateLimiterTrait, RedisRateLimiter,
        config::AppConfig,
        notification_dispatcher::{
            HttpNotificationSink, LogNotificationSink, NotificationDispatcher, NotificationSink,
            RetryPolicy,
        },
        postgres_persistence,
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> Result<AppState, InfraError> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let rate_limiter: Arc<dyn RateLimiterTrait> = Arc::new(
        RedisRateLimiter::new(
            &config.redis_url,
            config.rate_limit_window_secs,
            config.rate_limit_per_ip,
            config.rate_limit_per_email,
        )
        .await?,
    );

    let sink: Arc<dyn NotificationSink> = match &config.notify_url {
        Some(url) => Arc::new(HttpNotificationSink::new(url.clone())),
        None => {
            tracing::warn!("NOTIFY_URL not set, admission notifications will only be logged");
            Arc::new(LogNotificationSink)
        }
    };
    let notifier: Arc<dyn AdmissionNotifier> = Arc::new(NotificationDispatcher::spawn(
        sink,
        RetryPolicy::with_attempts(config.notify_max_attempts),
    ));

    let store_arc = postgres_arc.clone() as Arc<dyn AdmissionStore>;
    let catalog_arc = postgres_arc.clone() as Arc<dyn CatalogRepo>;
    let membership_arc = postgres_arc.clone() as Arc<dyn MembershipRepo>;
    let intent_arc = postgres_arc.clone() as Arc<dyn PaymentIntentRepo>;

    let gateway = Arc::new(HostedCheckoutGateway::new(config.gateway.clone()));

    let checkout_use_cases = CheckoutUseCases::new(
        catalog_arc.clone(),
        membership_arc.clone(),
        intent_arc.clone(),
        gateway,
    );

    let payment_callback_use_cases = PaymentCallbackUseCases::new(
        store_arc.clone(),
        notifier.clone(),
        config.gateway.credentials.clone(),
    );

    let manual_admission_use_cases = ManualAdmissionUseCases::new(
        store_arc,
        catalog_arc,
        membership_arc,
        intent_arc,
        notifier,
    );

    Ok(AppState {
        config: Arc::new(config),
        checkout_use_cases: Arc::new(checkout_use_cases),
        payment_callback_use_cases: Arc::new(payment_callback_use_cases),
        manual_admission_use_cases: Arc::new(manual_admission_use_cases),
        rate_limiter,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "admission_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer);

    // File (structured JSON logs)
    match File::create("app.log") {
        Ok(file) => {
            let json_layer = fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(true)
                .with_span_list(true);
            registry.with(json_layer).try_init().ok();
        }
        Err(e) => {
            registry.try_init().ok();
            tracing::warn!(error = %e, "Cannot create app.log, JSON file logging disabled");
        }
    }
}

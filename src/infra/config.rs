use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::infra::gateway_signer::GatewayCredentials;

/// Settings for the hosted checkout gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    pub credentials: GatewayCredentials,
    /// Always ends with `/` so relative paths join beneath it.
    pub base_url: Url,
    pub currency: String,
    pub test_mode: bool,
    pub no_installment: bool,
    pub max_installment: u32,
    pub timeout_minutes: u32,
    pub ok_url: Url,
    pub fail_url: Url,
}

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    pub database_url: String,
    pub redis_url: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_per_ip: u64,
    pub rate_limit_per_email: u64,
    /// Whether to trust X-Forwarded-For headers. Set to true when behind a reverse proxy.
    /// SECURITY: the client IP is part of the gateway signature; only enable this when the
    /// API is not directly exposed to the internet.
    pub trust_proxy: bool,
    pub admin_jwt_secret: SecretString,
    pub gateway: GatewayConfig,
    /// Where admission notifications are POSTed. Unset means log only.
    pub notify_url: Option<Url>,
    pub notify_max_attempts: u32,
}

/// Ensures a base URL ends with a slash so `Url::join` keeps its path.
pub fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

impl AppConfig {
    pub fn from_env() -> Self {
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let rate_limit_window_secs: u64 = get_env_default("RATE_LIMIT_WINDOW_SECS", 60);
        let rate_limit_per_ip: u64 = get_env_default("RATE_LIMIT_PER_IP", 30);
        let rate_limit_per_email: u64 = get_env_default("RATE_LIMIT_PER_EMAIL", 10);
        // Default to false for security - must explicitly enable when behind a trusted proxy
        let trust_proxy: bool = get_env_default("TRUST_PROXY", false);
        let admin_jwt_secret = SecretString::new(get_env::<String>("ADMIN_JWT_SECRET").into());

        let gateway = GatewayConfig {
            credentials: GatewayCredentials {
                merchant_id: get_env("GATEWAY_MERCHANT_ID"),
                merchant_key: SecretString::new(get_env::<String>("GATEWAY_MERCHANT_KEY").into()),
                merchant_salt: SecretString::new(
                    get_env::<String>("GATEWAY_MERCHANT_SALT").into(),
                ),
            },
            base_url: with_trailing_slash(get_env_default(
                "GATEWAY_BASE_URL",
                "https://www.paytr.com/".parse().unwrap(),
            )),
            currency: get_env_default("GATEWAY_CURRENCY", "TL".to_string()),
            test_mode: get_env_default("GATEWAY_TEST_MODE", false),
            no_installment: get_env_default("GATEWAY_NO_INSTALLMENT", true),
            max_installment: get_env_default("GATEWAY_MAX_INSTALLMENT", 0),
            timeout_minutes: get_env_default("GATEWAY_TIMEOUT_MINUTES", 30),
            ok_url: get_env("CHECKOUT_OK_URL"),
            fail_url: get_env("CHECKOUT_FAIL_URL"),
        };

        let notify_url: Option<Url> = std::env::var("NOTIFY_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse().expect("NOTIFY_URL must be a valid URL"));
        let notify_max_attempts: u32 = get_env_default("NOTIFY_MAX_ATTEMPTS", 5);

        Self {
            bind_addr,
            cors_origin,
            database_url,
            redis_url,
            rate_limit_window_secs,
            rate_limit_per_ip,
            rate_limit_per_email,
            trust_proxy,
            admin_jwt_secret,
            gateway,
            notify_url,
            notify_max_attempts,
        }
    }
}

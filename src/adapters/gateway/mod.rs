use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        BasketItem, GatewaySession, PaymentGateway, SessionRequest,
    },
    infra::{
        config::GatewayConfig,
        gateway_signer::{CheckoutSignatureFields, flag, sign_checkout},
    },
};

const TOKEN_PATH: &str = "odeme/api/get-token";
const HOSTED_PAGE_PATH: &str = "odeme/guvenli/";

/// Hosted checkout gateway reached over its token API.
#[derive(Clone)]
pub struct HostedCheckoutGateway {
    client: Client,
    config: GatewayConfig,
}

impl HostedCheckoutGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("failed to build reqwest client");
        Self { client, config }
    }

    fn token_url(&self) -> AppResult<Url> {
        self.config
            .base_url
            .join(TOKEN_PATH)
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    fn hosted_page_url(&self, token: &str) -> AppResult<String> {
        self.config
            .base_url
            .join(HOSTED_PAGE_PATH)
            .and_then(|base| base.join(token))
            .map(String::from)
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    status: String,
    token: Option<String>,
    reason: Option<String>,
}

/// Minor units rendered as a decimal string, e.g. 12345 -> "123.45".
fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Base64 of the basket as `[[name, price, quantity], ...]`.
fn encode_basket(basket: &[BasketItem]) -> String {
    let rows: Vec<serde_json::Value> = basket
        .iter()
        .map(|item| {
            serde_json::json!([
                item.name,
                format_minor_units(item.unit_price),
                item.quantity
            ])
        })
        .collect();
    BASE64.encode(serde_json::Value::Array(rows).to_string())
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    async fn create_session(&self, request: &SessionRequest) -> AppResult<GatewaySession> {
        let user_basket = encode_basket(&request.basket);
        let cfg = &self.config;

        let token = sign_checkout(
            &cfg.credentials,
            &CheckoutSignatureFields {
                user_ip: &request.client_ip,
                merchant_oid: request.merchant_oid.as_str(),
                email: &request.buyer.email,
                payment_amount: request.amount,
                user_basket: &user_basket,
                no_installment: cfg.no_installment,
                max_installment: cfg.max_installment,
                currency: &cfg.currency,
                test_mode: cfg.test_mode,
            },
        );

        let payment_amount = request.amount.to_string();
        let max_installment = cfg.max_installment.to_string();
        let timeout_limit = cfg.timeout_minutes.to_string();
        let form: Vec<(&str, &str)> = vec![
            ("merchant_id", cfg.credentials.merchant_id.as_str()),
            ("user_ip", request.client_ip.as_str()),
            ("merchant_oid", request.merchant_oid.as_str()),
            ("email", request.buyer.email.as_str()),
            ("payment_amount", payment_amount.as_str()),
            ("paytr_token", token.as_str()),
            ("user_basket", user_basket.as_str()),
            ("debug_on", flag(cfg.test_mode)),
            ("no_installment", flag(cfg.no_installment)),
            ("max_installment", max_installment.as_str()),
            ("user_name", request.buyer.name.as_deref().unwrap_or_default()),
            (
                "user_address",
                request.buyer.address.as_deref().unwrap_or_default(),
            ),
            ("user_phone", request.buyer.phone.as_deref().unwrap_or_default()),
            ("merchant_ok_url", cfg.ok_url.as_str()),
            ("merchant_fail_url", cfg.fail_url.as_str()),
            ("timeout_limit", timeout_limit.as_str()),
            ("currency", cfg.currency.as_str()),
            ("test_mode", flag(cfg.test_mode)),
        ];

        let resp = self
            .client
            .post(self.token_url()?)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::Gateway(format!(
                "token endpoint returned {}",
                resp.status()
            )));
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        match (parsed.status.as_str(), parsed.token) {
            ("success", Some(token)) if !token.is_empty() => {
                let url = self.hosted_page_url(&token)?;
                Ok(GatewaySession { token, url })
            }
            _ => {
                let reason = parsed.reason.unwrap_or_else(|| "no reason given".into());
                tracing::warn!(
                    merchant_oid = %request.merchant_oid,
                    reason = %reason,
                    "Gateway refused checkout token"
                );
                Err(AppError::Gateway(reason))
            }
        }
    }
}

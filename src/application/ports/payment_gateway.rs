use async_trait::async_trait;
use serde::Serialize;

use crate::app_error::AppResult;

// ============================================================================
// Port Types - Gateway-agnostic checkout types
// ============================================================================

/// Correlation identifier shared with the gateway for one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MerchantOid(pub String);

impl MerchantOid {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MerchantOid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Buyer contact details forwarded to the gateway's hosted page.
#[derive(Debug, Clone)]
pub struct BuyerDetails {
    pub email: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// One line of the basket shown on the gateway page. Prices are minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasketItem {
    pub name: String,
    pub unit_price: i64,
    pub quantity: u32,
}

/// Everything the gateway needs to open a hosted checkout.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub merchant_oid: MerchantOid,
    pub client_ip: String,
    pub buyer: BuyerDetails,
    /// Total in minor units.
    pub amount: i64,
    pub basket: Vec<BasketItem>,
}

/// Handle returned by the gateway for the buyer to complete payment.
#[derive(Debug, Clone, Serialize)]
pub struct GatewaySession {
    pub token: String,
    pub url: String,
}

// ============================================================================
// Port Trait
// ============================================================================

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout session for an already persisted intent.
    async fn create_session(&self, request: &SessionRequest) -> AppResult<GatewaySession>;
}

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Shared-secret material issued by the payment gateway.
#[derive(Clone)]
pub struct GatewayCredentials {
    pub merchant_id: String,
    pub merchant_key: SecretString,
    pub merchant_salt: SecretString,
}

/// Fields covered by the checkout token, in canonical order.
#[derive(Debug, Clone)]
pub struct CheckoutSignatureFields<'a> {
    pub user_ip: &'a str,
    pub merchant_oid: &'a str,
    pub email: &'a str,
    pub payment_amount: i64,
    /// Base64-encoded basket JSON, exactly as sent to the gateway.
    pub user_basket: &'a str,
    pub no_installment: bool,
    pub max_installment: u32,
    pub currency: &'a str,
    pub test_mode: bool,
}

/// Gateway wire encoding of a boolean.
pub fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn mac_for(credentials: &GatewayCredentials) -> HmacSha256 {
    HmacSha256::new_from_slice(credentials.merchant_key.expose_secret().as_bytes())
        .expect("HMAC accepts any key length")
}

/// Token authenticating a checkout request to the gateway.
///
/// base64(HMAC-SHA256(key, merchant_id ‖ ip ‖ oid ‖ email ‖ amount ‖ basket ‖
/// no_installment ‖ max_installment ‖ currency ‖ test_mode ‖ salt))
pub fn sign_checkout(credentials: &GatewayCredentials, fields: &CheckoutSignatureFields<'_>) -> String {
    let canonical = format!(
        "{}{}{}{}{}{}{}{}{}{}",
        credentials.merchant_id,
        fields.user_ip,
        fields.merchant_oid,
        fields.email,
        fields.payment_amount,
        fields.user_basket,
        flag(fields.no_installment),
        fields.max_installment,
        fields.currency,
        flag(fields.test_mode),
    );

    let mut mac = mac_for(credentials);
    mac.update(canonical.as_bytes());
    mac.update(credentials.merchant_salt.expose_secret().as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Hash the gateway attaches to its payment callback.
///
/// base64(HMAC-SHA256(key, merchant_oid ‖ salt ‖ status ‖ total_amount))
pub fn sign_callback(
    credentials: &GatewayCredentials,
    merchant_oid: &str,
    status: &str,
    total_amount: &str,
) -> String {
    BASE64.encode(callback_mac(credentials, merchant_oid, status, total_amount).finalize().into_bytes())
}

fn callback_mac(
    credentials: &GatewayCredentials,
    merchant_oid: &str,
    status: &str,
    total_amount: &str,
) -> HmacSha256 {
    let mut mac = mac_for(credentials);
    mac.update(merchant_oid.as_bytes());
    mac.update(credentials.merchant_salt.expose_secret().as_bytes());
    mac.update(status.as_bytes());
    mac.update(total_amount.as_bytes());
    mac
}

/// Constant-time check of a callback hash. Malformed base64 fails closed.
pub fn verify_callback(
    credentials: &GatewayCredentials,
    merchant_oid: &str,
    status: &str,
    total_amount: &str,
    provided_hash: &str,
) -> bool {
    let Ok(provided) = BASE64.decode(provided_hash.trim()) else {
        return false;
    };
    callback_mac(credentials, merchant_oid, status, total_amount)
        .verify_slice(&provided)
        .is_ok()
}

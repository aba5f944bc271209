use validator::ValidateEmail;

/// Longest merchant order id the gateway accepts.
pub const MAX_MERCHANT_OID_LEN: usize = 64;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Merchant order ids travel through the gateway unescaped, so they must be
/// plain ASCII alphanumerics.
pub fn is_valid_merchant_oid(oid: &str) -> bool {
    !oid.is_empty()
        && oid.len() <= MAX_MERCHANT_OID_LEN
        && oid.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Trims optional free text and treats blank values as absent.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

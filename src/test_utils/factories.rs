//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::NaiveDateTime;
use rand::{Rng, distributions::Alphanumeric};
use secrecy::SecretString;
use uuid::Uuid;

use crate::{
    application::{
        jwt,
        use_cases::admission_ledger::{ClubProfile, EventProfile, PaymentIntentProfile},
    },
    domain::entities::payment_intent::{PaymentIntentStatus, SeatStatus},
    infra::{config::GatewayConfig, gateway_signer::GatewayCredentials},
};

/// Secret shared between `test_admin_token` and the builder's config.
pub const TEST_ADMIN_SECRET: &str = "test_admin_jwt_secret";

/// Create a test club with sensible defaults: no capacity, no price.
pub fn create_test_club(overrides: impl FnOnce(&mut ClubProfile)) -> ClubProfile {
    let mut club = ClubProfile {
        id: Uuid::new_v4(),
        name: "Test Club".to_string(),
        capacity: None,
        price: None,
        owner_user_id: Some(Uuid::new_v4()),
    };
    overrides(&mut club);
    club
}

/// Create a test event priced at 100.00 with no capacity of its own.
pub fn create_test_event(
    club_id: Uuid,
    overrides: impl FnOnce(&mut EventProfile),
) -> EventProfile {
    let mut event = EventProfile {
        id: Uuid::new_v4(),
        club_id,
        title: "Test Event".to_string(),
        capacity: None,
        price: Some(10000),
        owner_user_id: None,
    };
    overrides(&mut event);
    event
}

/// Create a pending payment intent with a unique merchant_oid.
pub fn create_test_intent(
    club_id: Uuid,
    event_id: Uuid,
    overrides: impl FnOnce(&mut PaymentIntentProfile),
) -> PaymentIntentProfile {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();

    let mut intent = PaymentIntentProfile {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        club_id,
        event_id,
        amount: 10000,
        status: PaymentIntentStatus::RequiresPayment,
        seat_status: SeatStatus::Unassigned,
        merchant_oid: format!("TEST{suffix}"),
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut intent);
    intent
}

pub fn test_gateway_credentials() -> GatewayCredentials {
    GatewayCredentials {
        merchant_id: "123456".to_string(),
        merchant_key: SecretString::new("test_merchant_key".into()),
        merchant_salt: SecretString::new("test_merchant_salt".into()),
    }
}

pub fn test_gateway_config() -> GatewayConfig {
    GatewayConfig {
        credentials: test_gateway_credentials(),
        base_url: "https://gateway.test/".parse().unwrap(),
        currency: "TL".to_string(),
        test_mode: true,
        no_installment: true,
        max_installment: 0,
        timeout_minutes: 30,
        ok_url: "https://app.test/checkout/ok".parse().unwrap(),
        fail_url: "https://app.test/checkout/fail".parse().unwrap(),
    }
}

/// Bearer token signed with the secret `TestAppStateBuilder` configures.
pub fn test_admin_token(roles: &[&str]) -> String {
    jwt::issue(
        Uuid::new_v4(),
        roles,
        &SecretString::new(TEST_ADMIN_SECRET.into()),
        time::Duration::minutes(10),
    )
    .unwrap()
}

/// Returns a fixed datetime for deterministic tests.
pub fn test_datetime() -> NaiveDateTime {
    chrono::DateTime::from_timestamp(1_700_000_000, 0)
        .unwrap()
        .naive_utc()
}

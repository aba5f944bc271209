use std::sync::Arc;

use rand::{Rng, distributions::Alphanumeric};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::{
            BasketItem, BuyerDetails, MerchantOid, PaymentGateway, SessionRequest,
        },
        use_cases::admission_ledger::{
            CatalogRepo, CreatePaymentIntentInput, MembershipRepo, PaymentIntentRepo,
            PaymentIntentProfile,
        },
        validators::is_valid_merchant_oid,
    },
};

const OID_RANDOM_LEN: usize = 8;
/// Fresh merchant_oids tried before a unique collision is reported.
const OID_ATTEMPTS: usize = 3;

/// A validated purchase request.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub user_id: Uuid,
    pub club_id: Uuid,
    pub event_id: Uuid,
    /// Amount the client believes it is paying, in minor units.
    pub declared_amount: i64,
    pub buyer: BuyerDetails,
    pub client_ip: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub merchant_oid: String,
    pub session_token: String,
    pub session_url: String,
}

/// Builds a merchant order id from the club and event ids, a millisecond
/// timestamp and a random suffix. Uniqueness is enforced by the intents table.
pub fn generate_merchant_oid(club_id: Uuid, event_id: Uuid) -> MerchantOid {
    let club = club_id.simple().to_string();
    let event = event_id.simple().to_string();
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(OID_RANDOM_LEN)
        .map(char::from)
        .collect();

    MerchantOid::new(format!(
        "C{}E{}T{}R{}",
        &club[..8],
        &event[..8],
        millis,
        suffix.to_uppercase()
    ))
}

#[derive(Clone)]
pub struct CheckoutUseCases {
    catalog: Arc<dyn CatalogRepo>,
    memberships: Arc<dyn MembershipRepo>,
    intents: Arc<dyn PaymentIntentRepo>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutUseCases {
    pub fn new(
        catalog: Arc<dyn CatalogRepo>,
        memberships: Arc<dyn MembershipRepo>,
        intents: Arc<dyn PaymentIntentRepo>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            catalog,
            memberships,
            intents,
            gateway,
        }
    }

    /// Reserve a payment intent and open a gateway session for it.
    ///
    /// The capacity check here is advisory only: it keeps buyers from paying
    /// for an event that is already full, but two buyers can both pass it.
    /// The authoritative check runs when the payment callback seats the buyer.
    #[instrument(skip(self, input), fields(event_id = %input.event_id, user_id = %input.user_id))]
    pub async fn initiate(&self, input: CheckoutInput) -> AppResult<CheckoutSession> {
        let target = self
            .catalog
            .get_event_with_club(input.event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event".into()))?;
        if target.club.id != input.club_id {
            return Err(AppError::NotFound("Club".into()));
        }

        let price = target.price().ok_or(AppError::NotPurchasable)?;
        if input.declared_amount != price {
            tracing::warn!(
                declared = input.declared_amount,
                expected = price,
                "Rejected checkout with mismatched amount"
            );
            return Err(AppError::PriceMismatch {
                declared: input.declared_amount,
                expected: price,
            });
        }

        if self
            .memberships
            .get(input.user_id, input.event_id)
            .await?
            .is_some_and(|m| m.is_active)
        {
            return Err(AppError::AlreadyAdmitted);
        }

        if let Some(capacity) = target.effective_capacity() {
            let active = self.memberships.count_active(input.event_id).await?;
            if capacity.is_full(active) {
                return Err(AppError::CapacityFull {
                    capacity: capacity.limit,
                });
            }
        }

        let (merchant_oid, intent) = self
            .reserve_intent(input.user_id, target.club.id, target.event.id, price)
            .await?;

        let session = self
            .gateway
            .create_session(&SessionRequest {
                merchant_oid: merchant_oid.clone(),
                client_ip: input.client_ip,
                buyer: input.buyer,
                amount: price,
                basket: vec![BasketItem {
                    name: target.event.title.clone(),
                    unit_price: price,
                    quantity: 1,
                }],
            })
            .await?;

        tracing::info!(
            merchant_oid = %merchant_oid,
            intent_id = %intent.id,
            amount = price,
            "Checkout session opened"
        );

        Ok(CheckoutSession {
            merchant_oid: merchant_oid.0,
            session_token: session.token,
            session_url: session.url,
        })
    }

    /// Persist a REQUIRES_PAYMENT intent under a freshly generated
    /// merchant_oid, drawing a new one when the id is already taken.
    async fn reserve_intent(
        &self,
        user_id: Uuid,
        club_id: Uuid,
        event_id: Uuid,
        amount: i64,
    ) -> AppResult<(MerchantOid, PaymentIntentProfile)> {
        let mut attempt = 1;
        loop {
            let merchant_oid = generate_merchant_oid(club_id, event_id);
            debug_assert!(is_valid_merchant_oid(merchant_oid.as_str()));

            let created = self
                .intents
                .create(&CreatePaymentIntentInput {
                    user_id,
                    club_id,
                    event_id,
                    amount,
                    merchant_oid: merchant_oid.to_string(),
                })
                .await;

            match created {
                Ok(intent) => return Ok((merchant_oid, intent)),
                Err(AppError::Conflict(_)) if attempt < OID_ATTEMPTS => {
                    tracing::warn!(%merchant_oid, attempt, "merchant_oid collision, regenerating");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Resolution of a checkout, polled by the client after the gateway page.
    pub async fn get_status(&self, merchant_oid: &str) -> AppResult<PaymentIntentProfile> {
        self.intents
            .get_by_merchant_oid(merchant_oid)
            .await?
            .ok_or_else(|| AppError::NotFound("Checkout".into()))
    }
}

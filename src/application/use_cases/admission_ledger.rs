//! Admission ledger: the persisted payment intents, memberships and
//! subscriptions, plus the transactional seat mutations shared by the
//! payment callback and the manual admission paths.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{
        capacity::{
            CapacitySource, EffectiveCapacity, resolve_effective_capacity, resolve_price,
        },
        membership::MembershipRole,
        payment_intent::{PaymentIntentStatus, SeatStatus},
    },
};

// ============================================================================
// Profile Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ClubProfile {
    pub id: Uuid,
    pub name: String,
    pub capacity: Option<i32>,
    pub price: Option<i64>,
    pub owner_user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventProfile {
    pub id: Uuid,
    pub club_id: Uuid,
    pub title: String,
    pub capacity: Option<i32>,
    pub price: Option<i64>,
    pub owner_user_id: Option<Uuid>,
}

/// An event together with the club whose defaults it inherits.
#[derive(Debug, Clone, Serialize)]
pub struct EventWithClub {
    pub event: EventProfile,
    pub club: ClubProfile,
}

impl EventWithClub {
    pub fn effective_capacity(&self) -> Option<EffectiveCapacity> {
        resolve_effective_capacity(self.event.capacity, self.club.capacity)
    }

    pub fn price(&self) -> Option<i64> {
        resolve_price(self.event.price, self.club.price)
    }

    /// Whether the user owns the event or the club hosting it.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.event.owner_user_id == Some(user_id) || self.club.owner_user_id == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub club_id: Uuid,
    pub event_id: Uuid,
    pub amount: i64,
    pub status: PaymentIntentStatus,
    pub seat_status: SeatStatus,
    pub merchant_oid: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipProfile {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub club_id: Uuid,
    pub is_active: bool,
    pub joined_at: Option<NaiveDateTime>,
    pub role: MembershipRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionProfile {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub club_id: Uuid,
    pub active: bool,
    pub started_at: Option<NaiveDateTime>,
    pub canceled_at: Option<NaiveDateTime>,
}

// ============================================================================
// Input Types
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreatePaymentIntentInput {
    pub user_id: Uuid,
    pub club_id: Uuid,
    pub event_id: Uuid,
    pub amount: i64,
    pub merchant_oid: String,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn get_event_with_club(&self, event_id: Uuid) -> AppResult<Option<EventWithClub>>;
}

#[async_trait]
pub trait PaymentIntentRepo: Send + Sync {
    /// Insert a fresh intent in REQUIRES_PAYMENT. The merchant_oid unique
    /// constraint rejects duplicates.
    async fn create(&self, input: &CreatePaymentIntentInput) -> AppResult<PaymentIntentProfile>;
    async fn get_by_merchant_oid(&self, merchant_oid: &str)
    -> AppResult<Option<PaymentIntentProfile>>;
    async fn list_over_capacity(&self, event_id: Uuid) -> AppResult<Vec<PaymentIntentProfile>>;
}

#[async_trait]
pub trait MembershipRepo: Send + Sync {
    async fn count_active(&self, event_id: Uuid) -> AppResult<i64>;
    async fn get(&self, user_id: Uuid, event_id: Uuid) -> AppResult<Option<MembershipProfile>>;
}

/// Opens units of work over the ledger.
#[async_trait]
pub trait AdmissionStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn AdmissionTx>>;
}

/// One ledger transaction. Dropping it without `commit` rolls back.
///
/// Locks taken here are held until commit or rollback, so a count read after
/// `lock_event` is authoritative for the rest of the transaction.
#[async_trait]
pub trait AdmissionTx: Send {
    /// Lock the event row and its club row, returning the catalog view.
    async fn lock_event(&mut self, event_id: Uuid) -> AppResult<Option<EventWithClub>>;

    /// Lock an intent row by merchant_oid.
    async fn lock_intent(&mut self, merchant_oid: &str) -> AppResult<Option<PaymentIntentProfile>>;

    async fn count_active(&mut self, event_id: Uuid) -> AppResult<i64>;

    async fn get_membership(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<MembershipProfile>>;

    /// Move an intent out of REQUIRES_PAYMENT. Returns false when the row was
    /// already terminal and nothing changed.
    async fn finalize_intent(
        &mut self,
        intent_id: Uuid,
        status: PaymentIntentStatus,
        seat_status: SeatStatus,
    ) -> AppResult<bool>;

    /// Insert or reactivate. An already active row is left untouched.
    async fn upsert_membership_active(
        &mut self,
        user_id: Uuid,
        club_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<MembershipProfile>;

    /// Insert or reactivate with a fresh started_at and cleared canceled_at.
    /// An already active row is left untouched.
    async fn upsert_subscription_active(
        &mut self,
        user_id: Uuid,
        club_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<SubscriptionProfile>;

    async fn deactivate_membership(&mut self, user_id: Uuid, event_id: Uuid) -> AppResult<()>;

    /// Set active = false; canceled_at is stamped only if the row was active.
    async fn deactivate_subscription(&mut self, user_id: Uuid, event_id: Uuid) -> AppResult<()>;

    async fn set_event_capacity(&mut self, event_id: Uuid, capacity: i32) -> AppResult<()>;

    async fn set_club_capacity(&mut self, club_id: Uuid, capacity: i32) -> AppResult<()>;

    /// Mark the user's over-capacity intents for the event as seated.
    async fn seat_over_capacity_intents(&mut self, user_id: Uuid, event_id: Uuid)
    -> AppResult<u64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

// ============================================================================
// Ledger Mutations
// ============================================================================

/// Put a user into a seat: subscription and membership move together.
///
/// Returns true only when the membership went from absent or inactive to
/// active, which is the sole case that warrants a notification.
pub async fn activate_seat(
    tx: &mut dyn AdmissionTx,
    user_id: Uuid,
    club_id: Uuid,
    event_id: Uuid,
) -> AppResult<bool> {
    let was_active = tx
        .get_membership(user_id, event_id)
        .await?
        .is_some_and(|m| m.is_active);

    tx.upsert_subscription_active(user_id, club_id, event_id)
        .await?;
    tx.upsert_membership_active(user_id, club_id, event_id)
        .await?;

    Ok(!was_active)
}

/// Release a seat. Idempotent: a second call leaves canceled_at as it was.
pub async fn deactivate_seat(
    tx: &mut dyn AdmissionTx,
    user_id: Uuid,
    event_id: Uuid,
) -> AppResult<()> {
    tx.deactivate_subscription(user_id, event_id).await?;
    tx.deactivate_membership(user_id, event_id).await
}

/// Raise the binding capacity so one more seat fits and return the new limit.
///
/// The increment lands on the level that produced the limit. The new value is
/// `active + 1`, which equals `limit + 1` whenever the ledger is consistent; if
/// capacity was lowered below the current occupancy the override still leaves
/// the active count within the limit.
pub async fn raise_capacity_for_one_more(
    tx: &mut dyn AdmissionTx,
    target: &EventWithClub,
    capacity: EffectiveCapacity,
    active: i64,
) -> AppResult<i32> {
    let occupied = i32::try_from(active).unwrap_or(i32::MAX - 1);
    let new_limit = occupied.max(capacity.limit).saturating_add(1);

    match capacity.source {
        CapacitySource::Event => {
            tx.set_event_capacity(target.event.id, new_limit).await?;
        }
        CapacitySource::Club => {
            tx.set_club_capacity(target.club.id, new_limit).await?;
        }
    }

    tracing::info!(
        event_id = %target.event.id,
        level = capacity.source.as_str(),
        previous = capacity.limit,
        new_limit,
        "Raised capacity for administrative admission"
    );

    Ok(new_limit)
}

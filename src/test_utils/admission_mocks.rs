//! In-memory doubles for the admission ledger, the gateway and the notifier.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{
            notifier::AdmissionNotifier,
            payment_gateway::{GatewaySession, PaymentGateway, SessionRequest},
        },
        use_cases::admission_ledger::{
            AdmissionStore, AdmissionTx, CatalogRepo, ClubProfile, CreatePaymentIntentInput,
            EventProfile, EventWithClub, MembershipProfile, MembershipRepo, PaymentIntentProfile,
            PaymentIntentRepo, SubscriptionProfile,
        },
    },
    domain::entities::{
        membership::MembershipRole,
        payment_intent::{PaymentIntentStatus, SeatStatus},
    },
    infra::rate_limit::LimitKey,
};

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

// ============================================================================
// InMemoryAdmissionStore
// ============================================================================

#[derive(Default, Clone)]
struct LedgerState {
    clubs: HashMap<Uuid, ClubProfile>,
    events: HashMap<Uuid, EventProfile>,
    intents: HashMap<String, PaymentIntentProfile>,
    memberships: HashMap<(Uuid, Uuid), MembershipProfile>,
    subscriptions: HashMap<(Uuid, Uuid), SubscriptionProfile>,
}

impl LedgerState {
    fn event_view(&self, event_id: Uuid) -> Option<EventWithClub> {
        let event = self.events.get(&event_id)?.clone();
        let club = self.clubs.get(&event.club_id)?.clone();
        Some(EventWithClub { event, club })
    }

    fn count_active(&self, event_id: Uuid) -> i64 {
        self.memberships
            .values()
            .filter(|m| m.event_id == event_id && m.is_active)
            .count() as i64
    }
}

/// Ledger backed by a `HashMap` snapshot.
///
/// A transaction holds a single store-wide lock and works on a private copy
/// of the state, written back on commit. That serializes units of work the
/// way the row locks do in Postgres, and dropping a transaction discards its
/// changes.
#[derive(Default)]
pub struct InMemoryAdmissionStore {
    state: Arc<Mutex<LedgerState>>,
    tx_lock: Arc<tokio::sync::Mutex<()>>,
}

impl InMemoryAdmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_event(&self, club: ClubProfile, event: EventProfile) {
        let mut state = self.state.lock().unwrap();
        state.clubs.insert(club.id, club);
        state.events.insert(event.id, event);
    }

    pub fn insert_intent(&self, intent: PaymentIntentProfile) {
        self.state
            .lock()
            .unwrap()
            .intents
            .insert(intent.merchant_oid.clone(), intent);
    }

    /// Seat a plain member directly, with a matching active subscription.
    pub fn insert_active_member(&self, user_id: Uuid, club_id: Uuid, event_id: Uuid) {
        self.insert_member_with_role(user_id, club_id, event_id, MembershipRole::Member);
    }

    pub fn insert_member_with_role(
        &self,
        user_id: Uuid,
        club_id: Uuid,
        event_id: Uuid,
        role: MembershipRole,
    ) {
        let mut state = self.state.lock().unwrap();
        state.memberships.insert(
            (user_id, event_id),
            MembershipProfile {
                user_id,
                event_id,
                club_id,
                is_active: true,
                joined_at: Some(now()),
                role,
            },
        );
        state.subscriptions.insert(
            (user_id, event_id),
            SubscriptionProfile {
                user_id,
                event_id,
                club_id,
                active: true,
                started_at: Some(now()),
                canceled_at: None,
            },
        );
    }

    pub fn active_count(&self, event_id: Uuid) -> i64 {
        self.state.lock().unwrap().count_active(event_id)
    }

    pub fn event_view(&self, event_id: Uuid) -> Option<EventWithClub> {
        self.state.lock().unwrap().event_view(event_id)
    }

    pub fn intent(&self, merchant_oid: &str) -> Option<PaymentIntentProfile> {
        self.state.lock().unwrap().intents.get(merchant_oid).cloned()
    }

    pub fn intent_count(&self) -> usize {
        self.state.lock().unwrap().intents.len()
    }

    pub fn membership(&self, user_id: Uuid, event_id: Uuid) -> Option<MembershipProfile> {
        self.state
            .lock()
            .unwrap()
            .memberships
            .get(&(user_id, event_id))
            .cloned()
    }

    pub fn subscription(&self, user_id: Uuid, event_id: Uuid) -> Option<SubscriptionProfile> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .get(&(user_id, event_id))
            .cloned()
    }
}

#[async_trait]
impl CatalogRepo for InMemoryAdmissionStore {
    async fn get_event_with_club(&self, event_id: Uuid) -> AppResult<Option<EventWithClub>> {
        Ok(self.event_view(event_id))
    }
}

#[async_trait]
impl PaymentIntentRepo for InMemoryAdmissionStore {
    async fn create(&self, input: &CreatePaymentIntentInput) -> AppResult<PaymentIntentProfile> {
        let _guard = self.tx_lock.lock().await;
        let mut state = self.state.lock().unwrap();

        if state.intents.contains_key(&input.merchant_oid) {
            return Err(AppError::Conflict(
                "A record with this value already exists".into(),
            ));
        }

        let intent = PaymentIntentProfile {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            club_id: input.club_id,
            event_id: input.event_id,
            amount: input.amount,
            status: PaymentIntentStatus::RequiresPayment,
            seat_status: SeatStatus::Unassigned,
            merchant_oid: input.merchant_oid.clone(),
            created_at: Some(now()),
            updated_at: Some(now()),
        };
        state
            .intents
            .insert(intent.merchant_oid.clone(), intent.clone());
        Ok(intent)
    }

    async fn get_by_merchant_oid(
        &self,
        merchant_oid: &str,
    ) -> AppResult<Option<PaymentIntentProfile>> {
        Ok(self.intent(merchant_oid))
    }

    async fn list_over_capacity(&self, event_id: Uuid) -> AppResult<Vec<PaymentIntentProfile>> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<_> = state
            .intents
            .values()
            .filter(|i| i.event_id == event_id && i.seat_status.needs_reconciliation())
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }
}

#[async_trait]
impl MembershipRepo for InMemoryAdmissionStore {
    async fn count_active(&self, event_id: Uuid) -> AppResult<i64> {
        Ok(self.active_count(event_id))
    }

    async fn get(&self, user_id: Uuid, event_id: Uuid) -> AppResult<Option<MembershipProfile>> {
        Ok(self.membership(user_id, event_id))
    }
}

#[async_trait]
impl AdmissionStore for InMemoryAdmissionStore {
    async fn begin(&self) -> AppResult<Box<dyn AdmissionTx>> {
        let guard = self.tx_lock.clone().lock_owned().await;
        let staged = self.state.lock().unwrap().clone();
        Ok(Box::new(InMemoryAdmissionTx {
            _guard: guard,
            state: self.state.clone(),
            staged,
        }))
    }
}

struct InMemoryAdmissionTx {
    _guard: OwnedMutexGuard<()>,
    state: Arc<Mutex<LedgerState>>,
    staged: LedgerState,
}

#[async_trait]
impl AdmissionTx for InMemoryAdmissionTx {
    async fn lock_event(&mut self, event_id: Uuid) -> AppResult<Option<EventWithClub>> {
        Ok(self.staged.event_view(event_id))
    }

    async fn lock_intent(&mut self, merchant_oid: &str) -> AppResult<Option<PaymentIntentProfile>> {
        Ok(self.staged.intents.get(merchant_oid).cloned())
    }

    async fn count_active(&mut self, event_id: Uuid) -> AppResult<i64> {
        Ok(self.staged.count_active(event_id))
    }

    async fn get_membership(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<MembershipProfile>> {
        Ok(self.staged.memberships.get(&(user_id, event_id)).cloned())
    }

    async fn finalize_intent(
        &mut self,
        intent_id: Uuid,
        status: PaymentIntentStatus,
        seat_status: SeatStatus,
    ) -> AppResult<bool> {
        let Some(intent) = self.staged.intents.values_mut().find(|i| i.id == intent_id) else {
            return Ok(false);
        };
        if !intent.status.can_transition_to(status) {
            return Ok(false);
        }
        intent.status = status;
        intent.seat_status = seat_status;
        intent.updated_at = Some(now());
        Ok(true)
    }

    async fn upsert_membership_active(
        &mut self,
        user_id: Uuid,
        club_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<MembershipProfile> {
        let membership = self
            .staged
            .memberships
            .entry((user_id, event_id))
            .or_insert_with(|| MembershipProfile {
                user_id,
                event_id,
                club_id,
                is_active: false,
                joined_at: None,
                role: MembershipRole::Member,
            });
        if !membership.is_active {
            membership.is_active = true;
            membership.club_id = club_id;
            membership.joined_at = Some(now());
        }
        Ok(membership.clone())
    }

    async fn upsert_subscription_active(
        &mut self,
        user_id: Uuid,
        club_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<SubscriptionProfile> {
        let subscription = self
            .staged
            .subscriptions
            .entry((user_id, event_id))
            .or_insert_with(|| SubscriptionProfile {
                user_id,
                event_id,
                club_id,
                active: false,
                started_at: None,
                canceled_at: None,
            });
        if !subscription.active {
            subscription.active = true;
            subscription.club_id = club_id;
            subscription.started_at = Some(now());
            subscription.canceled_at = None;
        }
        Ok(subscription.clone())
    }

    async fn deactivate_membership(&mut self, user_id: Uuid, event_id: Uuid) -> AppResult<()> {
        if let Some(membership) = self.staged.memberships.get_mut(&(user_id, event_id)) {
            membership.is_active = false;
        }
        Ok(())
    }

    async fn deactivate_subscription(&mut self, user_id: Uuid, event_id: Uuid) -> AppResult<()> {
        if let Some(subscription) = self.staged.subscriptions.get_mut(&(user_id, event_id)) {
            if subscription.active {
                subscription.canceled_at = Some(now());
            }
            subscription.active = false;
        }
        Ok(())
    }

    async fn set_event_capacity(&mut self, event_id: Uuid, capacity: i32) -> AppResult<()> {
        if let Some(event) = self.staged.events.get_mut(&event_id) {
            event.capacity = Some(capacity);
        }
        Ok(())
    }

    async fn set_club_capacity(&mut self, club_id: Uuid, capacity: i32) -> AppResult<()> {
        if let Some(club) = self.staged.clubs.get_mut(&club_id) {
            club.capacity = Some(capacity);
        }
        Ok(())
    }

    async fn seat_over_capacity_intents(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<u64> {
        let mut seated = 0;
        for intent in self.staged.intents.values_mut().filter(|i| {
            i.user_id == user_id
                && i.event_id == event_id
                && i.seat_status == SeatStatus::OverCapacity
        }) {
            intent.seat_status = SeatStatus::Seated;
            intent.updated_at = Some(now());
            seated += 1;
        }
        Ok(seated)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        *this.state.lock().unwrap() = this.staged;
        Ok(())
    }
}

// ============================================================================
// RecordingNotifier
// ============================================================================

/// Notifier that remembers every admission it was told about.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Uuid, Uuid)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(user_id, event_id)` pairs in notification order.
    pub fn sent(&self) -> Vec<(Uuid, Uuid)> {
        self.sent.lock().unwrap().clone()
    }
}

impl AdmissionNotifier for RecordingNotifier {
    fn notify_admitted(&self, user_id: Uuid, event_id: Uuid) {
        self.sent.lock().unwrap().push((user_id, event_id));
    }
}

// ============================================================================
// RecordingPaymentGateway
// ============================================================================

/// Gateway double that records session requests and answers with a token
/// derived from the merchant_oid.
#[derive(Default)]
pub struct RecordingPaymentGateway {
    requests: Mutex<Vec<SessionRequest>>,
    fail: bool,
}

impl RecordingPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that rejects every session request.
    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingPaymentGateway {
    async fn create_session(&self, request: &SessionRequest) -> AppResult<GatewaySession> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail {
            return Err(AppError::Gateway("gateway unavailable".into()));
        }

        let token = format!("tok{}", request.merchant_oid);
        Ok(GatewaySession {
            url: format!("https://gateway.test/odeme/guvenli/{token}"),
            token,
        })
    }
}

// ============================================================================
// InMemoryRateLimiter
// ============================================================================

/// In-memory rate limiter for testing. Counters never expire.
pub struct InMemoryRateLimiter {
    counts: Mutex<HashMap<LimitKey, u64>>,
    max_per_ip: u64,
    max_per_email: u64,
}

impl InMemoryRateLimiter {
    pub fn new(max_per_ip: u64, max_per_email: u64) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            max_per_ip,
            max_per_email,
        }
    }

    /// A limiter that never blocks.
    pub fn permissive() -> Self {
        Self::new(u64::MAX, u64::MAX)
    }
}

#[async_trait]
impl crate::infra::RateLimiterTrait for InMemoryRateLimiter {
    async fn check(&self, ip: &str, email: Option<&str>) -> AppResult<()> {
        let mut counts = self.counts.lock().unwrap();

        // Every counter moves, as in the Redis script
        let mut exceeded = false;
        let mut keys = vec![(LimitKey::client_ip(ip), self.max_per_ip)];
        if let Some(email) = email {
            keys.push((LimitKey::buyer_email(email), self.max_per_email));
        }
        for (key, max) in keys {
            let count = counts.entry(key).or_insert(0);
            *count += 1;
            exceeded |= *count > max;
        }

        if exceeded {
            return Err(AppError::RateLimited);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_club, create_test_event, create_test_intent};

    #[tokio::test]
    async fn transaction_serializes_and_commits_snapshot() {
        let club = create_test_club(|_| {});
        let event = create_test_event(club.id, |_| {});
        let store = Arc::new(InMemoryAdmissionStore::new());
        store.insert_event(club.clone(), event.clone());

        let mut tx = store.begin().await.unwrap();
        tx.set_event_capacity(event.id, 7).await.unwrap();
        assert_eq!(store.event_view(event.id).unwrap().event.capacity, None);
        tx.commit().await.unwrap();
        assert_eq!(store.event_view(event.id).unwrap().event.capacity, Some(7));
    }

    #[tokio::test]
    async fn finalize_only_moves_pending_intents() {
        let club = create_test_club(|_| {});
        let event = create_test_event(club.id, |_| {});
        let intent = create_test_intent(club.id, event.id, |_| {});
        let store = InMemoryAdmissionStore::new();
        store.insert_intent(intent.clone());

        let mut tx = store.begin().await.unwrap();
        assert!(
            tx.finalize_intent(intent.id, PaymentIntentStatus::Failed, SeatStatus::Unassigned)
                .await
                .unwrap()
        );
        assert!(
            !tx.finalize_intent(intent.id, PaymentIntentStatus::Succeeded, SeatStatus::Seated)
                .await
                .unwrap()
        );
        tx.commit().await.unwrap();

        assert_eq!(
            store.intent(&intent.merchant_oid).unwrap().status,
            PaymentIntentStatus::Failed
        );
    }

    #[tokio::test]
    async fn rate_limiter_counts_per_key() {
        use crate::infra::RateLimiterTrait;

        let limiter = InMemoryRateLimiter::new(2, 1);
        limiter.check("10.0.0.1", None).await.unwrap();
        limiter.check("10.0.0.1", Some("a@example.com")).await.unwrap();
        assert!(matches!(
            limiter.check("10.0.0.1", None).await,
            Err(AppError::RateLimited)
        ));
        assert!(matches!(
            limiter.check("10.0.0.2", Some("A@example.com")).await,
            Err(AppError::RateLimited)
        ));
    }
}

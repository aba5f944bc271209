//! Administrative seat management.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::notifier::AdmissionNotifier,
        use_cases::admission_ledger::{
            AdmissionStore, CatalogRepo, MembershipRepo, PaymentIntentProfile, PaymentIntentRepo,
            activate_seat, deactivate_seat, raise_capacity_for_one_more,
        },
    },
    domain::entities::capacity::CapacitySource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionResult {
    /// Whether the membership went from absent or inactive to active.
    pub activated: bool,
    /// Set when the admission had to raise the event's seat limit.
    pub raised_capacity_to: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatSummary {
    pub event_id: Uuid,
    /// None means unlimited.
    pub capacity: Option<i32>,
    pub capacity_source: Option<CapacitySource>,
    pub active: i64,
}

#[derive(Clone)]
pub struct ManualAdmissionUseCases {
    store: Arc<dyn AdmissionStore>,
    catalog: Arc<dyn CatalogRepo>,
    memberships: Arc<dyn MembershipRepo>,
    intents: Arc<dyn PaymentIntentRepo>,
    notifier: Arc<dyn AdmissionNotifier>,
}

impl ManualAdmissionUseCases {
    pub fn new(
        store: Arc<dyn AdmissionStore>,
        catalog: Arc<dyn CatalogRepo>,
        memberships: Arc<dyn MembershipRepo>,
        intents: Arc<dyn PaymentIntentRepo>,
        notifier: Arc<dyn AdmissionNotifier>,
    ) -> Self {
        Self {
            store,
            catalog,
            memberships,
            intents,
            notifier,
        }
    }

    /// Seat a user regardless of capacity.
    ///
    /// When the event is full the binding limit is raised by one inside the
    /// same transaction, so active members never exceed the stored capacity.
    /// Admitting a user who already holds a seat changes nothing.
    #[instrument(skip(self))]
    pub async fn admit(&self, event_id: Uuid, user_id: Uuid) -> AppResult<AdmissionResult> {
        let mut tx = self.store.begin().await?;

        let target = tx
            .lock_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event".into()))?;

        if tx
            .get_membership(user_id, event_id)
            .await?
            .is_some_and(|m| m.is_active)
        {
            return Ok(AdmissionResult {
                activated: false,
                raised_capacity_to: None,
            });
        }

        let mut raised_capacity_to = None;
        if let Some(capacity) = target.effective_capacity() {
            let active = tx.count_active(event_id).await?;
            if capacity.is_full(active) {
                raised_capacity_to =
                    Some(raise_capacity_for_one_more(tx.as_mut(), &target, capacity, active).await?);
            }
        }

        let activated = activate_seat(tx.as_mut(), user_id, target.club.id, event_id).await?;
        let reconciled = tx.seat_over_capacity_intents(user_id, event_id).await?;
        tx.commit().await?;

        tracing::info!(
            %event_id,
            %user_id,
            activated,
            reconciled,
            "Administrative admission applied"
        );

        if activated {
            self.notifier.notify_admitted(user_id, event_id);
        }

        Ok(AdmissionResult {
            activated,
            raised_capacity_to,
        })
    }

    /// Release a user's seat. Capacity is left as it is.
    #[instrument(skip(self))]
    pub async fn remove(&self, event_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;

        let target = tx
            .lock_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event".into()))?;

        let membership = tx
            .get_membership(user_id, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Membership".into()))?;

        if membership.role.is_protected() || target.is_owned_by(user_id) {
            return Err(AppError::ProtectedMember);
        }

        deactivate_seat(tx.as_mut(), user_id, event_id).await?;
        tx.commit().await?;

        tracing::info!(%event_id, %user_id, "Seat released");
        Ok(())
    }

    pub async fn seat_summary(&self, event_id: Uuid) -> AppResult<SeatSummary> {
        let target = self
            .catalog
            .get_event_with_club(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event".into()))?;
        let capacity = target.effective_capacity();
        let active = self.memberships.count_active(event_id).await?;

        Ok(SeatSummary {
            event_id,
            capacity: capacity.map(|c| c.limit),
            capacity_source: capacity.map(|c| c.source),
            active,
        })
    }

    /// Paid intents still waiting for a seat.
    pub async fn list_reconciliations(
        &self,
        event_id: Uuid,
    ) -> AppResult<Vec<PaymentIntentProfile>> {
        if self.catalog.get_event_with_club(event_id).await?.is_none() {
            return Err(AppError::NotFound("Event".into()));
        }
        self.intents.list_over_capacity(event_id).await
    }
}

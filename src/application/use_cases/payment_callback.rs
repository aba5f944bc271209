//! Gateway callback reconciliation.

use std::sync::Arc;

use tracing::instrument;

use crate::{
    app_error::AppResult,
    application::{
        ports::notifier::AdmissionNotifier,
        use_cases::admission_ledger::{AdmissionStore, activate_seat},
    },
    domain::entities::payment_intent::{GatewayOutcome, PaymentIntentStatus, SeatStatus},
    infra::gateway_signer::{GatewayCredentials, verify_callback},
};

/// Fields posted by the gateway. All of them are untrusted until the hash
/// checks out.
#[derive(Debug, Clone)]
pub struct PaymentCallback {
    pub merchant_oid: String,
    pub status: String,
    pub total_amount: String,
    pub hash: String,
}

/// What a callback did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Hash did not verify. Nothing was read or written.
    Rejected,
    /// Verified, but no intent carries this merchant_oid.
    UnknownIntent,
    /// The intent was already terminal; the callback was a replay.
    AlreadyFinal,
    /// Payment failed and the intent was marked FAILED.
    PaymentFailed,
    /// Payment succeeded and the buyer holds a seat.
    Seated { newly_admitted: bool },
    /// Payment succeeded but the event filled up first.
    OverCapacity,
}

/// Whether the gateway's `total_amount` (minor units) is the intent amount.
fn reported_total_matches(expected: i64, reported: &str) -> bool {
    reported.trim().parse::<i64>().is_ok_and(|total| total == expected)
}

pub struct PaymentCallbackUseCases {
    store: Arc<dyn AdmissionStore>,
    notifier: Arc<dyn AdmissionNotifier>,
    credentials: GatewayCredentials,
}

impl PaymentCallbackUseCases {
    pub fn new(
        store: Arc<dyn AdmissionStore>,
        notifier: Arc<dyn AdmissionNotifier>,
        credentials: GatewayCredentials,
    ) -> Self {
        Self {
            store,
            notifier,
            credentials,
        }
    }

    /// Apply a gateway callback.
    ///
    /// Integrity problems are reported through the outcome, never as errors;
    /// an `Err` here means the store failed and the gateway should retry.
    #[instrument(skip(self, callback), fields(merchant_oid = %callback.merchant_oid))]
    pub async fn reconcile(&self, callback: PaymentCallback) -> AppResult<CallbackOutcome> {
        if !verify_callback(
            &self.credentials,
            &callback.merchant_oid,
            &callback.status,
            &callback.total_amount,
            &callback.hash,
        ) {
            tracing::warn!(
                merchant_oid = %callback.merchant_oid,
                status = %callback.status,
                "Rejected payment callback with invalid hash"
            );
            return Ok(CallbackOutcome::Rejected);
        }

        let mut tx = self.store.begin().await?;

        let Some(intent) = tx.lock_intent(&callback.merchant_oid).await? else {
            tracing::warn!(
                merchant_oid = %callback.merchant_oid,
                "Payment callback for unknown merchant_oid"
            );
            return Ok(CallbackOutcome::UnknownIntent);
        };

        if intent.status.is_terminal() {
            tracing::debug!(
                intent_id = %intent.id,
                status = ?intent.status,
                "Ignoring callback for finalized intent"
            );
            return Ok(CallbackOutcome::AlreadyFinal);
        }

        // The hash vouches for the gateway's figure, so the mismatch is only
        // recorded for audit.
        if !reported_total_matches(intent.amount, &callback.total_amount) {
            tracing::warn!(
                intent_id = %intent.id,
                expected = intent.amount,
                reported = %callback.total_amount,
                "Callback total differs from the intent amount"
            );
        }

        let outcome = GatewayOutcome::from_callback_status(&callback.status);
        if outcome == GatewayOutcome::Failure {
            tx.finalize_intent(intent.id, outcome.target_status(), SeatStatus::Unassigned)
                .await?;
            tx.commit().await?;
            tracing::info!(intent_id = %intent.id, "Payment failed");
            return Ok(CallbackOutcome::PaymentFailed);
        }

        // The event row lock serializes this against manual admissions and
        // other callbacks for the same event, so the count below is current.
        let Some(target) = tx.lock_event(intent.event_id).await? else {
            // Flag the payment so an administrator sees it.
            tracing::error!(
                intent_id = %intent.id,
                event_id = %intent.event_id,
                "Paid intent references a missing event"
            );
            tx.finalize_intent(
                intent.id,
                PaymentIntentStatus::Succeeded,
                SeatStatus::OverCapacity,
            )
            .await?;
            tx.commit().await?;
            return Ok(CallbackOutcome::OverCapacity);
        };

        let already_seated = tx
            .get_membership(intent.user_id, intent.event_id)
            .await?
            .is_some_and(|m| m.is_active);

        if already_seated {
            tx.finalize_intent(intent.id, PaymentIntentStatus::Succeeded, SeatStatus::Seated)
                .await?;
            tx.commit().await?;
            return Ok(CallbackOutcome::Seated {
                newly_admitted: false,
            });
        }

        if let Some(capacity) = target.effective_capacity() {
            let active = tx.count_active(intent.event_id).await?;
            if capacity.is_full(active) {
                tx.finalize_intent(
                    intent.id,
                    PaymentIntentStatus::Succeeded,
                    SeatStatus::OverCapacity,
                )
                .await?;
                tx.commit().await?;
                tracing::warn!(
                    intent_id = %intent.id,
                    user_id = %intent.user_id,
                    event_id = %intent.event_id,
                    capacity = capacity.limit,
                    active,
                    "Paid intent could not be seated, flagged for reconciliation"
                );
                return Ok(CallbackOutcome::OverCapacity);
            }
        }

        let newly_admitted =
            activate_seat(tx.as_mut(), intent.user_id, intent.club_id, intent.event_id).await?;
        tx.finalize_intent(intent.id, PaymentIntentStatus::Succeeded, SeatStatus::Seated)
            .await?;
        tx.commit().await?;

        tracing::info!(
            intent_id = %intent.id,
            user_id = %intent.user_id,
            event_id = %intent.event_id,
            "Payment confirmed, seat activated"
        );

        if newly_admitted {
            self.notifier
                .notify_admitted(intent.user_id, intent.event_id);
        }

        Ok(CallbackOutcome::Seated { newly_admitted })
    }
}

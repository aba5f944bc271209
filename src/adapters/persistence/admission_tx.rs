//! Postgres unit of work for seat mutations.
//!
//! Lock order is intent, then event, then club. Every path that takes more
//! than one of these locks follows it.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    adapters::persistence::{
        PostgresPersistence,
        catalog::fetch_event_with_club,
        membership::{
            MEMBERSHIP_COLS, SUBSCRIPTION_COLS, count_active_members, fetch_membership,
            row_to_membership, row_to_subscription,
        },
        payment_intent::fetch_by_merchant_oid,
    },
    app_error::{AppError, AppResult},
    application::use_cases::admission_ledger::{
        AdmissionStore, AdmissionTx, EventWithClub, MembershipProfile, PaymentIntentProfile,
        SubscriptionProfile,
    },
    domain::entities::{
        membership::MembershipRole,
        payment_intent::{PaymentIntentStatus, SeatStatus},
    },
};

pub struct PgAdmissionTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AdmissionStore for PostgresPersistence {
    async fn begin(&self) -> AppResult<Box<dyn AdmissionTx>> {
        let tx = self.pool.begin().await.map_err(AppError::from)?;
        Ok(Box::new(PgAdmissionTx { tx }))
    }
}

#[async_trait]
impl AdmissionTx for PgAdmissionTx {
    async fn lock_event(&mut self, event_id: Uuid) -> AppResult<Option<EventWithClub>> {
        fetch_event_with_club(&mut *self.tx, event_id, true)
            .await
            .map_err(AppError::from)
    }

    async fn lock_intent(&mut self, merchant_oid: &str) -> AppResult<Option<PaymentIntentProfile>> {
        fetch_by_merchant_oid(&mut *self.tx, merchant_oid, true)
            .await
            .map_err(AppError::from)
    }

    async fn count_active(&mut self, event_id: Uuid) -> AppResult<i64> {
        count_active_members(&mut *self.tx, event_id)
            .await
            .map_err(AppError::from)
    }

    async fn get_membership(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<MembershipProfile>> {
        fetch_membership(&mut *self.tx, user_id, event_id)
            .await
            .map_err(AppError::from)
    }

    async fn finalize_intent(
        &mut self,
        intent_id: Uuid,
        status: PaymentIntentStatus,
        seat_status: SeatStatus,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payment_intents
            SET status = $2, seat_status = $3, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(intent_id)
        .bind(status)
        .bind(seat_status)
        .bind(PaymentIntentStatus::RequiresPayment)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_membership_active(
        &mut self,
        user_id: Uuid,
        club_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<MembershipProfile> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO memberships (user_id, event_id, club_id, is_active, joined_at, role)
            VALUES ($1, $2, $3, TRUE, CURRENT_TIMESTAMP, $4)
            ON CONFLICT (user_id, event_id) DO UPDATE SET
                joined_at = CASE WHEN memberships.is_active
                    THEN memberships.joined_at ELSE CURRENT_TIMESTAMP END,
                club_id = CASE WHEN memberships.is_active
                    THEN memberships.club_id ELSE EXCLUDED.club_id END,
                is_active = TRUE
            RETURNING {MEMBERSHIP_COLS}
            "#
        ))
        .bind(user_id)
        .bind(event_id)
        .bind(club_id)
        .bind(MembershipRole::Member)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(row_to_membership(row))
    }

    async fn upsert_subscription_active(
        &mut self,
        user_id: Uuid,
        club_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<SubscriptionProfile> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (user_id, event_id, club_id, active, started_at, canceled_at)
            VALUES ($1, $2, $3, TRUE, CURRENT_TIMESTAMP, NULL)
            ON CONFLICT (user_id, event_id) DO UPDATE SET
                started_at = CASE WHEN subscriptions.active
                    THEN subscriptions.started_at ELSE CURRENT_TIMESTAMP END,
                canceled_at = CASE WHEN subscriptions.active
                    THEN subscriptions.canceled_at ELSE NULL END,
                club_id = CASE WHEN subscriptions.active
                    THEN subscriptions.club_id ELSE EXCLUDED.club_id END,
                active = TRUE
            RETURNING {SUBSCRIPTION_COLS}
            "#
        ))
        .bind(user_id)
        .bind(event_id)
        .bind(club_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(row_to_subscription(row))
    }

    async fn deactivate_membership(&mut self, user_id: Uuid, event_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE memberships SET is_active = FALSE WHERE user_id = $1 AND event_id = $2")
            .bind(user_id)
            .bind(event_id)
            .execute(&mut *self.tx)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn deactivate_subscription(&mut self, user_id: Uuid, event_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET canceled_at = CASE WHEN active THEN CURRENT_TIMESTAMP ELSE canceled_at END,
                active = FALSE
            WHERE user_id = $1 AND event_id = $2
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn set_event_capacity(&mut self, event_id: Uuid, capacity: i32) -> AppResult<()> {
        sqlx::query("UPDATE events SET capacity = $2 WHERE id = $1")
            .bind(event_id)
            .bind(capacity)
            .execute(&mut *self.tx)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn set_club_capacity(&mut self, club_id: Uuid, capacity: i32) -> AppResult<()> {
        sqlx::query("UPDATE clubs SET capacity = $2 WHERE id = $1")
            .bind(club_id)
            .bind(capacity)
            .execute(&mut *self.tx)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn seat_over_capacity_intents(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payment_intents
            SET seat_status = $3, updated_at = CURRENT_TIMESTAMP
            WHERE user_id = $1 AND event_id = $2 AND seat_status = $4
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .bind(SeatStatus::Seated)
        .bind(SeatStatus::OverCapacity)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(AppError::from)
    }
}

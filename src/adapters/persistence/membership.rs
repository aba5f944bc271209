use async_trait::async_trait;
use sqlx::{PgExecutor, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::admission_ledger::{
        MembershipProfile, MembershipRepo, SubscriptionProfile,
    },
};

pub(super) const MEMBERSHIP_COLS: &str = "user_id, event_id, club_id, is_active, joined_at, role";
pub(super) const SUBSCRIPTION_COLS: &str =
    "user_id, event_id, club_id, active, started_at, canceled_at";

pub(super) fn row_to_membership(row: PgRow) -> MembershipProfile {
    MembershipProfile {
        user_id: row.get("user_id"),
        event_id: row.get("event_id"),
        club_id: row.get("club_id"),
        is_active: row.get("is_active"),
        joined_at: row.get("joined_at"),
        role: row.get("role"),
    }
}

pub(super) fn row_to_subscription(row: PgRow) -> SubscriptionProfile {
    SubscriptionProfile {
        user_id: row.get("user_id"),
        event_id: row.get("event_id"),
        club_id: row.get("club_id"),
        active: row.get("active"),
        started_at: row.get("started_at"),
        canceled_at: row.get("canceled_at"),
    }
}

pub(super) async fn count_active_members<'e>(
    executor: impl PgExecutor<'e>,
    event_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM memberships WHERE event_id = $1 AND is_active")
        .bind(event_id)
        .fetch_one(executor)
        .await
}

pub(super) async fn fetch_membership<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    event_id: Uuid,
) -> Result<Option<MembershipProfile>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {MEMBERSHIP_COLS} FROM memberships WHERE user_id = $1 AND event_id = $2"
    ))
    .bind(user_id)
    .bind(event_id)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(row_to_membership))
}

#[async_trait]
impl MembershipRepo for PostgresPersistence {
    async fn count_active(&self, event_id: Uuid) -> AppResult<i64> {
        count_active_members(&self.pool, event_id)
            .await
            .map_err(AppError::from)
    }

    async fn get(&self, user_id: Uuid, event_id: Uuid) -> AppResult<Option<MembershipProfile>> {
        fetch_membership(&self.pool, user_id, event_id)
            .await
            .map_err(AppError::from)
    }
}

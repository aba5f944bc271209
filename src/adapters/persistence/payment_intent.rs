use async_trait::async_trait;
use sqlx::{PgExecutor, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::admission_ledger::{
        CreatePaymentIntentInput, PaymentIntentProfile, PaymentIntentRepo,
    },
    domain::entities::payment_intent::{PaymentIntentStatus, SeatStatus},
};

pub(super) const INTENT_COLS: &str = r#"
    id, user_id, club_id, event_id, amount, status, seat_status, merchant_oid,
    created_at, updated_at
"#;

pub(super) fn row_to_intent(row: PgRow) -> PaymentIntentProfile {
    PaymentIntentProfile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        club_id: row.get("club_id"),
        event_id: row.get("event_id"),
        amount: row.get("amount"),
        status: row.get("status"),
        seat_status: row.get("seat_status"),
        merchant_oid: row.get("merchant_oid"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(super) async fn fetch_by_merchant_oid<'e>(
    executor: impl PgExecutor<'e>,
    merchant_oid: &str,
    lock: bool,
) -> Result<Option<PaymentIntentProfile>, sqlx::Error> {
    let sql = format!(
        "SELECT {INTENT_COLS} FROM payment_intents WHERE merchant_oid = $1{}",
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query(&sql)
        .bind(merchant_oid)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(row_to_intent))
}

#[async_trait]
impl PaymentIntentRepo for PostgresPersistence {
    async fn create(&self, input: &CreatePaymentIntentInput) -> AppResult<PaymentIntentProfile> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payment_intents
                (id, user_id, club_id, event_id, amount, status, seat_status, merchant_oid)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {INTENT_COLS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.club_id)
        .bind(input.event_id)
        .bind(input.amount)
        .bind(PaymentIntentStatus::RequiresPayment)
        .bind(SeatStatus::Unassigned)
        .bind(&input.merchant_oid)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row_to_intent(row))
    }

    async fn get_by_merchant_oid(
        &self,
        merchant_oid: &str,
    ) -> AppResult<Option<PaymentIntentProfile>> {
        fetch_by_merchant_oid(&self.pool, merchant_oid, false)
            .await
            .map_err(AppError::from)
    }

    async fn list_over_capacity(&self, event_id: Uuid) -> AppResult<Vec<PaymentIntentProfile>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {INTENT_COLS}
            FROM payment_intents
            WHERE event_id = $1 AND seat_status = $2
            ORDER BY created_at ASC
            "#
        ))
        .bind(event_id)
        .bind(SeatStatus::OverCapacity)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_intent).collect())
    }
}

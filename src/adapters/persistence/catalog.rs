use async_trait::async_trait;
use sqlx::{PgExecutor, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::admission_ledger::{
        CatalogRepo, ClubProfile, EventProfile, EventWithClub,
    },
};

const SELECT_EVENT_WITH_CLUB: &str = r#"
    SELECT e.id, e.club_id, e.title, e.capacity, e.price, e.owner_user_id,
           c.name AS club_name, c.capacity AS club_capacity, c.price AS club_price,
           c.owner_user_id AS club_owner_user_id
    FROM events e
    JOIN clubs c ON c.id = e.club_id
    WHERE e.id = $1
"#;

fn row_to_event_with_club(row: PgRow) -> EventWithClub {
    let club_id: Uuid = row.get("club_id");
    EventWithClub {
        event: EventProfile {
            id: row.get("id"),
            club_id,
            title: row.get("title"),
            capacity: row.get("capacity"),
            price: row.get("price"),
            owner_user_id: row.get("owner_user_id"),
        },
        club: ClubProfile {
            id: club_id,
            name: row.get("club_name"),
            capacity: row.get("club_capacity"),
            price: row.get("club_price"),
            owner_user_id: row.get("club_owner_user_id"),
        },
    }
}

/// Load an event with its club. With `lock`, both rows stay locked until the
/// surrounding transaction ends.
pub(super) async fn fetch_event_with_club<'e>(
    executor: impl PgExecutor<'e>,
    event_id: Uuid,
    lock: bool,
) -> Result<Option<EventWithClub>, sqlx::Error> {
    let sql = if lock {
        format!("{SELECT_EVENT_WITH_CLUB} FOR UPDATE OF e, c")
    } else {
        SELECT_EVENT_WITH_CLUB.to_string()
    };

    let row = sqlx::query(&sql)
        .bind(event_id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(row_to_event_with_club))
}

#[async_trait]
impl CatalogRepo for PostgresPersistence {
    async fn get_event_with_club(&self, event_id: Uuid) -> AppResult<Option<EventWithClub>> {
        fetch_event_with_club(&self.pool, event_id, false)
            .await
            .map_err(AppError::from)
    }
}

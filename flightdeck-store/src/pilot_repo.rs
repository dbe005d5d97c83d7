use async_trait::async_trait;
use sqlx::PgPool;

use flightdeck_core::models::Pilot;
use flightdeck_core::repository::{BoxError, PilotDirectory};

pub struct PostgresPilotDirectory {
    pool: PgPool,
}

impl PostgresPilotDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PilotRow {
    id: i64,
    airline_id: String,
    home_airport_id: String,
    curr_airport_id: Option<String>,
}

#[async_trait]
impl PilotDirectory for PostgresPilotDirectory {
    /// Authorized subfleets are the union of those granted by the pilot's
    /// rank and those covered by any of the pilot's type ratings.
    async fn find_pilot(&self, id: i64) -> Result<Option<Pilot>, BoxError> {
        let row: Option<PilotRow> = sqlx::query_as(
            "SELECT id, airline_id, home_airport_id, curr_airport_id FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let subfleets: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT sr.subfleet_id
            FROM users u
            JOIN subfleet_rank sr ON sr.rank_id = u.rank_id
            WHERE u.id = $1
            UNION
            SELECT ts.subfleet_id
            FROM typerating_user tu
            JOIN typerating_subfleet ts ON ts.typerating_id = tu.typerating_id
            WHERE tu.user_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Pilot {
            id: row.id,
            airline_id: row.airline_id,
            home_airport_id: row.home_airport_id,
            curr_airport_id: row.curr_airport_id,
            authorized_subfleets: subfleets.into_iter().map(|(s,)| s).collect(),
        }))
    }
}

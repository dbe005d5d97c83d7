use async_trait::async_trait;
use sqlx::PgPool;

use flightdeck_core::models::Briefing;
use flightdeck_core::repository::{BoxError, BriefingLookup};

/// Briefings are stored as the ACARS XML document returned by the planner.
pub const BRIEFING_CONTENT_TYPE: &str = "application/xml";

const LATEST_BRIEFING: &str = r#"
    SELECT id, user_id, flight_id, acars_xml
    FROM simbrief
    WHERE user_id = $1 AND flight_id = $2
    ORDER BY created_at DESC NULLS LAST, id DESC
    LIMIT 1
"#;

pub struct PostgresBriefingLookup {
    pool: PgPool,
}

impl PostgresBriefingLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BriefingRow {
    id: String,
    user_id: i64,
    flight_id: String,
    acars_xml: String,
}

#[async_trait]
impl BriefingLookup for PostgresBriefingLookup {
    async fn find(&self, pilot_id: i64, flight_id: &str) -> Result<Option<Briefing>, BoxError> {
        let row: Option<BriefingRow> = sqlx::query_as(LATEST_BRIEFING)
        .bind(pilot_id)
        .bind(flight_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Briefing {
            id: r.id,
            pilot_id: r.user_id,
            flight_id: r.flight_id,
            body: r.acars_xml,
            content_type: BRIEFING_CONTENT_TYPE.to_string(),
        }))
    }
}

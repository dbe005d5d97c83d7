use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use flightdeck_core::models::{Flight, NavFix, NavaidKind};
use flightdeck_core::repository::{BoxError, RouteExpander};

/// Expands a stored route string against the `navdata` table.
pub struct NavdataRouteExpander {
    pool: PgPool,
}

impl NavdataRouteExpander {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct NavaidRow {
    id: String,
    name: Option<String>,
    #[sqlx(rename = "type")]
    kind: String,
    lat: f64,
    lon: f64,
}

fn route_tokens(route: &str) -> Vec<String> {
    route.split_whitespace().map(|t| t.to_uppercase()).collect()
}

/// Puts looked-up navaids back into route order. Tokens with no navaid
/// (airways, SID/STAR names, speed/level groups) are skipped; an ident that
/// appears more than once in the table resolves to the first row returned.
fn order_fixes(tokens: &[String], rows: Vec<NavaidRow>) -> Vec<NavFix> {
    let mut by_id: HashMap<String, NavaidRow> = HashMap::new();
    for row in rows {
        by_id.entry(row.id.clone()).or_insert(row);
    }

    tokens
        .iter()
        .filter_map(|t| by_id.get(t))
        .enumerate()
        .map(|(i, row)| NavFix {
            sequence: i as u32 + 1,
            id: row.id.clone(),
            name: row.name.clone(),
            kind: row.kind.parse().unwrap_or(NavaidKind::Unknown),
            lat: row.lat,
            lon: row.lon,
        })
        .collect()
}

#[async_trait]
impl RouteExpander for NavdataRouteExpander {
    async fn expand(&self, flight: &Flight) -> Result<Vec<NavFix>, BoxError> {
        let Some(route) = flight.route.as_deref() else {
            return Ok(Vec::new());
        };
        let tokens = route_tokens(route);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<NavaidRow> = sqlx::query_as(
            "SELECT id, name, type, lat, lon FROM navdata WHERE id = ANY($1) ORDER BY id",
        )
        .bind(&tokens)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(flight_id = %flight.id, tokens = tokens.len(), found = rows.len(), "Expanded route");
        Ok(order_fixes(&tokens, rows))
    }
}

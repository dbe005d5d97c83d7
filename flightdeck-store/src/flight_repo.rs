use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use flightdeck_core::models::{Aircraft, Airline, BriefingRef, FareOffering, Flight, SubfleetOffering};
use flightdeck_core::repository::{BoxError, FlightRepository};
use flightdeck_core::search::{Clause, Field, FieldValue, Predicate, SearchCriteria};

const FLIGHT_COLUMNS: &str = "f.id, f.airline_id, f.flight_number, f.callsign, f.route_code, \
    f.route_leg, f.flight_type, f.dpt_airport_id, f.arr_airport_id, f.distance, f.route, \
    f.active, f.visible";

/// Newest first per pilot; rows without a timestamp lose to dated ones.
const BRIEFING_REFS: &str = r#"
    SELECT id, flight_id, created_at
    FROM simbrief
    WHERE user_id = $1 AND flight_id = ANY($2)
    ORDER BY created_at DESC NULLS LAST, id DESC
"#;

pub struct PostgresFlightRepository {
    pool: PgPool,
}

impl PostgresFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FlightRow {
    id: String,
    airline_id: String,
    flight_number: i32,
    callsign: Option<String>,
    route_code: Option<String>,
    route_leg: Option<i32>,
    flight_type: String,
    dpt_airport_id: String,
    arr_airport_id: String,
    distance: f64,
    route: Option<String>,
    active: bool,
    visible: bool,
}

#[derive(sqlx::FromRow)]
struct AirlineRow {
    id: String,
    icao: String,
    iata: Option<String>,
    name: String,
}

#[derive(sqlx::FromRow)]
struct OfferingRow {
    flight_id: String,
    id: i64,
    type_code: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct AircraftRow {
    id: i64,
    subfleet_id: i64,
    icao: String,
    registration: String,
    name: String,
    airport_id: Option<String>,
}

#[derive(sqlx::FromRow)]
struct FareRow {
    subfleet_id: i64,
    id: i64,
    code: String,
    name: String,
    capacity: i32,
    price: f64,
}

#[derive(sqlx::FromRow)]
struct FieldValueRow {
    flight_id: String,
    name: String,
    value: String,
}

#[derive(sqlx::FromRow)]
struct BriefingRefRow {
    id: String,
    flight_id: String,
    created_at: Option<DateTime<Utc>>,
}

/// Everything hanging off a page of flights, keyed by flight id.
#[derive(Default)]
struct Relations {
    airlines: HashMap<String, Airline>,
    offerings: HashMap<String, Vec<SubfleetOffering>>,
    field_values: HashMap<String, BTreeMap<String, String>>,
    briefings: HashMap<String, BriefingRef>,
}

impl FlightRow {
    fn into_flight(self, relations: &Relations) -> Flight {
        Flight {
            airline: relations.airlines.get(&self.airline_id).cloned(),
            field_values: relations.field_values.get(&self.id).cloned().unwrap_or_default(),
            subfleets: relations.offerings.get(&self.id).cloned().unwrap_or_default(),
            briefing: relations.briefings.get(&self.id).cloned(),
            id: self.id,
            airline_id: self.airline_id,
            flight_number: self.flight_number,
            callsign: self.callsign,
            route_code: self.route_code,
            route_leg: self.route_leg,
            flight_type: self.flight_type,
            dpt_airport_id: self.dpt_airport_id,
            arr_airport_id: self.arr_airport_id,
            distance: self.distance,
            route: self.route,
            active: self.active,
            visible: self.visible,
        }
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, criteria: &SearchCriteria) {
    qb.push(" WHERE TRUE");
    for clause in &criteria.clauses {
        push_clause(qb, clause);
    }
}

fn push_clause(qb: &mut QueryBuilder<'_, Postgres>, clause: &Clause) {
    let column = clause.field.column();
    match (&clause.field, &clause.predicate) {
        (Field::Subfleet, Predicate::Equals(FieldValue::Int(id))) => {
            qb.push(" AND EXISTS (SELECT 1 FROM flight_subfleet fs WHERE fs.flight_id = f.id AND fs.subfleet_id = ");
            qb.push_bind(*id);
            qb.push(")");
        }
        // Anything else against the join table cannot be expressed; match nothing.
        (Field::Subfleet, _) => {
            qb.push(" AND FALSE");
        }
        (_, Predicate::Equals(value)) => {
            qb.push(format!(" AND f.{} = ", column));
            match value {
                FieldValue::Bool(b) => qb.push_bind(*b),
                FieldValue::Int(i) => qb.push_bind(*i),
                FieldValue::Text(s) => qb.push_bind(s.clone()),
            };
        }
        (_, Predicate::Contains(needle)) => {
            qb.push(format!(" AND f.{}::text ILIKE ", column));
            qb.push_bind(format!("%{}%", escape_like(needle)));
        }
        (_, Predicate::AtLeast(v)) => {
            qb.push(format!(" AND f.{} >= ", column));
            qb.push_bind(*v);
        }
        (_, Predicate::AtMost(v)) => {
            qb.push(format!(" AND f.{} <= ", column));
            qb.push_bind(*v);
        }
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn count_query(criteria: &SearchCriteria) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM flights f");
    push_where(&mut qb, criteria);
    qb
}

fn page_query(criteria: &SearchCriteria) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM flights f", FLIGHT_COLUMNS));
    push_where(&mut qb, criteria);
    qb.push(" ORDER BY f.flight_number, f.id LIMIT ");
    qb.push_bind(criteria.page.per_page as i64);
    qb.push(" OFFSET ");
    qb.push_bind(criteria.page.offset() as i64);
    qb
}

impl PostgresFlightRepository {
    async fn load_relations(
        &self,
        rows: &[FlightRow],
        pilot_id: Option<i64>,
    ) -> Result<Relations, sqlx::Error> {
        let mut relations = Relations::default();
        if rows.is_empty() {
            return Ok(relations);
        }

        let flight_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut airline_ids: Vec<String> = rows.iter().map(|r| r.airline_id.clone()).collect();
        airline_ids.sort();
        airline_ids.dedup();

        let airlines: Vec<AirlineRow> =
            sqlx::query_as("SELECT id, icao, iata, name FROM airlines WHERE id = ANY($1)")
                .bind(&airline_ids)
                .fetch_all(&self.pool)
                .await?;
        for a in airlines {
            relations.airlines.insert(
                a.id.clone(),
                Airline { id: a.id, icao: a.icao, iata: a.iata, name: a.name },
            );
        }

        let offerings: Vec<OfferingRow> = sqlx::query_as(
            r#"
            SELECT fs.flight_id, s.id, s.type AS type_code, s.name
            FROM flight_subfleet fs
            JOIN subfleets s ON s.id = fs.subfleet_id
            WHERE fs.flight_id = ANY($1)
            ORDER BY fs.flight_id, fs.position, s.id
            "#,
        )
        .bind(&flight_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut subfleet_ids: Vec<i64> = offerings.iter().map(|o| o.id).collect();
        subfleet_ids.sort_unstable();
        subfleet_ids.dedup();

        let mut aircraft: HashMap<i64, Vec<Aircraft>> = HashMap::new();
        let mut fares: HashMap<i64, Vec<FareOffering>> = HashMap::new();

        if !subfleet_ids.is_empty() {
            let rows: Vec<AircraftRow> = sqlx::query_as(
                "SELECT id, subfleet_id, icao, registration, name, airport_id FROM aircraft WHERE subfleet_id = ANY($1) ORDER BY id",
            )
            .bind(&subfleet_ids)
            .fetch_all(&self.pool)
            .await?;
            for a in rows {
                aircraft.entry(a.subfleet_id).or_default().push(Aircraft {
                    id: a.id,
                    icao: a.icao,
                    registration: a.registration,
                    name: a.name,
                    airport_id: a.airport_id,
                });
            }

            // Pivot overrides win over the fare's own capacity and price.
            let rows: Vec<FareRow> = sqlx::query_as(
                r#"
                SELECT sf.subfleet_id, fa.id, fa.code, fa.name,
                       COALESCE(sf.capacity, fa.capacity) AS capacity,
                       COALESCE(sf.price, fa.price) AS price
                FROM subfleet_fare sf
                JOIN fares fa ON fa.id = sf.fare_id
                WHERE sf.subfleet_id = ANY($1)
                ORDER BY sf.subfleet_id, fa.id
                "#,
            )
            .bind(&subfleet_ids)
            .fetch_all(&self.pool)
            .await?;
            for f in rows {
                fares.entry(f.subfleet_id).or_default().push(FareOffering {
                    id: f.id,
                    code: f.code,
                    name: f.name,
                    capacity: f.capacity,
                    price: f.price,
                });
            }
        }

        for o in offerings {
            relations.offerings.entry(o.flight_id).or_default().push(SubfleetOffering {
                id: o.id,
                type_code: o.type_code,
                name: o.name,
                aircraft: aircraft.get(&o.id).cloned().unwrap_or_default(),
                fares: fares.get(&o.id).cloned().unwrap_or_default(),
            });
        }

        let values: Vec<FieldValueRow> = sqlx::query_as(
            "SELECT flight_id, name, value FROM flight_field_values WHERE flight_id = ANY($1)",
        )
        .bind(&flight_ids)
        .fetch_all(&self.pool)
        .await?;
        for v in values {
            relations.field_values.entry(v.flight_id).or_default().insert(v.name, v.value);
        }

        if let Some(pilot_id) = pilot_id {
            let briefings: Vec<BriefingRefRow> = sqlx::query_as(BRIEFING_REFS)
            .bind(pilot_id)
            .bind(&flight_ids)
            .fetch_all(&self.pool)
            .await?;
            // Newest first, so keep the first seen per flight.
            for b in briefings {
                relations
                    .briefings
                    .entry(b.flight_id)
                    .or_insert(BriefingRef { id: b.id, generated_at: b.created_at });
            }
        }

        Ok(relations)
    }
}

#[async_trait]
impl FlightRepository for PostgresFlightRepository {
    async fn find_flight(
        &self,
        id: &str,
        pilot_id: Option<i64>,
    ) -> Result<Option<Flight>, BoxError> {
        let sql = format!("SELECT {} FROM flights f WHERE f.id = $1", FLIGHT_COLUMNS);
        let row: Option<FlightRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let relations = self.load_relations(std::slice::from_ref(&row), pilot_id).await?;
        Ok(Some(row.into_flight(&relations)))
    }

    async fn search_flights(
        &self,
        criteria: &SearchCriteria,
        pilot_id: i64,
    ) -> Result<(Vec<Flight>, u64), BoxError> {
        let mut count = count_query(criteria);
        let (total,): (i64,) = count
            .build_query_as()
            .fetch_one(&self.pool)
            .await?;

        let mut page = page_query(criteria);
        let rows: Vec<FlightRow> = page
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        let relations = self.load_relations(&rows, Some(pilot_id)).await?;
        let flights = rows.into_iter().map(|r| r.into_flight(&relations)).collect();

        Ok((flights, total.max(0) as u64))
    }
}

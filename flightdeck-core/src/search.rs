use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Flight, Pilot};

/// Raw query string parameters as received from the caller.
pub type SearchParams = HashMap<String, String>;

pub const IGNORE_RESTRICTIONS: &str = "ignore_restrictions";

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// Policy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKey {
    RestrictToCompany,
    OnlyFlightsFromCurrent,
}

impl PolicyKey {
    pub const ALL: [PolicyKey; 2] = [PolicyKey::RestrictToCompany, PolicyKey::OnlyFlightsFromCurrent];

    /// Key in the tenant settings table.
    pub fn setting_key(&self) -> &'static str {
        match self {
            PolicyKey::RestrictToCompany => "pilots.restrict_to_company",
            PolicyKey::OnlyFlightsFromCurrent => "pilots.only_flights_from_current",
        }
    }
}

/// Snapshot of the tenant-wide search toggles, taken once per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPolicy {
    pub restrict_to_company: bool,
    pub only_flights_from_current: bool,
}

impl SearchPolicy {
    pub fn set(&mut self, key: PolicyKey, enabled: bool) {
        match key {
            PolicyKey::RestrictToCompany => self.restrict_to_company = enabled,
            PolicyKey::OnlyFlightsFromCurrent => self.only_flights_from_current = enabled,
        }
    }
}

// ============================================================================
// Clauses
// ============================================================================

/// Catalog fields a clause may target. Anything not listed here cannot be
/// filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Active,
    Visible,
    Airline,
    FlightNumber,
    Callsign,
    FlightType,
    RouteCode,
    DptAirport,
    ArrAirport,
    Distance,
    Subfleet,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Active => "active",
            Field::Visible => "visible",
            Field::Airline => "airline_id",
            Field::FlightNumber => "flight_number",
            Field::Callsign => "callsign",
            Field::FlightType => "flight_type",
            Field::RouteCode => "route_code",
            Field::DptAirport => "dpt_airport_id",
            Field::ArrAirport => "arr_airport_id",
            Field::Distance => "distance",
            Field::Subfleet => "subfleet_id",
        }
    }

    /// Fields reachable through the free-form `search=field:value` parameter.
    fn searchable(name: &str) -> Option<Field> {
        match name {
            "flight_number" => Some(Field::FlightNumber),
            "callsign" => Some(Field::Callsign),
            "route_code" => Some(Field::RouteCode),
            "dpt_airport_id" => Some(Field::DptAirport),
            "arr_airport_id" => Some(Field::ArrAirport),
            _ => None,
        }
    }

    fn read(&self, flight: &Flight) -> Option<FieldValue> {
        match self {
            Field::Id => Some(FieldValue::Text(flight.id.clone())),
            Field::Active => Some(FieldValue::Bool(flight.active)),
            Field::Visible => Some(FieldValue::Bool(flight.visible)),
            Field::Airline => Some(FieldValue::Text(flight.airline_id.clone())),
            Field::FlightNumber => Some(FieldValue::Int(flight.flight_number as i64)),
            Field::Callsign => flight.callsign.clone().map(FieldValue::Text),
            Field::FlightType => Some(FieldValue::Text(flight.flight_type.clone())),
            Field::RouteCode => flight.route_code.clone().map(FieldValue::Text),
            Field::DptAirport => Some(FieldValue::Text(flight.dpt_airport_id.clone())),
            Field::ArrAirport => Some(FieldValue::Text(flight.arr_airport_id.clone())),
            Field::Distance | Field::Subfleet => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum Predicate {
    Equals(FieldValue),
    /// Case-insensitive substring match.
    Contains(String),
    AtLeast(f64),
    AtMost(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseOrigin {
    Baseline,
    Policy,
    AdHoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub field: Field,
    pub predicate: Predicate,
    pub origin: ClauseOrigin,
}

impl Clause {
    pub fn equals(field: Field, value: FieldValue, origin: ClauseOrigin) -> Self {
        Self { field, predicate: Predicate::Equals(value), origin }
    }

    /// Evaluate the clause against an already loaded flight.
    pub fn matches(&self, flight: &Flight) -> bool {
        match (&self.field, &self.predicate) {
            (Field::Subfleet, Predicate::Equals(FieldValue::Int(id))) => {
                flight.subfleets.iter().any(|s| s.id == *id)
            }
            (Field::Distance, Predicate::AtLeast(min)) => flight.distance >= *min,
            (Field::Distance, Predicate::AtMost(max)) => flight.distance <= *max,
            (field, Predicate::Equals(value)) => field.read(flight).as_ref() == Some(value),
            (field, Predicate::Contains(needle)) => field
                .read(flight)
                .map(|v| v.to_string().to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            _ => false,
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.per_page as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PAGE_SIZE }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub current_page: u32,
    pub per_page: u32,
    pub last_page: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, request: PageRequest) -> Self {
        let per_page = request.per_page.max(1) as u64;
        let last_page = total.div_ceil(per_page).max(1) as u32;
        Self {
            data,
            meta: PageMeta {
                total,
                current_page: request.page,
                per_page: request.per_page,
                last_page,
                has_more: request.page < last_page,
            },
        }
    }
}

// ============================================================================
// Criteria
// ============================================================================

/// Everything needed to run one catalog scan. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchCriteria {
    /// Baseline, then policy, then ad-hoc clauses. All are AND-ed.
    pub clauses: Vec<Clause>,
    pub bypass: bool,
    pub page: PageRequest,
}

impl SearchCriteria {
    pub fn matches(&self, flight: &Flight) -> bool {
        self.clauses.iter().all(|c| c.matches(flight))
    }

    pub fn clauses_from(&self, origin: ClauseOrigin) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(move |c| c.origin == origin)
    }

    /// Equality value pinned on `field` by a clause of the given origin.
    pub fn pinned(&self, field: Field, origin: ClauseOrigin) -> Option<&FieldValue> {
        self.clauses_from(origin).find_map(|c| match (&c.field, &c.predicate) {
            (f, Predicate::Equals(v)) if *f == field => Some(v),
            _ => None,
        })
    }
}

/// Turns policy, pilot and raw parameters into [`SearchCriteria`].
#[derive(Debug, Clone, Copy)]
pub struct CriteriaBuilder {
    page_size: u32,
    max_page_size: u32,
}

impl Default for CriteriaBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_MAX_PAGE_SIZE)
    }
}

impl CriteriaBuilder {
    pub fn new(page_size: u32, max_page_size: u32) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            page_size: page_size.clamp(1, max_page_size),
            max_page_size,
        }
    }

    pub fn build(&self, policy: &SearchPolicy, pilot: &Pilot, params: &SearchParams) -> SearchCriteria {
        let mut clauses = vec![
            Clause::equals(Field::Active, FieldValue::Bool(true), ClauseOrigin::Baseline),
            Clause::equals(Field::Visible, FieldValue::Bool(true), ClauseOrigin::Baseline),
        ];

        let bypass = bypass_requested(params);
        if !bypass {
            if policy.restrict_to_company {
                clauses.push(Clause::equals(
                    Field::Airline,
                    FieldValue::Text(pilot.airline_id.clone()),
                    ClauseOrigin::Policy,
                ));
            }
            if policy.only_flights_from_current {
                clauses.push(Clause::equals(
                    Field::DptAirport,
                    FieldValue::Text(pilot.current_airport().to_string()),
                    ClauseOrigin::Policy,
                ));
            }
        }

        clauses.extend(named_clauses(params));
        clauses.extend(pattern_clauses(params));

        SearchCriteria {
            clauses,
            bypass,
            page: self.page_request(params),
        }
    }

    fn page_request(&self, params: &SearchParams) -> PageRequest {
        let page = filled(params, "page")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1)
            .max(1);
        let per_page = filled(params, "limit")
            .and_then(|v| v.parse::<u32>().ok())
            .map(|v| v.clamp(1, self.max_page_size))
            .unwrap_or(self.page_size);
        PageRequest { page, per_page }
    }
}

/// Present and non-blank after trimming.
fn filled<'a>(params: &'a SearchParams, key: &str) -> Option<&'a str> {
    params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Only a filled value other than the literal `"0"` relaxes the policy clauses.
fn bypass_requested(params: &SearchParams) -> bool {
    matches!(filled(params, IGNORE_RESTRICTIONS), Some(v) if v != "0")
}

fn named_clauses(params: &SearchParams) -> Vec<Clause> {
    let mut out = Vec::new();
    let mut push = |field: Field, predicate: Predicate| {
        out.push(Clause { field, predicate, origin: ClauseOrigin::AdHoc });
    };
    let text = |v: &str| Predicate::Equals(FieldValue::Text(v.to_string()));
    let upper = |v: &str| Predicate::Equals(FieldValue::Text(v.to_uppercase()));

    if let Some(v) = filled(params, "flight_id") {
        push(Field::Id, text(v));
    }
    if let Some(v) = filled(params, "airline_id") {
        push(Field::Airline, text(v));
    }
    if let Some(n) = filled(params, "flight_number").and_then(|v| v.parse::<i64>().ok()) {
        push(Field::FlightNumber, Predicate::Equals(FieldValue::Int(n)));
    }
    if let Some(v) = filled(params, "callsign") {
        push(Field::Callsign, text(v));
    }
    if let Some(v) = filled(params, "flight_type").filter(|v| *v != "0") {
        push(Field::FlightType, text(v));
    }
    if let Some(v) = filled(params, "route_code") {
        push(Field::RouteCode, text(v));
    }
    if let Some(v) = filled(params, "dep_icao").or_else(|| filled(params, "dpt_airport_id")) {
        push(Field::DptAirport, upper(v));
    }
    if let Some(v) = filled(params, "arr_icao").or_else(|| filled(params, "arr_airport_id")) {
        push(Field::ArrAirport, upper(v));
    }
    if let Some(d) = filled(params, "dgt").and_then(distance) {
        push(Field::Distance, Predicate::AtLeast(d));
    }
    if let Some(d) = filled(params, "dlt").and_then(distance) {
        push(Field::Distance, Predicate::AtMost(d));
    }
    if let Some(id) = filled(params, "subfleet_id").and_then(|v| v.parse::<i64>().ok()) {
        push(Field::Subfleet, Predicate::Equals(FieldValue::Int(id)));
    }

    out
}

/// `NaN` and infinities parse as `f64` but are not distances.
fn distance(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|d| d.is_finite())
}

/// `search=field:value;field:value` becomes one substring clause per pair.
/// Pairs naming a field outside the searchable set are dropped.
fn pattern_clauses(params: &SearchParams) -> Vec<Clause> {
    let Some(raw) = filled(params, "search") else {
        return Vec::new();
    };

    raw.split(';')
        .filter_map(|pair| pair.split_once(':'))
        .filter_map(|(name, value)| {
            let field = Field::searchable(name.trim())?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            Some(Clause {
                field,
                predicate: Predicate::Contains(value.to_string()),
                origin: ClauseOrigin::AdHoc,
            })
        })
        .collect()
}

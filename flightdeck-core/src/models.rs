use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled flight joined with its airline, subfleets, aircraft, fares and
/// custom field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub id: String,
    pub airline_id: String,
    pub flight_number: i32,
    pub callsign: Option<String>,
    pub route_code: Option<String>,
    pub route_leg: Option<i32>,
    pub flight_type: String,
    pub dpt_airport_id: String,
    pub arr_airport_id: String,
    /// Great-circle distance in nautical miles.
    pub distance: f64,
    /// Stored route string, e.g. `"GREKI J60 MERIT"`.
    pub route: Option<String>,
    pub active: bool,
    pub visible: bool,
    pub airline: Option<Airline>,
    #[serde(default)]
    pub field_values: BTreeMap<String, String>,
    #[serde(default)]
    pub subfleets: Vec<SubfleetOffering>,
    /// The requesting pilot's own briefing for this flight, if one was generated.
    pub briefing: Option<BriefingRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    pub id: String,
    pub icao: String,
    pub iata: Option<String>,
    pub name: String,
}

/// One equipment group offered on a flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubfleetOffering {
    pub id: i64,
    pub type_code: String,
    pub name: String,
    #[serde(default)]
    pub aircraft: Vec<Aircraft>,
    #[serde(default)]
    pub fares: Vec<FareOffering>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aircraft {
    pub id: i64,
    pub icao: String,
    pub registration: String,
    pub name: String,
    pub airport_id: Option<String>,
}

/// A priced seating class nested under a subfleet offering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareOffering {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub capacity: i32,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefingRef {
    pub id: String,
    pub generated_at: Option<DateTime<Utc>>,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pilot {
    pub id: i64,
    pub airline_id: String,
    pub home_airport_id: String,
    pub curr_airport_id: Option<String>,
    /// Subfleets this pilot may operate. Computed outside the core.
    #[serde(default)]
    pub authorized_subfleets: BTreeSet<i64>,
}

impl Pilot {
    /// Where the pilot currently is; pilots that never filed a flight are
    /// still sitting at their home airport.
    pub fn current_airport(&self) -> &str {
        self.curr_airport_id
            .as_deref()
            .unwrap_or(&self.home_airport_id)
    }

    pub fn may_fly(&self, subfleet_id: i64) -> bool {
        self.authorized_subfleets.contains(&subfleet_id)
    }
}

/// A stored planning document for one pilot and one flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Briefing {
    pub id: String,
    pub pilot_id: i64,
    pub flight_id: String,
    pub body: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavaidKind {
    Vor,
    VorDme,
    Ndb,
    Dme,
    Fix,
    Airport,
    Unknown,
}

impl FromStr for NavaidKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "VOR" => NavaidKind::Vor,
            "VORDME" | "VOR_DME" | "VOR/DME" => NavaidKind::VorDme,
            "NDB" => NavaidKind::Ndb,
            "DME" => NavaidKind::Dme,
            "FIX" | "WAYPOINT" => NavaidKind::Fix,
            "AIRPORT" | "APT" => NavaidKind::Airport,
            _ => NavaidKind::Unknown,
        })
    }
}

impl fmt::Display for NavaidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NavaidKind::Vor => "VOR",
            NavaidKind::VorDme => "VOR_DME",
            NavaidKind::Ndb => "NDB",
            NavaidKind::Dme => "DME",
            NavaidKind::Fix => "FIX",
            NavaidKind::Airport => "AIRPORT",
            NavaidKind::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// A single waypoint of an expanded route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavFix {
    pub sequence: u32,
    pub id: String,
    pub name: Option<String>,
    pub kind: NavaidKind,
    pub lat: f64,
    pub lon: f64,
}

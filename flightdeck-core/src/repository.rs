use async_trait::async_trait;

use crate::models::{Briefing, Flight, NavFix, Pilot};
use crate::search::{PolicyKey, SearchCriteria};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Catalog access for flight aggregates
#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// Loads one aggregate by id with no visibility filtering. `pilot_id`
    /// scopes the attached briefing reference; `None` attaches none.
    async fn find_flight(
        &self,
        id: &str,
        pilot_id: Option<i64>,
    ) -> Result<Option<Flight>, BoxError>;

    /// Runs every clause of `criteria` AND-ed together and returns one page of
    /// aggregates plus the total number of matches.
    async fn search_flights(
        &self,
        criteria: &SearchCriteria,
        pilot_id: i64,
    ) -> Result<(Vec<Flight>, u64), BoxError>;
}

/// Resolves an authenticated caller into a pilot with its authorized subfleets
#[async_trait]
pub trait PilotDirectory: Send + Sync {
    async fn find_pilot(
        &self,
        id: i64,
    ) -> Result<Option<Pilot>, BoxError>;
}

/// Tenant-wide toggles
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get(
        &self,
        key: PolicyKey,
    ) -> Result<bool, BoxError>;
}

/// Stored briefings, keyed by pilot and flight
#[async_trait]
pub trait BriefingLookup: Send + Sync {
    async fn find(
        &self,
        pilot_id: i64,
        flight_id: &str,
    ) -> Result<Option<Briefing>, BoxError>;
}

/// Decodes a flight's stored route into waypoints
#[async_trait]
pub trait RouteExpander: Send + Sync {
    async fn expand(
        &self,
        flight: &Flight,
    ) -> Result<Vec<NavFix>, BoxError>;
}

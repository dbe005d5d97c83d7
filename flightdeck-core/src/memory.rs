//! In-process adapters for every store trait, used by tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::models::{Briefing, BriefingRef, Flight, NavFix, Pilot};
use crate::repository::{BoxError, BriefingLookup, FlightRepository, PilotDirectory, PolicyStore, RouteExpander};
use crate::search::{PolicyKey, SearchCriteria, SearchPolicy};

/// Evaluates criteria clause by clause over a fixed list of flights, keeping
/// insertion order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFlightRepository {
    flights: Vec<Flight>,
    briefing_refs: HashMap<(i64, String), BriefingRef>,
}

impl InMemoryFlightRepository {
    pub fn new(flights: Vec<Flight>) -> Self {
        Self { flights, briefing_refs: HashMap::new() }
    }

    pub fn with_briefing_ref(mut self, pilot_id: i64, flight_id: &str, briefing: BriefingRef) -> Self {
        self.briefing_refs.insert((pilot_id, flight_id.to_string()), briefing);
        self
    }

    fn attach_briefing(&self, mut flight: Flight, pilot_id: Option<i64>) -> Flight {
        flight.briefing = pilot_id
            .and_then(|pid| self.briefing_refs.get(&(pid, flight.id.clone())))
            .cloned();
        flight
    }
}

#[async_trait]
impl FlightRepository for InMemoryFlightRepository {
    async fn find_flight(
        &self,
        id: &str,
        pilot_id: Option<i64>,
    ) -> Result<Option<Flight>, BoxError> {
        Ok(self
            .flights
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .map(|f| self.attach_briefing(f, pilot_id)))
    }

    async fn search_flights(
        &self,
        criteria: &SearchCriteria,
        pilot_id: i64,
    ) -> Result<(Vec<Flight>, u64), BoxError> {
        let matching: Vec<&Flight> = self.flights.iter().filter(|f| criteria.matches(f)).collect();
        let total = matching.len() as u64;

        let page = matching
            .into_iter()
            .skip(criteria.page.offset() as usize)
            .take(criteria.page.per_page as usize)
            .map(|f| self.attach_briefing(f.clone(), Some(pilot_id)))
            .collect();

        Ok((page, total))
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryPilotDirectory {
    pilots: HashMap<i64, Pilot>,
}

impl InMemoryPilotDirectory {
    pub fn new(pilots: Vec<Pilot>) -> Self {
        Self { pilots: pilots.into_iter().map(|p| (p.id, p)).collect() }
    }
}

#[async_trait]
impl PilotDirectory for InMemoryPilotDirectory {
    async fn find_pilot(&self, id: i64) -> Result<Option<Pilot>, BoxError> {
        Ok(self.pilots.get(&id).cloned())
    }
}

/// Fixed policy, typically taken from configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticPolicyStore {
    policy: SearchPolicy,
}

impl StaticPolicyStore {
    pub fn new(policy: SearchPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl PolicyStore for StaticPolicyStore {
    async fn get(&self, key: PolicyKey) -> Result<bool, BoxError> {
        Ok(match key {
            PolicyKey::RestrictToCompany => self.policy.restrict_to_company,
            PolicyKey::OnlyFlightsFromCurrent => self.policy.only_flights_from_current,
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryBriefings {
    briefings: HashMap<(i64, String), Briefing>,
}

impl InMemoryBriefings {
    pub fn with_briefing(mut self, briefing: Briefing) -> Self {
        self.briefings.insert((briefing.pilot_id, briefing.flight_id.clone()), briefing);
        self
    }
}

#[async_trait]
impl BriefingLookup for InMemoryBriefings {
    async fn find(&self, pilot_id: i64, flight_id: &str) -> Result<Option<Briefing>, BoxError> {
        Ok(self.briefings.get(&(pilot_id, flight_id.to_string())).cloned())
    }
}

/// Pre-expanded routes keyed by flight id; unknown flights expand to nothing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRoutes {
    routes: HashMap<String, Vec<NavFix>>,
}

impl InMemoryRoutes {
    pub fn with_route(mut self, flight_id: &str, fixes: Vec<NavFix>) -> Self {
        self.routes.insert(flight_id.to_string(), fixes);
        self
    }
}

#[async_trait]
impl RouteExpander for InMemoryRoutes {
    async fn expand(&self, flight: &Flight) -> Result<Vec<NavFix>, BoxError> {
        Ok(self.routes.get(&flight.id).cloned().unwrap_or_default())
    }
}

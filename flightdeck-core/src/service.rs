use std::sync::Arc;

use tracing::{debug, error, info};

use crate::eligibility::EligibilityFilter;
use crate::models::{Briefing, Flight, NavFix, Pilot};
use crate::repository::{BriefingLookup, FlightRepository, PolicyStore, RouteExpander};
use crate::search::{CriteriaBuilder, Page, PolicyKey, SearchParams, SearchPolicy};
use crate::{CoreError, CoreResult};

/// Pilot-facing flight lookups. Every flight handed back has been through
/// [`EligibilityFilter`].
#[derive(Clone)]
pub struct FlightSearchService {
    flights: Arc<dyn FlightRepository>,
    policies: Arc<dyn PolicyStore>,
    briefings: Arc<dyn BriefingLookup>,
    routes: Arc<dyn RouteExpander>,
    criteria: CriteriaBuilder,
}

impl FlightSearchService {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        policies: Arc<dyn PolicyStore>,
        briefings: Arc<dyn BriefingLookup>,
        routes: Arc<dyn RouteExpander>,
        criteria: CriteriaBuilder,
    ) -> Self {
        Self { flights, policies, briefings, routes, criteria }
    }

    /// Read both search toggles into a snapshot for one request.
    pub async fn load_policy(&self) -> CoreResult<SearchPolicy> {
        let mut policy = SearchPolicy::default();
        for key in PolicyKey::ALL {
            let enabled = self.policies.get(key).await.map_err(unavailable)?;
            policy.set(key, enabled);
        }
        Ok(policy)
    }

    /// Direct lookup skips the active/visible baseline and the policy clauses.
    pub async fn get_by_id(&self, id: &str, pilot: &Pilot) -> CoreResult<Flight> {
        let flight = self
            .flights
            .find_flight(id, Some(pilot.id))
            .await
            .map_err(unavailable)?
            .ok_or_else(|| CoreError::NotFound(format!("Flight {}", id)))?;

        Ok(EligibilityFilter::apply(flight, pilot))
    }

    pub async fn search(
        &self,
        policy: &SearchPolicy,
        pilot: &Pilot,
        params: &SearchParams,
    ) -> CoreResult<Page<Flight>> {
        let criteria = self.criteria.build(policy, pilot, params);
        debug!(
            pilot_id = pilot.id,
            clauses = criteria.clauses.len(),
            bypass = criteria.bypass,
            page = criteria.page.page,
            "Searching flights"
        );

        let (mut flights, total) = self
            .flights
            .search_flights(&criteria, pilot.id)
            .await
            .map_err(unavailable)?;

        for flight in flights.iter_mut() {
            EligibilityFilter::apply_in_place(flight, pilot);
        }

        info!(pilot_id = pilot.id, returned = flights.len(), total, "Flight search complete");
        Ok(Page::new(flights, total, criteria.page))
    }

    /// The flight is loaded unfiltered; the expander is never called for an
    /// unknown id.
    pub async fn get_route(&self, id: &str) -> CoreResult<Vec<NavFix>> {
        let flight = self
            .flights
            .find_flight(id, None)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| CoreError::NotFound(format!("Flight {}", id)))?;

        self.routes.expand(&flight).await.map_err(unavailable)
    }

    pub async fn get_briefing(&self, id: &str, pilot: &Pilot) -> CoreResult<Briefing> {
        self.briefings
            .find(pilot.id, id)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| CoreError::NotFound("Flight briefing".to_string()))
    }
}

fn unavailable(err: crate::repository::BoxError) -> CoreError {
    error!("Catalog store failure: {}", err);
    CoreError::ServiceUnavailable(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryBriefings, InMemoryFlightRepository, InMemoryRoutes, StaticPolicyStore,
    };
    use crate::models::{BriefingRef, NavaidKind, SubfleetOffering};
    use crate::repository::BoxError;
    use crate::search::SearchCriteria;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenCatalog;

    #[async_trait]
    impl FlightRepository for BrokenCatalog {
        async fn find_flight(&self, _id: &str, _pilot_id: Option<i64>) -> Result<Option<Flight>, BoxError> {
            Err("connection refused".into())
        }

        async fn search_flights(
            &self,
            _criteria: &SearchCriteria,
            _pilot_id: i64,
        ) -> Result<(Vec<Flight>, u64), BoxError> {
            Err("connection refused".into())
        }
    }

    #[derive(Default)]
    struct CountingRoutes {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RouteExpander for CountingRoutes {
        async fn expand(&self, _flight: &Flight) -> Result<Vec<NavFix>, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn subfleet(id: i64) -> SubfleetOffering {
        SubfleetOffering {
            id,
            type_code: "B738".to_string(),
            name: format!("Subfleet {}", id),
            aircraft: Vec::new(),
            fares: Vec::new(),
        }
    }

    fn flight(id: &str, airline: &str, dpt: &str, active: bool, visible: bool) -> Flight {
        Flight {
            id: id.to_string(),
            airline_id: airline.to_string(),
            flight_number: 100,
            callsign: None,
            route_code: None,
            route_leg: None,
            flight_type: "J".to_string(),
            dpt_airport_id: dpt.to_string(),
            arr_airport_id: "KBOS".to_string(),
            distance: 163.0,
            route: Some("GREKI J60 MERIT".to_string()),
            active,
            visible,
            airline: None,
            field_values: Default::default(),
            subfleets: vec![subfleet(101), subfleet(205)],
            briefing: None,
        }
    }

    fn pilot() -> Pilot {
        Pilot {
            id: 42,
            airline_id: "NGA".to_string(),
            home_airport_id: "KATL".to_string(),
            curr_airport_id: Some("KJFK".to_string()),
            authorized_subfleets: BTreeSet::from([101]),
        }
    }

    fn catalog() -> Vec<Flight> {
        vec![
            flight("F1", "NGA", "KJFK", true, true),
            flight("F2", "NGA", "KATL", true, true),
            flight("F3", "OTH", "KJFK", true, true),
            flight("F4", "NGA", "KJFK", false, true),
            flight("F5", "NGA", "KJFK", true, false),
        ]
    }

    fn service_with(
        flights: Arc<dyn FlightRepository>,
        policy: SearchPolicy,
        routes: Arc<dyn RouteExpander>,
    ) -> FlightSearchService {
        FlightSearchService::new(
            flights,
            Arc::new(StaticPolicyStore::new(policy)),
            Arc::new(InMemoryBriefings::default()),
            routes,
            CriteriaBuilder::default(),
        )
    }

    fn service(policy: SearchPolicy) -> FlightSearchService {
        service_with(
            Arc::new(InMemoryFlightRepository::new(catalog())),
            policy,
            Arc::new(InMemoryRoutes::default()),
        )
    }

    fn params(pairs: &[(&str, &str)]) -> SearchParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn ids(page: &Page<Flight>) -> Vec<&str> {
        page.data.iter().map(|f| f.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_get_by_id_filters_subfleets() {
        let svc = service(SearchPolicy::default());
        let flight = svc.get_by_id("F1", &pilot()).await.unwrap();
        assert_eq!(flight.subfleets.iter().map(|s| s.id).collect::<Vec<_>>(), vec![101]);
    }

    #[tokio::test]
    async fn test_get_by_id_ignores_active_and_visible() {
        let svc = service(SearchPolicy { restrict_to_company: true, only_flights_from_current: true });
        let inactive = svc.get_by_id("F4", &pilot()).await.unwrap();
        assert!(!inactive.active);
        assert_eq!(inactive.subfleets.len(), 1);
        let hidden = svc.get_by_id("F5", &pilot()).await.unwrap();
        assert!(!hidden.visible);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let svc = service(SearchPolicy::default());
        let err = svc.get_by_id("nope", &pilot()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_by_id_attaches_own_briefing_only() {
        let repo = InMemoryFlightRepository::new(catalog()).with_briefing_ref(
            42,
            "F1",
            BriefingRef { id: "SB1".to_string(), generated_at: None },
        );
        let svc = service_with(Arc::new(repo), SearchPolicy::default(), Arc::new(InMemoryRoutes::default()));

        let mine = svc.get_by_id("F1", &pilot()).await.unwrap();
        assert_eq!(mine.briefing.map(|b| b.id), Some("SB1".to_string()));

        let mut other = pilot();
        other.id = 43;
        let theirs = svc.get_by_id("F1", &other).await.unwrap();
        assert!(theirs.briefing.is_none());
    }

    #[tokio::test]
    async fn test_search_applies_baseline() {
        let svc = service(SearchPolicy::default());
        let page = svc.search(&SearchPolicy::default(), &pilot(), &SearchParams::new()).await.unwrap();
        assert_eq!(ids(&page), vec!["F1", "F2", "F3"]);
        assert!(page.data.iter().all(|f| f.active && f.visible));
    }

    #[tokio::test]
    async fn test_search_applies_policy_and_eligibility() {
        let policy = SearchPolicy { restrict_to_company: true, only_flights_from_current: true };
        let svc = service(policy);
        let page = svc.search(&policy, &pilot(), &SearchParams::new()).await.unwrap();

        assert_eq!(ids(&page), vec!["F1"]);
        assert_eq!(page.meta.total, 1);
        assert!(page.data.iter().all(|f| f.subfleets.iter().all(|s| s.id == 101)));
    }

    #[tokio::test]
    async fn test_search_bypass_keeps_baseline() {
        let policy = SearchPolicy { restrict_to_company: true, only_flights_from_current: true };
        let svc = service(policy);

        let page = svc.search(&policy, &pilot(), &params(&[("ignore_restrictions", "1")])).await.unwrap();
        assert_eq!(ids(&page), vec!["F1", "F2", "F3"]);

        let page = svc.search(&policy, &pilot(), &params(&[("ignore_restrictions", "0")])).await.unwrap();
        assert_eq!(ids(&page), vec!["F1"]);
    }

    #[tokio::test]
    async fn test_search_paginates() {
        let svc = service(SearchPolicy::default());
        let page = svc
            .search(&SearchPolicy::default(), &pilot(), &params(&[("limit", "2"), ("page", "2")]))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["F3"]);
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.meta.last_page, 2);
        assert!(!page.meta.has_more);
    }

    #[tokio::test]
    async fn test_search_store_failure_is_unavailable() {
        let svc = service_with(Arc::new(BrokenCatalog), SearchPolicy::default(), Arc::new(InMemoryRoutes::default()));
        let err = svc.search(&SearchPolicy::default(), &pilot(), &SearchParams::new()).await.unwrap_err();
        match err {
            CoreError::ServiceUnavailable(cause) => assert_eq!(cause.to_string(), "connection refused"),
            other => panic!("expected ServiceUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_policy() {
        let policy = SearchPolicy { restrict_to_company: true, only_flights_from_current: false };
        let svc = service(policy);
        assert_eq!(svc.load_policy().await.unwrap(), policy);
    }

    #[tokio::test]
    async fn test_get_route_unknown_flight_skips_expander() {
        let routes = Arc::new(CountingRoutes::default());
        let svc = service_with(
            Arc::new(InMemoryFlightRepository::new(catalog())),
            SearchPolicy::default(),
            routes.clone(),
        );

        let err = svc.get_route("nope").await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert_eq!(routes.calls.load(Ordering::SeqCst), 0);

        svc.get_route("F4").await.unwrap();
        assert_eq!(routes.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_route_returns_expander_output() {
        let fixes = vec![NavFix {
            sequence: 1,
            id: "GREKI".to_string(),
            name: None,
            kind: NavaidKind::Fix,
            lat: 41.48,
            lon: -73.31,
        }];
        let routes = InMemoryRoutes::default().with_route("F1", fixes.clone());
        let svc = service_with(
            Arc::new(InMemoryFlightRepository::new(catalog())),
            SearchPolicy::default(),
            Arc::new(routes),
        );
        assert_eq!(svc.get_route("F1").await.unwrap(), fixes);
    }

    #[tokio::test]
    async fn test_missing_briefing_is_not_found() {
        let briefings = InMemoryBriefings::default().with_briefing(Briefing {
            id: "SB1".to_string(),
            pilot_id: 42,
            flight_id: "F1".to_string(),
            body: "<OFP/>".to_string(),
            content_type: "application/xml".to_string(),
        });
        let svc = FlightSearchService::new(
            Arc::new(InMemoryFlightRepository::new(catalog())),
            Arc::new(StaticPolicyStore::new(SearchPolicy::default())),
            Arc::new(briefings),
            Arc::new(InMemoryRoutes::default()),
            CriteriaBuilder::default(),
        );

        let found = svc.get_briefing("F1", &pilot()).await.unwrap();
        assert_eq!(found.body, "<OFP/>");

        let err = svc.get_briefing("F2", &pilot()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}

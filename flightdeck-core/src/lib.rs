pub mod models;
pub mod search;
pub mod eligibility;
pub mod repository;
pub mod service;
pub mod memory;

pub use eligibility::EligibilityFilter;
pub use models::{Airline, Aircraft, Briefing, BriefingRef, FareOffering, Flight, NavFix, NavaidKind, Pilot, SubfleetOffering};
pub use search::{CriteriaBuilder, Page, PageRequest, SearchCriteria, SearchParams, SearchPolicy};
pub use service::FlightSearchService;

use repository::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(#[source] BoxError),
}

pub type CoreResult<T> = Result<T, CoreError>;

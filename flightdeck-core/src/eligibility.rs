use crate::models::{Flight, Pilot};

/// Second pass after the catalog query: strips every subfleet (and the fares
/// nested under it) the pilot is not authorized to operate.
pub struct EligibilityFilter;

impl EligibilityFilter {
    /// Stable: surviving offerings keep their original relative order.
    pub fn apply(mut flight: Flight, pilot: &Pilot) -> Flight {
        Self::apply_in_place(&mut flight, pilot);
        flight
    }

    pub fn apply_in_place(flight: &mut Flight, pilot: &Pilot) {
        let before = flight.subfleets.len();
        flight.subfleets.retain(|s| pilot.may_fly(s.id));

        tracing::debug!(
            flight_id = %flight.id,
            pilot_id = pilot.id,
            kept = flight.subfleets.len(),
            dropped = before - flight.subfleets.len(),
            "Filtered subfleets"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FareOffering, SubfleetOffering};
    use std::collections::BTreeSet;

    fn offering(id: i64) -> SubfleetOffering {
        SubfleetOffering {
            id,
            type_code: format!("T{}", id),
            name: format!("Subfleet {}", id),
            aircraft: Vec::new(),
            fares: vec![FareOffering {
                id: id * 10,
                code: "Y".to_string(),
                name: "Economy".to_string(),
                capacity: 150,
                price: 120.0,
            }],
        }
    }

    fn flight(offerings: &[i64]) -> Flight {
        Flight {
            id: "F1".to_string(),
            airline_id: "NGA".to_string(),
            flight_number: 1,
            callsign: None,
            route_code: None,
            route_leg: None,
            flight_type: "J".to_string(),
            dpt_airport_id: "KJFK".to_string(),
            arr_airport_id: "KBOS".to_string(),
            distance: 163.0,
            route: None,
            active: true,
            visible: true,
            airline: None,
            field_values: Default::default(),
            subfleets: offerings.iter().copied().map(offering).collect(),
            briefing: None,
        }
    }

    fn pilot(authorized: &[i64]) -> Pilot {
        Pilot {
            id: 9,
            airline_id: "NGA".to_string(),
            home_airport_id: "KJFK".to_string(),
            curr_airport_id: None,
            authorized_subfleets: authorized.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    fn ids(flight: &Flight) -> Vec<i64> {
        flight.subfleets.iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_keeps_only_authorized() {
        let filtered = EligibilityFilter::apply(flight(&[101, 205]), &pilot(&[101]));
        assert_eq!(ids(&filtered), vec![101]);
        assert_eq!(filtered.subfleets[0].fares.len(), 1);
    }

    #[test]
    fn test_preserves_relative_order() {
        let filtered = EligibilityFilter::apply(flight(&[300, 101, 205, 7]), &pilot(&[7, 205, 300]));
        assert_eq!(ids(&filtered), vec![300, 205, 7]);
    }

    #[test]
    fn test_empty_authorization_yields_no_offerings() {
        let filtered = EligibilityFilter::apply(flight(&[101, 205]), &pilot(&[]));
        assert!(filtered.subfleets.is_empty());
    }

    #[test]
    fn test_never_widens() {
        let original = flight(&[1, 2, 3, 4, 5, 6]);
        for authorized in [&[][..], &[2][..], &[1, 6][..], &[1, 2, 3, 4, 5, 6, 7, 8][..]] {
            let p = pilot(authorized);
            let filtered = EligibilityFilter::apply(original.clone(), &p);
            assert!(filtered.subfleets.len() <= original.subfleets.len());
            assert!(filtered.subfleets.iter().all(|s| p.may_fly(s.id)));
            assert!(filtered.subfleets.iter().all(|s| s.fares.iter().all(|f| f.id == s.id * 10)));
        }
    }

    #[test]
    fn test_leaves_other_fields_untouched() {
        let original = flight(&[101, 205]);
        let filtered = EligibilityFilter::apply(original.clone(), &pilot(&[205]));
        assert_eq!(filtered.id, original.id);
        assert_eq!(filtered.active, original.active);
        assert_eq!(filtered.distance, original.distance);
    }
}

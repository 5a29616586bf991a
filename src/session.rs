//! Route planning state: two endpoints, the last route, and the request in flight.

use crate::data::{RequestSeq, RequestToken};
use crate::error::{DataError, SessionError};
use crate::geo::Coord;
use crate::map::ViewHints;
use crate::model::{CityRef, RouteResult, RouteSegment, Zone};
use std::sync::Arc;

/// Zoom used when centering on a single endpoint
pub const ENDPOINT_ZOOM: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NoSelection,
    PartialSelection,
    FullSelection,
    RouteResolved,
}

/// A route request ready to hand to a fetcher
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub token: RequestToken,
    pub origin: String,
    pub destination: String,
}

/// What happened to a route response
#[derive(Debug)]
pub enum Resolution {
    Applied,
    /// Superseded or abandoned request; nothing changed
    Stale,
    Failed(DataError),
}

#[derive(Debug, Default)]
pub struct RouteSession {
    start: Option<CityRef>,
    destination: Option<CityRef>,
    route: Option<RouteResult>,
    requests: RequestSeq,
}

impl RouteSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.start, &self.destination, &self.route) {
            (Some(_), Some(_), Some(_)) => SessionPhase::RouteResolved,
            (Some(_), Some(_), None) => SessionPhase::FullSelection,
            (None, None, _) => SessionPhase::NoSelection,
            _ => SessionPhase::PartialSelection,
        }
    }

    pub fn endpoint(&self, which: Endpoint) -> Option<&CityRef> {
        match which {
            Endpoint::Start => self.start.as_ref(),
            Endpoint::Destination => self.destination.as_ref(),
        }
    }

    pub fn route(&self) -> Option<&RouteResult> {
        self.route.as_ref()
    }

    pub fn routes(&self) -> &[RouteSegment] {
        self.route.as_ref().map_or(&[], |r| r.segments.as_slice())
    }

    pub fn is_loading(&self) -> bool {
        self.requests.in_flight()
    }

    /// Set or clear an endpoint. Any route and in-flight request are discarded.
    pub fn select(&mut self, which: Endpoint, city: Option<CityRef>) {
        let slot = match which {
            Endpoint::Start => &mut self.start,
            Endpoint::Destination => &mut self.destination,
        };
        let unchanged = match (&*slot, &city) {
            (Some(a), Some(b)) => a.id == b.id,
            (None, None) => true,
            _ => false,
        };
        *slot = city;
        if !unchanged {
            self.route = None;
            self.requests.cancel();
        }
        tracing::debug!(?which, phase = ?self.phase(), "endpoint selected");
    }

    /// Swap start and destination; the route no longer matches
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.start, &mut self.destination);
        self.route = None;
        self.requests.cancel();
    }

    pub fn clear(&mut self) {
        self.start = None;
        self.destination = None;
        self.route = None;
        self.requests.cancel();
    }

    /// Begin a route request for the current pair. A resolved session may
    /// re-request; its route stays visible until the response lands.
    pub fn request_route(&mut self) -> Result<RouteRequest, SessionError> {
        let (Some(start), Some(destination)) = (&self.start, &self.destination) else {
            return Err(SessionError::IncompleteSelection);
        };
        let (origin, destination) = (start.name.clone(), destination.name.clone());
        let token = self.requests.issue();
        tracing::info!(%origin, %destination, ?token, "route requested");
        Ok(RouteRequest {
            token,
            origin,
            destination,
        })
    }

    /// Apply a route response. Stale tokens are ignored; failures leave
    /// the previous route untouched.
    pub fn resolve(&mut self, token: RequestToken, result: Result<RouteResult, DataError>) -> Resolution {
        if !self.requests.settle(token) {
            tracing::debug!(?token, "ignoring stale route response");
            return Resolution::Stale;
        }
        match result {
            Ok(route) => {
                self.route = Some(route);
                Resolution::Applied
            }
            Err(e) => Resolution::Failed(e),
        }
    }

    /// Endpoint markers: start styled safe, destination styled high-risk,
    /// regardless of the cities' real zones
    pub fn markers(&self) -> Vec<CityRef> {
        let start = self.start.iter().map(|c| Arc::new(c.restyled(Zone::Safe)));
        let dest = self.destination.iter().map(|c| Arc::new(c.restyled(Zone::HighRisk)));
        start.chain(dest).collect()
    }

    /// Camera hints for the current state
    pub fn view_hints(&self) -> ViewHints {
        if let Some(route) = &self.route {
            let points: Vec<Coord> = route.segments.iter().flat_map(|s| s.path.iter().copied()).collect();
            if points.len() >= 2 {
                return ViewHints::fit(points);
            }
        }
        match (&self.start, &self.destination) {
            (Some(a), Some(b)) => ViewHints::fit(vec![a.coord, b.coord]),
            (Some(c), None) | (None, Some(c)) => ViewHints::center(c.coord, ENDPOINT_ZOOM),
            (None, None) => ViewHints::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{city, mumbai_delhi};
    use crate::model::RouteSegment;

    fn unsafe_route() -> RouteResult {
        RouteResult {
            segments: vec![RouteSegment {
                path: vec![Coord::new(19.07, 72.87), Coord::new(24.0, 75.0), Coord::new(28.6, 77.2)],
                safe: false,
                info: None,
            }],
            ..Default::default()
        }
    }

    fn resolved() -> RouteSession {
        let cities = mumbai_delhi();
        let mut session = RouteSession::new();
        session.select(Endpoint::Start, Some(cities[0].clone()));
        session.select(Endpoint::Destination, Some(cities[1].clone()));
        let req = session.request_route().unwrap();
        assert!(matches!(session.resolve(req.token, Ok(unsafe_route())), Resolution::Applied));
        session
    }

    #[test]
    fn test_phases() {
        let cities = mumbai_delhi();
        let mut session = RouteSession::new();
        assert_eq!(session.phase(), SessionPhase::NoSelection);
        session.select(Endpoint::Destination, Some(cities[1].clone()));
        assert_eq!(session.phase(), SessionPhase::PartialSelection);
        session.select(Endpoint::Start, Some(cities[0].clone()));
        assert_eq!(session.phase(), SessionPhase::FullSelection);
        assert_eq!(resolved().phase(), SessionPhase::RouteResolved);
    }

    #[test]
    fn test_request_requires_both_endpoints() {
        let mut session = RouteSession::new();
        assert_eq!(session.request_route(), Err(SessionError::IncompleteSelection));
        session.select(Endpoint::Start, Some(mumbai_delhi()[0].clone()));
        assert_eq!(session.request_route(), Err(SessionError::IncompleteSelection));
        assert!(!session.is_loading());
    }

    #[test]
    fn test_new_start_discards_route() {
        let mut session = resolved();
        let pune = city(3, "Pune", "Maharashtra", 18.52, 73.85, Zone::Safe);
        session.select(Endpoint::Start, Some(pune));
        assert!(session.route().is_none());
        assert_eq!(session.phase(), SessionPhase::FullSelection);

        let mut session = resolved();
        session.select(Endpoint::Destination, None);
        session.select(Endpoint::Start, Some(city(3, "Pune", "", 18.52, 73.85, Zone::Safe)));
        assert!(session.route().is_none());
        assert_eq!(session.phase(), SessionPhase::PartialSelection);
    }

    #[test]
    fn test_reselecting_same_city_keeps_route() {
        let mut session = resolved();
        session.select(Endpoint::Start, Some(mumbai_delhi()[0].clone()));
        assert_eq!(session.phase(), SessionPhase::RouteResolved);
    }

    #[test]
    fn test_stale_response_ignored() {
        let cities = mumbai_delhi();
        let mut session = RouteSession::new();
        session.select(Endpoint::Start, Some(cities[0].clone()));
        session.select(Endpoint::Destination, Some(cities[1].clone()));
        let first = session.request_route().unwrap();
        let second = session.request_route().unwrap();

        assert!(matches!(session.resolve(first.token, Ok(unsafe_route())), Resolution::Stale));
        assert!(session.route().is_none());
        assert!(matches!(session.resolve(second.token, Ok(unsafe_route())), Resolution::Applied));
        assert!(session.route().is_some());
    }

    #[test]
    fn test_response_after_selection_change_is_dropped() {
        let cities = mumbai_delhi();
        let mut session = RouteSession::new();
        session.select(Endpoint::Start, Some(cities[0].clone()));
        session.select(Endpoint::Destination, Some(cities[1].clone()));
        let req = session.request_route().unwrap();
        session.select(Endpoint::Destination, None);
        assert!(matches!(session.resolve(req.token, Ok(unsafe_route())), Resolution::Stale));
        assert_eq!(session.phase(), SessionPhase::PartialSelection);
    }

    #[test]
    fn test_failure_keeps_previous_route() {
        let mut session = resolved();
        let req = session.request_route().unwrap();
        assert!(session.is_loading());
        let outcome = session.resolve(req.token, Err(DataError::unavailable("server down")));
        assert!(matches!(outcome, Resolution::Failed(DataError::Unavailable(_))));
        assert_eq!(session.route(), Some(&unsafe_route()));
        assert!(!session.is_loading());
    }

    #[test]
    fn test_markers_force_presentational_zones() {
        let cities = mumbai_delhi();
        let mut session = RouteSession::new();
        assert!(session.markers().is_empty());

        // Delhi is really moderate, Mumbai really safe: swap roles
        session.select(Endpoint::Start, Some(cities[1].clone()));
        session.select(Endpoint::Destination, Some(cities[0].clone()));
        let markers = session.markers();
        assert_eq!(markers.len(), 2);
        assert_eq!((markers[0].name.as_str(), markers[0].zone), ("Delhi", Zone::Safe));
        assert_eq!((markers[1].name.as_str(), markers[1].zone), ("Mumbai", Zone::HighRisk));
        assert_eq!(cities[1].zone, Zone::Moderate);
    }

    #[test]
    fn test_view_hints_follow_state() {
        let cities = mumbai_delhi();
        let mut session = RouteSession::new();
        assert_eq!(session.view_hints(), ViewHints::default());

        session.select(Endpoint::Start, Some(cities[0].clone()));
        assert_eq!(session.view_hints(), ViewHints::center(cities[0].coord, ENDPOINT_ZOOM));

        session.select(Endpoint::Destination, Some(cities[1].clone()));
        assert_eq!(session.view_hints(), ViewHints::fit(vec![cities[0].coord, cities[1].coord]));

        let session = resolved();
        assert_eq!(session.view_hints().fit_bounds.map(|p| p.len()), Some(3));
    }

    #[test]
    fn test_swap_discards_route() {
        let mut session = resolved();
        session.swap();
        assert_eq!(session.phase(), SessionPhase::FullSelection);
        assert_eq!(session.endpoint(Endpoint::Start).unwrap().name, "Delhi");
    }
}

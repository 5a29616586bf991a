use super::{CitySource, RouteSource};
use crate::error::DataError;
use crate::model::{City, RouteResult, Zone};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Identifies one request; responses carrying an outdated token are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

/// Issues tokens and remembers which one is still wanted
#[derive(Debug, Default)]
pub struct RequestSeq {
    issued: u64,
    live: Option<u64>,
}

impl RequestSeq {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding any in flight
    pub fn issue(&mut self) -> RequestToken {
        self.issued += 1;
        self.live = Some(self.issued);
        RequestToken(self.issued)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.live == Some(token.0)
    }

    /// Accept a response; returns false (and changes nothing) for stale tokens
    pub fn settle(&mut self, token: RequestToken) -> bool {
        if self.is_current(token) {
            self.live = None;
            true
        } else {
            false
        }
    }

    /// Abandon whatever is in flight
    pub fn cancel(&mut self) {
        self.live = None;
    }

    pub fn in_flight(&self) -> bool {
        self.live.is_some()
    }
}

/// Result of a background fetch, tagged with its request token
#[derive(Debug)]
pub enum FetchEvent {
    Cities {
        token: RequestToken,
        result: Result<Vec<City>, DataError>,
    },
    Route {
        token: RequestToken,
        result: Result<RouteResult, DataError>,
    },
}

/// Runs source calls on the rayon pool and posts results back to the UI thread
pub struct Fetcher<E> {
    cities: Arc<dyn CitySource>,
    routes: Arc<dyn RouteSource>,
    tx: Sender<E>,
}

impl<E> Fetcher<E>
where
    E: From<FetchEvent> + Send + 'static,
{
    pub fn new(cities: Arc<dyn CitySource>, routes: Arc<dyn RouteSource>, tx: Sender<E>) -> Self {
        Self { cities, routes, tx }
    }

    pub fn fetch_cities(&self, token: RequestToken, zone: Option<Zone>) {
        let source = Arc::clone(&self.cities);
        let tx = self.tx.clone();
        rayon::spawn(move || {
            let result = source.fetch_cities(zone);
            if let Err(e) = &result {
                tracing::error!("city fetch failed: {e}");
            }
            // receiver gone means the UI has shut down
            let _ = tx.send(FetchEvent::Cities { token, result }.into());
        });
    }

    pub fn fetch_route(&self, token: RequestToken, origin: String, destination: String) {
        let source = Arc::clone(&self.routes);
        let tx = self.tx.clone();
        rayon::spawn(move || {
            let result = source.fetch_route(&origin, &destination);
            if let Err(e) = &result {
                tracing::warn!(%origin, %destination, "route fetch failed: {e}");
            }
            let _ = tx.send(FetchEvent::Route { token, result }.into());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DemoSource;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_newer_request_supersedes_older() {
        let mut seq = RequestSeq::new();
        let first = seq.issue();
        let second = seq.issue();
        assert!(!seq.settle(first));
        assert!(seq.in_flight());
        assert!(seq.settle(second));
        assert!(!seq.in_flight());
        assert!(!seq.settle(second));
    }

    #[test]
    fn test_cancel_drops_in_flight() {
        let mut seq = RequestSeq::new();
        let token = seq.issue();
        seq.cancel();
        assert!(!seq.is_current(token));
        assert!(!seq.settle(token));
    }

    #[test]
    fn test_fetcher_posts_tagged_results() {
        let (tx, rx) = mpsc::channel::<FetchEvent>();
        let source = Arc::new(DemoSource::new());
        let fetcher = Fetcher::new(source.clone(), source, tx);
        let mut seq = RequestSeq::new();
        let token = seq.issue();
        fetcher.fetch_cities(token, Some(Zone::HighRisk));

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            FetchEvent::Cities { token: got, result } => {
                assert_eq!(got, token);
                assert!(result.unwrap().iter().all(|c| c.zone == Zone::HighRisk));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

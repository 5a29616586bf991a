use super::{normalize_cities, CityRecord, CitySource, RouteRecord, RouteSource};
use crate::error::DataError;
use crate::model::{City, RouteResult, Zone};
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct RouteRequest<'a> {
    origin: &'a str,
    destination: &'a str,
}

/// Client for the travel-safety REST API
pub struct HttpSource {
    base_url: String,
    client: Client,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("safemap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl CitySource for HttpSource {
    fn fetch_cities(&self, zone: Option<Zone>) -> Result<Vec<City>, DataError> {
        let mut request = self.client.get(self.url("/api/cities"));
        if let Some(zone) = zone {
            request = request.query(&[("zone", zone.id())]);
        }
        let records: Vec<CityRecord> = request.send()?.error_for_status()?.json()?;
        let cities = normalize_cities(records);
        tracing::info!(base = %self.base_url, count = cities.len(), "cities fetched");
        Ok(cities)
    }
}

impl RouteSource for HttpSource {
    fn fetch_route(&self, origin: &str, destination: &str) -> Result<RouteResult, DataError> {
        tracing::info!(origin, destination, "requesting safe route");
        let record: RouteRecord = self
            .client
            .post(self.url("/api/routes/safe"))
            .json(&RouteRequest { origin, destination })
            .send()?
            .error_for_status()?
            .json()?;
        record.into_result()
    }
}

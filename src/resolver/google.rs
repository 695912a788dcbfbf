//! Google Maps backed resolver: Places text search for typed addresses,
//! reverse geocoding for shared locations.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::conversation::state::AddressCandidate;
use crate::error::ResolverError;
use crate::resolver::{AddressQuery, AddressResolver};

const MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

pub struct GooglePlacesResolver {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl GooglePlacesResolver {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            base_url: MAPS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request(&self, query: &AddressQuery) -> reqwest::RequestBuilder {
        let key = self.api_key.expose_secret();
        match query {
            AddressQuery::Text(text) => self
                .client
                .get(format!("{}/place/textsearch/json", self.base_url))
                .query(&[("query", text.as_str()), ("key", key)]),
            AddressQuery::Coordinates(c) => self
                .client
                .get(format!("{}/geocode/json", self.base_url))
                .query(&[("latlng", format!("{},{}", c.lat, c.lng).as_str()), ("key", key)]),
        }
    }
}

/// Convert a Places/Geocoding response body into candidates.
///
/// `ZERO_RESULTS` is an empty list; any other non-`OK` status is an error.
fn parse_response(body: &str) -> Result<Vec<AddressCandidate>, ResolverError> {
    let resp: SearchResponse = serde_json::from_str(body)
        .map_err(|e| ResolverError::RequestFailed(format!("invalid response body: {e}")))?;

    match resp.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(Vec::new()),
        _ => {
            return Err(ResolverError::BadStatus {
                status: resp.status,
                message: resp.error_message.unwrap_or_default(),
            });
        }
    }

    Ok(resp
        .results
        .into_iter()
        .filter_map(|place| {
            let text = place.formatted_address.or_else(|| place.name.clone())?;
            let mut candidate = AddressCandidate::new(place.place_id, text);
            if let Some(name) = place.name.filter(|n| !n.trim().is_empty()) {
                candidate = candidate.with_name(name);
            }
            if let Some(geometry) = place.geometry {
                candidate = candidate.with_location(geometry.location.lat, geometry.location.lng);
            }
            Some(candidate)
        })
        .collect())
}

#[async_trait]
impl AddressResolver for GooglePlacesResolver {
    async fn resolve(&self, query: &AddressQuery) -> Result<Vec<AddressCandidate>, ResolverError> {
        let resp = self.request(query).send().await.map_err(|e| {
            if e.is_timeout() {
                ResolverError::Timeout(REQUEST_TIMEOUT)
            } else {
                ResolverError::RequestFailed(e.to_string())
            }
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ResolverError::RequestFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(ResolverError::BadStatus {
                status: status.to_string(),
                message: body,
            });
        }

        let candidates = parse_response(&body)?;
        tracing::debug!(query = %query, count = candidates.len(), "Address lookup complete");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT_SEARCH: &str = r#"{
        "html_attributions": [],
        "results": [
            {
                "formatted_address": "Main St, Leeds LS1 1AA, UK",
                "geometry": { "location": { "lat": 53.79, "lng": -1.54 } },
                "name": "Main Street",
                "place_id": "ChIJ-leeds"
            },
            {
                "formatted_address": "Main St, York YO1 7HH, UK",
                "geometry": { "location": { "lat": 53.96, "lng": -1.08 } },
                "name": "",
                "place_id": "ChIJ-york"
            }
        ],
        "status": "OK"
    }"#;

    #[test]
    fn parse_text_search_results() {
        let candidates = parse_response(TEXT_SEARCH).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "ChIJ-leeds");
        assert_eq!(candidates[0].name.as_deref(), Some("Main Street"));
        assert_eq!(candidates[0].location.unwrap().lat, 53.79);
        // Blank names are dropped so the label falls back to the address.
        assert_eq!(candidates[1].name, None);
        assert_eq!(candidates[1].label(), "Main St");
    }

    #[test]
    fn parse_geocode_without_names() {
        let body = r#"{
            "results": [{
                "formatted_address": "10 Downing St, London SW1A 2AA, UK",
                "geometry": { "location": { "lat": 51.5033, "lng": -0.1276 } },
                "place_id": "ChIJ-downing"
            }],
            "status": "OK"
        }"#;
        let candidates = parse_response(body).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "10 Downing St, London SW1A 2AA, UK");
        assert_eq!(candidates[0].label(), "10 Downing St");
    }

    #[test]
    fn zero_results_is_empty() {
        let body = r#"{ "results": [], "status": "ZERO_RESULTS" }"#;
        assert!(parse_response(body).unwrap().is_empty());
    }

    #[test]
    fn denied_status_is_error() {
        let body = r#"{ "results": [], "status": "REQUEST_DENIED", "error_message": "bad key" }"#;
        match parse_response(body) {
            Err(ResolverError::BadStatus { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "bad key");
            }
            other => panic!("expected BadStatus, got {other:?}"),
        }
    }

    #[test]
    fn garbage_body_is_error() {
        assert!(parse_response("<html>").is_err());
    }

    #[test]
    fn request_urls() {
        let resolver =
            GooglePlacesResolver::new(SecretString::from("k")).with_base_url("http://maps.test/");
        let text = resolver
            .request(&AddressQuery::Text("Main Street".into()))
            .build()
            .unwrap();
        assert_eq!(text.url().path(), "/place/textsearch/json");
        assert!(text.url().query().unwrap().contains("query=Main+Street"));

        let coords = resolver
            .request(&AddressQuery::Coordinates(
                crate::conversation::state::Coordinates {
                    lat: 51.5,
                    lng: -0.12,
                },
            ))
            .build()
            .unwrap();
        assert_eq!(coords.url().path(), "/geocode/json");
        assert!(coords.url().query().unwrap().contains("latlng=51.5%2C-0.12"));
    }
}

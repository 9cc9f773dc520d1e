//! Reverse geocoding for phototrack.
//!
//! This module converts geographic coordinates (latitude/longitude)
//! into human-readable place names. It defines the `Address` struct for
//! the place-name hierarchy Nominatim returns and the `Geocoder` trait
//! as the seam between the resolver and the network.
//!
//! `NominatimGeocoder` talks to the OpenStreetMap Nominatim API;
//! `MockGeocoder` returns predefined answers for coordinate regions and
//! counts live calls, which is what the cache and pipeline tests run
//! against.

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;
use std::cell::Cell;
use std::time::Duration;
use url::Url;

/// HTTP timeout for a single reverse-geocoding request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The address hierarchy of a reverse-geocoded point.
///
/// Nominatim fills whichever levels exist for the location; a remote
/// coastline may only have a county, a capital has all of them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub county: Option<String>,
}

impl Address {
    /// The most specific populated-place name available, walking
    /// city → town → village → municipality → county.
    pub fn preferred_name(&self) -> Option<&str> {
        self.city
            .as_deref()
            .or(self.town.as_deref())
            .or(self.village.as_deref())
            .or(self.municipality.as_deref())
            .or(self.county.as_deref())
    }
}

/// Interface for reverse geocoding services.
///
/// Returns `Ok(None)` when the service answered but knows nothing about
/// the coordinates; `Err` means the call itself failed (timeout,
/// service error) and the caller should back off.
#[allow(async_fn_in_trait)]
pub trait Geocoder {
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Option<Address>>;
}

/// Shape of a Nominatim `/reverse` response. Lookups with no result
/// come back as `{"error": "Unable to geocode"}` — no address, not an
/// HTTP error.
#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<Address>,
}

/// Reverse geocoder backed by the Nominatim (OpenStreetMap) API.
pub struct NominatimGeocoder {
    client: Client,
    endpoint: Url,
}

impl NominatimGeocoder {
    /// Creates a client for the given endpoint. Nominatim's usage
    /// policy requires an identifying User-Agent.
    pub fn new(endpoint: &str, user_agent: &str) -> Result<Self> {
        // Url::join treats a missing trailing slash as a file component.
        let normalized = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{endpoint}/")
        };
        let endpoint = Url::parse(&normalized)
            .with_context(|| format!("Invalid geocoder endpoint {normalized:?}"))?;

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, endpoint })
    }
}

impl Geocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Option<Address>> {
        let url = self.endpoint.join("reverse")?;

        let response = self
            .client
            .get(url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("accept-language", "en".to_string()),
            ])
            .send()
            .await
            .context("Reverse-geocoding request failed")?
            .error_for_status()
            .context("Reverse-geocoding service returned an error")?;

        let body: NominatimResponse = response
            .json()
            .await
            .context("Failed to parse reverse-geocoding response")?;

        Ok(body.address)
    }
}

/// How closely a coordinate must match a canned place, in degrees.
const MOCK_MATCH_RADIUS: f64 = 0.5;

/// Mock geocoding service for testing and offline use.
///
/// Returns the canned city for any coordinate within about half a
/// degree of a registered place, `None` elsewhere, and an error for
/// every call when constructed with `failing()`. `live_calls` counts
/// how often the service was actually hit, which is how the cache tests
/// prove a grid cell is only resolved once.
#[derive(Debug, Default)]
pub struct MockGeocoder {
    places: Vec<(f64, f64, String)>,
    fail_all: bool,
    live_calls: Cell<usize>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock where every call fails, as if the service were down.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Registers a canned city around the given coordinates.
    pub fn with_place(mut self, latitude: f64, longitude: f64, city: &str) -> Self {
        self.places.push((latitude, longitude, city.to_string()));
        self
    }

    /// Number of times `reverse_geocode` was invoked.
    pub fn live_calls(&self) -> usize {
        self.live_calls.get()
    }
}

impl Geocoder for MockGeocoder {
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Option<Address>> {
        self.live_calls.set(self.live_calls.get() + 1);

        if self.fail_all {
            bail!("simulated geocoder outage");
        }

        let hit = self.places.iter().find(|(lat, lon, _)| {
            (latitude - lat).abs() < MOCK_MATCH_RADIUS
                && (longitude - lon).abs() < MOCK_MATCH_RADIUS
        });

        Ok(hit.map(|(_, _, city)| Address {
            city: Some(city.clone()),
            ..Address::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_name_fallback_order() {
        let full = Address {
            city: Some("Tórshavn".to_string()),
            town: Some("Ignored Town".to_string()),
            ..Address::default()
        };
        assert_eq!(full.preferred_name(), Some("Tórshavn"));

        let village_only = Address {
            village: Some("Gjógv".to_string()),
            county: Some("Eysturoy".to_string()),
            ..Address::default()
        };
        assert_eq!(village_only.preferred_name(), Some("Gjógv"));

        let county_only = Address {
            county: Some("Vágar".to_string()),
            ..Address::default()
        };
        assert_eq!(county_only.preferred_name(), Some("Vágar"));

        assert_eq!(Address::default().preferred_name(), None);
    }

    #[tokio::test]
    async fn test_mock_geocoder_matches_nearby_coordinates() -> Result<()> {
        let mock = MockGeocoder::new().with_place(62.01, -6.77, "Tórshavn");

        let address = mock.reverse_geocode(62.0104, -6.7719).await?;
        assert_eq!(address.and_then(|a| a.city), Some("Tórshavn".to_string()));

        let nothing = mock.reverse_geocode(0.0, 0.0).await?;
        assert!(nothing.is_none());

        assert_eq!(mock.live_calls(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_mock_geocoder_failing_mode() {
        let mock = MockGeocoder::failing();
        let result = mock.reverse_geocode(62.01, -6.77).await;
        assert!(result.is_err());
        assert_eq!(mock.live_calls(), 1);
    }

    #[tokio::test]
    async fn test_nominatim_parses_address_response() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reverse")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"place_id": 1, "address": {"city": "Tórshavn", "county": "Streymoy"}}"#)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&server.url(), "phototrack-tests")?;
        let address = geocoder.reverse_geocode(62.0104, -6.7719).await?;

        mock.assert_async().await;
        let address = address.expect("address should be present");
        assert_eq!(address.preferred_name(), Some("Tórshavn"));

        Ok(())
    }

    #[tokio::test]
    async fn test_nominatim_unable_to_geocode_is_none() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/reverse")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Unable to geocode"}"#)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&server.url(), "phototrack-tests")?;
        let address = geocoder.reverse_geocode(0.0, 0.0).await?;

        assert!(address.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_nominatim_http_error_is_an_error() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/reverse")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&server.url(), "phototrack-tests")?;
        let result = geocoder.reverse_geocode(62.01, -6.77).await;

        assert!(result.is_err());

        Ok(())
    }
}

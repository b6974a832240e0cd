//! Google Geocoding API client
//!
//! Forward geocoding resolves submitted street addresses; reverse
//! geocoding resolves `"lat,lng"` submissions to the nearest building
//! address. Both filter Plus Codes and prefer results that name an actual
//! building over administrative areas, so the stored address and place ID
//! describe something a street image can depict.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use super::RateLimiter;

const GEOCODE_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const USER_AGENT: &str = "Vantage/0.1.0 (https://github.com/vantage-maps/vantage)";
const RATE_LIMIT_MS: u64 = 25; // stay well under the 50 req/sec API limit

/// Geocoding client errors
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No geocoding results for: {0}")]
    NoResults(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Geocoding status {0}: {1}")]
    Status(String, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// A geocoded location, either from a submitted address or coordinates
#[derive(Debug, Clone)]
pub struct GeocodedLocation {
    /// Provider place ID, the deduplication key for stored points
    pub place_id: String,
    /// Formatted street address
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    /// Geometry precision reported by the provider (e.g. ROOFTOP)
    pub location_type: String,
}

/// Resolves a submission string to a geocoded location
#[async_trait]
pub trait Locator: Send + Sync {
    async fn locate(&self, submission: &str) -> Result<GeocodedLocation, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    place_id: String,
    formatted_address: String,
    geometry: Geometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinates,
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    #[serde(default)]
    types: Vec<String>,
}

/// Plus Codes look like "XXXX+XX" and are not street addresses
fn has_plus_code(formatted_address: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"[A-Z0-9]{4}\+[A-Z0-9]{2,3}").unwrap());
    pattern.is_match(formatted_address)
}

/// Whether the result names a specific building rather than a general area
fn is_building_address(components: &[AddressComponent]) -> bool {
    const AREA_TYPES: &[&str] = &[
        "plus_code",
        "neighborhood",
        "sublocality",
        "locality",
        "administrative_area_level_1",
        "administrative_area_level_2",
        "country",
        "postal_code",
        "natural_feature",
        "park",
    ];

    // A street number means a specific building
    let has_street_number = components
        .iter()
        .any(|c| c.types.iter().any(|t| t == "street_number"));
    if has_street_number {
        return true;
    }

    // Purely administrative/area types are not a building
    let all_area = components
        .iter()
        .flat_map(|c| c.types.iter())
        .all(|t| AREA_TYPES.contains(&t.as_str()));

    !all_area
}

/// Pick the best result: first building address that is not a Plus Code,
/// falling back to the first non-Plus-Code result
fn select_result(results: &[GeocodeResult]) -> Option<&GeocodeResult> {
    results
        .iter()
        .find(|r| !has_plus_code(&r.formatted_address) && is_building_address(&r.address_components))
        .or_else(|| results.iter().find(|r| !has_plus_code(&r.formatted_address)))
}

/// Parse a `"lat,lng"` submission, None if it is a street address
fn parse_coordinate_pair(submission: &str) -> Option<(f64, f64)> {
    let (lat_str, lng_str) = submission.split_once(',')?;
    let lat: f64 = lat_str.trim().parse().ok()?;
    let lng: f64 = lng_str.trim().parse().ok()?;
    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
        Some((lat, lng))
    } else {
        None
    }
}

/// Google Geocoding API client
pub struct GoogleGeocoder {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: String) -> Result<Self, GeocodeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            api_key,
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<GeocodeResponse, GeocodeError> {
        self.rate_limiter.wait().await;

        let response = self
            .http_client
            .get(GEOCODE_BASE_URL)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api(status.as_u16(), error_text));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(body),
            "OVER_QUERY_LIMIT" => Err(GeocodeError::RateLimited),
            status => Err(GeocodeError::Status(
                status.to_string(),
                body.error_message.unwrap_or_default(),
            )),
        }
    }

    fn to_location(result: &GeocodeResult) -> GeocodedLocation {
        GeocodedLocation {
            place_id: result.place_id.clone(),
            address: result.formatted_address.clone(),
            lat: result.geometry.location.lat,
            lng: result.geometry.location.lng,
            location_type: result
                .geometry
                .location_type
                .clone()
                .unwrap_or_else(|| "UNKNOWN".to_string()),
        }
    }

    /// Forward geocode an address string
    pub async fn forward(&self, address: &str) -> Result<GeocodedLocation, GeocodeError> {
        tracing::debug!(address = %address, "Forward geocoding");

        let body = self.query(&[("address", address)]).await?;
        let result = body
            .results
            .first()
            .ok_or_else(|| GeocodeError::NoResults(address.to_string()))?;

        let location = Self::to_location(result);
        tracing::info!(
            address = %location.address,
            place_id = %location.place_id,
            "Forward geocoding success"
        );
        Ok(location)
    }

    /// Reverse geocode coordinates to the nearest building address
    pub async fn reverse(&self, lat: f64, lng: f64) -> Result<GeocodedLocation, GeocodeError> {
        tracing::debug!(lat = lat, lng = lng, "Reverse geocoding");

        let latlng = format!("{},{}", lat, lng);
        let body = self.query(&[("latlng", latlng.as_str())]).await?;
        let result = select_result(&body.results)
            .ok_or_else(|| GeocodeError::NoResults(format!("({}, {})", lat, lng)))?;

        let location = Self::to_location(result);
        tracing::info!(
            address = %location.address,
            place_id = %location.place_id,
            "Reverse geocoding success"
        );
        Ok(location)
    }
}

#[async_trait]
impl Locator for GoogleGeocoder {
    async fn locate(&self, submission: &str) -> Result<GeocodedLocation, GeocodeError> {
        match parse_coordinate_pair(submission) {
            Some((lat, lng)) => self.reverse(lat, lng).await,
            None => self.forward(submission).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(types: &[&str]) -> AddressComponent {
        AddressComponent {
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn result(address: &str, components: Vec<AddressComponent>) -> GeocodeResult {
        GeocodeResult {
            place_id: format!("place-{}", address),
            formatted_address: address.to_string(),
            geometry: Geometry {
                location: Coordinates { lat: 51.5, lng: -0.1 },
                location_type: Some("ROOFTOP".to_string()),
            },
            address_components: components,
        }
    }

    #[test]
    fn test_plus_code_detection() {
        assert!(has_plus_code("GV2F+9X London, UK"));
        assert!(has_plus_code("9C3XGV2F+9X"));
        assert!(!has_plus_code("10 Downing Street, London SW1A 2AA, UK"));
    }

    #[test]
    fn test_building_address_detection() {
        // Street number wins
        assert!(is_building_address(&[
            component(&["street_number"]),
            component(&["route"]),
            component(&["locality"]),
        ]));

        // Purely administrative is not a building
        assert!(!is_building_address(&[
            component(&["locality"]),
            component(&["administrative_area_level_1"]),
            component(&["country"]),
            component(&["postal_code"]),
        ]));

        // A named establishment without a street number still counts
        assert!(is_building_address(&[
            component(&["establishment", "point_of_interest"]),
            component(&["locality"]),
        ]));
    }

    #[test]
    fn test_result_selection_prefers_buildings() {
        let results = vec![
            result("GV2F+9X London, UK", vec![component(&["plus_code"])]),
            result("London, UK", vec![component(&["locality"]), component(&["country"])]),
            result(
                "10 Downing Street, London, UK",
                vec![component(&["street_number"]), component(&["route"])],
            ),
        ];

        let selected = select_result(&results).unwrap();
        assert_eq!(selected.formatted_address, "10 Downing Street, London, UK");
    }

    #[test]
    fn test_result_selection_falls_back_past_plus_codes() {
        let results = vec![
            result("GV2F+9X London, UK", vec![component(&["plus_code"])]),
            result("London, UK", vec![component(&["locality"]), component(&["country"])]),
        ];

        let selected = select_result(&results).unwrap();
        assert_eq!(selected.formatted_address, "London, UK");

        let only_plus = vec![result("GV2F+9X London, UK", vec![component(&["plus_code"])])];
        assert!(select_result(&only_plus).is_none());
    }

    #[test]
    fn test_coordinate_pair_parsing() {
        assert_eq!(
            parse_coordinate_pair("51.508000,-0.128000"),
            Some((51.508, -0.128))
        );
        assert_eq!(parse_coordinate_pair(" 51.5 , -0.1 "), Some((51.5, -0.1)));
        assert_eq!(parse_coordinate_pair("10 Downing Street, London"), None);
        assert_eq!(parse_coordinate_pair("91.0,0.0"), None);
        assert_eq!(parse_coordinate_pair("51.5"), None);
    }
}

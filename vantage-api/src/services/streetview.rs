//! Street View Static API client
//!
//! Fetching an image the way the interactive map does takes two steps:
//! the metadata endpoint reports where the nearest panorama actually
//! stands, then the image request points the camera from the panorama back
//! at the target address. Without the heading the API centers the view on
//! the road direction, which frequently faces away from the building.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::RateLimiter;

const METADATA_BASE_URL: &str = "https://maps.googleapis.com/maps/api/streetview/metadata";
const IMAGE_BASE_URL: &str = "https://maps.googleapis.com/maps/api/streetview";
const USER_AGENT: &str = "Vantage/0.1.0 (https://github.com/vantage-maps/vantage)";
const RATE_LIMIT_MS: u64 = 25;

/// Requested image parameters
const IMAGE_SIZE: &str = "640x640";
const FIELD_OF_VIEW: &str = "90";

/// Street imagery client errors
#[derive(Debug, Error)]
pub enum ImageryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No street-level imagery available at this location")]
    NoImagery,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Fetches a street-level JPEG for a coordinate
#[async_trait]
pub trait ImagerySource: Send + Sync {
    async fn fetch(&self, lat: f64, lng: f64) -> Result<Vec<u8>, ImageryError>;
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    status: String,
    location: Option<PanoramaLocation>,
}

#[derive(Debug, Deserialize)]
struct PanoramaLocation {
    lat: f64,
    lng: f64,
}

/// Initial great-circle bearing from one coordinate to another, in
/// degrees normalized to [0, 360)
pub fn heading_between(from_lat: f64, from_lng: f64, to_lat: f64, to_lng: f64) -> f64 {
    let lat1 = from_lat.to_radians();
    let lat2 = to_lat.to_radians();
    let delta_lng = (to_lng - from_lng).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Detect the provider's "no imagery here" placeholder.
///
/// The placeholder is a near-uniform light gray frame. Sample a coarse
/// pixel grid and flag images with very low color variance in the light
/// gray range. Images that fail to decode are passed through.
pub fn looks_blank(bytes: &[u8]) -> bool {
    let image = match image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg) {
        Ok(image) => image.to_rgb8(),
        Err(_) => return false,
    };

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return false;
    }

    let step_x = (width / 10).max(1);
    let step_y = (height / 10).max(1);

    let mut samples: Vec<[u8; 3]> = Vec::new();
    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            samples.push(image.get_pixel(x, y).0);
            x += step_x;
        }
        y += step_y;
    }

    let n = samples.len() as f64;
    let mut mean = [0.0f64; 3];
    for pixel in &samples {
        for channel in 0..3 {
            mean[channel] += pixel[channel] as f64;
        }
    }
    for channel in &mut mean {
        *channel /= n;
    }

    let mut variance = 0.0f64;
    for pixel in &samples {
        for channel in 0..3 {
            let diff = pixel[channel] as f64 - mean[channel];
            variance += diff * diff;
        }
    }
    variance /= n;

    let is_low_variance = variance < 100.0;
    let is_light_gray = (mean[0] - mean[1]).abs() < 20.0
        && (mean[1] - mean[2]).abs() < 20.0
        && (mean[0] - mean[2]).abs() < 20.0
        && (200.0..=255.0).contains(&mean[0]);

    is_low_variance && is_light_gray
}

/// Street View Static API client
pub struct StreetViewClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
}

impl StreetViewClient {
    pub fn new(api_key: String) -> Result<Self, ImageryError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ImageryError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            api_key,
        })
    }

    /// Panorama location nearest the target, None when the metadata has
    /// a panorama but no location to report
    async fn metadata(&self, lat: f64, lng: f64) -> Result<Option<PanoramaLocation>, ImageryError> {
        self.rate_limiter.wait().await;

        let location = format!("{},{}", lat, lng);
        let response = self
            .http_client
            .get(METADATA_BASE_URL)
            .query(&[("location", location.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ImageryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ImageryError::Api(status.as_u16(), error_text));
        }

        let metadata: MetadataResponse = response
            .json()
            .await
            .map_err(|e| ImageryError::Parse(e.to_string()))?;

        // ZERO_RESULTS (and NOT_FOUND for unresolvable locations) mean no
        // panorama covers this spot
        if metadata.status != "OK" {
            tracing::debug!(lat = lat, lng = lng, status = %metadata.status, "No panorama");
            return Err(ImageryError::NoImagery);
        }

        Ok(metadata.location)
    }

    async fn fetch_image(
        &self,
        lat: f64,
        lng: f64,
        heading: Option<f64>,
    ) -> Result<Vec<u8>, ImageryError> {
        self.rate_limiter.wait().await;

        let location = format!("{},{}", lat, lng);
        let mut params: Vec<(&str, String)> = vec![
            ("size", IMAGE_SIZE.to_string()),
            ("location", location),
            ("fov", FIELD_OF_VIEW.to_string()),
            // Prefer official outdoor imagery over user photospheres
            ("source", "outdoor".to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(heading) = heading {
            params.push(("heading", format!("{:.1}", heading)));
        }

        let response = self
            .http_client
            .get(IMAGE_BASE_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| ImageryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ImageryError::Api(status.as_u16(), error_text));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageryError::Network(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImagerySource for StreetViewClient {
    /// Fetch the best available street-level image for a target coordinate
    async fn fetch(&self, lat: f64, lng: f64) -> Result<Vec<u8>, ImageryError> {
        let (pano_lat, pano_lng, heading) = match self.metadata(lat, lng).await? {
            Some(pano) => {
                let heading = heading_between(pano.lat, pano.lng, lat, lng);
                (pano.lat, pano.lng, Some(heading))
            }
            // Panorama exists but its location is unreported; let the API
            // pick the viewpoint
            None => (lat, lng, None),
        };

        tracing::debug!(
            lat = lat,
            lng = lng,
            pano_lat = pano_lat,
            pano_lng = pano_lng,
            heading = ?heading,
            "Fetching street image"
        );

        let bytes = self.fetch_image(pano_lat, pano_lng, heading).await?;

        // Belt and braces: the metadata said OK but the frame can still be
        // the gray placeholder
        if looks_blank(&bytes) {
            tracing::info!(lat = lat, lng = lng, "Blank street image rejected");
            return Err(ImageryError::NoImagery);
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{ImageBuffer, Rgb};

    fn encode_jpeg(image: &ImageBuffer<Rgb<u8>, Vec<u8>>) -> Vec<u8> {
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, 90);
        image.write_with_encoder(encoder).unwrap();
        bytes
    }

    #[test]
    fn test_heading_cardinal_directions() {
        // Due east along the equator
        let east = heading_between(0.0, 0.0, 0.0, 1.0);
        assert!((east - 90.0).abs() < 0.5);

        // Due north
        let north = heading_between(51.0, 0.0, 52.0, 0.0);
        assert!(north < 0.5 || north > 359.5);

        // Due west
        let west = heading_between(0.0, 1.0, 0.0, 0.0);
        assert!((west - 270.0).abs() < 0.5);

        // Always normalized
        let heading = heading_between(51.508, -0.128, 51.507, -0.129);
        assert!((0.0..360.0).contains(&heading));
    }

    #[test]
    fn test_blank_detection_flags_uniform_gray() {
        let gray = ImageBuffer::from_pixel(64, 64, Rgb([228u8, 227, 223]));
        assert!(looks_blank(&encode_jpeg(&gray)));
    }

    #[test]
    fn test_blank_detection_passes_textured_image() {
        let textured = ImageBuffer::from_fn(64, 64, |x, y| {
            Rgb([
                ((x * 4) % 256) as u8,
                ((y * 4) % 256) as u8,
                (((x + y) * 2) % 256) as u8,
            ])
        });
        assert!(!looks_blank(&encode_jpeg(&textured)));
    }

    #[test]
    fn test_blank_detection_passes_dark_uniform_image() {
        // Uniform but dark: a night shot, not the placeholder
        let dark = ImageBuffer::from_pixel(64, 64, Rgb([40u8, 40, 42]));
        assert!(!looks_blank(&encode_jpeg(&dark)));
    }

    #[test]
    fn test_blank_detection_ignores_undecodable_bytes() {
        assert!(!looks_blank(b"not a jpeg"));
        assert!(!looks_blank(&[]));
    }
}

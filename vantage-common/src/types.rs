//! Wire types shared between vantage-api and its clients

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Geographic bounding box (viewport)
///
/// Boxes crossing the antimeridian are rejected; the map frontend never
/// produces them for the areas this service covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self> {
        let bbox = Self {
            south,
            west,
            north,
            east,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> Result<()> {
        let values = [self.south, self.west, self.north, self.east];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(
                "Bounding box coordinates must be finite".to_string(),
            ));
        }
        if self.south < -90.0 || self.north > 90.0 || self.south >= self.north {
            return Err(Error::InvalidInput(format!(
                "Invalid latitude range: south={}, north={}",
                self.south, self.north
            )));
        }
        if self.west < -180.0 || self.east > 180.0 || self.west >= self.east {
            return Err(Error::InvalidInput(format!(
                "Invalid longitude range: west={}, east={}",
                self.west, self.east
            )));
        }
        Ok(())
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }

    /// Widen the box by `margin` degrees on every side, clamped to the
    /// valid coordinate ranges
    pub fn with_margin(&self, margin: f64) -> Self {
        Self {
            south: (self.south - margin).max(-90.0),
            west: (self.west - margin).max(-180.0),
            north: (self.north + margin).min(90.0),
            east: (self.east + margin).min(180.0),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }
}

/// Request body for POST /point
///
/// `address` is either a street address or a `"lat,lng"` coordinate pair.
/// Bulk uploaders that evaluated an image locally send it as base64 along
/// with the precomputed rating so the server skips the provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPointRequest {
    pub address: String,

    /// Base64-encoded JPEG to use instead of fetching street imagery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,

    /// Beauty score from a prior local evaluation (1-10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precomputed_beauty: Option<f64>,

    /// Review text from a prior local evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precomputed_review: Option<String>,
}

impl SubmitPointRequest {
    pub fn address_only(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            image_data: None,
            precomputed_beauty: None,
            precomputed_review: None,
        }
    }
}

/// A rated street-scene point as served over the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRecord {
    pub guid: Uuid,
    pub place_id: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub beauty: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Response body for POST /point
///
/// `message` is present only for duplicates ("Point already exists");
/// bulk clients match on it to classify the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitPointResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub point: PointRecord,
}

/// Response body for GET /points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsResponse {
    pub total: i64,
    pub points: Vec<PointRecord>,
}

/// One aggregate heatmap cell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellAggregate {
    /// H3 cell ID (lowercase hex string)
    pub cell: String,
    pub resolution: u8,
    /// Cell center
    pub lat: f64,
    pub lng: f64,
    pub count: i64,
    pub sum: f64,
    pub avg: f64,
}

/// Response body for GET /cells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellsResponse {
    pub resolution: u8,
    pub cells: Vec<CellAggregate>,
}

/// Response body for GET /coverage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageResponse {
    pub resolution: u8,
    /// Cell ID to point count
    pub cells: BTreeMap<String, i64>,
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_points: i64,
    pub avg_beauty: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_validation() {
        assert!(BoundingBox::new(51.45, -0.25, 51.55, 0.05).is_ok());
        // south >= north
        assert!(BoundingBox::new(51.55, -0.25, 51.45, 0.05).is_err());
        // west >= east (antimeridian crossing rejected)
        assert!(BoundingBox::new(51.45, 0.05, 51.55, -0.25).is_err());
        // out of range
        assert!(BoundingBox::new(-91.0, -0.25, 51.55, 0.05).is_err());
        assert!(BoundingBox::new(51.45, -0.25, 51.55, 181.0).is_err());
        assert!(BoundingBox::new(f64::NAN, -0.25, 51.55, 0.05).is_err());
    }

    #[test]
    fn bbox_contains_and_margin() {
        let bbox = BoundingBox::new(51.45, -0.25, 51.55, 0.05).unwrap();
        assert!(bbox.contains(51.5, -0.1));
        assert!(!bbox.contains(51.6, -0.1));
        assert!(!bbox.contains(51.5, 0.1));

        let widened = bbox.with_margin(0.01);
        assert!(widened.contains(51.555, -0.255));

        // Margin clamps at the poles
        let polar = BoundingBox::new(89.0, -10.0, 90.0, 10.0).unwrap();
        assert_eq!(polar.with_margin(5.0).north, 90.0);
    }

    #[test]
    fn submit_request_uses_upload_field_names() {
        let request = SubmitPointRequest {
            address: "10 Downing Street, London".to_string(),
            image_data: Some("aGVsbG8=".to_string()),
            precomputed_beauty: Some(7.0),
            precomputed_review: Some("Fine brickwork.".to_string()),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["imageData"], "aGVsbG8=");
        assert_eq!(json["precomputedBeauty"], 7.0);
        assert_eq!(json["precomputedReview"], "Fine brickwork.");
    }

    #[test]
    fn duplicate_response_omits_message_when_absent() {
        let point = PointRecord {
            guid: Uuid::new_v4(),
            place_id: "ChIJ123".to_string(),
            address: "Somewhere".to_string(),
            lat: 51.5,
            lng: -0.1,
            beauty: 6.0,
            review: None,
            image_url: None,
            created_at: Utc::now(),
        };

        let created = SubmitPointResponse {
            message: None,
            point: point.clone(),
        };
        let json = serde_json::to_value(&created).unwrap();
        assert!(json.get("message").is_none());

        let duplicate = SubmitPointResponse {
            message: Some("Point already exists".to_string()),
            point,
        };
        let json = serde_json::to_value(&duplicate).unwrap();
        assert_eq!(json["message"], "Point already exists");
    }
}

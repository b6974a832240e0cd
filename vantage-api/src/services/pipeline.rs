//! Ingestion pipeline
//!
//! One submission walks: locate (forward or reverse geocoding) → place-ID
//! dedup → image (provided or fetched) → rating (precomputed or model) →
//! image file persistence → point insert + both aggregate increments in a
//! single transaction.

use base64::Engine;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use vantage_common::hex;
use vantage_common::types::{PointRecord, SubmitPointRequest};

use crate::db::{cells, points};
use crate::error::ApiError;
use crate::services::aesthetics::{Rater, Rating, RatingError};
use crate::services::geocoding::{GeocodeError, Locator};
use crate::services::streetview::{looks_blank, ImageryError, ImagerySource};

/// Error body text for locations without street imagery. Bulk clients
/// classify failures by matching "imagery" in this message.
pub const NO_IMAGERY_MESSAGE: &str = "No street-level imagery available at this location";

/// Outcome of a submission
#[derive(Debug)]
pub enum Submission {
    /// A new point was stored
    Created(PointRecord),
    /// The place was already rated; the existing point is returned
    Duplicate(PointRecord),
}

/// Ingestion pipeline over the provider clients and the database
pub struct IngestPipeline {
    db: SqlitePool,
    locator: Arc<dyn Locator>,
    imagery: Arc<dyn ImagerySource>,
    rater: Arc<dyn Rater>,
    /// Data directory; stored images go under `<data_dir>/images/`
    data_dir: PathBuf,
}

impl IngestPipeline {
    pub fn new(
        db: SqlitePool,
        locator: Arc<dyn Locator>,
        imagery: Arc<dyn ImagerySource>,
        rater: Arc<dyn Rater>,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            locator,
            imagery,
            rater,
            data_dir,
        }
    }

    /// Process one submission end to end
    pub async fn submit(&self, request: SubmitPointRequest) -> Result<Submission, ApiError> {
        let address = request.address.trim();
        if address.is_empty() {
            return Err(ApiError::BadRequest("Address must not be empty".to_string()));
        }

        // Step 1: resolve the submission to a place
        let location = self.locator.locate(address).await.map_err(map_geocode_error)?;

        // Step 2: place-ID dedup; an already-rated place is returned as-is
        if let Some(existing) = points::find_by_place_id(&self.db, &location.place_id).await? {
            tracing::info!(
                place_id = %location.place_id,
                address = %existing.address,
                "Duplicate submission"
            );
            return Ok(Submission::Duplicate(existing.to_record()));
        }

        // Step 3: obtain the street image
        let image_bytes = match &request.image_data {
            Some(encoded) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| ApiError::BadRequest(format!("Invalid image data: {}", e)))?;
                if looks_blank(&bytes) {
                    return Err(ApiError::BadRequest(NO_IMAGERY_MESSAGE.to_string()));
                }
                bytes
            }
            None => self
                .imagery
                .fetch(location.lat, location.lng)
                .await
                .map_err(map_imagery_error)?,
        };

        // Step 4: rate the scene, unless the client already did
        let rating = match request.precomputed_beauty {
            Some(beauty) => {
                if !(1.0..=10.0).contains(&beauty) {
                    return Err(ApiError::BadRequest(format!(
                        "Precomputed beauty score must be in [1, 10], got {}",
                        beauty
                    )));
                }
                Rating {
                    score: beauty,
                    review: request.precomputed_review.clone(),
                }
            }
            None => self
                .rater
                .rate(&image_bytes, &location.address)
                .await
                .map_err(map_rating_error)?,
        };

        // Step 5: persist image + point + aggregates
        let indexing = hex::index_point(location.lat, location.lng)?;
        let mut point = points::Point::new(
            location.place_id.clone(),
            location.address.clone(),
            location.lat,
            location.lng,
            rating.score,
            rating.review,
            indexing,
        );

        let relative_path = format!("images/{}.jpg", point.guid);
        tokio::fs::write(self.data_dir.join(&relative_path), &image_bytes).await?;
        point.image_path = Some(relative_path);

        let mut tx = self.db.begin().await.map_err(vantage_common::Error::from)?;
        points::insert_point(&mut *tx, &point).await?;
        cells::increment_cell(&mut *tx, indexing.r7, rating.score).await?;
        cells::increment_cell(&mut *tx, indexing.r9, rating.score).await?;
        tx.commit().await.map_err(vantage_common::Error::from)?;

        tracing::info!(
            place_id = %point.place_id,
            address = %point.address,
            beauty = point.beauty,
            cell_r9 = %point.h3_r9,
            "Point stored"
        );

        Ok(Submission::Created(point.to_record()))
    }
}

fn map_geocode_error(error: GeocodeError) -> ApiError {
    match error {
        GeocodeError::NoResults(what) => {
            ApiError::BadRequest(format!("No address found for: {}", what))
        }
        other => ApiError::Upstream(format!("Geocoding failed: {}", other)),
    }
}

fn map_imagery_error(error: ImageryError) -> ApiError {
    match error {
        ImageryError::NoImagery => ApiError::BadRequest(NO_IMAGERY_MESSAGE.to_string()),
        other => ApiError::Upstream(format!("Street imagery fetch failed: {}", other)),
    }
}

fn map_rating_error(error: RatingError) -> ApiError {
    ApiError::Upstream(format!("Aesthetic rating failed: {}", error))
}

//! Point persistence and viewport queries

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use vantage_common::hex::HexIndexing;
use vantage_common::types::{BoundingBox, PointRecord};

/// A rated street-scene point as stored in the database
#[derive(Debug, Clone)]
pub struct Point {
    pub guid: Uuid,
    pub place_id: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub beauty: f64,
    pub review: Option<String>,
    /// Path of the stored image, relative to the data directory
    pub image_path: Option<String>,
    pub h3_r7: String,
    pub h3_r9: String,
    pub h3_r13: String,
    pub created_at: DateTime<Utc>,
}

impl Point {
    pub fn new(
        place_id: String,
        address: String,
        lat: f64,
        lng: f64,
        beauty: f64,
        review: Option<String>,
        indexing: HexIndexing,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            place_id,
            address,
            lat,
            lng,
            beauty,
            review,
            image_path: None,
            h3_r7: indexing.r7.to_string(),
            h3_r9: indexing.r9.to_string(),
            h3_r13: indexing.r13.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Wire representation; the relative image path becomes a served URL
    pub fn to_record(&self) -> PointRecord {
        PointRecord {
            guid: self.guid,
            place_id: self.place_id.clone(),
            address: self.address.clone(),
            lat: self.lat,
            lng: self.lng,
            beauty: self.beauty,
            review: self.review.clone(),
            image_url: self.image_path.as_ref().map(|p| format!("/{}", p)),
            created_at: self.created_at,
        }
    }
}

fn point_from_row(row: &SqliteRow) -> Result<Point> {
    let guid_str: String = row.get("guid");
    let guid = Uuid::parse_str(&guid_str)?;

    let created_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc);

    Ok(Point {
        guid,
        place_id: row.get("place_id"),
        address: row.get("address"),
        lat: row.get("lat"),
        lng: row.get("lng"),
        beauty: row.get("beauty"),
        review: row.get("review"),
        image_path: row.get("image_path"),
        h3_r7: row.get("h3_r7"),
        h3_r9: row.get("h3_r9"),
        h3_r13: row.get("h3_r13"),
        created_at,
    })
}

const POINT_COLUMNS: &str =
    "guid, place_id, address, lat, lng, beauty, review, image_path, h3_r7, h3_r9, h3_r13, created_at";

/// Insert a new point.
///
/// Takes any executor so the insert can share a transaction with the
/// aggregate increments.
pub async fn insert_point<'e>(
    executor: impl sqlx::SqliteExecutor<'e>,
    point: &Point,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO points (guid, place_id, address, lat, lng, beauty, review, image_path,
                            h3_r7, h3_r9, h3_r13, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(point.guid.to_string())
    .bind(&point.place_id)
    .bind(&point.address)
    .bind(point.lat)
    .bind(point.lng)
    .bind(point.beauty)
    .bind(&point.review)
    .bind(&point.image_path)
    .bind(&point.h3_r7)
    .bind(&point.h3_r9)
    .bind(&point.h3_r13)
    .bind(point.created_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Load a point by its provider place ID (deduplication key)
pub async fn find_by_place_id(pool: &SqlitePool, place_id: &str) -> Result<Option<Point>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM points WHERE place_id = ?",
        POINT_COLUMNS
    ))
    .bind(place_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(point_from_row).transpose()
}

/// Load points whose coordinates fall inside the viewport, newest first
pub async fn points_in_bbox(
    pool: &SqlitePool,
    bbox: &BoundingBox,
    limit: i64,
) -> Result<Vec<Point>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM points
        WHERE lat BETWEEN ? AND ? AND lng BETWEEN ? AND ?
        ORDER BY created_at DESC
        LIMIT ?
        "#,
        POINT_COLUMNS
    ))
    .bind(bbox.south)
    .bind(bbox.north)
    .bind(bbox.west)
    .bind(bbox.east)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(point_from_row).collect()
}

/// Count total points in database
pub async fn count_points(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM points")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Total point count and mean beauty score.
///
/// The average is NULL (None) while the table is empty.
pub async fn stats(pool: &SqlitePool) -> Result<(i64, Option<f64>)> {
    let row: (i64, Option<f64>) = sqlx::query_as("SELECT COUNT(*), AVG(beauty) FROM points")
        .fetch_one(pool)
        .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_common::hex;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    fn test_point(place_id: &str, lat: f64, lng: f64, beauty: f64) -> Point {
        Point::new(
            place_id.to_string(),
            format!("{} Test Street, London", place_id),
            lat,
            lng,
            beauty,
            Some("A pleasant terrace.".to_string()),
            hex::index_point(lat, lng).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_find_by_place_id() {
        let pool = test_pool().await;

        let point = test_point("ChIJ-test-1", 51.508, -0.128, 7.0);
        insert_point(&pool, &point).await.unwrap();

        let loaded = find_by_place_id(&pool, "ChIJ-test-1")
            .await
            .unwrap()
            .expect("Point not found");

        assert_eq!(loaded.guid, point.guid);
        assert_eq!(loaded.address, point.address);
        assert_eq!(loaded.beauty, 7.0);
        assert_eq!(loaded.h3_r9, point.h3_r9);

        assert!(find_by_place_id(&pool, "ChIJ-missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_place_id_rejected() {
        let pool = test_pool().await;

        insert_point(&pool, &test_point("ChIJ-dup", 51.50, -0.12, 5.0))
            .await
            .unwrap();
        let result = insert_point(&pool, &test_point("ChIJ-dup", 51.51, -0.13, 6.0)).await;

        assert!(result.is_err());
        assert_eq!(count_points(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bbox_query_filters_and_orders() {
        let pool = test_pool().await;

        insert_point(&pool, &test_point("inside-1", 51.50, -0.12, 5.0))
            .await
            .unwrap();
        insert_point(&pool, &test_point("inside-2", 51.52, -0.10, 8.0))
            .await
            .unwrap();
        // North of the viewport
        insert_point(&pool, &test_point("outside", 51.60, -0.12, 3.0))
            .await
            .unwrap();

        let bbox = BoundingBox::new(51.45, -0.25, 51.55, 0.05).unwrap();
        let points = points_in_bbox(&pool, &bbox, 100).await.unwrap();

        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| bbox.contains(p.lat, p.lng)));

        let limited = points_in_bbox(&pool, &bbox, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_stats_empty_and_populated() {
        let pool = test_pool().await;

        let (count, avg) = stats(&pool).await.unwrap();
        assert_eq!(count, 0);
        assert!(avg.is_none());

        insert_point(&pool, &test_point("a", 51.50, -0.12, 4.0))
            .await
            .unwrap();
        insert_point(&pool, &test_point("b", 51.51, -0.13, 8.0))
            .await
            .unwrap();

        let (count, avg) = stats(&pool).await.unwrap();
        assert_eq!(count, 2);
        assert!((avg.unwrap() - 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_record_image_url() {
        let mut point = test_point("with-image", 51.50, -0.12, 5.0);
        point.image_path = Some(format!("images/{}.jpg", point.guid));

        let record = point.to_record();
        assert_eq!(
            record.image_url.as_deref(),
            Some(format!("/images/{}.jpg", point.guid).as_str())
        );
    }
}

//! Hexagonal grid policy
//!
//! Points are indexed into the H3 hierarchy at three fixed resolutions:
//! large cells (~1.4 km across) drawn at low zoom, medium cells (~200 m)
//! at mid zoom, and fine cells (~4 m) identifying the point itself. The
//! zoom thresholds match what the map frontend renders at each level.

use crate::{Error, Result};
use h3o::{CellIndex, LatLng, Resolution};

/// Resolution of the coarse heatmap cells, drawn at zoom 12 and below
pub const LARGE_RESOLUTION: Resolution = Resolution::Seven;

/// Resolution of the mid-zoom heatmap cells, drawn at zoom 13-15
pub const MEDIUM_RESOLUTION: Resolution = Resolution::Nine;

/// Resolution identifying an individual point location
pub const POINT_RESOLUTION: Resolution = Resolution::Thirteen;

/// Zoom level at and above which individual points are served instead of
/// aggregate cells
pub const POINT_ZOOM: u8 = 16;

/// The three cell indexes stored with every point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexIndexing {
    pub r7: CellIndex,
    pub r9: CellIndex,
    pub r13: CellIndex,
}

/// Compute the cell containing a coordinate at the given resolution
pub fn cell_at(lat: f64, lng: f64, resolution: Resolution) -> Result<CellIndex> {
    let coord = LatLng::new(lat, lng)
        .map_err(|e| Error::InvalidInput(format!("Invalid coordinate ({}, {}): {}", lat, lng, e)))?;
    Ok(coord.to_cell(resolution))
}

/// Compute all three stored cell indexes for a point
pub fn index_point(lat: f64, lng: f64) -> Result<HexIndexing> {
    let coord = LatLng::new(lat, lng)
        .map_err(|e| Error::InvalidInput(format!("Invalid coordinate ({}, {}): {}", lat, lng, e)))?;

    Ok(HexIndexing {
        r7: coord.to_cell(LARGE_RESOLUTION),
        r9: coord.to_cell(MEDIUM_RESOLUTION),
        r13: coord.to_cell(POINT_RESOLUTION),
    })
}

/// Map a map zoom level to the aggregate resolution to serve.
///
/// Returns None at high zoom, where individual points are served instead.
pub fn resolution_for_zoom(zoom: u8) -> Option<Resolution> {
    if zoom >= POINT_ZOOM {
        None
    } else if zoom >= 13 {
        Some(MEDIUM_RESOLUTION)
    } else {
        Some(LARGE_RESOLUTION)
    }
}

/// Center of a cell as (lat, lng) degrees
pub fn cell_center(cell: CellIndex) -> (f64, f64) {
    let center = LatLng::from(cell);
    (center.lat(), center.lng())
}

/// Viewport margin, in degrees, applied when querying aggregate cells so
/// hexes whose center sits just outside the viewport still render.
///
/// Approximately one average hex diameter at each resolution.
pub fn bbox_margin_deg(resolution: Resolution) -> f64 {
    match resolution {
        Resolution::Seven => 0.03,
        Resolution::Nine => 0.005,
        // Finer resolutions are never aggregated; a tiny margin is enough.
        _ => 0.001,
    }
}

/// Parse a stored cell ID string back into a cell index
pub fn parse_cell(s: &str) -> Result<CellIndex> {
    s.parse::<CellIndex>()
        .map_err(|e| Error::InvalidInput(format!("Invalid cell ID '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trafalgar Square
    const LAT: f64 = 51.508;
    const LNG: f64 = -0.128;

    #[test]
    fn index_point_produces_nested_cells() {
        let indexing = index_point(LAT, LNG).unwrap();

        assert_eq!(indexing.r7.resolution(), Resolution::Seven);
        assert_eq!(indexing.r9.resolution(), Resolution::Nine);
        assert_eq!(indexing.r13.resolution(), Resolution::Thirteen);

        // The finer cells sit inside the coarser ones
        assert_eq!(indexing.r9.parent(Resolution::Seven), Some(indexing.r7));
        assert_eq!(indexing.r13.parent(Resolution::Nine), Some(indexing.r9));
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        assert!(index_point(91.0, 0.0).is_err());
        assert!(index_point(0.0, 181.0).is_err());
        assert!(cell_at(f64::NAN, 0.0, Resolution::Nine).is_err());
    }

    #[test]
    fn zoom_mapping_matches_render_thresholds() {
        assert_eq!(resolution_for_zoom(0), Some(Resolution::Seven));
        assert_eq!(resolution_for_zoom(9), Some(Resolution::Seven));
        assert_eq!(resolution_for_zoom(12), Some(Resolution::Seven));
        assert_eq!(resolution_for_zoom(13), Some(Resolution::Nine));
        assert_eq!(resolution_for_zoom(15), Some(Resolution::Nine));
        assert_eq!(resolution_for_zoom(16), None);
        assert_eq!(resolution_for_zoom(20), None);
    }

    #[test]
    fn cell_ids_round_trip_through_strings() {
        let indexing = index_point(LAT, LNG).unwrap();
        let id = indexing.r9.to_string();
        assert_eq!(parse_cell(&id).unwrap(), indexing.r9);
    }

    #[test]
    fn cell_center_is_near_the_indexed_point() {
        let cell = cell_at(LAT, LNG, Resolution::Nine).unwrap();
        let (lat, lng) = cell_center(cell);
        // A res 9 hex is ~200m across; its center is within ~0.01 degrees
        assert!((lat - LAT).abs() < 0.01);
        assert!((lng - LNG).abs() < 0.01);
    }
}

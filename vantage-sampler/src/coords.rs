//! Candidate coordinate generation

use rand::Rng;
use vantage_common::types::BoundingBox;

/// Central London sampling box (roughly Zones 1-3), the default area
pub const LONDON_BBOX: BoundingBox = BoundingBox {
    south: 51.45,
    west: -0.25,
    north: 51.55,
    east: 0.05,
};

/// Uniform random coordinate inside the box
pub fn random_coordinate(rng: &mut impl Rng, bbox: &BoundingBox) -> (f64, f64) {
    (
        rng.gen_range(bbox.south..bbox.north),
        rng.gen_range(bbox.west..bbox.east),
    )
}

/// size x size grid of coordinates spread over the box interior
pub fn grid_coordinates(bbox: &BoundingBox, size: usize) -> Vec<(f64, f64)> {
    let mut coordinates = Vec::with_capacity(size * size);
    if size == 0 {
        return coordinates;
    }

    let lat_step = (bbox.north - bbox.south) / (size + 1) as f64;
    let lng_step = (bbox.east - bbox.west) / (size + 1) as f64;

    for row in 1..=size {
        for col in 1..=size {
            coordinates.push((
                bbox.south + lat_step * row as f64,
                bbox.west + lng_step * col as f64,
            ));
        }
    }

    coordinates
}

/// Submission string for a coordinate; the API reverse-geocodes these
pub fn coordinate_address(lat: f64, lng: f64) -> String {
    format!("{:.6},{:.6}", lat, lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_coordinates_stay_in_bounds() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let (lat, lng) = random_coordinate(&mut rng, &LONDON_BBOX);
            assert!(LONDON_BBOX.contains(lat, lng));
        }
    }

    #[test]
    fn test_grid_size_and_bounds() {
        let grid = grid_coordinates(&LONDON_BBOX, 5);
        assert_eq!(grid.len(), 25);
        assert!(grid.iter().all(|&(lat, lng)| LONDON_BBOX.contains(lat, lng)));

        // Interior points only: no coordinate sits on the box edge
        assert!(grid
            .iter()
            .all(|&(lat, _)| lat > LONDON_BBOX.south && lat < LONDON_BBOX.north));

        assert!(grid_coordinates(&LONDON_BBOX, 0).is_empty());
    }

    #[test]
    fn test_coordinate_address_format() {
        assert_eq!(coordinate_address(51.508, -0.128), "51.508000,-0.128000");
    }
}

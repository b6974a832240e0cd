//! Coverage-driven hierarchical sampling plan
//!
//! Builds the cell work-list for even coverage: a disk of large (res 7)
//! cells around the box center clipped to the box, their medium (res 9)
//! children, and the number of points each still needs given the counts
//! already stored. Candidate points are then drawn inside each
//! under-covered cell by rejection sampling.

use anyhow::Result;
use h3o::{CellIndex, LatLng, Resolution};
use rand::Rng;
use std::collections::BTreeMap;
use vantage_common::hex;
use vantage_common::types::BoundingBox;

/// Approximate center-to-center spacing of res 7 cells, in degrees of
/// latitude. Used only to size the search disk; overestimating is fine.
const R7_SPACING_DEG: f64 = 0.02;

/// One medium cell and how many points it still needs
#[derive(Debug, Clone)]
pub struct CellPlan {
    pub cell: CellIndex,
    pub existing: i64,
    pub needed: i64,
}

/// Build the per-cell plan for a box.
///
/// `existing` maps res 9 cell IDs to their current point counts (from the
/// API's coverage endpoint); `target` is the desired points per cell.
pub fn plan_cells(
    bbox: &BoundingBox,
    existing: &BTreeMap<String, i64>,
    target: i64,
) -> Result<Vec<CellPlan>> {
    bbox.validate()?;

    let (center_lat, center_lng) = bbox.center();
    let center = hex::cell_at(center_lat, center_lng, Resolution::Seven)?;

    // A disk wide enough to cover the whole box from its center
    let extent = (bbox.north - bbox.south).max(bbox.east - bbox.west);
    let k = (extent / 2.0 / R7_SPACING_DEG).ceil() as u32 + 2;

    let disk: Vec<CellIndex> = center.grid_disk(k);

    let mut plans = Vec::new();
    for large in disk {
        let (lat, lng) = hex::cell_center(large);
        if !bbox.contains(lat, lng) {
            continue;
        }

        for medium in large.children(Resolution::Nine) {
            let (lat, lng) = hex::cell_center(medium);
            if !bbox.contains(lat, lng) {
                continue;
            }

            let current = existing.get(&medium.to_string()).copied().unwrap_or(0);
            plans.push(CellPlan {
                cell: medium,
                existing: current,
                needed: (target - current).max(0),
            });
        }
    }

    // Deterministic work order
    plans.sort_by_key(|p| p.cell);

    Ok(plans)
}

/// Uniform random coordinate inside a cell.
///
/// Rejection-samples the cell's bounding box and keeps the first draw
/// that indexes back to the cell, falling back to the cell center if the
/// draws are unlucky.
pub fn random_point_in_cell(rng: &mut impl Rng, cell: CellIndex) -> (f64, f64) {
    let boundary = cell.boundary();
    let mut south = f64::INFINITY;
    let mut north = f64::NEG_INFINITY;
    let mut west = f64::INFINITY;
    let mut east = f64::NEG_INFINITY;

    for vertex in boundary.iter() {
        south = south.min(vertex.lat());
        north = north.max(vertex.lat());
        west = west.min(vertex.lng());
        east = east.max(vertex.lng());
    }

    let resolution = cell.resolution();
    for _ in 0..100 {
        let lat = rng.gen_range(south..north);
        let lng = rng.gen_range(west..east);
        if let Ok(coord) = LatLng::new(lat, lng) {
            if coord.to_cell(resolution) == cell {
                return (lat, lng);
            }
        }
    }

    hex::cell_center(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_bbox() -> BoundingBox {
        BoundingBox::new(51.50, -0.14, 51.52, -0.10).unwrap()
    }

    #[test]
    fn test_plan_covers_the_box_with_medium_cells() {
        let plans = plan_cells(&small_bbox(), &BTreeMap::new(), 1).unwrap();

        assert!(!plans.is_empty());
        for plan in &plans {
            assert_eq!(plan.cell.resolution(), Resolution::Nine);
            assert_eq!(plan.existing, 0);
            assert_eq!(plan.needed, 1);

            let (lat, lng) = hex::cell_center(plan.cell);
            assert!(small_bbox().contains(lat, lng));
        }

        // No duplicate cells
        let mut ids: Vec<_> = plans.iter().map(|p| p.cell).collect();
        ids.dedup();
        assert_eq!(ids.len(), plans.len());
    }

    #[test]
    fn test_existing_counts_reduce_needed() {
        let bbox = small_bbox();
        let baseline = plan_cells(&bbox, &BTreeMap::new(), 2).unwrap();

        // Pretend the first cell already has 3 points, the second has 1
        let mut existing = BTreeMap::new();
        existing.insert(baseline[0].cell.to_string(), 3);
        existing.insert(baseline[1].cell.to_string(), 1);

        let plans = plan_cells(&bbox, &existing, 2).unwrap();
        assert_eq!(plans[0].needed, 0); // already over target
        assert_eq!(plans[1].needed, 1);
        assert_eq!(plans[2].needed, 2);
    }

    #[test]
    fn test_random_point_lands_in_cell() {
        let cell = hex::cell_at(51.508, -0.128, Resolution::Nine).unwrap();
        let mut rng = rand::thread_rng();

        for _ in 0..20 {
            let (lat, lng) = random_point_in_cell(&mut rng, cell);
            let indexed = LatLng::new(lat, lng).unwrap().to_cell(Resolution::Nine);
            assert_eq!(indexed, cell);
        }
    }
}

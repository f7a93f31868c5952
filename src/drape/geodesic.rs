// src/drape/geodesic.rs
// Great-circle sampling of a segment for spheroid displays
// RELEVANT FILES: src/drape/mod.rs, src/geo/great_circle.rs

use log::debug;

use crate::budget::AllocationBudget;
use crate::error::OverlayResult;
use crate::geo::great_circle;
use crate::geo::Projector;
use crate::grid::TerrainGrid;

use super::SurfacePoint;

/// Great-circle distance between two diagonal neighbours at the grid centre.
fn characteristic_spacing(terrain: &TerrainGrid, projector: &Projector) -> OverlayResult<f64> {
    let (i, j) = (terrain.nx() / 2, terrain.ny() / 2);
    let (x0, y0) = terrain.node_position(i, j);
    let (x1, y1) = terrain.node_position(i + 1, j + 1);
    let (lon0, lat0) = projector.grid_to_lonlat(x0, y0)?;
    let (lon1, lat1) = projector.grid_to_lonlat(x1, y1)?;
    Ok(great_circle::distance(lon0, lat0, lon1, lat1))
}

/// Sample `start -> end` along its great circle at about one grid spacing.
///
/// Interior samples take the mean elevation of their cell's valid corners;
/// samples over cells with no valid corner are dropped.
pub(crate) fn sample_great_circle(
    terrain: &TerrainGrid,
    projector: &Projector,
    start: &SurfacePoint,
    end: &SurfacePoint,
    budget: &AllocationBudget,
) -> OverlayResult<Vec<SurfacePoint>> {
    let (bearing, distance) = great_circle::distance_bearing(start.lon, start.lat, end.lon, end.lat);
    let spacing = characteristic_spacing(terrain, projector)?;

    let count = if spacing > 0.0 && distance.is_finite() {
        ((distance / spacing).floor() as usize).saturating_add(1).max(2)
    } else {
        2
    };

    let mut samples = Vec::new();
    if count <= 2 {
        budget.reserve_samples(&mut samples, 2)?;
        samples.push(*start);
        samples.push(*end);
        return Ok(samples);
    }

    budget.reserve_samples(&mut samples, count)?;
    samples.push(*start);
    let step = distance / (count - 1) as f64;
    let mut dropped = 0usize;
    for k in 1..count - 1 {
        let (lon, lat) = great_circle::end_position(start.lon, start.lat, bearing, k as f64 * step);
        match projector.lonlat_to_grid_z(terrain, lon, lat)? {
            Some((x, y, z)) => samples.push(SurfacePoint {
                xgrid: x,
                ygrid: y,
                zdata: z,
                lon,
                lat,
            }),
            None => dropped += 1,
        }
    }
    samples.push(*end);

    if dropped > 0 {
        debug!("Great-circle drape dropped {} samples without data", dropped);
    }
    Ok(samples)
}

// src/drape/mod.rs
// Segment draper: subdivide a straight segment into a terrain-following polyline
// RELEVANT FILES: src/drape/grid_walk.rs, src/drape/geodesic.rs, src/overlay/segment.rs

mod geodesic;
mod grid_walk;

use glam::DVec3;

use crate::budget::AllocationBudget;
use crate::error::OverlayResult;
use crate::geo::{DisplayProjection, GeoResult, Projector};
use crate::grid::TerrainGrid;

/// How a segment is subdivided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrapeMode {
    /// Insert a sample wherever the segment crosses a grid line
    Grid,
    /// Sample the great circle at roughly one grid spacing
    GreatCircle,
}

impl DrapeMode {
    /// Great-circle sampling on spheroid displays, grid crossings otherwise.
    pub fn for_projector(projector: &Projector) -> Self {
        if projector.is_spheroid() {
            DrapeMode::GreatCircle
        } else {
            DrapeMode::Grid
        }
    }
}

/// One drape sample (or segment endpoint) in grid and geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfacePoint {
    pub xgrid: f64,
    pub ygrid: f64,
    pub zdata: f64,
    pub lon: f64,
    pub lat: f64,
}

impl SurfacePoint {
    /// Build from grid coordinates, resolving lon/lat through the projector.
    pub fn from_grid(projector: &Projector, x: f64, y: f64, z: f64) -> GeoResult<Self> {
        let (lon, lat) = projector.grid_to_lonlat(x, y)?;
        Ok(Self {
            xgrid: x,
            ygrid: y,
            zdata: z,
            lon,
            lat,
        })
    }

    /// Build from lon/lat, resolving grid coordinates through the projector.
    pub fn from_lonlat(projector: &Projector, lon: f64, lat: f64, z: f64) -> GeoResult<Self> {
        let (x, y) = projector.lonlat_to_grid(lon, lat)?;
        Ok(Self {
            xgrid: x,
            ygrid: y,
            zdata: z,
            lon,
            lat,
        })
    }

    /// Display position of this point in the projector's window.
    pub fn display(&self, projector: &Projector) -> GeoResult<DVec3> {
        match projector.display_projection() {
            DisplayProjection::AlreadyProjected => Ok(projector
                .forward(self.xgrid, self.ygrid, self.zdata)?
                .display),
            _ => projector.lonlat_to_display(self.lon, self.lat, self.zdata),
        }
    }

    /// Display position raised by `offset` so the sample sits above the terrain.
    pub fn draped_display(&self, projector: &Projector, offset: f64) -> GeoResult<DVec3> {
        Ok(projector.lift(self.display(projector)?, offset))
    }
}

/// Subdivide the segment `start -> end` so it follows the terrain surface.
///
/// The result always begins with `start` and ends with `end`. Endpoints in
/// the same cell, or coincident, yield just the two endpoints. Fails with
/// `OutOfMemory` when the sample buffer cannot be reserved within `budget`.
pub fn drape_segment(
    terrain: &TerrainGrid,
    projector: &Projector,
    start: &SurfacePoint,
    end: &SurfacePoint,
    mode: DrapeMode,
    budget: &AllocationBudget,
) -> OverlayResult<Vec<SurfacePoint>> {
    match mode {
        DrapeMode::Grid => {
            let samples = grid_walk::walk_crossings(terrain, start, end, budget)?;
            let mut out = Vec::new();
            budget.reserve_samples(&mut out, samples.len())?;
            let last = samples.len().saturating_sub(1);
            for (n, sample) in samples.iter().enumerate() {
                // endpoints are carried through unchanged
                let point = if n == 0 {
                    *start
                } else if n == last {
                    *end
                } else {
                    SurfacePoint::from_grid(projector, sample[0], sample[1], sample[2])?
                };
                out.push(point);
            }
            Ok(out)
        }
        DrapeMode::GreatCircle => geodesic::sample_great_circle(terrain, projector, start, end, budget),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GridProjection, ProjectorConfig};

    fn flat_world() -> (TerrainGrid, Projector) {
        let grid = TerrainGrid::filled(10, 10, [0.0, 0.0], [0.1, 0.1], -50.0).unwrap();
        let projector = Projector::new(
            GridProjection::Geographic,
            DisplayProjection::Geographic,
            &grid,
            &ProjectorConfig::default(),
        )
        .unwrap();
        (grid, projector)
    }

    #[test]
    fn test_mode_follows_display() {
        let (grid, projector) = flat_world();
        assert_eq!(DrapeMode::for_projector(&projector), DrapeMode::Grid);
        let spheroid = Projector::new(
            GridProjection::Geographic,
            DisplayProjection::Spheroid,
            &grid,
            &ProjectorConfig::default(),
        )
        .unwrap();
        assert_eq!(DrapeMode::for_projector(&spheroid), DrapeMode::GreatCircle);
    }

    #[test]
    fn test_endpoints_preserved_exactly() {
        let (grid, projector) = flat_world();
        let start = SurfacePoint::from_grid(&projector, 0.05, 0.12, -50.0).unwrap();
        let end = SurfacePoint::from_grid(&projector, 0.73, 0.41, -50.0).unwrap();
        let line = drape_segment(
            &grid,
            &projector,
            &start,
            &end,
            DrapeMode::Grid,
            &AllocationBudget::default(),
        )
        .unwrap();
        assert_eq!(line.first(), Some(&start));
        assert_eq!(line.last(), Some(&end));
        assert!(line.len() > 2);
        for pair in line.windows(2) {
            assert!(pair[1].xgrid >= pair[0].xgrid);
        }
    }

    #[test]
    fn test_lift_raises_display_z() {
        let (_, projector) = flat_world();
        let p = SurfacePoint::from_grid(&projector, 0.3, 0.3, -50.0).unwrap();
        let base = p.display(&projector).unwrap();
        let lifted = p.draped_display(&projector, 0.01).unwrap();
        assert!((lifted.z - base.z - 0.01).abs() < 1e-12);
        assert_eq!(lifted.x, base.x);
    }
}

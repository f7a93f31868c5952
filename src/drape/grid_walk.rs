// src/drape/grid_walk.rs
// Grid-line crossing walk for draping a segment over a regular grid
// RELEVANT FILES: src/drape/mod.rs, src/grid.rs

use crate::budget::AllocationBudget;
use crate::error::OverlayResult;
use crate::grid::TerrainGrid;

use super::SurfacePoint;

/// Grid-space sample `[x, y, z]`.
pub(crate) type GridSample = [f64; 3];

/// First crossing line and step along one axis.
fn crossing_walk(start_cell: i64, end_cell: i64) -> (i64, i64, usize) {
    let count = usize::try_from(end_cell.abs_diff(start_cell)).unwrap_or(usize::MAX);
    if end_cell > start_cell {
        (start_cell + 1, 1, count)
    } else {
        (start_cell, -1, count)
    }
}

/// Samples of the segment at every vertical and horizontal grid line it crosses.
///
/// Crossings whose bracketing nodes are off the grid or hold no data are
/// skipped, as are horizontal crossings that coincide with a sample already
/// present. The first and last entries are the endpoints.
pub(crate) fn walk_crossings(
    terrain: &TerrainGrid,
    start: &SurfacePoint,
    end: &SurfacePoint,
    budget: &AllocationBudget,
) -> OverlayResult<Vec<GridSample>> {
    let p0 = [start.xgrid, start.ygrid, start.zdata];
    let p1 = [end.xgrid, end.ygrid, end.zdata];

    let (istart, jstart) = terrain.cell_of(p0[0], p0[1]);
    let (iend, jend) = terrain.cell_of(p1[0], p1[1]);

    let mut samples: Vec<GridSample> = Vec::new();
    if istart == iend && jstart == jend {
        budget.reserve_samples(&mut samples, 2)?;
        samples.push(p0);
        samples.push(p1);
        return Ok(samples);
    }

    let (ifirst, istep, ni) = crossing_walk(istart, iend);
    let (jfirst, jstep, nj) = crossing_walk(jstart, jend);
    budget.reserve_samples(&mut samples, ni.saturating_add(nj).saturating_add(2))?;

    let (xmin, ymin) = (terrain.xmin(), terrain.ymin());
    let (dx, dy) = (terrain.dx(), terrain.dy());

    samples.push(p0);

    // vertical grid lines, appended in travel order
    if ni > 0 && p0[0] != p1[0] {
        let m = (p1[1] - p0[1]) / (p1[0] - p0[0]);
        let b = p0[1] - m * p0[0];
        for n in 0..ni as i64 {
            let i = ifirst + n * istep;
            let x = xmin + i as f64 * dx;
            let y = m * x + b;
            let j = ((y - ymin) / dy).floor() as i64;
            if !terrain.is_cell(i, j) {
                continue;
            }
            let (iu, ju) = (i as usize, j as usize);
            if let (Some(zk), Some(zl)) = (terrain.value(iu, ju), terrain.value(iu, ju + 1)) {
                let (zk, zl) = (f64::from(zk), f64::from(zl));
                let z = zk + (y - ymin - j as f64 * dy) / dy * (zl - zk);
                samples.push([x, y, z]);
            }
        }
    }

    samples.push(p1);

    // horizontal grid lines, merged into the ordered list
    if nj > 0 && p0[1] != p1[1] {
        let m = (p1[0] - p0[0]) / (p1[1] - p0[1]);
        let b = p0[0] - m * p0[1];
        let ascending = p1[1] > p0[1];
        let mut hint = 1usize;
        for n in 0..nj as i64 {
            let j = jfirst + n * jstep;
            let y = ymin + j as f64 * dy;
            let x = m * y + b;
            let i = ((x - xmin) / dx).floor() as i64;
            if !terrain.is_cell(i, j) {
                continue;
            }
            let (iu, ju) = (i as usize, j as usize);
            let (zk, zl) = match (terrain.value(iu, ju), terrain.value(iu + 1, ju)) {
                (Some(zk), Some(zl)) => (f64::from(zk), f64::from(zl)),
                _ => continue,
            };
            let z = zk + (x - xmin - i as f64 * dx) / dx * (zl - zk);
            if let Some(at) = insertion_slot(&samples, hint, y, ascending) {
                samples.insert(at, [x, y, z]);
                hint = at;
            }
        }
    }

    Ok(samples)
}

/// Walk from `hint` to the slot where `y` falls strictly between its neighbours.
///
/// `None` when `y` coincides with a neighbour or the walk leaves the interior.
fn insertion_slot(samples: &[GridSample], hint: usize, y: f64, ascending: bool) -> Option<usize> {
    let mut at = hint;
    while at > 0 && at < samples.len() {
        let before = samples[at - 1][1];
        let after = samples[at][1];
        if y == before || y == after {
            return None;
        }
        let (inside, go_back) = if ascending {
            (before < y && y < after, y < before)
        } else {
            (after < y && y < before, y > before)
        };
        if inside {
            return Some(at);
        }
        if go_back {
            at -= 1;
        } else {
            at += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64, z: f64) -> SurfacePoint {
        SurfacePoint {
            xgrid: x,
            ygrid: y,
            zdata: z,
            lon: x,
            lat: y,
        }
    }

    fn unit_grid(nx: usize, ny: usize) -> TerrainGrid {
        let mut data = Vec::with_capacity(nx * ny);
        for i in 0..nx {
            for j in 0..ny {
                data.push((i * 10 + j) as f32);
            }
        }
        TerrainGrid::new(nx, ny, [0.0, 0.0], [1.0, 1.0], -9999.0, data).unwrap()
    }

    #[test]
    fn test_same_cell_returns_endpoints() {
        let grid = unit_grid(4, 4);
        let out = walk_crossings(
            &grid,
            &point(0.2, 0.2, 1.0),
            &point(0.8, 0.6, 2.0),
            &AllocationBudget::default(),
        )
        .unwrap();
        assert_eq!(out, vec![[0.2, 0.2, 1.0], [0.8, 0.6, 2.0]]);
    }

    #[test]
    fn test_far_off_grid_endpoints_hit_budget() {
        let grid = unit_grid(4, 4);
        let err = walk_crossings(
            &grid,
            &point(-1e300, -1e300, 0.0),
            &point(1e300, 1e300, 0.0),
            &AllocationBudget::default(),
        )
        .unwrap_err();
        assert_eq!(err.category(), "OutOfMemory");
    }

    #[test]
    fn test_counts_vertical_and_horizontal_crossings() {
        let grid = unit_grid(6, 6);
        // crosses x = 1, 2, 3 and y = 1 with no coincident crossings
        let out = walk_crossings(
            &grid,
            &point(0.5, 0.25, 0.0),
            &point(3.5, 1.5, 0.0),
            &AllocationBudget::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 2 + 3 + 1);
        for pair in out.windows(2) {
            assert!(pair[1][0] > pair[0][0], "{:?}", out);
            assert!(pair[1][1] > pair[0][1], "{:?}", out);
        }
    }

    #[test]
    fn test_interpolates_between_bracketing_nodes() {
        let grid = unit_grid(4, 4);
        let out = walk_crossings(
            &grid,
            &point(0.5, 0.25, 0.0),
            &point(1.5, 0.25, 0.0),
            &AllocationBudget::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 3);
        // x = 1 between nodes (1,0) = 10 and (1,1) = 11
        assert!((out[1][2] - 10.25).abs() < 1e-12);
    }

    #[test]
    fn test_descending_walk_keeps_order() {
        let grid = unit_grid(6, 6);
        let out = walk_crossings(
            &grid,
            &point(3.5, 4.75, 0.0),
            &point(0.5, 0.5, 0.0),
            &AllocationBudget::default(),
        )
        .unwrap();
        assert_eq!(out.first(), Some(&[3.5, 4.75, 0.0]));
        assert_eq!(out.last(), Some(&[0.5, 0.5, 0.0]));
        for pair in out.windows(2) {
            assert!(pair[1][1] < pair[0][1], "{:?}", out);
        }
    }

    #[test]
    fn test_budget_failure_reported() {
        let grid = unit_grid(6, 6);
        let budget = AllocationBudget {
            max_drape_samples: 3,
            max_collection_points: 16,
        };
        let err = walk_crossings(&grid, &point(0.5, 0.5, 0.0), &point(4.5, 4.2, 0.0), &budget)
            .unwrap_err();
        assert_eq!(err.category(), "OutOfMemory");
    }
}

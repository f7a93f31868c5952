// tests/test_drape.rs
// Segment draper integration tests: crossing samples, no-data skipping and endpoint fidelity.
// Exercises the public drape API against small hand-built grids.
// RELEVANT FILES: src/drape/mod.rs, src/drape/grid_walk.rs, src/drape/geodesic.rs, src/budget.rs

use drape3d::{
    drape_segment, AllocationBudget, DisplayProjection, DrapeMode, GridProjection, Projector,
    ProjectorConfig, SurfacePoint, TerrainGrid,
};

const NODATA: f32 = -99999.0;

fn projector_for(terrain: &TerrainGrid, display: DisplayProjection) -> Projector {
    Projector::new(
        GridProjection::Geographic,
        display,
        terrain,
        &ProjectorConfig::default(),
    )
    .expect("projector should build")
}

/// Unit-spaced grid at -10 everywhere, with the listed nodes holding no data.
fn grid_with_holes(nx: usize, ny: usize, holes: &[(usize, usize)]) -> TerrainGrid {
    let mut data = vec![-10.0f32; nx * ny];
    for &(i, j) in holes {
        data[i * ny + j] = NODATA;
    }
    TerrainGrid::new(nx, ny, [0.0, 0.0], [1.0, 1.0], NODATA, data).expect("grid should build")
}

fn drape(
    terrain: &TerrainGrid,
    projector: &Projector,
    a: (f64, f64),
    b: (f64, f64),
) -> Vec<SurfacePoint> {
    let start = SurfacePoint::from_grid(projector, a.0, a.1, -10.0).unwrap();
    let end = SurfacePoint::from_grid(projector, b.0, b.1, -10.0).unwrap();
    drape_segment(
        terrain,
        projector,
        &start,
        &end,
        DrapeMode::for_projector(projector),
        &AllocationBudget::default(),
    )
    .expect("drape should succeed")
}

#[test]
fn diagonal_over_missing_node_keeps_valid_crossing_only() {
    let terrain = grid_with_holes(4, 4, &[(2, 2)]);
    let projector = projector_for(&terrain, DisplayProjection::Geographic);
    let line = drape(&terrain, &projector, (0.5, 0.5), (2.5, 2.5));

    // x = 1 and y = 1 meet at the same place; x = 2 and y = 2 touch the hole
    assert_eq!(line.len(), 3, "samples: {:?}", line);
    assert_eq!((line[0].xgrid, line[0].ygrid), (0.5, 0.5));
    assert!((line[1].xgrid - 1.0).abs() < 1e-12);
    assert!((line[1].ygrid - 1.0).abs() < 1e-12);
    assert!((line[1].zdata + 10.0).abs() < 1e-9, "z {}", line[1].zdata);
    assert_eq!((line[2].xgrid, line[2].ygrid), (2.5, 2.5));
}

#[test]
fn sample_count_is_endpoints_plus_crossings() {
    let terrain = grid_with_holes(10, 10, &[]);
    let projector = projector_for(&terrain, DisplayProjection::Geographic);
    // crosses x = 1..=6 and y = 1..=3, none of them at a shared point
    let line = drape(&terrain, &projector, (0.5, 0.3), (6.5, 3.6));
    assert_eq!(line.len(), 2 + 6 + 3, "samples: {:?}", line);

    for pair in line.windows(2) {
        assert!(pair[1].xgrid > pair[0].xgrid, "x not increasing: {:?}", pair);
        assert!(pair[1].ygrid > pair[0].ygrid, "y not increasing: {:?}", pair);
    }
    for sample in &line[1..line.len() - 1] {
        let on_vertical = (sample.xgrid - sample.xgrid.round()).abs() < 1e-9;
        let on_horizontal = (sample.ygrid - sample.ygrid.round()).abs() < 1e-9;
        assert!(on_vertical || on_horizontal, "off grid line: {:?}", sample);
    }
}

#[test]
fn reversed_segment_visits_same_crossings() {
    let terrain = grid_with_holes(10, 10, &[(4, 2)]);
    let projector = projector_for(&terrain, DisplayProjection::Geographic);
    let forward = drape(&terrain, &projector, (0.5, 0.3), (6.5, 3.6));
    let mut backward = drape(&terrain, &projector, (6.5, 3.6), (0.5, 0.3));
    backward.reverse();

    assert_eq!(forward.len(), backward.len());
    for (f, b) in forward.iter().zip(&backward) {
        assert!((f.xgrid - b.xgrid).abs() < 1e-9);
        assert!((f.ygrid - b.ygrid).abs() < 1e-9);
    }
}

#[test]
fn endpoints_in_one_cell_yield_two_samples() {
    let terrain = grid_with_holes(4, 4, &[]);
    let projector = projector_for(&terrain, DisplayProjection::Geographic);
    let line = drape(&terrain, &projector, (1.1, 1.2), (1.9, 1.7));
    assert_eq!(line.len(), 2);
}

#[test]
fn great_circle_drape_keeps_endpoints_exact() {
    let terrain = grid_with_holes(10, 10, &[]);
    let projector = projector_for(&terrain, DisplayProjection::Spheroid);
    assert_eq!(DrapeMode::for_projector(&projector), DrapeMode::GreatCircle);

    let start = SurfacePoint::from_grid(&projector, 0.5, 0.5, -10.0).unwrap();
    let end = SurfacePoint::from_grid(&projector, 8.5, 7.5, -10.0).unwrap();
    let line = drape_segment(
        &terrain,
        &projector,
        &start,
        &end,
        DrapeMode::GreatCircle,
        &AllocationBudget::default(),
    )
    .expect("great circle drape should succeed");

    assert!(line.len() > 2, "expected interior samples, got {}", line.len());
    assert_eq!(line.first(), Some(&start));
    assert_eq!(line.last(), Some(&end));
}

#[test]
fn tiny_sample_budget_reports_out_of_memory() {
    let terrain = grid_with_holes(10, 10, &[]);
    let projector = projector_for(&terrain, DisplayProjection::Geographic);
    let start = SurfacePoint::from_grid(&projector, 0.5, 0.3, -10.0).unwrap();
    let end = SurfacePoint::from_grid(&projector, 6.5, 3.6, -10.0).unwrap();
    let budget = AllocationBudget {
        max_drape_samples: 4,
        max_collection_points: 1024,
    };
    let err = drape_segment(&terrain, &projector, &start, &end, DrapeMode::Grid, &budget)
        .expect_err("budget of 4 samples cannot hold 11");
    assert_eq!(err.category(), "OutOfMemory");
}

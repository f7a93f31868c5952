// tests/test_picking.rs
// Pick resolver and view bounds integration tests on a projected unit grid.
// Verifies multi-resolution refinement and visible-region bounds through the public API.
// RELEVANT FILES: src/picking/resolver.rs, src/picking/view_bounds.rs, src/picking/id_buffer.rs, src/view.rs

use std::rc::Rc;

use drape3d::geo::LocalProjection;
use drape3d::picking::{PickScene, TerrainMesh};
use drape3d::{
    compute_view_bounds, DisplayMode, DisplayProjection, GridBounds, GridProjection,
    PickResolver, Projector, ProjectorConfig, SoftwareIdBuffer, TerrainGrid, ViewTransform,
    ViewerConfig,
};

struct Scene {
    terrain: TerrainGrid,
    projector: Projector,
    mesh: TerrainMesh,
    view: ViewTransform,
    config: ViewerConfig,
}

impl Scene {
    fn new(n: usize, mode: DisplayMode) -> Self {
        let terrain = TerrainGrid::filled(n, n, [0.0, 0.0], [1.0, 1.0], -100.0).unwrap();
        Self::with_terrain(terrain, mode)
    }

    fn with_terrain(terrain: TerrainGrid, mode: DisplayMode) -> Self {
        let projector = Projector::new(
            GridProjection::Projected(Rc::new(LocalProjection::new(0.0, 0.0))),
            DisplayProjection::AlreadyProjected,
            &terrain,
            &ProjectorConfig::default(),
        )
        .expect("projector should build");
        let mesh = TerrainMesh::build(&terrain, &projector).expect("mesh should build");
        Self {
            terrain,
            projector,
            mesh,
            view: ViewTransform::new(mode, 400, 400),
            config: ViewerConfig::default(),
        }
    }

    fn scene(&self) -> PickScene<'_> {
        PickScene {
            terrain: &self.terrain,
            projector: &self.projector,
            mesh: &self.mesh,
            view: &self.view,
            config: &self.config,
        }
    }

    fn pixel_of(&self, x: f64, y: f64) -> (u32, u32) {
        let d = self.projector.forward(x, y, -100.0).unwrap().display;
        let (px, py, _) = self.view.display_to_pixel(d).expect("point in front of camera");
        (px as u32, py as u32)
    }
}

#[test]
fn pick_lands_within_a_cell_of_the_target() {
    let fx = Scene::new(60, DisplayMode::TwoD);
    let mut buffer = SoftwareIdBuffer::new(400, 400);

    for &(x, y) in &[(7.3, 50.8), (30.0, 30.0), (54.4, 9.9)] {
        let mut resolver = PickResolver::new(fx.scene(), &mut buffer);
        let (px, py) = fx.pixel_of(x, y);
        let result = resolver.find_point(px, py, None).unwrap();
        assert!(result.found, "pick at ({}, {}) missed", x, y);
        // one pixel spans half a cell at this zoom
        assert!((result.xgrid - x).abs() < 1.0, "x {} vs {}", result.xgrid, x);
        assert!((result.ygrid - y).abs() < 1.0, "y {} vs {}", result.ygrid, y);
        assert!((result.zdata + 100.0).abs() < 1e-9);
    }
}

const NODATA: f32 = -9999.0;

/// Flat grid at -100 with the lower-left 3x3 block of nodes missing.
fn grid_with_missing_corner(n: usize) -> TerrainGrid {
    let mut data = vec![-100.0; n * n];
    for i in 0..3 {
        for j in 0..3 {
            data[i * n + j] = NODATA;
        }
    }
    TerrainGrid::new(n, n, [0.0, 0.0], [1.0, 1.0], NODATA, data).unwrap()
}

fn is_centroid_offset(v: f64) -> bool {
    let f = v.fract();
    (f - 1.0 / 3.0).abs() < 1e-9 || (f - 2.0 / 3.0).abs() < 1e-9
}

#[test]
fn pick_in_perspective_view_lands_within_a_cell() {
    let fx = Scene::new(60, DisplayMode::ThreeD);
    let mut buffer = SoftwareIdBuffer::new(400, 400);

    for &(x, y) in &[(12.4, 40.6), (30.0, 30.0), (47.8, 18.1)] {
        let mut resolver = PickResolver::new(fx.scene(), &mut buffer);
        let (px, py) = fx.pixel_of(x, y);
        let result = resolver.find_point(px, py, None).unwrap();
        assert!(result.found, "3D pick at ({}, {}) missed", x, y);
        assert!((result.xgrid - x).abs() < 1.0, "x {} vs {}", result.xgrid, x);
        assert!((result.ygrid - y).abs() < 1.0, "y {} vs {}", result.ygrid, y);
        assert!(is_centroid_offset(result.xgrid), "x {} not a centroid", result.xgrid);
        assert!((result.zdata + 100.0).abs() < 1e-9);
    }
}

#[test]
fn pick_next_to_missing_tile_origin_is_found() {
    for mode in [DisplayMode::ThreeD, DisplayMode::TwoD] {
        let fx = Scene::with_terrain(grid_with_missing_corner(60), mode);
        let mut buffer = SoftwareIdBuffer::new(400, 400);
        let mut resolver = PickResolver::new(fx.scene(), &mut buffer);
        let (px, py) = fx.pixel_of(3.3, 3.3);
        let result = resolver.find_point(px, py, None).unwrap();

        assert!(result.found, "{:?} pick over valid terrain missed", mode);
        // an id render resolved the hit, not the 2D pixel inverse
        assert!(resolver.trace().len() >= 2, "{:?} stopped after {:?}", mode, resolver.trace());
        assert!(is_centroid_offset(result.xgrid), "{:?} x {}", mode, result.xgrid);
        assert!(is_centroid_offset(result.ygrid), "{:?} y {}", mode, result.ygrid);
        assert!((result.xgrid - 3.3).abs() < 1.0, "{:?} x {}", mode, result.xgrid);
        assert!((result.ygrid - 3.3).abs() < 1.0, "{:?} y {}", mode, result.ygrid);
        assert!((result.zdata + 100.0).abs() < 1e-9);
    }
}

#[test]
fn refinement_trace_nests_and_shrinks() {
    let fx = Scene::new(60, DisplayMode::TwoD);
    let mut buffer = SoftwareIdBuffer::new(400, 400);
    let mut resolver = PickResolver::new(fx.scene(), &mut buffer);
    let (px, py) = fx.pixel_of(23.2, 41.7);
    let result = resolver.find_point(px, py, None).unwrap();
    assert!(result.found);

    let trace = resolver.trace();
    assert!(trace.len() >= 2, "expected several passes, got {:?}", trace);
    for pair in trace.windows(2) {
        assert!(pair[0].contains(&pair[1]), "window escaped its parent: {:?}", trace);
        assert!(pair[1].is_smaller_than(&pair[0]), "window did not shrink: {:?}", trace);
    }
}

#[test]
fn coarse_bounds_limit_the_first_pass() {
    let fx = Scene::new(60, DisplayMode::TwoD);
    let mut buffer = SoftwareIdBuffer::new(400, 400);
    let mut resolver = PickResolver::new(fx.scene(), &mut buffer);
    let coarse = GridBounds::new(30, 55, 5, 25);
    let (px, py) = fx.pixel_of(41.7, 12.6);
    let result = resolver.find_point(px, py, Some(coarse)).unwrap();
    assert!(result.found);
    assert!((result.xgrid - 41.7).abs() < 1.0);

    let trace = resolver.trace();
    assert!(coarse.contains(&trace[0]), "first pass {:?} outside {:?}", trace[0], coarse);
}

#[test]
fn view_bounds_cover_whole_grid_when_fully_visible() {
    let fx = Scene::new(40, DisplayMode::TwoD);
    let mut buffer = SoftwareIdBuffer::new(400, 400);
    let bounds = compute_view_bounds(&fx.scene(), &mut buffer);
    assert_eq!(bounds, fx.terrain.full_bounds());
}

#[test]
fn view_bounds_shrink_when_zoomed_in() {
    let mut fx = Scene::new(40, DisplayMode::TwoD);
    fx.view.size_2d = 8.0;
    let mut buffer = SoftwareIdBuffer::new(400, 400);
    let bounds = compute_view_bounds(&fx.scene(), &mut buffer);
    let full = fx.terrain.full_bounds();

    assert!(full.contains(&bounds));
    assert!(bounds.is_smaller_than(&full), "zoomed bounds {:?}", bounds);
    // the view stays centred on the grid
    assert!(bounds.imin < 20 && bounds.imax > 20, "{:?}", bounds);
    assert!(bounds.jmin < 20 && bounds.jmax > 20, "{:?}", bounds);
}

#[test]
fn three_d_view_bounds_stay_on_grid() {
    let fx = Scene::new(60, DisplayMode::ThreeD);
    let mut buffer = SoftwareIdBuffer::new(400, 400);
    let bounds = compute_view_bounds(&fx.scene(), &mut buffer);
    let full = fx.terrain.full_bounds();
    assert!(full.contains(&bounds), "{:?} not inside {:?}", bounds, full);
    assert!(!bounds.is_collapsed());
}

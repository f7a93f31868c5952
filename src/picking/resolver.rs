// src/picking/resolver.rs
// Progressive-refinement point picking through colour-encoded id renders
// RELEVANT FILES: src/picking/id_buffer.rs, src/picking/view_bounds.rs, src/picking/terrain_mesh.rs

use glam::DVec3;
use log::debug;

use crate::config::ViewerConfig;
use crate::error::OverlayResult;
use crate::geo::Projector;
use crate::grid::{GridBounds, TerrainGrid};
use crate::picking::id_buffer::IdRasterizer;
use crate::picking::terrain_mesh::TerrainMesh;
use crate::view::{DisplayMode, ViewTransform};

/// Grid sampling density of one id render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Roughly `lorez_dimension` nodes per axis
    Low,
    /// Roughly `hirez_dimension` nodes per axis
    High,
    /// Every node
    Full,
}

/// Outcome of a pick: grid, geographic and display position of the hit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PickResult {
    pub found: bool,
    pub xgrid: f64,
    pub ygrid: f64,
    pub lon: f64,
    pub lat: f64,
    pub zdata: f64,
    pub display: DVec3,
}

/// One id render and read-back over a search window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickPass {
    pub result: PickResult,
    /// Narrowed search window when found, otherwise the input window
    pub bounds: GridBounds,
    pub stride: usize,
    pub pick_stride: usize,
}

/// Everything a pick reads about one window.
#[derive(Clone, Copy)]
pub struct PickScene<'a> {
    pub terrain: &'a TerrainGrid,
    pub projector: &'a Projector,
    pub mesh: &'a TerrainMesh,
    pub view: &'a ViewTransform,
    pub config: &'a ViewerConfig,
}

impl<'a> PickScene<'a> {
    /// Node stride of a resolution.
    pub fn stride(&self, resolution: Resolution) -> usize {
        match resolution {
            Resolution::Full => 1,
            Resolution::High => self.terrain.stride_for(self.config.hirez_dimension),
            Resolution::Low => self.terrain.stride_for(self.config.lorez_dimension),
        }
    }
}

/// Stride between colour tiles along one axis of `count` nodes.
pub(crate) fn tile_stride(count: usize, stride: usize, division: u32) -> usize {
    stride * ((count / stride) / division.max(1) as usize + 1)
}

/// Clear the rasterizer and draw every cell of `bounds` at `stride`, coloured
/// by its tile relative to the window origin.
pub(crate) fn render_tiles(
    rasterizer: &mut dyn IdRasterizer,
    scene: &PickScene<'_>,
    bounds: &GridBounds,
    stride: usize,
    tile_strides: (usize, usize),
) {
    let levels = scene.config.pick_levels() as f32;
    rasterizer.clear(
        scene.view.view_projection().as_mat4(),
        scene.view.mode == DisplayMode::ThreeD,
    );
    let mut i = bounds.imin;
    while i + stride <= bounds.imax {
        let mut j = bounds.jmin;
        while j + stride <= bounds.jmax {
            let tile = (
                (i - bounds.imin) / tile_strides.0,
                (j - bounds.jmin) / tile_strides.1,
            );
            scene.mesh.draw_cell(rasterizer, i, j, stride, tile, levels);
            j += stride;
        }
        i += stride;
    }
}

/// Narrow one axis around a decoded node.
fn narrow(index: usize, pick_stride: usize, lo: usize, hi: usize) -> (usize, usize) {
    if pick_stride == 1 {
        (index, index)
    } else {
        (
            index.saturating_sub(pick_stride).max(lo),
            (index + 2 * pick_stride - 1).min(hi),
        )
    }
}

/// First valid elevation inside the tile starting at node (i, j).
fn tile_elevation(terrain: &TerrainGrid, i: usize, j: usize, pick_stride: usize) -> Option<f64> {
    let iend = (i + pick_stride).min(terrain.nx() - 1);
    let jend = (j + pick_stride).min(terrain.ny() - 1);
    (i..=iend)
        .flat_map(|ii| (j..=jend).map(move |jj| (ii, jj)))
        .find_map(|(ii, jj)| terrain.value(ii, jj))
        .map(f64::from)
}

/// Maps window pixels to terrain positions by id rendering.
pub struct PickResolver<'a> {
    scene: PickScene<'a>,
    rasterizer: &'a mut dyn IdRasterizer,
    trace: Vec<GridBounds>,
}

impl<'a> PickResolver<'a> {
    pub fn new(scene: PickScene<'a>, rasterizer: &'a mut dyn IdRasterizer) -> Self {
        Self {
            scene,
            rasterizer,
            trace: Vec::new(),
        }
    }

    /// Search windows visited by the last `find_point`, starting window first.
    pub fn trace(&self) -> &[GridBounds] {
        &self.trace
    }

    /// Render `bounds` at `resolution`, read the pixel and decode the hit.
    pub fn find_point_rez(
        &mut self,
        px: u32,
        py: u32,
        resolution: Resolution,
        bounds: GridBounds,
    ) -> OverlayResult<PickPass> {
        let scene = self.scene;
        let stride = scene.stride(resolution);
        let division = scene.config.pick_division;
        let pick_stride = tile_stride(bounds.width(), stride, division)
            .max(tile_stride(bounds.height(), stride, division));

        render_tiles(
            &mut *self.rasterizer,
            &scene,
            &bounds,
            stride,
            (pick_stride, pick_stride),
        );

        let miss = PickPass {
            result: PickResult::default(),
            bounds,
            stride,
            pick_stride,
        };
        let levels = scene.config.pick_levels() as f32;
        let cell = match self.rasterizer.read_pixel(px, py).and_then(|c| c.decode(levels)) {
            Some(cell) => cell,
            None => {
                debug!("{:?} pick at ({}, {}) hit background", resolution, px, py);
                return Ok(miss);
            }
        };

        let i = bounds.imin + pick_stride * cell.tile_i;
        let j = bounds.jmin + pick_stride * cell.tile_j;
        if i > bounds.imax || j > bounds.jmax {
            return Ok(miss);
        }

        let terrain = scene.terrain;
        let (third_x, third_y, corners) = if cell.upper {
            (
                3 * i + 2 * stride,
                3 * j + 2 * stride,
                [(i + stride, j), (i + stride, j + stride), (i, j + stride)],
            )
        } else {
            (
                3 * i + stride,
                3 * j + stride,
                [(i, j), (i + stride, j), (i, j + stride)],
            )
        };
        let xgrid = terrain.xmin() + third_x as f64 * terrain.dx() / 3.0;
        let ygrid = terrain.ymin() + third_y as f64 * terrain.dy() / 3.0;

        let (sum, count) = corners
            .iter()
            .filter_map(|&(ci, cj)| terrain.value(ci, cj))
            .fold((0.0, 0usize), |(s, n), z| (s + f64::from(z), n + 1));
        // coarse tiles decode to their origin, which may hold no data
        let zdata = if count > 0 {
            sum / count as f64
        } else {
            terrain
                .cell_mean(xgrid, ygrid)
                .or_else(|| tile_elevation(terrain, i, j, pick_stride))
                .unwrap_or_else(|| f64::from(terrain.z_range().0))
        };

        let projected = scene.projector.forward(xgrid, ygrid, zdata)?;
        let (imin, imax) = narrow(i, pick_stride, bounds.imin, bounds.imax);
        let (jmin, jmax) = narrow(j, pick_stride, bounds.jmin, bounds.jmax);
        debug!(
            "{:?} pick at ({}, {}) -> node ({}, {}) stride {} pickstride {}",
            resolution, px, py, i, j, stride, pick_stride
        );

        Ok(PickPass {
            result: PickResult {
                found: true,
                xgrid,
                ygrid,
                lon: projected.lon,
                lat: projected.lat,
                zdata,
                display: projected.display,
            },
            bounds: GridBounds::new(imin, imax, jmin, jmax),
            stride,
            pick_stride,
        })
    }

    /// Resolve a pixel to the terrain under it.
    ///
    /// Starts with a low resolution pass over `coarse` (or the whole grid),
    /// then refines while the hit is found and the window has not collapsed.
    /// A failed refinement keeps the last good hit. In 2D a complete miss
    /// falls back to inverting the pixel through the view transform.
    pub fn find_point(
        &mut self,
        px: u32,
        py: u32,
        coarse: Option<GridBounds>,
    ) -> OverlayResult<PickResult> {
        self.trace.clear();
        let mut bounds = coarse.unwrap_or_else(|| self.scene.terrain.full_bounds());
        self.trace.push(bounds);
        let mut best: Option<PickResult> = None;

        let mut found = false;
        for resolution in [Resolution::Low, Resolution::High] {
            let pass = self.find_point_rez(px, py, resolution, bounds)?;
            found = pass.result.found;
            if !found {
                break;
            }
            best = Some(pass.result);
            if pass.bounds != bounds {
                bounds = pass.bounds;
                self.trace.push(bounds);
            }
        }

        let hirez = self.scene.config.hirez_dimension;
        let mut force_full = false;
        while found && !bounds.is_collapsed() {
            let resolution = if !force_full && (bounds.width() > hirez || bounds.height() > hirez) {
                Resolution::High
            } else {
                Resolution::Full
            };
            let pass = self.find_point_rez(px, py, resolution, bounds)?;
            found = pass.result.found;
            if !found {
                break;
            }
            best = Some(pass.result);
            if pass.bounds.is_smaller_than(&bounds) {
                bounds = pass.bounds;
                self.trace.push(bounds);
            } else if resolution == Resolution::Full {
                break;
            } else {
                force_full = true;
            }
        }

        match best {
            Some(result) => Ok(result),
            None if self.scene.view.mode == DisplayMode::TwoD => self.pixel_fallback(px, py),
            None => Ok(PickResult::default()),
        }
    }

    fn pixel_fallback(&self, px: u32, py: u32) -> OverlayResult<PickResult> {
        let display = self
            .scene
            .view
            .pixel_to_display_2d(f64::from(px), f64::from(py));
        let (lon, lat, xgrid, ygrid) = self.scene.projector.inverse(display)?;
        let zdata = self.scene.terrain.cell_mean(xgrid, ygrid).unwrap_or(0.0);
        debug!("2D pick at ({}, {}) resolved from pixel", px, py);
        Ok(PickResult {
            found: true,
            xgrid,
            ygrid,
            lon,
            lat,
            zdata,
            display,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{DisplayProjection, GridProjection, ProjectorConfig};
    use crate::picking::id_buffer::SoftwareIdBuffer;

    struct Fixture {
        terrain: TerrainGrid,
        projector: Projector,
        mesh: TerrainMesh,
        view: ViewTransform,
        config: ViewerConfig,
    }

    impl Fixture {
        fn new(n: usize, mode: DisplayMode) -> Self {
            let terrain = TerrainGrid::filled(n, n, [0.0, 0.0], [1.0, 1.0], -100.0).unwrap();
            let projector = Projector::new(
                GridProjection::Projected(std::rc::Rc::new(
                    crate::geo::LocalProjection::new(0.0, 0.0),
                )),
                DisplayProjection::AlreadyProjected,
                &terrain,
                &ProjectorConfig::default(),
            )
            .unwrap();
            let mesh = TerrainMesh::build(&terrain, &projector).unwrap();
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
            let (px, py, _) = self.view.display_to_pixel(d).unwrap();
            (px as u32, py as u32)
        }
    }

    #[test]
    fn test_tile_stride() {
        assert_eq!(tile_stride(10, 1, 15), 1);
        assert_eq!(tile_stride(40, 1, 15), 3);
        assert_eq!(tile_stride(40, 2, 15), 4);
    }

    #[test]
    fn test_full_pass_on_small_grid_is_exact() {
        let fx = Fixture::new(8, DisplayMode::TwoD);
        let mut buffer = SoftwareIdBuffer::new(400, 400);
        let mut resolver = PickResolver::new(fx.scene(), &mut buffer);
        let (px, py) = fx.pixel_of(3.2, 5.1);
        let pass = resolver
            .find_point_rez(px, py, Resolution::Full, fx.terrain.full_bounds())
            .unwrap();
        assert!(pass.result.found);
        assert_eq!(pass.pick_stride, 1);
        assert_eq!(pass.bounds, GridBounds::new(3, 3, 5, 5));
        assert!((pass.result.xgrid - (3.0 + 1.0 / 3.0)).abs() < 1e-9);
        assert!((pass.result.ygrid - (5.0 + 1.0 / 3.0)).abs() < 1e-9);
        assert!((pass.result.zdata + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_refinement_windows_nest_and_shrink() {
        let fx = Fixture::new(60, DisplayMode::TwoD);
        let mut buffer = SoftwareIdBuffer::new(400, 400);
        let mut resolver = PickResolver::new(fx.scene(), &mut buffer);
        let (px, py) = fx.pixel_of(41.7, 12.6);
        let result = resolver.find_point(px, py, None).unwrap();
        assert!(result.found);
        assert!((result.xgrid - 41.7).abs() < 1.0, "x {}", result.xgrid);
        assert!((result.ygrid - 12.6).abs() < 1.0, "y {}", result.ygrid);

        let trace = resolver.trace();
        assert!(trace.len() >= 2);
        for pair in trace.windows(2) {
            assert!(pair[0].contains(&pair[1]), "{:?}", trace);
            assert!(pair[1].is_smaller_than(&pair[0]), "{:?}", trace);
        }
        assert!(trace[trace.len() - 1].is_collapsed());
    }

    #[test]
    fn test_2d_miss_falls_back_to_pixel() {
        let fx = Fixture::new(8, DisplayMode::TwoD);
        let mut buffer = SoftwareIdBuffer::new(400, 400);
        let mut resolver = PickResolver::new(fx.scene(), &mut buffer);
        // the grid fills 1.75 of the 6 unit view, so the corner is background
        let result = resolver.find_point(2, 2, None).unwrap();
        assert!(result.found);
        assert!(result.xgrid < 0.0 && result.ygrid < 0.0);
        assert_eq!(result.zdata, 0.0);
    }

    #[test]
    fn test_3d_miss_reports_not_found() {
        let fx = Fixture::new(8, DisplayMode::ThreeD);
        let mut buffer = SoftwareIdBuffer::new(400, 400);
        let mut resolver = PickResolver::new(fx.scene(), &mut buffer);
        let result = resolver.find_point(1, 1, None).unwrap();
        assert!(!result.found);
    }
}

// src/picking/view_bounds.rs
// Visible grid region of a window, used to bound picks and draws
// RELEVANT FILES: src/picking/resolver.rs, src/picking/terrain_mesh.rs, src/view.rs

use log::debug;

use crate::grid::GridBounds;
use crate::picking::id_buffer::IdRasterizer;
use crate::picking::resolver::{render_tiles, tile_stride, PickScene, Resolution};
use crate::view::DisplayMode;

/// Accumulates hit windows, starting from nothing.
#[derive(Default)]
struct BoundsAccumulator {
    bounds: Option<GridBounds>,
}

impl BoundsAccumulator {
    fn add(&mut self, i0: usize, i1: usize, j0: usize, j1: usize) {
        match self.bounds.as_mut() {
            Some(b) => b.union_with(i0, i1, j0, j1),
            None => self.bounds = Some(GridBounds::new(i0, i1, j0, j1)),
        }
    }
}

/// Grid window covering everything visible in the window, padded by one
/// low resolution stride and clamped to the grid. The full grid when
/// nothing is visible.
pub fn compute_view_bounds(
    scene: &PickScene<'_>,
    rasterizer: &mut dyn IdRasterizer,
) -> GridBounds {
    let terrain = scene.terrain;
    let (nx, ny) = (terrain.nx(), terrain.ny());
    let stride = scene.stride(Resolution::Low);
    let mut hits = BoundsAccumulator::default();

    match scene.view.mode {
        DisplayMode::TwoD => {
            let [xmin, xmax, ymin, ymax] = scene.view.visible_rect_2d();
            let mut visit = |i: usize, j: usize| {
                if let Some(p) = scene.mesh.position(i, j) {
                    let (x, y) = (f64::from(p.x), f64::from(p.y));
                    if x >= xmin && x <= xmax && y >= ymin && y <= ymax {
                        hits.add(i, i + stride, j, j + stride);
                    }
                }
            };
            for i in (0..nx).step_by(stride) {
                for j in (0..ny).step_by(stride) {
                    visit(i, j);
                }
            }
            for (i, j) in [(0, 0), (nx - 1, 0), (0, ny - 1), (nx - 1, ny - 1)] {
                visit(i, j);
            }
        }
        DisplayMode::ThreeD => {
            let division = scene.config.pick_division;
            let levels = scene.config.pick_levels() as f32;
            let ips = tile_stride(nx, stride, division);
            let jps = tile_stride(ny, stride, division);
            render_tiles(rasterizer, scene, &terrain.full_bounds(), stride, (ips, jps));

            let (width, height) = rasterizer.dimensions();
            let decode = |px: u32, py: u32| {
                rasterizer
                    .read_pixel(px, py)
                    .and_then(|c| c.decode(levels))
                    .map(|cell| (ips * cell.tile_i, jps * cell.tile_j))
            };

            let xstep = (width / 20).max(1) as usize;
            let ystep = (height / 20).max(1) as usize;
            for px in (0..width).step_by(xstep) {
                for py in (0..height).step_by(ystep) {
                    if let Some((i, j)) = decode(px, py) {
                        hits.add(i, i + stride, j, j + stride);
                    }
                }
            }
            for (px, py) in [
                (0, 0),
                (width - 1, 0),
                (0, height - 1),
                (width - 1, height - 1),
            ] {
                if let Some((i, j)) = decode(px, py) {
                    let i1 = if ips == 1 { i } else { (i + 2 * ips - 1).min(nx - 1) };
                    let j1 = if jps == 1 { j } else { (j + 2 * jps - 1).min(ny - 1) };
                    hits.add(i, i1, j, j1);
                }
            }
        }
    }

    let bounds = match hits.bounds {
        Some(b) => GridBounds::new(
            b.imin.saturating_sub(stride),
            (b.imax + stride).min(nx - 1),
            b.jmin.saturating_sub(stride),
            (b.jmax + stride).min(ny - 1),
        ),
        None => terrain.full_bounds(),
    };
    debug!("View bounds {:?} (stride {})", bounds, stride);
    bounds
}

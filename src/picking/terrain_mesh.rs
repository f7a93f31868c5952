// src/picking/terrain_mesh.rs
// Display-space node positions of the terrain grid for one window
// RELEVANT FILES: src/picking/resolver.rs, src/picking/view_bounds.rs, src/geo/projection.rs

use glam::Vec3;
use log::debug;

use crate::error::OverlayResult;
use crate::geo::Projector;
use crate::grid::TerrainGrid;
use crate::picking::id_buffer::{IdColor, IdRasterizer, IdVertex};

/// Projected terrain nodes, `None` where the grid holds no data.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    nx: usize,
    ny: usize,
    positions: Vec<Option<Vec3>>,
}

impl TerrainMesh {
    /// Project every valid node through the window's projector.
    pub fn build(terrain: &TerrainGrid, projector: &Projector) -> OverlayResult<Self> {
        let (nx, ny) = (terrain.nx(), terrain.ny());
        let mut positions = Vec::new();
        positions.try_reserve_exact(nx * ny)?;
        for i in 0..nx {
            for j in 0..ny {
                let node = match terrain.value(i, j) {
                    Some(z) => {
                        let (x, y) = terrain.node_position(i, j);
                        let p = projector.forward(x, y, f64::from(z))?;
                        Some(p.display.as_vec3())
                    }
                    None => None,
                };
                positions.push(node);
            }
        }
        debug!("Projected terrain mesh {}x{}", nx, ny);
        Ok(Self { nx, ny, positions })
    }

    /// Display position of node (i, j).
    #[inline]
    pub fn position(&self, i: usize, j: usize) -> Option<Vec3> {
        if i < self.nx && j < self.ny {
            self.positions[i * self.ny + j]
        } else {
            None
        }
    }

    /// Draw the two half-triangles of the cell with corner (i, j) and size `stride`.
    ///
    /// Each half is drawn only when its three nodes hold data.
    pub(crate) fn draw_cell(
        &self,
        rasterizer: &mut dyn IdRasterizer,
        i: usize,
        j: usize,
        stride: usize,
        tile: (usize, usize),
        levels: f32,
    ) {
        let k = self.position(i, j);
        let l = self.position(i + stride, j);
        let m = self.position(i, j + stride);
        let n = self.position(i + stride, j + stride);
        let vertex = |p: Vec3| IdVertex::new(p.x, p.y, p.z);

        if let (Some(k), Some(l), Some(m)) = (k, l, m) {
            rasterizer.draw_triangle(
                &[vertex(k), vertex(l), vertex(m)],
                IdColor::encode(tile.0, tile.1, false, levels),
            );
        }
        if let (Some(l), Some(n), Some(m)) = (l, n, m) {
            rasterizer.draw_triangle(
                &[vertex(l), vertex(n), vertex(m)],
                IdColor::encode(tile.0, tile.1, true, levels),
            );
        }
    }
}

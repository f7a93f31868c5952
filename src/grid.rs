//! Regular elevation grid accessor.
//! Nodes are stored column-major: node (i, j) lives at linear index `i * ny + j`,
//! with i running along x (columns) and j along y (rows).

use crate::error::{OverlayError, OverlayResult};

/// Read-only terrain grid with a no-data sentinel.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    nx: usize,
    ny: usize,
    xmin: f64,
    ymin: f64,
    dx: f64,
    dy: f64,
    nodata: f32,
    data: Vec<f32>,
    zmin: f32,
    zmax: f32,
}

impl TerrainGrid {
    /// Build a grid from column-major samples.
    ///
    /// `origin` is the position of node (0, 0), `cell` the node spacing.
    pub fn new(
        nx: usize,
        ny: usize,
        origin: [f64; 2],
        cell: [f64; 2],
        nodata: f32,
        data: Vec<f32>,
    ) -> OverlayResult<Self> {
        if nx < 2 || ny < 2 {
            return Err(OverlayError::invalid_grid(format!(
                "grid must be at least 2x2, got {}x{}",
                nx, ny
            )));
        }
        if !(cell[0] > 0.0 && cell[1] > 0.0) {
            return Err(OverlayError::invalid_grid(format!(
                "cell size must be positive, got {:?}",
                cell
            )));
        }
        if data.len() != nx * ny {
            return Err(OverlayError::invalid_grid(format!(
                "expected {} samples, got {}",
                nx * ny,
                data.len()
            )));
        }

        let mut grid = Self {
            nx,
            ny,
            xmin: origin[0],
            ymin: origin[1],
            dx: cell[0],
            dy: cell[1],
            nodata,
            data,
            zmin: 0.0,
            zmax: 0.0,
        };
        grid.update_range();
        Ok(grid)
    }

    /// Grid with every node set to `value`.
    pub fn filled(
        nx: usize,
        ny: usize,
        origin: [f64; 2],
        cell: [f64; 2],
        value: f32,
    ) -> OverlayResult<Self> {
        Self::new(nx, ny, origin, cell, f32::MIN, vec![value; nx * ny])
    }

    fn update_range(&mut self) {
        let mut range: Option<(f32, f32)> = None;
        for &z in self.data.iter().filter(|&&z| z != self.nodata) {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(z), hi.max(z)),
                None => (z, z),
            });
        }
        let (lo, hi) = range.unwrap_or((0.0, 0.0));
        self.zmin = lo;
        self.zmax = hi;
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    pub fn xmax(&self) -> f64 {
        self.xmin + (self.nx - 1) as f64 * self.dx
    }

    pub fn ymax(&self) -> f64 {
        self.ymin + (self.ny - 1) as f64 * self.dy
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    pub fn nodata(&self) -> f32 {
        self.nodata
    }

    /// Minimum and maximum valid elevation.
    pub fn z_range(&self) -> (f32, f32) {
        (self.zmin, self.zmax)
    }

    /// Linear index of node (i, j).
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.ny + j
    }

    /// Raw sample at a linear index, no-data included.
    #[inline]
    pub fn raw(&self, k: usize) -> Option<f32> {
        self.data.get(k).copied()
    }

    /// Whether node (i, j) exists and holds data.
    #[inline]
    pub fn is_valid(&self, i: usize, j: usize) -> bool {
        i < self.nx && j < self.ny && self.data[self.index(i, j)] != self.nodata
    }

    /// Elevation of node (i, j), `None` when out of range or no-data.
    pub fn value(&self, i: usize, j: usize) -> Option<f32> {
        if self.is_valid(i, j) {
            Some(self.data[self.index(i, j)])
        } else {
            None
        }
    }

    /// Overwrite a node; `nodata` marks it invalid.
    pub fn set(&mut self, i: usize, j: usize, z: f32) -> OverlayResult<()> {
        if i >= self.nx {
            return Err(OverlayError::invalid_index("grid column", i, self.nx));
        }
        if j >= self.ny {
            return Err(OverlayError::invalid_index("grid row", j, self.ny));
        }
        let k = self.index(i, j);
        self.data[k] = z;
        self.update_range();
        Ok(())
    }

    /// Grid-space position of node (i, j).
    #[inline]
    pub fn node_position(&self, i: usize, j: usize) -> (f64, f64) {
        (
            self.xmin + i as f64 * self.dx,
            self.ymin + j as f64 * self.dy,
        )
    }

    /// Cell indices containing a grid-space position (may lie outside the grid).
    #[inline]
    pub fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        (
            ((x - self.xmin) / self.dx).floor() as i64,
            ((y - self.ymin) / self.dy).floor() as i64,
        )
    }

    /// Whether (i, j) names a cell whose four corners exist.
    #[inline]
    pub fn is_cell(&self, i: i64, j: i64) -> bool {
        i >= 0 && j >= 0 && (i as usize) + 1 < self.nx && (j as usize) + 1 < self.ny
    }

    /// Mean of the valid corner nodes of the cell holding (x, y).
    ///
    /// Returns `None` outside the grid or when all four corners are no-data.
    pub fn cell_mean(&self, x: f64, y: f64) -> Option<f64> {
        let (i, j) = self.cell_of(x, y);
        if !self.is_cell(i, j) {
            return None;
        }
        let (i, j) = (i as usize, j as usize);
        let mut sum = 0.0;
        let mut count = 0;
        for ii in i..=i + 1 {
            for jj in j..=j + 1 {
                if let Some(z) = self.value(ii, jj) {
                    sum += f64::from(z);
                    count += 1;
                }
            }
        }
        if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        }
    }

    /// Stride that reduces the grid to roughly `dimension` nodes per axis.
    pub fn stride_for(&self, dimension: usize) -> usize {
        let dimension = dimension.max(1);
        self.nx.div_ceil(dimension).max(self.ny.div_ceil(dimension)).max(1)
    }

    /// Bounds covering every node.
    pub fn full_bounds(&self) -> GridBounds {
        GridBounds::new(0, self.nx - 1, 0, self.ny - 1)
    }
}

/// Inclusive node index window `[imin, imax] x [jmin, jmax]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub imin: usize,
    pub imax: usize,
    pub jmin: usize,
    pub jmax: usize,
}

impl GridBounds {
    pub fn new(imin: usize, imax: usize, jmin: usize, jmax: usize) -> Self {
        Self {
            imin,
            imax,
            jmin,
            jmax,
        }
    }

    /// Nodes spanned along i.
    pub fn width(&self) -> usize {
        self.imax - self.imin + 1
    }

    /// Nodes spanned along j.
    pub fn height(&self) -> usize {
        self.jmax - self.jmin + 1
    }

    /// True once the window has shrunk to a single node.
    pub fn is_collapsed(&self) -> bool {
        self.imin == self.imax && self.jmin == self.jmax
    }

    pub fn contains(&self, other: &GridBounds) -> bool {
        other.imin >= self.imin
            && other.imax <= self.imax
            && other.jmin >= self.jmin
            && other.jmax <= self.jmax
    }

    /// Strictly fewer nodes than `other` along at least one axis and no more along either.
    pub fn is_smaller_than(&self, other: &GridBounds) -> bool {
        self.width() <= other.width()
            && self.height() <= other.height()
            && (self.width() < other.width() || self.height() < other.height())
    }

    /// Grow to include `[i0, i1] x [j0, j1]`.
    pub fn union_with(&mut self, i0: usize, i1: usize, j0: usize, j1: usize) {
        self.imin = self.imin.min(i0);
        self.imax = self.imax.max(i1);
        self.jmin = self.jmin.min(j0);
        self.jmax = self.jmax.max(j1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> TerrainGrid {
        let mut data = vec![10.0; 16];
        data[2 * 4 + 2] = -9999.0;
        TerrainGrid::new(4, 4, [0.0, 0.0], [1.0, 1.0], -9999.0, data).unwrap()
    }

    #[test]
    fn test_index_layout() {
        let grid = sample_grid();
        assert_eq!(grid.index(0, 0), 0);
        assert_eq!(grid.index(0, 3), 3);
        assert_eq!(grid.index(1, 0), 4);
        assert!(!grid.is_valid(2, 2));
        assert!(grid.is_valid(2, 1));
        assert_eq!(grid.value(4, 0), None);
    }

    #[test]
    fn test_raw_is_bounds_checked() {
        let grid = sample_grid();
        assert_eq!(grid.raw(grid.index(2, 2)), Some(-9999.0));
        assert_eq!(grid.raw(16), None);
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(TerrainGrid::new(1, 4, [0.0, 0.0], [1.0, 1.0], 0.0, vec![0.0; 4]).is_err());
        assert!(TerrainGrid::new(2, 2, [0.0, 0.0], [0.0, 1.0], 0.0, vec![0.0; 4]).is_err());
        assert!(TerrainGrid::new(2, 2, [0.0, 0.0], [1.0, 1.0], 0.0, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_cell_mean_skips_nodata() {
        let grid = sample_grid();
        // cell (1,1) has corner (2,2) missing
        let z = grid.cell_mean(1.5, 1.5).unwrap();
        assert!((z - 10.0).abs() < 1e-9);
        assert_eq!(grid.cell_mean(3.5, 0.5), None);
        assert_eq!(grid.cell_mean(-0.5, 0.5), None);
    }

    #[test]
    fn test_z_range_and_stride() {
        let mut grid = sample_grid();
        grid.set(0, 0, -5.0).unwrap();
        assert_eq!(grid.z_range(), (-5.0, 10.0));
        assert_eq!(grid.stride_for(2), 2);
        assert_eq!(grid.stride_for(100), 1);
        assert!(grid.set(9, 0, 1.0).is_err());
    }

    #[test]
    fn test_bounds_helpers() {
        let outer = GridBounds::new(0, 9, 0, 9);
        let inner = GridBounds::new(2, 5, 3, 9);
        assert!(outer.contains(&inner));
        assert!(inner.is_smaller_than(&outer));
        assert!(!outer.is_smaller_than(&outer));
        assert!(GridBounds::new(4, 4, 7, 7).is_collapsed());
    }
}

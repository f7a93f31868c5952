// src/overlay/point.rs
// Overlay points with per-window display coordinate caches
// RELEVANT FILES: src/overlay/segment.rs, src/overlay/world.rs, src/drape/mod.rs

use std::collections::HashMap;

use glam::DVec3;

use crate::drape::SurfacePoint;

/// Handle of an open window.
pub type WindowId = u32;

/// A geographic point plus its display position in every open window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayPoint {
    pub surface: SurfacePoint,
    display: HashMap<WindowId, DVec3>,
}

/// A drape polyline sample; carries its own display cache like any point.
pub type DrapePoint = OverlayPoint;

impl OverlayPoint {
    pub fn new(surface: SurfacePoint) -> Self {
        Self {
            surface,
            display: HashMap::new(),
        }
    }

    /// Cached display position for `window`.
    #[inline]
    pub fn display(&self, window: WindowId) -> Option<DVec3> {
        self.display.get(&window).copied()
    }

    pub fn set_display(&mut self, window: WindowId, position: DVec3) {
        self.display.insert(window, position);
    }

    pub fn forget_window(&mut self, window: WindowId) {
        self.display.remove(&window);
    }

    /// Windows this point has been projected into.
    pub fn window_count(&self) -> usize {
        self.display.len()
    }

    /// Planar distance in grid units to `(xgrid, ygrid)`.
    pub fn grid_distance(&self, xgrid: f64, ygrid: f64) -> f64 {
        let dx = xgrid - self.surface.xgrid;
        let dy = ygrid - self.surface.ygrid;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Input for a new entity point: its position and the per-point payload of
/// the entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoint<D> {
    pub position: SurfacePoint,
    pub data: D,
}

impl<D: Default> NewPoint<D> {
    /// A point with the kind's default payload.
    pub fn plain(position: SurfacePoint) -> Self {
        Self {
            position,
            data: D::default(),
        }
    }
}

impl<D> NewPoint<D> {
    pub fn with_data(position: SurfacePoint, data: D) -> Self {
        Self { position, data }
    }
}

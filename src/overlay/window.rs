// src/overlay/window.rs
// One open view of the shared world: projector, camera, terrain mesh and id buffer
// RELEVANT FILES: src/overlay/world.rs, src/picking/resolver.rs, src/picking/view_bounds.rs

use log::debug;

use crate::config::ViewerConfig;
use crate::error::OverlayResult;
use crate::geo::{DisplayProjection, GridProjection, Projector, ProjectorConfig};
use crate::grid::{GridBounds, TerrainGrid};
use crate::overlay::point::WindowId;
use crate::picking::{
    compute_view_bounds, PickResolver, PickResult, PickScene, SoftwareIdBuffer, TerrainMesh,
};
use crate::redraw::RedrawGuard;
use crate::view::ViewTransform;

/// Per-window state; overlay data itself lives in the world.
#[derive(Debug)]
pub struct Window {
    id: WindowId,
    projector: Projector,
    view: ViewTransform,
    mesh: TerrainMesh,
    ids: SoftwareIdBuffer,
    pub(crate) redraw: RedrawGuard,
    view_bounds: Option<GridBounds>,
    plots_since_bounds: usize,
}

fn build_projector(
    terrain: &TerrainGrid,
    grid: GridProjection,
    display: DisplayProjection,
    view: &ViewTransform,
    exaggeration: f64,
) -> OverlayResult<Projector> {
    let config = ProjectorConfig {
        exaggeration,
        aspect_ratio: view.aspect_ratio(),
    };
    Ok(Projector::new(grid, display, terrain, &config)?)
}

impl Window {
    pub(crate) fn new(
        id: WindowId,
        terrain: &TerrainGrid,
        grid: GridProjection,
        display: DisplayProjection,
        view: ViewTransform,
    ) -> OverlayResult<Self> {
        let projector = build_projector(terrain, grid, display, &view, 1.0)?;
        let mesh = TerrainMesh::build(terrain, &projector)?;
        let ids = SoftwareIdBuffer::new(view.width, view.height);
        Ok(Self {
            id,
            projector,
            view,
            mesh,
            ids,
            redraw: RedrawGuard::new(),
            view_bounds: None,
            plots_since_bounds: 0,
        })
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn mesh(&self) -> &TerrainMesh {
        &self.mesh
    }

    pub fn id_buffer(&self) -> &SoftwareIdBuffer {
        &self.ids
    }

    pub fn redraw_guard(&self) -> &RedrawGuard {
        &self.redraw
    }

    /// Cached visible region, if computed since the last view change.
    pub fn view_bounds(&self) -> Option<GridBounds> {
        self.view_bounds
    }

    /// Switch display projection and rebuild the projected mesh.
    pub(crate) fn set_projection(
        &mut self,
        terrain: &TerrainGrid,
        display: DisplayProjection,
    ) -> OverlayResult<()> {
        let projector = build_projector(
            terrain,
            self.projector.grid_projection().clone(),
            display,
            &self.view,
            self.projector.exaggeration(),
        )?;
        self.mesh = TerrainMesh::build(terrain, &projector)?;
        self.projector = projector;
        self.view_bounds = None;
        Ok(())
    }

    /// Replace the camera; a new aspect ratio rebuilds the projector.
    ///
    /// Returns true when display coordinates changed.
    pub(crate) fn set_view(&mut self, terrain: &TerrainGrid, view: ViewTransform) -> OverlayResult<bool> {
        let reproject = (view.aspect_ratio() - self.view.aspect_ratio()).abs() > f64::EPSILON;
        if reproject {
            let projector = build_projector(
                terrain,
                self.projector.grid_projection().clone(),
                self.projector.display_projection().clone(),
                &view,
                self.projector.exaggeration(),
            )?;
            self.mesh = TerrainMesh::build(terrain, &projector)?;
            self.projector = projector;
        }
        self.ids.resize(view.width, view.height);
        self.view = view;
        self.view_bounds = None;
        Ok(reproject)
    }

    /// Recompute the visible grid region.
    pub(crate) fn refresh_view_bounds(&mut self, terrain: &TerrainGrid, config: &ViewerConfig) -> GridBounds {
        let scene = PickScene {
            terrain,
            projector: &self.projector,
            mesh: &self.mesh,
            view: &self.view,
            config,
        };
        let bounds = compute_view_bounds(&scene, &mut self.ids);
        self.view_bounds = Some(bounds);
        self.plots_since_bounds = 0;
        bounds
    }

    /// Count a plot, refreshing the view bounds every `bounds_frequency` plots.
    pub(crate) fn note_plot(&mut self, terrain: &TerrainGrid, config: &ViewerConfig) {
        self.plots_since_bounds += 1;
        if self.view_bounds.is_none() || self.plots_since_bounds >= config.bounds_frequency {
            self.refresh_view_bounds(terrain, config);
        }
    }

    /// Resolve a pixel to the terrain, bounded by the visible region.
    pub fn pick(
        &mut self,
        terrain: &TerrainGrid,
        config: &ViewerConfig,
        px: u32,
        py: u32,
    ) -> OverlayResult<PickResult> {
        let bounds = match self.view_bounds {
            Some(bounds) => bounds,
            None => self.refresh_view_bounds(terrain, config),
        };
        let scene = PickScene {
            terrain,
            projector: &self.projector,
            mesh: &self.mesh,
            view: &self.view,
            config,
        };
        let mut resolver = PickResolver::new(scene, &mut self.ids);
        let result = resolver.find_point(px, py, Some(bounds))?;
        debug!(
            "Window {} pick ({}, {}) found {} at grid ({:.3}, {:.3})",
            self.id, px, py, result.found, result.xgrid, result.ygrid
        );
        Ok(result)
    }
}

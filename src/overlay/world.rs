// src/overlay/world.rs
// Shared overlay world: terrain, open windows and one collection per overlay kind
// RELEVANT FILES: src/overlay/collection.rs, src/overlay/window.rs, src/overlay/gesture.rs

use std::collections::BTreeMap;

use glam::DVec3;
use log::{info, warn};

use crate::config::ViewerConfig;
use crate::drape::SurfacePoint;
use crate::error::{OverlayError, OverlayResult};
use crate::geo::{DisplayProjection, GridProjection, Projector, ProjectorConfig};
use crate::grid::TerrainGrid;
use crate::overlay::collection::{
    Collection, CollectionMode, Collections, EntityId, PointRef, Selection,
};
use crate::overlay::entity::EntityKind;
use crate::overlay::point::{NewPoint, WindowId};
use crate::overlay::segment::DrapeContext;
use crate::overlay::window::Window;
use crate::picking::PickResult;
use crate::redraw::DrawOutcome;
use crate::view::ViewTransform;

/// The single copy of all overlay data, viewed by any number of windows.
///
/// Every point caches one display position per open window; edits and
/// projection changes update all of them before returning.
#[derive(Debug)]
pub struct World {
    terrain: TerrainGrid,
    config: ViewerConfig,
    /// Lon/lat conversion and draping while no window is open
    base: Projector,
    windows: BTreeMap<WindowId, Window>,
    next_window: WindowId,
    active: Option<WindowId>,
    collections: Collections,
}

fn drape_context<'a>(
    terrain: &'a TerrainGrid,
    base: &'a Projector,
    windows: &'a BTreeMap<WindowId, Window>,
    active: Option<WindowId>,
    config: &ViewerConfig,
) -> DrapeContext<'a> {
    let source = active
        .and_then(|id| windows.get(&id))
        .map(|w| w.projector())
        .unwrap_or(base);
    DrapeContext {
        terrain,
        source,
        targets: windows.iter().map(|(&id, w)| (id, w.projector())).collect(),
        offset: config.drape_offset(),
        budget: config.budget(),
    }
}

impl World {
    /// Create a world around `terrain` whose grid coordinates follow `grid`.
    pub fn new(terrain: TerrainGrid, grid: GridProjection, config: ViewerConfig) -> OverlayResult<Self> {
        config.validate()?;
        let display = match grid {
            GridProjection::Geographic => DisplayProjection::Geographic,
            GridProjection::Projected(_) => DisplayProjection::AlreadyProjected,
        };
        let base = Projector::new(grid, display, &terrain, &ProjectorConfig::default())?;
        info!(
            "Created world over {}x{} grid",
            terrain.nx(),
            terrain.ny()
        );
        Ok(Self {
            terrain,
            config,
            base,
            windows: BTreeMap::new(),
            next_window: 0,
            active: None,
            collections: Collections::default(),
        })
    }

    pub fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn collection<K: EntityKind>(&self) -> &Collection<K> {
        K::collection(&self.collections)
    }

    // Window management

    /// Open a window; every existing overlay is projected into it.
    pub fn open_window(&mut self, display: DisplayProjection, view: ViewTransform) -> OverlayResult<WindowId> {
        let id = self.next_window;
        let window = Window::new(
            id,
            &self.terrain,
            self.base.grid_projection().clone(),
            display,
            view,
        )?;
        self.collections
            .project_window(id, window.projector(), self.config.drape_offset())?;
        self.windows.insert(id, window);
        self.next_window += 1;
        if self.active.is_none() {
            self.active = Some(id);
        }
        info!("Opened window {} ({} open)", id, self.windows.len());
        Ok(id)
    }

    pub fn close_window(&mut self, id: WindowId) -> OverlayResult<()> {
        self.windows
            .remove(&id)
            .ok_or(OverlayError::UnknownWindow(id))?;
        self.collections.forget_window(id);
        if self.active == Some(id) {
            self.active = self.windows.keys().next().copied();
        }
        info!("Closed window {} ({} open)", id, self.windows.len());
        Ok(())
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn window_ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.windows.keys().copied()
    }

    pub fn active_window(&self) -> Option<WindowId> {
        self.active
    }

    /// Make `id` the window whose projection drives draping.
    pub fn set_active_window(&mut self, id: WindowId) -> OverlayResult<()> {
        if !self.windows.contains_key(&id) {
            return Err(OverlayError::UnknownWindow(id));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Change a window's display projection, then re-project every point for
    /// it and re-drape every segment with its projection.
    pub fn set_projection(&mut self, id: WindowId, display: DisplayProjection) -> OverlayResult<()> {
        let window = self
            .windows
            .get_mut(&id)
            .ok_or(OverlayError::UnknownWindow(id))?;
        window.set_projection(&self.terrain, display)?;

        let offset = self.config.drape_offset();
        if let Some(window) = self.windows.get(&id) {
            self.collections
                .project_window(id, window.projector(), offset)?;
        }
        let ctx = drape_context(&self.terrain, &self.base, &self.windows, Some(id), &self.config);
        self.collections.redrape_all(&ctx)?;
        info!("Window {} projection changed, overlays re-draped", id);
        Ok(())
    }

    /// Replace a window's camera.
    pub fn set_view(&mut self, id: WindowId, view: ViewTransform) -> OverlayResult<()> {
        let window = self
            .windows
            .get_mut(&id)
            .ok_or(OverlayError::UnknownWindow(id))?;
        if window.set_view(&self.terrain, view)? {
            if let Some(window) = self.windows.get(&id) {
                self.collections
                    .project_window(id, window.projector(), self.config.drape_offset())?;
            }
        }
        Ok(())
    }

    // Positions

    fn source_projector(&self) -> &Projector {
        self.active
            .and_then(|id| self.windows.get(&id))
            .map(|w| w.projector())
            .unwrap_or(&self.base)
    }

    /// Surface position at grid coordinates, elevation from the enclosing cell
    /// (zero where the grid holds no data).
    pub fn grid_position(&self, x: f64, y: f64) -> OverlayResult<SurfacePoint> {
        let z = self.terrain.cell_mean(x, y).unwrap_or(0.0);
        Ok(SurfacePoint::from_grid(self.source_projector(), x, y, z)?)
    }

    /// Surface position at lon/lat with an explicit elevation.
    pub fn lonlat_position(&self, lon: f64, lat: f64, z: f64) -> OverlayResult<SurfacePoint> {
        Ok(SurfacePoint::from_lonlat(self.source_projector(), lon, lat, z)?)
    }

    /// Surface position of a pick hit.
    pub fn pick_position(result: &PickResult) -> SurfacePoint {
        SurfacePoint {
            xgrid: result.xgrid,
            ygrid: result.ygrid,
            zdata: result.zdata,
            lon: result.lon,
            lat: result.lat,
        }
    }

    // Entity edits

    /// Add an entity of kind `K` built from `points`.
    pub fn add_entity<K: EntityKind>(
        &mut self,
        attributes: K,
        points: Vec<NewPoint<K::PointData>>,
    ) -> OverlayResult<EntityId> {
        let chunk = self.config.alloc_chunk;
        let ctx = drape_context(&self.terrain, &self.base, &self.windows, self.active, &self.config);
        K::collection_mut(&mut self.collections)
            .add_entity(&ctx, attributes, points, chunk)
            .map_err(|err| {
                warn!("Adding {} failed: {}", K::LABEL, err);
                err
            })
    }

    /// Insert a point after index `after`; returns the new point's index.
    pub fn insert_point<K: EntityKind>(
        &mut self,
        id: EntityId,
        after: usize,
        point: NewPoint<K::PointData>,
    ) -> OverlayResult<usize> {
        let chunk = self.config.alloc_chunk;
        let ctx = drape_context(&self.terrain, &self.base, &self.windows, self.active, &self.config);
        K::collection_mut(&mut self.collections)
            .insert_point(&ctx, id, after, point, chunk)
            .map_err(|err| {
                warn!("Inserting {} point failed: {}", K::LABEL, err);
                err
            })
    }

    pub fn move_point<K: EntityKind>(
        &mut self,
        id: EntityId,
        index: usize,
        position: SurfacePoint,
    ) -> OverlayResult<()> {
        let ctx = drape_context(&self.terrain, &self.base, &self.windows, self.active, &self.config);
        K::collection_mut(&mut self.collections)
            .move_point(&ctx, id, index, position)
            .map_err(|err| {
                warn!("Moving {} point failed: {}", K::LABEL, err);
                err
            })
    }

    /// Delete a point; returns true when its entity was removed with it.
    pub fn delete_point<K: EntityKind>(&mut self, id: EntityId, index: usize) -> OverlayResult<bool> {
        let ctx = drape_context(&self.terrain, &self.base, &self.windows, self.active, &self.config);
        K::collection_mut(&mut self.collections)
            .delete_point(&ctx, id, index)
            .map_err(|err| {
                warn!("Deleting {} point failed: {}", K::LABEL, err);
                err
            })
    }

    pub fn delete_entity<K: EntityKind>(&mut self, id: EntityId) -> OverlayResult<()> {
        K::collection_mut(&mut self.collections)
            .delete_entity(id)
            .map_err(|err| {
                warn!("Deleting {} failed: {}", K::LABEL, err);
                err
            })
    }

    pub fn set_active<K: EntityKind>(&mut self, id: EntityId, active: bool) -> OverlayResult<()> {
        K::collection_mut(&mut self.collections).set_active(id, active)
    }

    pub fn set_mode<K: EntityKind>(&mut self, mode: CollectionMode) {
        self.collections.set_mode::<K>(mode);
    }

    pub fn set_visible<K: EntityKind>(&mut self, visible: bool) {
        K::collection_mut(&mut self.collections).set_visible(visible);
    }

    // Picking and selection

    /// Resolve a window pixel to the terrain under it.
    pub fn pick(&mut self, window: WindowId, px: u32, py: u32) -> OverlayResult<PickResult> {
        let w = self
            .windows
            .get_mut(&window)
            .ok_or(OverlayError::UnknownWindow(window))?;
        w.pick(&self.terrain, &self.config, px, py)
    }

    /// Pick, then select the closest point of an active `K` entity.
    ///
    /// A miss, or a collection with no active points, returns `None` and
    /// leaves the current selection in place.
    pub fn select_nearest<K: EntityKind>(
        &mut self,
        window: WindowId,
        px: u32,
        py: u32,
    ) -> OverlayResult<Option<PointRef>> {
        let hit = self.pick(window, px, py)?;
        if !hit.found {
            return Ok(None);
        }
        let collection = K::collection_mut(&mut self.collections);
        let Some(nearest) = collection.nearest(hit.xgrid, hit.ygrid) else {
            return Ok(None);
        };
        collection.set_selection(Selection::Single(nearest))?;
        Ok(Some(nearest))
    }

    pub fn set_selection<K: EntityKind>(&mut self, selection: Selection) -> OverlayResult<()> {
        K::collection_mut(&mut self.collections).set_selection(selection)
    }

    /// Flag every point between `anchor` and `cursor` inclusive.
    pub fn select_range<K: EntityKind>(
        &mut self,
        anchor: PointRef,
        cursor: PointRef,
        select: bool,
    ) -> OverlayResult<()> {
        K::collection_mut(&mut self.collections).select_range(anchor, cursor, select)
    }

    /// Flag every point of the entities between `a` and `b` inclusive.
    pub fn select_entities<K: EntityKind>(
        &mut self,
        a: EntityId,
        b: EntityId,
        select: bool,
    ) -> OverlayResult<()> {
        K::collection_mut(&mut self.collections).select_entities(a, b, select)
    }

    // Drawing

    /// Display polylines of every visible collection for one window: one per
    /// segment, or a single position for one-point entities.
    pub fn polylines(&self, window: WindowId) -> OverlayResult<Vec<Vec<DVec3>>> {
        if !self.windows.contains_key(&window) {
            return Err(OverlayError::UnknownWindow(window));
        }
        let mut lines = Vec::new();
        collect_lines(&self.collections.navs, window, &mut lines);
        collect_lines(&self.collections.routes, window, &mut lines);
        collect_lines(&self.collections.sites, window, &mut lines);
        collect_lines(&self.collections.vectors, window, &mut lines);
        Ok(lines)
    }

    /// Feed every overlay polyline of `window` to `draw`, polling
    /// `interrupted` every `event_check_coarseness` lines.
    pub fn plot<D, I, P>(
        &mut self,
        window: WindowId,
        mut draw: D,
        interrupted: I,
        present: P,
    ) -> OverlayResult<DrawOutcome>
    where
        D: FnMut(&[DVec3]),
        I: FnMut() -> bool,
        P: FnOnce(),
    {
        let lines = self.polylines(window)?;
        let check_every = self.config.event_check_coarseness;
        let w = self
            .windows
            .get_mut(&window)
            .ok_or(OverlayError::UnknownWindow(window))?;
        w.note_plot(&self.terrain, &self.config);
        let outcome = w.redraw.draw_rows(
            lines.len(),
            check_every,
            |_, row| draw(&lines[row]),
            interrupted,
            present,
        );
        Ok(outcome)
    }
}

fn collect_lines<K: EntityKind>(collection: &Collection<K>, window: WindowId, out: &mut Vec<Vec<DVec3>>) {
    if !collection.is_visible() || collection.mode() == CollectionMode::Off {
        return;
    }
    for entity in collection.entities().iter().filter(|e| e.active) {
        let points = entity.points();
        if points.len() == 1 {
            out.extend(points[0].display(window).map(|d| vec![d]));
            continue;
        }
        for (s, segment) in entity.segments().iter().enumerate() {
            out.push(segment.polyline(window, &points[s], &points[s + 1]));
        }
    }
}

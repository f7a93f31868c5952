// src/overlay/collection.rs
// Growable collections of one overlay kind with mode, visibility and selection
// RELEVANT FILES: src/overlay/entity.rs, src/overlay/world.rs, src/overlay/gesture.rs

use log::{debug, info};

use crate::drape::SurfacePoint;
use crate::error::{OverlayError, OverlayResult};
use crate::geo::Projector;
use crate::overlay::entity::{Entity, EntityKind, NavTrack, PointExtras, Route, Site, Vector};
use crate::overlay::point::{NewPoint, OverlayPoint, WindowId};
use crate::overlay::segment::{DrapeContext, LineSegment};

/// Index of an entity within its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

/// A point of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointRef {
    pub entity: usize,
    pub point: usize,
}

impl PointRef {
    pub fn new(entity: usize, point: usize) -> Self {
        Self { entity, point }
    }
}

/// Whether a collection is shown and whether it accepts edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionMode {
    #[default]
    Off,
    View,
    Edit,
}

/// Current pick selection of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Single(PointRef),
    /// Two-stage pick: the anchor from the press, the cursor from the drag
    Range { anchor: PointRef, cursor: PointRef },
}

impl Selection {
    /// The single point, or the anchor of a range.
    pub fn primary(&self) -> Option<PointRef> {
        match *self {
            Selection::None => None,
            Selection::Single(p) => Some(p),
            Selection::Range { anchor, .. } => Some(anchor),
        }
    }

    /// Rewrite every reference; a reference mapped to `None` clears the selection.
    fn remap<F: Fn(PointRef) -> Option<PointRef>>(self, f: F) -> Selection {
        match self {
            Selection::None => Selection::None,
            Selection::Single(p) => f(p).map_or(Selection::None, Selection::Single),
            Selection::Range { anchor, cursor } => match (f(anchor), f(cursor)) {
                (Some(anchor), Some(cursor)) => Selection::Range { anchor, cursor },
                _ => Selection::None,
            },
        }
    }
}

/// All entities of one kind.
#[derive(Debug, Clone)]
pub struct Collection<K: EntityKind> {
    entities: Vec<Entity<K>>,
    mode: CollectionMode,
    visible: bool,
    selection: Selection,
}

impl<K: EntityKind> Default for Collection<K> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            mode: CollectionMode::Off,
            visible: false,
            selection: Selection::None,
        }
    }
}

impl<K: EntityKind> Collection<K> {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Entity<K>] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity<K>> {
        self.entities.get(id.0)
    }

    pub fn mode(&self) -> CollectionMode {
        self.mode
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::None;
    }

    /// Activate or deactivate an entity for picking.
    pub fn set_active(&mut self, id: EntityId, active: bool) -> OverlayResult<()> {
        let len = self.entities.len();
        let entity = self
            .entities
            .get_mut(id.0)
            .ok_or_else(|| OverlayError::invalid_index(K::LABEL, id.0, len))?;
        entity.active = active;
        Ok(())
    }

    /// Replace the selection after checking its references.
    pub fn set_selection(&mut self, selection: Selection) -> OverlayResult<()> {
        match selection {
            Selection::None => {}
            Selection::Single(p) => self.check_ref(p)?,
            Selection::Range { anchor, cursor } => {
                self.check_ref(anchor)?;
                self.check_ref(cursor)?;
            }
        }
        self.selection = selection;
        Ok(())
    }

    pub(crate) fn set_mode_unchecked(&mut self, mode: CollectionMode) {
        self.mode = mode;
    }

    fn check_entity(&self, id: EntityId) -> OverlayResult<&Entity<K>> {
        self.entities
            .get(id.0)
            .ok_or_else(|| OverlayError::invalid_index(K::LABEL, id.0, self.entities.len()))
    }

    fn check_ref(&self, p: PointRef) -> OverlayResult<()> {
        let entity = self.check_entity(EntityId(p.entity))?;
        if p.point >= entity.len() {
            return Err(OverlayError::invalid_index("point", p.point, entity.len()));
        }
        Ok(())
    }

    fn check_editable(&self, id: EntityId) -> OverlayResult<()> {
        let entity = self.check_entity(id)?;
        if !entity.attributes.editable() {
            return Err(OverlayError::EditModeConflict(format!(
                "{} {} is not in edit mode",
                K::LABEL,
                id.0
            )));
        }
        Ok(())
    }

    /// Add an entity, projecting every point and draping every segment.
    ///
    /// Nothing is stored unless the whole entity could be built.
    pub(crate) fn add_entity(
        &mut self,
        ctx: &DrapeContext<'_>,
        attributes: K,
        points: Vec<NewPoint<K::PointData>>,
        chunk: usize,
    ) -> OverlayResult<EntityId> {
        if points.is_empty() {
            return Err(OverlayError::invalid_index("point", 0, 0));
        }
        if let Some(max) = K::MAX_POINTS {
            if points.len() > max {
                return Err(OverlayError::invalid_index("point", points.len() - 1, max));
            }
        }
        ctx.budget.reserve_points(&mut self.entities, 1, chunk)?;

        let n = points.len();
        let mut entity = Entity::empty(attributes);
        ctx.budget.reserve_points(&mut entity.points, n, chunk)?;
        ctx.budget.reserve_points(&mut entity.data, n, chunk)?;
        ctx.budget.reserve_points(&mut entity.selected, n, chunk)?;
        ctx.budget.reserve_points(&mut entity.segments, n - 1, chunk)?;

        for NewPoint { position, data } in points {
            entity.points.push(OverlayPoint::new(position));
            entity.data.push(data);
            entity.selected.push(false);
            let j = entity.points.len() - 1;
            entity.project_point(ctx, j)?;
        }
        for s in 0..n - 1 {
            entity.segments.push(LineSegment::new());
            entity.drape(ctx, s);
        }
        K::refresh(&mut entity, ctx.source)?;

        let id = EntityId(self.entities.len());
        self.entities.push(entity);
        self.visible = true;
        info!("Added {} {} with {} points", K::LABEL, id.0, n);
        Ok(id)
    }

    /// Insert a point after `after`, re-draping only the segments touching it.
    /// Returns the new point's index.
    pub(crate) fn insert_point(
        &mut self,
        ctx: &DrapeContext<'_>,
        id: EntityId,
        after: usize,
        point: NewPoint<K::PointData>,
        chunk: usize,
    ) -> OverlayResult<usize> {
        self.check_editable(id)?;
        let len = self.entities[id.0].len();
        if after >= len {
            return Err(OverlayError::invalid_index("point", after, len));
        }
        if let Some(max) = K::MAX_POINTS {
            if len >= max {
                return Err(OverlayError::invalid_index("point", len, max));
            }
        }

        let NewPoint { position, mut data } = point;
        let mut new_point = OverlayPoint::new(position);
        ctx.project_point(&mut new_point)?;
        for extra in data.extra_points_mut() {
            ctx.project_point(extra)?;
        }

        let entity = &mut self.entities[id.0];
        ctx.budget.reserve_points(&mut entity.points, 1, chunk)?;
        ctx.budget.reserve_points(&mut entity.data, 1, chunk)?;
        ctx.budget.reserve_points(&mut entity.selected, 1, chunk)?;
        ctx.budget.reserve_points(&mut entity.segments, 1, chunk)?;

        let jnew = after + 1;
        entity.points.insert(jnew, new_point);
        entity.data.insert(jnew, data);
        entity.selected.insert(jnew, false);
        let n = entity.points.len();
        let slot = jnew.min(entity.segments.len());
        entity.segments.insert(slot, LineSegment::new());

        // segments jnew - 1 and jnew are the ones that touch the new point
        let first = jnew.saturating_sub(1);
        let last = jnew.min(n - 2);
        for s in first..=last {
            entity.drape(ctx, s);
        }
        K::refresh(entity, ctx.source)?;

        self.selection = self.selection.remap(|p| {
            Some(if p.entity == id.0 && p.point >= jnew {
                PointRef::new(p.entity, p.point + 1)
            } else {
                p
            })
        });
        debug!("Inserted {} {} point {}", K::LABEL, id.0, jnew);
        Ok(jnew)
    }

    /// Move a point, re-draping its adjacent segments.
    pub(crate) fn move_point(
        &mut self,
        ctx: &DrapeContext<'_>,
        id: EntityId,
        index: usize,
        position: SurfacePoint,
    ) -> OverlayResult<()> {
        self.check_editable(id)?;
        self.check_ref(PointRef::new(id.0, index))?;

        let mut moved = OverlayPoint::new(position);
        ctx.project_point(&mut moved)?;

        let entity = &mut self.entities[id.0];
        entity.points[index] = moved;
        if index > 0 {
            entity.drape(ctx, index - 1);
        }
        if index + 1 < entity.points.len() {
            entity.drape(ctx, index);
        }
        K::refresh(entity, ctx.source)?;
        Ok(())
    }

    /// Delete a point; the entity goes too when it was the last one.
    ///
    /// Returns true when the entity was removed.
    pub(crate) fn delete_point(
        &mut self,
        ctx: &DrapeContext<'_>,
        id: EntityId,
        index: usize,
    ) -> OverlayResult<bool> {
        self.check_editable(id)?;
        self.check_ref(PointRef::new(id.0, index))?;

        let entity = &mut self.entities[id.0];
        let n = entity.points.len();
        if n > 1 {
            // the segment after the point, or before it at the end
            let dropped = if index < n - 1 { index } else { index - 1 };
            entity.segments.remove(dropped);
        }
        entity.points.remove(index);
        entity.data.remove(index);
        entity.selected.remove(index);
        entity.recount_selected();

        if entity.points.is_empty() {
            self.remove_entity(id);
            debug!("Deleted last point of {} {}", K::LABEL, id.0);
            return Ok(true);
        }

        // the segment now bridging the gap
        if index > 0 && index < n - 1 {
            entity.drape(ctx, index - 1);
        }
        K::refresh(entity, ctx.source)?;
        self.selection = Selection::None;
        debug!("Deleted {} {} point {}", K::LABEL, id.0, index);
        Ok(false)
    }

    /// Remove a whole entity, compacting the collection.
    pub fn delete_entity(&mut self, id: EntityId) -> OverlayResult<()> {
        self.check_entity(id)?;
        self.remove_entity(id);
        info!("Deleted {} {}", K::LABEL, id.0);
        Ok(())
    }

    fn remove_entity(&mut self, id: EntityId) {
        self.entities.remove(id.0);
        self.selection = self.selection.remap(|p| {
            if p.entity == id.0 {
                None
            } else if p.entity > id.0 {
                Some(PointRef::new(p.entity - 1, p.point))
            } else {
                Some(p)
            }
        });
    }

    /// Closest point of an active entity in grid space. Ties keep the first
    /// entity and point in storage order.
    pub fn nearest(&self, xgrid: f64, ygrid: f64) -> Option<PointRef> {
        let mut best: Option<(f64, PointRef)> = None;
        for (i, entity) in self.entities.iter().enumerate() {
            if !entity.active {
                continue;
            }
            for (j, point) in entity.points.iter().enumerate() {
                let rr = point.grid_distance(xgrid, ygrid);
                if best.map_or(true, |(rrmin, _)| rr < rrmin) {
                    best = Some((rr, PointRef::new(i, j)));
                }
            }
        }
        best.map(|(_, p)| p)
    }

    /// Flag every point between `a` and `b` inclusive, across entities,
    /// as selected (or deselected). Symmetric in its arguments.
    pub fn select_range(&mut self, a: PointRef, b: PointRef, select: bool) -> OverlayResult<()> {
        self.check_ref(a)?;
        self.check_ref(b)?;
        let (first, last) = if a <= b { (a, b) } else { (b, a) };

        for e in first.entity..=last.entity {
            let entity = &mut self.entities[e];
            let n = entity.points.len();
            let j0 = if e == first.entity { first.point.min(n - 1) } else { 0 };
            let j1 = if e == last.entity { last.point } else { n - 1 };
            for flag in &mut entity.selected[j0..=j1] {
                *flag = select;
            }
            entity.recount_selected();
        }
        Ok(())
    }

    /// Flag every point of every entity between `a` and `b` inclusive.
    pub fn select_entities(&mut self, a: EntityId, b: EntityId, select: bool) -> OverlayResult<()> {
        self.check_entity(a)?;
        self.check_entity(b)?;
        let (first, last) = if a <= b { (a.0, b.0) } else { (b.0, a.0) };
        for entity in &mut self.entities[first..=last] {
            entity.selected.iter_mut().for_each(|s| *s = select);
            entity.recount_selected();
        }
        Ok(())
    }

    pub(crate) fn project_window(
        &mut self,
        window: WindowId,
        projector: &Projector,
        offset: f64,
    ) -> OverlayResult<()> {
        for entity in &mut self.entities {
            for point in &mut entity.points {
                point.set_display(window, point.surface.display(projector)?);
            }
            for data in &mut entity.data {
                for extra in data.extra_points_mut() {
                    extra.set_display(window, extra.surface.display(projector)?);
                }
            }
            for segment in &mut entity.segments {
                segment.project_samples(window, projector, offset)?;
            }
        }
        Ok(())
    }

    pub(crate) fn forget_window(&mut self, window: WindowId) {
        for entity in &mut self.entities {
            entity.points.iter_mut().for_each(|p| p.forget_window(window));
            for data in &mut entity.data {
                data.extra_points_mut().iter_mut().for_each(|p| p.forget_window(window));
            }
            entity.segments.iter_mut().for_each(|s| s.forget_window(window));
        }
    }

    /// Re-drape every segment, after the draping projection changed.
    pub(crate) fn redrape_all(&mut self, ctx: &DrapeContext<'_>) -> OverlayResult<()> {
        for entity in &mut self.entities {
            for s in 0..entity.segments.len() {
                entity.drape(ctx, s);
            }
            K::refresh(entity, ctx.source)?;
        }
        Ok(())
    }
}

/// One collection per overlay kind.
#[derive(Debug, Clone, Default)]
pub struct Collections {
    pub navs: Collection<NavTrack>,
    pub routes: Collection<Route>,
    pub sites: Collection<Site>,
    pub vectors: Collection<Vector>,
}

impl Collections {
    /// Set a collection's mode; entering edit mode demotes any other
    /// collection in edit mode to view.
    pub fn set_mode<K: EntityKind>(&mut self, mode: CollectionMode) {
        if mode == CollectionMode::Edit {
            let demote = |m: CollectionMode| {
                if m == CollectionMode::Edit {
                    CollectionMode::View
                } else {
                    m
                }
            };
            self.navs.mode = demote(self.navs.mode);
            self.routes.mode = demote(self.routes.mode);
            self.sites.mode = demote(self.sites.mode);
            self.vectors.mode = demote(self.vectors.mode);
        }
        K::collection_mut(self).set_mode_unchecked(mode);
        info!("{} mode set to {:?}", K::LABEL, mode);
    }

    /// Number of collections currently in edit mode.
    pub fn edit_count(&self) -> usize {
        [
            self.navs.mode,
            self.routes.mode,
            self.sites.mode,
            self.vectors.mode,
        ]
        .iter()
        .filter(|&&m| m == CollectionMode::Edit)
        .count()
    }

    pub(crate) fn project_window(
        &mut self,
        window: WindowId,
        projector: &Projector,
        offset: f64,
    ) -> OverlayResult<()> {
        self.navs.project_window(window, projector, offset)?;
        self.routes.project_window(window, projector, offset)?;
        self.sites.project_window(window, projector, offset)?;
        self.vectors.project_window(window, projector, offset)
    }

    pub(crate) fn forget_window(&mut self, window: WindowId) {
        self.navs.forget_window(window);
        self.routes.forget_window(window);
        self.sites.forget_window(window);
        self.vectors.forget_window(window);
    }

    pub(crate) fn redrape_all(&mut self, ctx: &DrapeContext<'_>) -> OverlayResult<()> {
        self.navs.redrape_all(ctx)?;
        self.routes.redrape_all(ctx)?;
        self.sites.redrape_all(ctx)?;
        self.vectors.redrape_all(ctx)
    }
}

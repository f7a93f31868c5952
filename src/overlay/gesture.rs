// src/overlay/gesture.rs
// Pointer gesture handling: select, drag, add and delete overlay points by pixel
// RELEVANT FILES: src/overlay/world.rs, src/overlay/collection.rs, src/picking/resolver.rs

use log::debug;

use crate::error::OverlayResult;
use crate::overlay::collection::{CollectionMode, EntityId, PointRef, Selection};
use crate::overlay::entity::EntityKind;
use crate::overlay::point::{NewPoint, WindowId};
use crate::overlay::world::World;

/// Phase of a pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickGesture {
    Down,
    Move,
    Up,
}

/// What a gesture did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected(PointRef),
    Moved(PointRef),
    Added(PointRef),
    Deleted(PointRef),
    /// Points between anchor and cursor were flagged
    RangeMarked { anchor: PointRef, cursor: PointRef },
    /// Nothing to do for this gesture
    Unchanged,
    /// The request was refused; the presentation layer should signal it
    Rejected,
}

/// Granularity of a range selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeScope {
    /// Points between the two picks
    Points,
    /// Whole entities between the two picks
    Entities,
}

fn rejected<K: EntityKind>(gesture: PickGesture, reason: &str) -> OverlayResult<SelectOutcome> {
    debug!("{} {:?} rejected: {}", K::LABEL, gesture, reason);
    Ok(SelectOutcome::Rejected)
}

impl World {
    /// Press selects the nearest point; a drag moves the selected point of
    /// an editable entity while the collection is in edit mode.
    pub fn handle_select<K: EntityKind>(
        &mut self,
        window: WindowId,
        gesture: PickGesture,
        px: u32,
        py: u32,
    ) -> OverlayResult<SelectOutcome> {
        let collection = self.collection::<K>();
        if collection.mode() == CollectionMode::Off || collection.is_empty() {
            return rejected::<K>(gesture, "nothing to select");
        }
        let selected = collection.selection().primary();

        if gesture == PickGesture::Down || selected.is_none() {
            return match self.select_nearest::<K>(window, px, py)? {
                Some(p) => Ok(SelectOutcome::Selected(p)),
                None => rejected::<K>(gesture, "no point under cursor"),
            };
        }
        let Some(p) = selected else {
            return Ok(SelectOutcome::Unchanged);
        };
        if gesture == PickGesture::Up {
            return Ok(SelectOutcome::Unchanged);
        }

        let collection = self.collection::<K>();
        let editable = collection.mode() == CollectionMode::Edit
            && collection
                .entity(EntityId(p.entity))
                .is_some_and(|e| e.attributes.editable());
        let hit = self.pick(window, px, py)?;
        if !hit.found || !editable {
            return rejected::<K>(gesture, "selection is not movable here");
        }
        self.move_point::<K>(EntityId(p.entity), p.point, World::pick_position(&hit))?;
        Ok(SelectOutcome::Moved(p))
    }

    /// In edit mode, a press adds a point after the selected one, or starts
    /// a new entity when nothing is selected; a drag moves the point just added.
    pub fn handle_add<K: EntityKind>(
        &mut self,
        window: WindowId,
        gesture: PickGesture,
        px: u32,
        py: u32,
    ) -> OverlayResult<SelectOutcome> {
        if self.collection::<K>().mode() != CollectionMode::Edit {
            return rejected::<K>(gesture, "collection not in edit mode");
        }
        let selected = self.collection::<K>().selection().primary();

        match (gesture, selected) {
            (PickGesture::Up, _) => Ok(SelectOutcome::Unchanged),
            (PickGesture::Move, Some(p)) => {
                let hit = self.pick(window, px, py)?;
                if !hit.found {
                    return Ok(SelectOutcome::Unchanged);
                }
                self.move_point::<K>(EntityId(p.entity), p.point, World::pick_position(&hit))?;
                Ok(SelectOutcome::Moved(p))
            }
            _ => {
                let hit = self.pick(window, px, py)?;
                if !hit.found {
                    return rejected::<K>(gesture, "no terrain under cursor");
                }
                let position = World::pick_position(&hit);
                let target = selected.and_then(|p| {
                    let entity = self.collection::<K>().entity(EntityId(p.entity))?;
                    let room = K::MAX_POINTS.map_or(true, |max| entity.len() < max);
                    room.then_some((p, entity.attributes.editable()))
                });

                let added = match target {
                    Some((p, true)) => {
                        let j = self.insert_point::<K>(
                            EntityId(p.entity),
                            p.point,
                            NewPoint::plain(position),
                        )?;
                        PointRef::new(p.entity, j)
                    }
                    Some((_, false)) => {
                        return rejected::<K>(gesture, "selected entity is not editable");
                    }
                    None => {
                        let index = self.collection::<K>().len();
                        let Some(attributes) = K::create(index) else {
                            return rejected::<K>(gesture, "kind cannot be created interactively");
                        };
                        let id = self.add_entity(attributes, vec![NewPoint::plain(position)])?;
                        PointRef::new(id.0, 0)
                    }
                };
                self.set_selection::<K>(Selection::Single(added))?;
                Ok(SelectOutcome::Added(added))
            }
        }
    }

    /// In edit mode, delete the selected point when the pick lands nearest to it.
    pub fn handle_delete<K: EntityKind>(
        &mut self,
        window: WindowId,
        px: u32,
        py: u32,
    ) -> OverlayResult<SelectOutcome> {
        let collection = self.collection::<K>();
        let selected = match collection.selection() {
            Selection::Single(p) if collection.mode() == CollectionMode::Edit => p,
            _ => return rejected::<K>(PickGesture::Down, "no selected point to delete"),
        };
        let hit = self.pick(window, px, py)?;
        let nearest = if hit.found {
            self.collection::<K>().nearest(hit.xgrid, hit.ygrid)
        } else {
            None
        };
        if nearest != Some(selected) {
            return rejected::<K>(PickGesture::Down, "pick is not on the selected point");
        }
        self.delete_point::<K>(EntityId(selected.entity), selected.point)?;
        Ok(SelectOutcome::Deleted(selected))
    }

    /// Two-stage range pick: press anchors, drag moves the cursor, release
    /// flags (or clears) everything between them.
    pub fn handle_range_select<K: EntityKind>(
        &mut self,
        window: WindowId,
        gesture: PickGesture,
        px: u32,
        py: u32,
        select: bool,
        scope: RangeScope,
    ) -> OverlayResult<SelectOutcome> {
        let collection = self.collection::<K>();
        if collection.mode() == CollectionMode::Off || collection.is_empty() {
            return rejected::<K>(gesture, "nothing to select");
        }
        let current = collection.selection();

        if gesture == PickGesture::Down || current == Selection::None {
            return match self.select_nearest::<K>(window, px, py)? {
                Some(anchor) => Ok(SelectOutcome::Selected(anchor)),
                None => rejected::<K>(gesture, "no point under cursor"),
            };
        }

        match gesture {
            PickGesture::Move => {
                let Some(anchor) = current.primary() else {
                    return Ok(SelectOutcome::Unchanged);
                };
                let hit = self.pick(window, px, py)?;
                if !hit.found {
                    return Ok(SelectOutcome::Unchanged);
                }
                match self.collection::<K>().nearest(hit.xgrid, hit.ygrid) {
                    Some(cursor) => {
                        self.set_selection::<K>(Selection::Range { anchor, cursor })?;
                        Ok(SelectOutcome::Selected(cursor))
                    }
                    None => Ok(SelectOutcome::Unchanged),
                }
            }
            _ => {
                let (anchor, cursor) = match current {
                    Selection::Range { anchor, cursor } => (anchor, cursor),
                    Selection::Single(p) => (p, p),
                    Selection::None => return Ok(SelectOutcome::Unchanged),
                };
                match scope {
                    RangeScope::Points => self.select_range::<K>(anchor, cursor, select)?,
                    RangeScope::Entities => self.select_entities::<K>(
                        EntityId(anchor.entity),
                        EntityId(cursor.entity),
                        select,
                    )?,
                }
                Ok(SelectOutcome::RangeMarked { anchor, cursor })
            }
        }
    }
}

// src/overlay/mod.rs
// Overlay entity store shared by every open window
// RELEVANT FILES: src/overlay/world.rs, src/overlay/collection.rs, src/overlay/gesture.rs

mod collection;
mod entity;
mod gesture;
mod point;
mod segment;
mod window;
mod world;

pub use collection::{
    Collection, CollectionMode, Collections, EntityId, PointRef, Selection,
};
pub use entity::{
    Entity, EntityKind, NavSample, NavTrack, OverlayColor, PointExtras, Route, RouteDistance, Site,
    Vector, WaypointKind,
};
pub use gesture::{PickGesture, RangeScope, SelectOutcome};
pub use point::{DrapePoint, NewPoint, OverlayPoint, WindowId};
pub use segment::LineSegment;
pub use window::Window;
pub use world::World;

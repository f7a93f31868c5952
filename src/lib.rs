//! Terrain draping, id-buffer picking and a shared overlay store for
//! bathymetric grid viewers.
//!
//! A [`World`](overlay::World) owns one elevation grid and every overlay
//! (navigation tracks, routes, sites, vectors). Windows opened on the world
//! each keep their own projection and camera; overlay points cache one
//! display position per window and segments are draped onto the terrain
//! whenever their endpoints move.

pub mod budget;
pub mod config;
pub mod drape;
pub mod error;
pub mod geo;
pub mod grid;
pub mod overlay;
pub mod picking;
pub mod redraw;
pub mod view;

pub use budget::AllocationBudget;
pub use config::ViewerConfig;
pub use drape::{drape_segment, DrapeMode, SurfacePoint};
pub use error::{OverlayError, OverlayResult};
pub use geo::{DisplayProjection, GridProjection, Projector, ProjectorConfig};
pub use grid::{GridBounds, TerrainGrid};
pub use overlay::{
    CollectionMode, EntityId, NavTrack, NewPoint, PickGesture, PointRef, Route, SelectOutcome,
    Selection, Site, Vector, WaypointKind, World,
};
pub use picking::{compute_view_bounds, PickResolver, PickResult, SoftwareIdBuffer};
pub use redraw::{DrawOutcome, RedrawGuard};
pub use view::{DisplayMode, ViewTransform};

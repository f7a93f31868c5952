// src/geo/mod.rs
// Coordinate projector: grid, geographic and display conversions plus great-circle math
// RELEVANT FILES: src/geo/projection.rs, src/geo/great_circle.rs, src/geo/reproject.rs

pub mod great_circle;
pub mod projection;
pub mod reproject;

// Re-export main types and functions
pub use great_circle::SPHEROID_RADIUS;
pub use projection::{
    DisplayProjection, DistanceInfo, GeoResult, GridProjection, LocalProjection, MapProjection,
    ProjectedPoint, Projector, ProjectorConfig,
};
pub use reproject::{GeoError, ProjTransform};

/// Check if the proj feature is available
pub fn proj_available() -> bool {
    cfg!(feature = "proj")
}

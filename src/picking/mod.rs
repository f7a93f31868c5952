// src/picking/mod.rs
// Pick resolver and view bounds calculator built on colour-encoded id renders
// RELEVANT FILES: src/picking/id_buffer.rs, src/picking/resolver.rs, src/picking/view_bounds.rs

mod id_buffer;
mod resolver;
mod terrain_mesh;
mod view_bounds;

pub use id_buffer::{
    IdCell, IdColor, IdRasterizer, IdVertex, SoftwareIdBuffer, LOWER_TRIANGLE_BLUE,
    UPPER_TRIANGLE_BLUE,
};
pub use resolver::{PickPass, PickResolver, PickResult, PickScene, Resolution};
pub use terrain_mesh::TerrainMesh;
pub use view_bounds::compute_view_bounds;

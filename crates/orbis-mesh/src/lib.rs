//! Terrain mesh assembly: grid triangulation, per-vertex normals and
//! tangents, stride decimation for coarse LODs, and a packed vertex format
//! for upload.

pub mod decimate;
pub mod grid;
pub mod mesh_data;
pub mod packed;

pub use decimate::{decimate_vertices, lod_triangle_target, simplify_triangles};
pub use grid::{grid_indices, grid_uvs};
pub use mesh_data::{MeshData, build_grid_mesh, build_mesh};
pub use packed::TerrainVertex;

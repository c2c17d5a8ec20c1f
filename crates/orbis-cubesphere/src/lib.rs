//! Cube-sphere parameterization: the six faces, unit-square UV rectangles
//! on a face, and the tangent-warp projection onto the unit sphere.

mod face;
mod projection;
mod uv_rect;

pub use face::CubeFace;
pub use projection::{direction_to_face_uv, face_uv_to_direction};
pub use uv_rect::UvRect;

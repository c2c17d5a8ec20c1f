//! Interleaved vertex layout for GPU upload.

use glam::{Vec2, Vec3, Vec4};

/// One terrain vertex, 48 bytes, tightly packed.
///
/// Layout:
///   - `[0..12]`  position `[f32; 3]`
///   - `[12..24]` normal `[f32; 3]`
///   - `[24..32]` uv `[f32; 2]`
///   - `[32..48]` tangent `[f32; 4]`, w = bitangent sign
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
}

static_assertions::assert_eq_size!(TerrainVertex, [u8; 48]);

impl TerrainVertex {
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2, tangent: Vec4) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
            tangent: tangent.to_array(),
        }
    }

    /// Reinterpret a vertex slice as raw bytes for a buffer write.
    #[must_use]
    pub fn as_bytes(vertices: &[TerrainVertex]) -> &[u8] {
        bytemuck::cast_slice(vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_layout() {
        let v = TerrainVertex::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::Z,
            Vec2::new(0.25, 0.75),
            Vec4::new(1.0, 0.0, 0.0, -1.0),
        );
        let bytes = TerrainVertex::as_bytes(std::slice::from_ref(&v));
        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[20..24], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[28..32], &0.75f32.to_ne_bytes());
        assert_eq!(&bytes[44..48], &(-1.0f32).to_ne_bytes());
    }

    #[test]
    fn test_cast_back() {
        let vs = [TerrainVertex::new(Vec3::ONE, Vec3::Y, Vec2::ZERO, Vec4::X); 3];
        let bytes = TerrainVertex::as_bytes(&vs);
        let back: &[TerrainVertex] = bytemuck::cast_slice(bytes);
        assert_eq!(back, &vs);
    }
}

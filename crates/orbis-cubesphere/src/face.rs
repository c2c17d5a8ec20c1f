//! The six root faces of the planet.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A face of the cube the planet surface is projected from.
///
/// Each face carries a right-handed basis: `tangent × bitangent = normal`.
/// `u` grows along the tangent and `v` along the bitangent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum CubeFace {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

impl CubeFace {
    /// Faces in root-creation order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<CubeFace> {
        Self::ALL.get(index).copied()
    }

    /// Outward unit normal.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::X,
            CubeFace::NegX => DVec3::NEG_X,
            CubeFace::PosY => DVec3::Y,
            CubeFace::NegY => DVec3::NEG_Y,
            CubeFace::PosZ => DVec3::Z,
            CubeFace::NegZ => DVec3::NEG_Z,
        }
    }

    /// Direction of increasing `u`.
    #[must_use]
    pub fn tangent(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::NEG_Z,
            CubeFace::NegX => DVec3::Z,
            CubeFace::PosY | CubeFace::NegY | CubeFace::PosZ => DVec3::X,
            CubeFace::NegZ => DVec3::NEG_X,
        }
    }

    /// Direction of increasing `v`.
    #[must_use]
    pub fn bitangent(self) -> DVec3 {
        match self {
            CubeFace::PosY => DVec3::NEG_Z,
            CubeFace::NegY => DVec3::Z,
            CubeFace::PosX | CubeFace::NegX | CubeFace::PosZ | CubeFace::NegZ => DVec3::Y,
        }
    }

    /// The face whose normal is closest to `dir`. Ties resolve X before Y before Z.
    #[must_use]
    pub fn from_direction(dir: DVec3) -> CubeFace {
        let a = dir.abs();
        if a.x >= a.y && a.x >= a.z {
            if dir.x >= 0.0 { CubeFace::PosX } else { CubeFace::NegX }
        } else if a.y >= a.z {
            if dir.y >= 0.0 { CubeFace::PosY } else { CubeFace::NegY }
        } else if dir.z >= 0.0 {
            CubeFace::PosZ
        } else {
            CubeFace::NegZ
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_is_right_handed() {
        for face in CubeFace::ALL {
            let cross = face.tangent().cross(face.bitangent());
            assert!(
                (cross - face.normal()).length() < 1e-12,
                "tangent x bitangent != normal for {face:?}"
            );
        }
    }

    #[test]
    fn test_index_round_trips() {
        for (i, face) in CubeFace::ALL.into_iter().enumerate() {
            assert_eq!(face.index(), i);
            assert_eq!(CubeFace::from_index(i), Some(face));
        }
        assert_eq!(CubeFace::from_index(6), None);
    }

    #[test]
    fn test_from_direction_picks_dominant_axis() {
        assert_eq!(CubeFace::from_direction(DVec3::new(0.9, 0.1, -0.2)), CubeFace::PosX);
        assert_eq!(CubeFace::from_direction(DVec3::new(0.1, -0.9, 0.2)), CubeFace::NegY);
        assert_eq!(CubeFace::from_direction(DVec3::new(0.1, 0.2, -0.9)), CubeFace::NegZ);
        for face in CubeFace::ALL {
            assert_eq!(CubeFace::from_direction(face.normal()), face);
        }
    }
}

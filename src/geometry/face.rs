//! Cube face identification and per-face coordinate frames.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Identifies one of the six cubemap faces.
///
/// The discriminant is the layer index used by the height/color/normal
/// fields and by the simulation kernel, so the order is part of the data
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CubeFaceId {
    /// -Z face
    NegZ = 0,
    /// +Z face
    PosZ = 1,
    /// -Y face (bottom)
    NegY = 2,
    /// +Y face (top)
    PosY = 3,
    /// -X face
    NegX = 4,
    /// +X face
    PosX = 5,
}

/// Local frame of a cube face: a grid point at parametric (u, v) in [-1, 1]
/// lies at `u * u_axis + v * v_axis + offset` on the unit cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeFaceBasis {
    pub u_axis: Vec3,
    pub v_axis: Vec3,
    /// Outward offset of the face plane from the cube center.
    pub offset: Vec3,
}

impl CubeFaceBasis {
    /// Point on the unit cube surface for parametric (u, v) in [-1, 1].
    pub fn cube_point(&self, u: f32, v: f32) -> Vec3 {
        u * self.u_axis + v * self.v_axis + self.offset
    }
}

impl CubeFaceId {
    /// Returns all six cube faces in layer order.
    pub const fn all() -> [CubeFaceId; 6] {
        [
            CubeFaceId::NegZ,
            CubeFaceId::PosZ,
            CubeFaceId::NegY,
            CubeFaceId::PosY,
            CubeFaceId::NegX,
            CubeFaceId::PosX,
        ]
    }

    /// Returns the face index (0-5).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Creates a face from an index (0-5).
    pub const fn from_index(index: usize) -> Option<CubeFaceId> {
        match index {
            0 => Some(CubeFaceId::NegZ),
            1 => Some(CubeFaceId::PosZ),
            2 => Some(CubeFaceId::NegY),
            3 => Some(CubeFaceId::PosY),
            4 => Some(CubeFaceId::NegX),
            5 => Some(CubeFaceId::PosX),
            _ => None,
        }
    }

    /// Returns a short name for the face (e.g., "posx", "negy").
    pub const fn short_name(self) -> &'static str {
        match self {
            CubeFaceId::NegZ => "negz",
            CubeFaceId::PosZ => "posz",
            CubeFaceId::NegY => "negy",
            CubeFaceId::PosY => "posy",
            CubeFaceId::NegX => "negx",
            CubeFaceId::PosX => "posx",
        }
    }

    /// Mesh-building frame for this face.
    ///
    /// `u_axis x v_axis` points along `offset` for every face, which gives
    /// the index generator its outward winding. Faces 2 and 3 run `v` in the
    /// opposite direction from the cubemap texel addressing; the sampler never
    /// relies on the mesh frame, only on vertex directions.
    pub const fn mesh_basis(self) -> CubeFaceBasis {
        let (u_axis, v_axis, offset) = match self {
            CubeFaceId::NegZ => (Vec3::X, Vec3::NEG_Y, Vec3::NEG_Z),
            CubeFaceId::PosZ => (Vec3::NEG_X, Vec3::NEG_Y, Vec3::Z),
            CubeFaceId::NegY => (Vec3::X, Vec3::Z, Vec3::NEG_Y),
            CubeFaceId::PosY => (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            CubeFaceId::NegX => (Vec3::NEG_Z, Vec3::NEG_Y, Vec3::NEG_X),
            CubeFaceId::PosX => (Vec3::Z, Vec3::NEG_Y, Vec3::X),
        };
        CubeFaceBasis { u_axis, v_axis, offset }
    }

    /// Texel-addressing frame for this face, as used by the cubemap fields.
    pub const fn cubemap_basis(self) -> CubeFaceBasis {
        let (u_axis, v_axis, offset) = match self {
            CubeFaceId::NegZ => (Vec3::X, Vec3::NEG_Y, Vec3::NEG_Z),
            CubeFaceId::PosZ => (Vec3::NEG_X, Vec3::NEG_Y, Vec3::Z),
            CubeFaceId::NegY => (Vec3::X, Vec3::NEG_Z, Vec3::NEG_Y),
            CubeFaceId::PosY => (Vec3::X, Vec3::Z, Vec3::Y),
            CubeFaceId::NegX => (Vec3::NEG_Z, Vec3::NEG_Y, Vec3::NEG_X),
            CubeFaceId::PosX => (Vec3::Z, Vec3::NEG_Y, Vec3::X),
        };
        CubeFaceBasis { u_axis, v_axis, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_faces() {
        let faces = CubeFaceId::all();
        assert_eq!(faces.len(), 6);
        for (i, face) in faces.iter().enumerate() {
            assert_eq!(face.index(), i);
        }
    }

    #[test]
    fn test_from_index() {
        for i in 0..6 {
            let face = CubeFaceId::from_index(i).unwrap();
            assert_eq!(face.index(), i);
        }
        assert!(CubeFaceId::from_index(6).is_none());
    }

    #[test]
    fn test_short_names() {
        assert_eq!(CubeFaceId::PosX.short_name(), "posx");
        assert_eq!(CubeFaceId::NegY.short_name(), "negy");
        assert_eq!(CubeFaceId::NegZ.short_name(), "negz");
    }

    #[test]
    fn test_bases_are_orthonormal_frames() {
        for face in CubeFaceId::all() {
            for basis in [face.mesh_basis(), face.cubemap_basis()] {
                assert_eq!(basis.u_axis.dot(basis.v_axis), 0.0, "{:?}", face);
                assert_eq!(basis.u_axis.dot(basis.offset), 0.0, "{:?}", face);
                assert_eq!(basis.v_axis.dot(basis.offset), 0.0, "{:?}", face);
            }
        }
    }

    #[test]
    fn test_mesh_basis_winds_outward() {
        for face in CubeFaceId::all() {
            let b = face.mesh_basis();
            assert_eq!(b.u_axis.cross(b.v_axis), b.offset, "{:?}", face);
        }
    }

    #[test]
    fn test_face_centers_share_offset() {
        for face in CubeFaceId::all() {
            assert_eq!(face.mesh_basis().offset, face.cubemap_basis().offset);
            assert_eq!(face.mesh_basis().cube_point(0.0, 0.0), face.mesh_basis().offset);
        }
    }
}

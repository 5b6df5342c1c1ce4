//! Cube-sphere geometry module.
//!
//! Face frames, the equal-area cube-to-sphere mapping, the cubemap
//! projection used to address field texels, and the base mesh builder.

mod cubemap;
mod face;
mod mesh;
mod spherify;

pub use cubemap::{direction_to_face_uv, face_uv_to_direction, texel_to_uv, FaceCoord};
pub use face::{CubeFaceBasis, CubeFaceId};
pub use mesh::{CubeSphereMesh, MeshError, Vertex};
pub use spherify::{cube_to_sphere, normalize_or_up};

//! Host-side terrain processing.
//!
//! Turns the fields read back from the kernel into a displaced mesh:
//! bilinear sampling by direction, radial displacement, and normal
//! reconstruction.

mod displace;
mod field;
mod normals;
mod sampler;

pub use displace::{displace, Displacement};
pub use field::{unpack_rgba8, FieldError, HeightField, Rgba8Field};
pub use normals::{recompute_normals, weld_seams};
pub use sampler::sample_height;

//! Cubemap texel fields read back from the kernel.

use thiserror::Error;

use crate::geometry::CubeFaceId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Tile size must be at least 1, got {0}")]
    InvalidTileSize(u32),
    #[error("Field data has {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Texels on one face, widened before multiplying.
fn face_texels(tile_size: u32) -> usize {
    let t = tile_size as usize;
    t * t
}

fn texel_count(tile_size: u32) -> Result<usize, FieldError> {
    if tile_size == 0 {
        return Err(FieldError::InvalidTileSize(tile_size));
    }
    Ok(6 * face_texels(tile_size))
}

fn check_len(expected: usize, actual: usize) -> Result<(), FieldError> {
    if expected != actual {
        return Err(FieldError::LengthMismatch { expected, actual });
    }
    Ok(())
}

/// Scalar height per texel, face-major then row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    tile_size: u32,
    data: Vec<f32>,
}

impl HeightField {
    pub fn new(tile_size: u32, data: Vec<f32>) -> Result<Self, FieldError> {
        check_len(texel_count(tile_size)?, data.len())?;
        Ok(Self { tile_size, data })
    }

    /// A field with every texel set to `value`.
    pub fn filled(tile_size: u32, value: f32) -> Result<Self, FieldError> {
        let n = texel_count(tile_size)?;
        Ok(Self {
            tile_size,
            data: vec![value; n],
        })
    }

    /// Decodes little-endian f32 words.
    pub fn from_le_bytes(tile_size: u32, bytes: &[u8]) -> Result<Self, FieldError> {
        check_len(texel_count(tile_size)? * 4, bytes.len())?;
        let data = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { tile_size, data })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn index(&self, face: CubeFaceId, x: u32, y: u32) -> usize {
        let t = self.tile_size as usize;
        face.index() * t * t + y as usize * t + x as usize
    }

    pub fn get(&self, face: CubeFaceId, x: u32, y: u32) -> f32 {
        self.data[self.index(face, x, y)]
    }

    pub fn set(&mut self, face: CubeFaceId, x: u32, y: u32, value: f32) {
        let i = self.index(face, x, y);
        self.data[i] = value;
    }

    /// Texels of one face, row-major.
    pub fn face(&self, face: CubeFaceId) -> &[f32] {
        let n = face_texels(self.tile_size);
        let start = face.index() * n;
        &self.data[start..start + n]
    }

    /// Minimum and maximum finite height, if any.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|h| h.is_finite())
            .fold(None, |acc, h| match acc {
                None => Some((h, h)),
                Some((lo, hi)) => Some((lo.min(h), hi.max(h))),
            })
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|h| h.to_le_bytes()).collect()
    }
}

/// Four 8-bit channels per texel (RGBA), face-major then row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rgba8Field {
    tile_size: u32,
    data: Vec<u8>,
}

impl Rgba8Field {
    pub fn new(tile_size: u32, data: Vec<u8>) -> Result<Self, FieldError> {
        check_len(texel_count(tile_size)? * 4, data.len())?;
        Ok(Self { tile_size, data })
    }

    /// Decodes packed u32 words whose least significant byte is red.
    pub fn from_packed_le_bytes(tile_size: u32, bytes: &[u8]) -> Result<Self, FieldError> {
        check_len(texel_count(tile_size)? * 4, bytes.len())?;
        let data = bytes
            .chunks_exact(4)
            .flat_map(|c| unpack_rgba8(u32::from_le_bytes([c[0], c[1], c[2], c[3]])))
            .collect();
        Ok(Self { tile_size, data })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn texel(&self, face: CubeFaceId, x: u32, y: u32) -> [u8; 4] {
        let t = self.tile_size as usize;
        let i = 4 * (face.index() * t * t + y as usize * t + x as usize);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Bytes of one face, row-major RGBA.
    pub fn face(&self, face: CubeFaceId) -> &[u8] {
        let n = 4 * face_texels(self.tile_size);
        let start = face.index() * n;
        &self.data[start..start + n]
    }
}

/// Splits a packed color word into `[r, g, b, a]`, red in the low byte.
pub fn unpack_rgba8(word: u32) -> [u8; 4] {
    [
        (word & 0xFF) as u8,
        ((word >> 8) & 0xFF) as u8,
        ((word >> 16) & 0xFF) as u8,
        (word >> 24) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_is_lsb_first() {
        assert_eq!(unpack_rgba8(0x4433_2211), [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(unpack_rgba8(0xFF00_0000), [0, 0, 0, 255]);
    }

    #[test]
    fn test_packed_decode() {
        let mut bytes = vec![0u8; 6 * 4];
        bytes[4..8].copy_from_slice(&0x8040_20FFu32.to_le_bytes());
        let field = Rgba8Field::from_packed_le_bytes(1, &bytes).unwrap();
        assert_eq!(field.texel(CubeFaceId::PosZ, 0, 0), [0xFF, 0x20, 0x40, 0x80]);
        assert_eq!(field.texel(CubeFaceId::NegZ, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_length_is_checked() {
        assert_eq!(
            HeightField::new(2, vec![0.0; 5]),
            Err(FieldError::LengthMismatch {
                expected: 24,
                actual: 5
            })
        );
        assert_eq!(
            HeightField::from_le_bytes(0, &[]),
            Err(FieldError::InvalidTileSize(0))
        );
        assert!(Rgba8Field::new(2, vec![0; 6 * 4 * 4]).is_ok());
        assert!(Rgba8Field::new(2, vec![0; 6 * 4]).is_err());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_face_texels_do_not_wrap() {
        assert_eq!(face_texels(65_536), 1usize << 32);
        assert_eq!(face_texels(u32::MAX), (u32::MAX as usize) * (u32::MAX as usize));
    }

    #[test]
    fn test_face_slices() {
        let data: Vec<f32> = (0..6 * 4).map(|i| i as f32).collect();
        let field = HeightField::new(2, data).unwrap();
        assert_eq!(field.face(CubeFaceId::PosX), &[20.0, 21.0, 22.0, 23.0]);

        let mut bytes = vec![0u8; 6 * 4 * 4];
        bytes[5 * 16] = 9;
        let colors = Rgba8Field::new(2, bytes).unwrap();
        assert_eq!(colors.face(CubeFaceId::PosX).len(), 16);
        assert_eq!(colors.face(CubeFaceId::PosX)[0], 9);
    }

    #[test]
    fn test_height_indexing_is_face_major() {
        let mut field = HeightField::filled(3, 0.0).unwrap();
        field.set(CubeFaceId::NegY, 2, 1, 5.0);
        assert_eq!(field.data()[2 * 9 + 3 + 2], 5.0);
        assert_eq!(field.face(CubeFaceId::NegY)[5], 5.0);
        assert_eq!(field.range(), Some((0.0, 5.0)));
    }

    #[test]
    fn test_height_bytes_roundtrip() {
        let data: Vec<f32> = (0..24).map(|i| i as f32 * 0.5 - 3.0).collect();
        let field = HeightField::new(2, data.clone()).unwrap();
        let back = HeightField::from_le_bytes(2, &field.to_le_bytes()).unwrap();
        assert_eq!(back.data(), &data[..]);
    }
}

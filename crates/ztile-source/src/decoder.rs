//! Payload decoder abstraction.

use crate::DecodeError;

/// GPU-facing texel format of a decoded raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Single 16-bit unsigned normalized channel, linear (not sRGB).
    R16Unorm,
    /// BC1/DXT1 with opaque color.
    Bc1RgbUnorm,
    /// BC1/DXT1 with 1-bit alpha.
    Bc1RgbaUnorm,
}

/// Turns the raw payload of one tile into a raster.
///
/// Decoding must be a pure function of the input bytes.
pub trait TileDecoder: Send + Sync {
    /// Decoded raster type.
    type Raster;

    /// Decode one payload.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Raster, DecodeError>;
}

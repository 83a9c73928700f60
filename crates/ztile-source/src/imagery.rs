//! Surface and land-mask image tiles.
//!
//! Image tiles are DXT1 DDS files stored top-down. Decoding flips them so row
//! zero is the southern edge, the same orientation elevation rasters use.

use crate::dds::{DdsSurface, MipLevel, PixelFormat};
use crate::decoder::{TextureFormat, TileDecoder};
use crate::DecodeError;
use image::RgbaImage;
use tracing::trace;
use ztile_archive::LayerKind;

/// How an image layer's pixel format is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageVariant {
    /// Surface color, format as declared by the file.
    Surface,
    /// Land/water mask. Water is encoded in the 1-bit alpha even when the
    /// file does not declare it.
    LandMask,
}

impl ImageVariant {
    /// Variant used for an archive layer, if the layer holds images.
    pub fn for_layer(layer: LayerKind) -> Option<Self> {
        match layer {
            LayerKind::Surface => Some(ImageVariant::Surface),
            LayerKind::LandMask => Some(ImageVariant::LandMask),
            _ => None,
        }
    }

    fn adjust(&self, format: PixelFormat) -> PixelFormat {
        match (self, format) {
            (ImageVariant::LandMask, PixelFormat::Dxt1Rgb) => PixelFormat::Dxt1Rgba,
            (_, format) => format,
        }
    }
}

/// A decoded image tile with its full mip chain, bottom-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRaster {
    surface: DdsSurface,
}

impl ImageRaster {
    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.surface.format()
    }

    pub fn texture_format(&self) -> TextureFormat {
        self.surface.format().texture_format()
    }

    pub fn mip_count(&self) -> usize {
        self.surface.levels().len()
    }

    pub fn mip_levels(&self) -> &[MipLevel] {
        self.surface.levels()
    }

    /// Compressed blocks of one mip level.
    pub fn mip_data(&self, index: usize) -> Option<&[u8]> {
        self.surface.level_data(index)
    }

    /// Compressed blocks of all mip levels.
    pub fn data(&self) -> &[u8] {
        self.surface.data()
    }

    /// Expand the top mip level to RGBA.
    pub fn to_rgba(&self) -> RgbaImage {
        self.surface.decode_rgba()
    }
}

/// Decoder for DXT1 image tiles.
///
/// Tiles must be 1, 2 or a multiple of 4 texels high to flip; other heights
/// fail to decode. Smaller mip levels past the first such height are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDecoder {
    variant: ImageVariant,
}

impl ImageDecoder {
    pub fn new(variant: ImageVariant) -> Self {
        Self { variant }
    }

    pub fn surface() -> Self {
        Self::new(ImageVariant::Surface)
    }

    pub fn land_mask() -> Self {
        Self::new(ImageVariant::LandMask)
    }

    pub fn variant(&self) -> ImageVariant {
        self.variant
    }
}

impl TileDecoder for ImageDecoder {
    type Raster = ImageRaster;

    fn decode(&self, bytes: &[u8]) -> Result<ImageRaster, DecodeError> {
        let mut surface = DdsSurface::parse(bytes)?;
        surface.flip_vertical()?;

        let declared = surface.format();
        let format = self.variant.adjust(declared);
        if format != declared {
            trace!(?declared, ?format, "Reinterpreting mask pixel format");
            surface.set_format(format);
        }

        Ok(ImageRaster { surface })
    }
}

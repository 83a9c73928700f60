//! DDS container handling for DXT1 tiles.
//!
//! Only the DXT1 (BC1) family is accepted. A surface keeps its compressed
//! blocks as stored; the helpers here flip them vertically in place and expand
//! them to RGBA for inspection.
//!
//! ## BC1 Block
//!
//! | Bytes | Content                                           |
//! |-------|---------------------------------------------------|
//! | 0-1   | Endpoint color 0 (RGB565)                         |
//! | 2-3   | Endpoint color 1 (RGB565)                         |
//! | 4-7   | One byte per texel row, 2-bit palette index each  |

use crate::decoder::TextureFormat;
use crate::DdsError;
use image::{Rgba, RgbaImage};
use std::io::{Cursor, Read};
use tracing::trace;

/// `"DDS "`
pub const DDS_MAGIC: [u8; 4] = *b"DDS ";

/// Magic plus header.
pub const DDS_PREAMBLE_LEN: usize = 128;

/// Bytes per 4x4 DXT1 block.
pub const DXT1_BLOCK_LEN: usize = 8;

const HEADER_SIZE: u32 = 124;
const PIXEL_FORMAT_SIZE: u32 = 32;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x20000;
const DDSD_LINEARSIZE: u32 = 0x80000;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_FOURCC: u32 = 0x4;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x400000;

/// Compressed pixel format of a DXT1 surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// DXT1 without alpha; the fourth palette entry of 3-color blocks is opaque black.
    Dxt1Rgb,
    /// DXT1 with 1-bit alpha; the fourth palette entry of 3-color blocks is transparent.
    Dxt1Rgba,
}

impl PixelFormat {
    /// True if the format carries alpha.
    pub fn has_alpha(&self) -> bool {
        matches!(self, PixelFormat::Dxt1Rgba)
    }

    /// Matching texture format.
    pub fn texture_format(&self) -> TextureFormat {
        match self {
            PixelFormat::Dxt1Rgb => TextureFormat::Bc1RgbUnorm,
            PixelFormat::Dxt1Rgba => TextureFormat::Bc1RgbaUnorm,
        }
    }
}

/// Fields of the DDS header that matter for DXT1 surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdsHeader {
    /// `DDSD_*` flags.
    pub flags: u32,
    /// Height in texels.
    pub height: u32,
    /// Width in texels.
    pub width: u32,
    /// Declared mip level count.
    pub mipmap_count: u32,
    /// `DDPF_*` pixel format flags.
    pub pixel_flags: u32,
    /// Pixel format FourCC.
    pub fourcc: [u8; 4],
}

impl DdsHeader {
    /// Read magic and header from a stream.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, DdsError> {
        let mut raw = Vec::with_capacity(DDS_PREAMBLE_LEN);
        let read = reader.by_ref().take(DDS_PREAMBLE_LEN as u64).read_to_end(&mut raw);
        if read.is_err() || raw.len() < DDS_PREAMBLE_LEN {
            return Err(DdsError::Truncated {
                needed: DDS_PREAMBLE_LEN,
                actual: raw.len(),
            });
        }

        let u32_at = |at: usize| u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]);

        let magic = [raw[0], raw[1], raw[2], raw[3]];
        if magic != DDS_MAGIC {
            return Err(DdsError::BadMagic(magic));
        }
        let size = u32_at(4);
        if size != HEADER_SIZE {
            return Err(DdsError::InvalidHeaderSize {
                structure: "header",
                size,
            });
        }
        let pixel_format_size = u32_at(76);
        if pixel_format_size != PIXEL_FORMAT_SIZE {
            return Err(DdsError::InvalidHeaderSize {
                structure: "pixel format",
                size: pixel_format_size,
            });
        }

        Ok(Self {
            flags: u32_at(8),
            height: u32_at(12),
            width: u32_at(16),
            mipmap_count: u32_at(28),
            pixel_flags: u32_at(80),
            fourcc: [raw[84], raw[85], raw[86], raw[87]],
        })
    }

    /// Pixel format declared by the header.
    pub fn pixel_format(&self) -> Result<PixelFormat, DdsError> {
        if self.pixel_flags & DDPF_FOURCC == 0 || &self.fourcc != b"DXT1" {
            return Err(DdsError::UnsupportedFourCc(
                String::from_utf8_lossy(&self.fourcc).into_owned(),
            ));
        }
        if self.pixel_flags & DDPF_ALPHAPIXELS != 0 {
            Ok(PixelFormat::Dxt1Rgba)
        } else {
            Ok(PixelFormat::Dxt1Rgb)
        }
    }

    /// Number of mip levels present, limited to the full chain for the surface size.
    pub fn mip_count(&self) -> u32 {
        if self.flags & DDSD_MIPMAPCOUNT != 0 {
            self.mipmap_count.clamp(1, full_chain_len(self.width, self.height))
        } else {
            1
        }
    }
}

/// Location of one mip level in a surface's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipLevel {
    /// Level width in texels.
    pub width: u32,
    /// Level height in texels.
    pub height: u32,
    /// Byte offset into the surface data.
    pub offset: usize,
    /// Byte length.
    pub len: usize,
}

/// Byte size of a DXT1 level.
pub fn dxt1_level_len(width: u32, height: u32) -> usize {
    blocks(width) * blocks(height) * DXT1_BLOCK_LEN
}

fn blocks(texels: u32) -> usize {
    (texels as usize).div_ceil(4).max(1)
}

/// Number of levels from `width` x `height` down to 1x1.
fn full_chain_len(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

fn mip_chain(width: u32, height: u32, count: u32) -> Vec<MipLevel> {
    let count = count.clamp(1, full_chain_len(width, height));
    let mut levels = Vec::with_capacity(count as usize);
    let (mut w, mut h, mut offset) = (width, height, 0);
    for _ in 0..count {
        let len = dxt1_level_len(w, h);
        levels.push(MipLevel {
            width: w,
            height: h,
            offset,
            len,
        });
        offset += len;
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    levels
}

/// A DXT1 surface with its complete mip chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsSurface {
    width: u32,
    height: u32,
    format: PixelFormat,
    levels: Vec<MipLevel>,
    data: Vec<u8>,
}

impl DdsSurface {
    /// Parse a DDS file held in memory.
    pub fn parse(bytes: &[u8]) -> Result<Self, DdsError> {
        let mut stream = Cursor::new(bytes);
        let header = DdsHeader::read(&mut stream)?;
        let format = header.pixel_format()?;

        let data = bytes[stream.position() as usize..].to_vec();
        Self::from_parts(header.width, header.height, format, header.mip_count(), data)
    }

    /// Build a surface from compressed blocks.
    ///
    /// The mip count is limited to the full chain; bytes beyond it are dropped.
    pub fn from_parts(width: u32, height: u32, format: PixelFormat, mip_count: u32, mut data: Vec<u8>) -> Result<Self, DdsError> {
        if width == 0 || height == 0 {
            return Err(DdsError::InvalidDimensions(width, height));
        }
        let levels = mip_chain(width, height, mip_count);
        let needed: usize = levels.iter().map(|l| l.len).sum();
        if data.len() < needed {
            return Err(DdsError::Truncated {
                needed,
                actual: data.len(),
            });
        }
        data.truncate(needed);

        Ok(Self {
            width,
            height,
            format,
            levels,
            data,
        })
    }

    /// Width of the top level.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the top level.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Change how the blocks are interpreted. The bytes are untouched.
    pub fn set_format(&mut self, format: PixelFormat) {
        self.format = format;
    }

    /// Mip levels, largest first.
    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    /// Compressed bytes of one mip level.
    pub fn level_data(&self, index: usize) -> Option<&[u8]> {
        let level = self.levels.get(index)?;
        self.data.get(level.offset..level.offset + level.len)
    }

    /// Compressed bytes of all levels.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Flip every mip level top-to-bottom.
    ///
    /// Block rows swap places and the texel rows inside each block are
    /// reversed. A level is flippable when it is 1, 2 or a multiple of 4
    /// texels high. The chain is cut at the first smaller level that is not;
    /// an unflippable top level is an error.
    pub fn flip_vertical(&mut self) -> Result<(), DdsError> {
        if let Some(cut) = self.levels.iter().position(|l| !is_flippable(l.height)) {
            if cut == 0 {
                return Err(DdsError::UnflippableHeight(self.height));
            }
            let dropped = self.levels.split_off(cut);
            self.data.truncate(dropped[0].offset);
            trace!(kept = cut, dropped = dropped.len(), height = dropped[0].height, "Cut mip chain before flip");
        }
        for level in &self.levels {
            let bytes = &mut self.data[level.offset..level.offset + level.len];
            flip_dxt1_level(bytes, level.width, level.height)?;
        }
        Ok(())
    }

    /// Expand the top level to RGBA.
    pub fn decode_rgba(&self) -> RgbaImage {
        let blocks_x = blocks(self.width);
        let has_alpha = self.format.has_alpha();
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let block_index = (y as usize / 4) * blocks_x + x as usize / 4;
            let block = &self.data[block_index * DXT1_BLOCK_LEN..(block_index + 1) * DXT1_BLOCK_LEN];
            decode_texel(block, x % 4, y % 4, has_alpha)
        })
    }

    /// Serialize as a DDS file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mip_count = self.levels.len() as u32;
        let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT | DDSD_LINEARSIZE;
        let mut caps = DDSCAPS_TEXTURE;
        if mip_count > 1 {
            flags |= DDSD_MIPMAPCOUNT;
            caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
        }
        let mut pixel_flags = DDPF_FOURCC;
        if self.format.has_alpha() {
            pixel_flags |= DDPF_ALPHAPIXELS;
        }

        let mut bytes = Vec::with_capacity(DDS_PREAMBLE_LEN + self.data.len());
        bytes.extend_from_slice(&DDS_MAGIC);
        for value in [
            HEADER_SIZE,
            flags,
            self.height,
            self.width,
            self.levels[0].len as u32,
            0,
            mip_count,
        ] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&[0u8; 44]);
        bytes.extend_from_slice(&PIXEL_FORMAT_SIZE.to_le_bytes());
        bytes.extend_from_slice(&pixel_flags.to_le_bytes());
        bytes.extend_from_slice(b"DXT1");
        bytes.extend_from_slice(&[0u8; 20]);
        bytes.extend_from_slice(&caps.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

fn is_flippable(height: u32) -> bool {
    height <= 2 || height % 4 == 0
}

fn flip_dxt1_level(bytes: &mut [u8], width: u32, height: u32) -> Result<(), DdsError> {
    match height {
        1 => Ok(()),
        2 => {
            for block in bytes.chunks_exact_mut(DXT1_BLOCK_LEN) {
                block.swap(4, 5);
            }
            Ok(())
        }
        h if h % 4 == 0 => {
            let row_len = blocks(width) * DXT1_BLOCK_LEN;
            let rows = blocks(h);
            for top in 0..rows / 2 {
                let bottom = rows - 1 - top;
                let (upper, lower) = bytes.split_at_mut(bottom * row_len);
                upper[top * row_len..(top + 1) * row_len].swap_with_slice(&mut lower[..row_len]);
            }
            for block in bytes.chunks_exact_mut(DXT1_BLOCK_LEN) {
                block[4..8].reverse();
            }
            Ok(())
        }
        h => Err(DdsError::UnflippableHeight(h)),
    }
}

fn rgb565(value: u16) -> [u8; 3] {
    let r = ((value >> 11) & 0x1F) as u8;
    let g = ((value >> 5) & 0x3F) as u8;
    let b = (value & 0x1F) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

fn mix(a: [u8; 3], b: [u8; 3], wa: u16, wb: u16) -> [u8; 3] {
    let total = wa + wb;
    [0, 1, 2].map(|i| ((a[i] as u16 * wa + b[i] as u16 * wb) / total) as u8)
}

fn decode_texel(block: &[u8], x: u32, y: u32, has_alpha: bool) -> Rgba<u8> {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let index = (block[4 + y as usize] >> (2 * x)) & 0x3;

    let (p0, p1) = (rgb565(c0), rgb565(c1));
    let (rgb, alpha) = match (c0 > c1, index) {
        (_, 0) => (p0, 255),
        (_, 1) => (p1, 255),
        (true, 2) => (mix(p0, p1, 2, 1), 255),
        (true, _) => (mix(p0, p1, 1, 2), 255),
        (false, 2) => (mix(p0, p1, 1, 1), 255),
        (false, _) => ([0, 0, 0], if has_alpha { 0 } else { 255 }),
    };
    Rgba([rgb[0], rgb[1], rgb[2], alpha])
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: u16 = 0xF800;
    const BLUE: u16 = 0x001F;

    /// Block with endpoints `c0`, `c1` and one index byte per row.
    fn block(c0: u16, c1: u16, rows: [u8; 4]) -> [u8; 8] {
        let mut b = [0u8; 8];
        b[0..2].copy_from_slice(&c0.to_le_bytes());
        b[2..4].copy_from_slice(&c1.to_le_bytes());
        b[4..8].copy_from_slice(&rows);
        b
    }

    /// 4x8 surface: top block all c0 (red), bottom block all c1 (blue).
    fn two_block_surface(format: PixelFormat) -> DdsSurface {
        let mut data = block(RED, BLUE, [0x00; 4]).to_vec();
        data.extend_from_slice(&block(RED, BLUE, [0x55; 4]));
        DdsSurface::from_parts(4, 8, format, 1, data).unwrap()
    }

    #[test]
    fn test_parse_round_trip_preserves_format() {
        for format in [PixelFormat::Dxt1Rgb, PixelFormat::Dxt1Rgba] {
            let surface = two_block_surface(format);
            let parsed = DdsSurface::parse(&surface.to_bytes()).unwrap();
            assert_eq!(parsed, surface);
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = two_block_surface(PixelFormat::Dxt1Rgb).to_bytes();
        assert_eq!(bytes.len(), DDS_PREAMBLE_LEN + 16);
        assert_eq!(&bytes[0..4], b"DDS ");
        assert_eq!(u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]), 8);
        assert_eq!(u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]), 4);
        assert_eq!(&bytes[84..88], b"DXT1");
    }

    #[test]
    fn test_parse_rejects_other_fourcc() {
        let mut bytes = two_block_surface(PixelFormat::Dxt1Rgb).to_bytes();
        bytes[84..88].copy_from_slice(b"DXT5");
        assert_eq!(
            DdsSurface::parse(&bytes).unwrap_err(),
            DdsError::UnsupportedFourCc("DXT5".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_bad_magic_and_truncation() {
        let mut bytes = two_block_surface(PixelFormat::Dxt1Rgb).to_bytes();
        assert!(matches!(
            DdsSurface::parse(&bytes[..bytes.len() - 1]),
            Err(DdsError::Truncated { needed: 16, actual: 15 })
        ));
        assert!(matches!(
            DdsSurface::parse(&bytes[..50]),
            Err(DdsError::Truncated { needed: 128, actual: 50 })
        ));
        bytes[0] = b'X';
        assert!(matches!(DdsSurface::parse(&bytes), Err(DdsError::BadMagic(_))));
        assert!(DdsSurface::parse(&[]).is_err());
    }

    #[test]
    fn test_mip_chain_sizes() {
        let levels = mip_chain(512, 512, 10);
        assert_eq!(levels[0].len, 128 * 128 * 8);
        assert_eq!(levels[7].width, 4);
        assert_eq!(levels[8].width, 2);
        assert_eq!(levels[8].len, 8);
        assert_eq!(levels[9].offset, levels[8].offset + 8);
    }

    #[test]
    fn test_mip_count_is_capped() {
        let header = DdsHeader {
            flags: DDSD_MIPMAPCOUNT,
            height: 8,
            width: 8,
            mipmap_count: 30,
            pixel_flags: DDPF_FOURCC,
            fourcc: *b"DXT1",
        };
        assert_eq!(header.mip_count(), 4);
        assert_eq!(DdsHeader { flags: 0, ..header }.mip_count(), 1);
    }

    #[test]
    fn test_flip_swaps_blocks_and_rows() {
        let mut data = block(RED, BLUE, [0x00, 0x01, 0x02, 0x03]).to_vec();
        data.extend_from_slice(&block(BLUE, RED, [0x10, 0x11, 0x12, 0x13]));
        let mut surface = DdsSurface::from_parts(4, 8, PixelFormat::Dxt1Rgb, 1, data).unwrap();

        surface.flip_vertical().unwrap();

        let mut expected = block(BLUE, RED, [0x13, 0x12, 0x11, 0x10]).to_vec();
        expected.extend_from_slice(&block(RED, BLUE, [0x03, 0x02, 0x01, 0x00]));
        assert_eq!(surface.data(), expected.as_slice());
    }

    #[test]
    fn test_flip_matches_decoded_image() {
        let mut surface = two_block_surface(PixelFormat::Dxt1Rgb);
        let before = surface.decode_rgba();
        surface.flip_vertical().unwrap();
        let after = surface.decode_rgba();

        assert_eq!(after, image::imageops::flip_vertical(&before));
        assert_eq!(after.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(after.get_pixel(3, 7).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_flip_small_levels() {
        let data = block(RED, BLUE, [0x01, 0x02, 0x00, 0x00]).to_vec();
        let mut surface = DdsSurface::from_parts(2, 2, PixelFormat::Dxt1Rgb, 1, data).unwrap();
        surface.flip_vertical().unwrap();
        assert_eq!(&surface.data()[4..8], &[0x02, 0x01, 0x00, 0x00]);

        let data = vec![0u8; 8];
        let mut surface = DdsSurface::from_parts(4, 3, PixelFormat::Dxt1Rgb, 1, data).unwrap();
        assert_eq!(surface.flip_vertical(), Err(DdsError::UnflippableHeight(3)));
    }

    #[test]
    fn test_flip_cuts_chain_at_odd_height() {
        // 8x12 halves to 4x6, which splits a block row.
        let len = dxt1_level_len(8, 12) + dxt1_level_len(4, 6) + dxt1_level_len(2, 3);
        let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
        let mut surface = DdsSurface::from_parts(8, 12, PixelFormat::Dxt1Rgb, 3, data).unwrap();
        let before = surface.decode_rgba();

        surface.flip_vertical().unwrap();
        assert_eq!(surface.levels().len(), 1);
        assert_eq!(surface.data().len(), dxt1_level_len(8, 12));
        assert_eq!(surface.decode_rgba(), image::imageops::flip_vertical(&before));
    }

    #[test]
    fn test_three_color_block_alpha_depends_on_format() {
        // c0 <= c1 selects the 3-color palette; index 3 is the transparent entry.
        let data = block(BLUE, RED, [0xFF; 4]).to_vec();
        let rgb = DdsSurface::from_parts(4, 4, PixelFormat::Dxt1Rgb, 1, data.clone()).unwrap();
        let rgba = DdsSurface::from_parts(4, 4, PixelFormat::Dxt1Rgba, 1, data).unwrap();

        assert_eq!(rgb.decode_rgba().get_pixel(1, 1).0, [0, 0, 0, 255]);
        assert_eq!(rgba.decode_rgba().get_pixel(1, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_four_color_interpolation() {
        // Index 2 is 2/3 c0 + 1/3 c1.
        let data = block(RED, BLUE, [0xAA; 4]).to_vec();
        let surface = DdsSurface::from_parts(4, 4, PixelFormat::Dxt1Rgb, 1, data).unwrap();
        assert_eq!(surface.decode_rgba().get_pixel(0, 0).0, [170, 0, 85, 255]);
    }
}

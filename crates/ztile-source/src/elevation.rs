//! Elevation tile decoding.
//!
//! ## Payload Format
//!
//! A 100-byte packed little-endian header followed by an optional data block:
//!
//! | Field          | Size (bytes) | Description                                       |
//! |----------------|--------------|---------------------------------------------------|
//! | id             | 4            | `'E' 'L' 'E' 1`                                   |
//! | hdrsize        | 4            | Header size; the data block starts here           |
//! | dtype          | 4            | `0` flat (no data), `8` uint8, `-16` int16        |
//! | xgrd, ygrd     | 2 x 4        | Grid size, 259 x 259                              |
//! | xpad, ypad     | 2 x 4        | Border width, 1 x 1                               |
//! | scale, offset  | 2 x 8        | `elevation = raw * scale + offset`                |
//! | lat/lng range  | 4 x 8        | Tile extent in radians                            |
//! | emin/emax/emean| 3 x 8        | Elevation statistics in meters                    |
//!
//! The data block is row-major with 259 samples per row. The one-sample border
//! is dropped, leaving a 256 x 256 raster.

use crate::decoder::{TextureFormat, TileDecoder};
use crate::DecodeError;
use image::{ImageBuffer, Luma};

/// Width and height of a decoded elevation raster.
pub const TILE_SIZE: usize = 256;

/// Width and height of the stored grid, including the border.
pub const PADDED_GRID: i32 = 259;

/// Size of the packed header.
pub const HEADER_LEN: usize = 100;

const GRID_SAMPLES: usize = (PADDED_GRID * PADDED_GRID) as usize;

/// Storage type of an elevation data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationDataType {
    /// No data block; the tile is at its mean elevation.
    Flat,
    /// Unsigned 8-bit samples.
    U8,
    /// Signed 16-bit samples.
    I16,
}

impl ElevationDataType {
    /// Map a header type code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ElevationDataType::Flat),
            8 => Some(ElevationDataType::U8),
            -16 => Some(ElevationDataType::I16),
            _ => None,
        }
    }

    /// Header type code.
    pub fn code(&self) -> i32 {
        match self {
            ElevationDataType::Flat => 0,
            ElevationDataType::U8 => 8,
            ElevationDataType::I16 => -16,
        }
    }

    /// Bytes per stored sample.
    pub fn sample_size(&self) -> usize {
        match self {
            ElevationDataType::Flat => 0,
            ElevationDataType::U8 => 1,
            ElevationDataType::I16 => 2,
        }
    }
}

/// Elevation tile header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationHeader {
    /// Format tag and version.
    pub id: [u8; 4],
    /// Header size in bytes; offset of the data block.
    pub header_size: i32,
    /// Data type code.
    pub data_type: i32,
    /// Grid width.
    pub grid_width: i32,
    /// Grid height.
    pub grid_height: i32,
    /// Horizontal border width.
    pub pad_x: i32,
    /// Vertical border width.
    pub pad_y: i32,
    /// Sample scale.
    pub scale: f64,
    /// Sample offset in meters.
    pub offset: f64,
    /// Southern edge [rad].
    pub lat_min: f64,
    /// Northern edge [rad].
    pub lat_max: f64,
    /// Western edge [rad].
    pub lng_min: f64,
    /// Eastern edge [rad].
    pub lng_max: f64,
    /// Minimum elevation [m].
    pub elev_min: f64,
    /// Maximum elevation [m].
    pub elev_max: f64,
    /// Mean elevation [m].
    pub elev_mean: f64,
}

impl Default for ElevationHeader {
    fn default() -> Self {
        Self {
            id: [b'E', b'L', b'E', 1],
            header_size: HEADER_LEN as i32,
            data_type: ElevationDataType::Flat.code(),
            grid_width: PADDED_GRID,
            grid_height: PADDED_GRID,
            pad_x: 1,
            pad_y: 1,
            scale: 1.0,
            offset: 0.0,
            lat_min: 0.0,
            lat_max: 0.0,
            lng_min: 0.0,
            lng_max: 0.0,
            elev_min: 0.0,
            elev_max: 0.0,
            elev_mean: 0.0,
        }
    }
}

impl ElevationHeader {
    /// Decode a header from the start of a buffer.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::too_short(HEADER_LEN, bytes.len()));
        }

        let i32_at = |at: usize| i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let f64_at = |at: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[at..at + 8]);
            f64::from_le_bytes(raw)
        };

        Ok(Self {
            id: [bytes[0], bytes[1], bytes[2], bytes[3]],
            header_size: i32_at(4),
            data_type: i32_at(8),
            grid_width: i32_at(12),
            grid_height: i32_at(16),
            pad_x: i32_at(20),
            pad_y: i32_at(24),
            scale: f64_at(28),
            offset: f64_at(36),
            lat_min: f64_at(44),
            lat_max: f64_at(52),
            lng_min: f64_at(60),
            lng_max: f64_at(68),
            elev_min: f64_at(76),
            elev_max: f64_at(84),
            elev_mean: f64_at(92),
        })
    }

    /// Encode the header in its packed form.
    pub fn to_le_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.id);
        let ints = [
            self.header_size,
            self.data_type,
            self.grid_width,
            self.grid_height,
            self.pad_x,
            self.pad_y,
        ];
        for (i, v) in ints.iter().enumerate() {
            out[4 + i * 4..8 + i * 4].copy_from_slice(&v.to_le_bytes());
        }
        let floats = [
            self.scale,
            self.offset,
            self.lat_min,
            self.lat_max,
            self.lng_min,
            self.lng_max,
            self.elev_min,
            self.elev_max,
            self.elev_mean,
        ];
        for (i, v) in floats.iter().enumerate() {
            out[28 + i * 8..36 + i * 8].copy_from_slice(&v.to_le_bytes());
        }
        out
    }
}

/// 256 x 256 height raster. Each sample is `sea_level + elevation_m`, clamped to `u16`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationRaster {
    samples: Vec<u16>,
    header: ElevationHeader,
}

impl ElevationRaster {
    /// Raster width in samples.
    pub fn width(&self) -> u32 {
        TILE_SIZE as u32
    }

    /// Raster height in samples.
    pub fn height(&self) -> u32 {
        TILE_SIZE as u32
    }

    /// Texel format for upload.
    pub fn texture_format(&self) -> TextureFormat {
        TextureFormat::R16Unorm
    }

    /// Sample at (x, y), row-major from the first stored row.
    pub fn sample(&self, x: u32, y: u32) -> Option<u16> {
        if x as usize >= TILE_SIZE || y as usize >= TILE_SIZE {
            return None;
        }
        self.samples.get(y as usize * TILE_SIZE + x as usize).copied()
    }

    /// All samples, row-major.
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Header the raster was decoded from.
    pub fn header(&self) -> &ElevationHeader {
        &self.header
    }

    /// Smallest and largest sample.
    pub fn sample_range(&self) -> (u16, u16) {
        self.samples
            .iter()
            .fold((u16::MAX, u16::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)))
    }

    /// Copy into a 16-bit grayscale image.
    pub fn to_image(&self) -> ImageBuffer<Luma<u16>, Vec<u16>> {
        ImageBuffer::from_fn(self.width(), self.height(), |x, y| {
            Luma([self.samples[y as usize * TILE_SIZE + x as usize]])
        })
    }
}

/// Decoder for elevation tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElevationDecoder {
    sea_level: u16,
}

impl ElevationDecoder {
    /// Create a decoder using `sea_level` as the zero-elevation sample value.
    pub fn new(sea_level: u16) -> Self {
        Self { sea_level }
    }

    /// Zero-elevation sample value.
    pub fn sea_level(&self) -> u16 {
        self.sea_level
    }

    fn encode(&self, elevation: i64) -> u16 {
        (self.sea_level as i64)
            .saturating_add(elevation)
            .clamp(0, u16::MAX as i64) as u16
    }

    fn decode_grid<F>(&self, header: &ElevationHeader, bytes: &[u8], data_type: ElevationDataType, read: F) -> Result<Vec<u16>, DecodeError>
    where
        F: Fn(&[u8], usize) -> i64,
    {
        let data_start = header.header_size as usize;
        let needed = data_start.saturating_add(GRID_SAMPLES * data_type.sample_size());
        if bytes.len() < needed {
            return Err(DecodeError::too_short(needed, bytes.len()));
        }

        let data = &bytes[data_start..needed];
        let offset = header.offset.trunc() as i64;
        let stride = PADDED_GRID as usize;

        let mut samples = Vec::with_capacity(TILE_SIZE * TILE_SIZE);
        for y in 1..=TILE_SIZE {
            for x in 1..=TILE_SIZE {
                samples.push(self.encode(read(data, y * stride + x).saturating_add(offset)));
            }
        }
        Ok(samples)
    }
}

impl TileDecoder for ElevationDecoder {
    type Raster = ElevationRaster;

    fn decode(&self, bytes: &[u8]) -> Result<ElevationRaster, DecodeError> {
        let header = ElevationHeader::parse(bytes)?;

        if header.grid_width != PADDED_GRID || header.grid_height != PADDED_GRID {
            return Err(DecodeError::GridMismatch {
                width: header.grid_width,
                height: header.grid_height,
                expected: PADDED_GRID,
            });
        }
        if header.header_size < 0 {
            return Err(DecodeError::NegativeHeaderSize(header.header_size));
        }

        let data_type = ElevationDataType::from_code(header.data_type)
            .ok_or(DecodeError::UnsupportedDataType(header.data_type))?;

        let samples = match data_type {
            ElevationDataType::Flat => {
                let value = self.encode(header.elev_mean.trunc() as i64);
                vec![value; TILE_SIZE * TILE_SIZE]
            }
            ElevationDataType::U8 => {
                self.decode_grid(&header, bytes, data_type, |data, i| data[i] as i64)?
            }
            ElevationDataType::I16 => self.decode_grid(&header, bytes, data_type, |data, i| {
                i16::from_le_bytes([data[i * 2], data[i * 2 + 1]]) as i64
            })?,
        };

        Ok(ElevationRaster { samples, header })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SEA_LEVEL;
    use rand::{Rng, SeedableRng};

    const B: u16 = DEFAULT_SEA_LEVEL;

    fn payload(header: ElevationHeader, data: &[u8]) -> Vec<u8> {
        let mut bytes = header.to_le_bytes().to_vec();
        bytes.resize(header.header_size as usize, 0);
        bytes.extend_from_slice(data);
        bytes
    }

    fn typed(data_type: ElevationDataType, offset: f64) -> ElevationHeader {
        ElevationHeader {
            data_type: data_type.code(),
            offset,
            ..ElevationHeader::default()
        }
    }

    fn i16_grid(value: i16) -> Vec<u8> {
        value.to_le_bytes().repeat(GRID_SAMPLES)
    }

    fn decoder() -> ElevationDecoder {
        ElevationDecoder::new(B)
    }

    #[test]
    fn test_header_round_trip_offsets() {
        let header = ElevationHeader {
            data_type: -16,
            offset: -12.5,
            lat_min: 0.25,
            elev_mean: 1234.0,
            ..ElevationHeader::default()
        };
        let bytes = header.to_le_bytes();
        assert_eq!(&bytes[8..12], &(-16i32).to_le_bytes());
        assert_eq!(&bytes[92..100], &1234.0f64.to_le_bytes());
        assert_eq!(ElevationHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_flat_tile_uses_mean_elevation() {
        let header = ElevationHeader {
            elev_mean: 1000.0,
            ..ElevationHeader::default()
        };
        let raster = decoder().decode(&payload(header, &[])).unwrap();
        assert_eq!(raster.samples().len(), TILE_SIZE * TILE_SIZE);
        assert!(raster.samples().iter().all(|&s| s == B + 1000));
        assert_eq!(raster.texture_format(), TextureFormat::R16Unorm);
    }

    #[test]
    fn test_flat_tile_truncates_mean() {
        let header = ElevationHeader {
            elev_mean: -20.9,
            ..ElevationHeader::default()
        };
        let raster = decoder().decode(&payload(header, &[])).unwrap();
        assert_eq!(raster.sample(17, 200), Some(B - 20));
    }

    #[test]
    fn test_u8_tile() {
        let data = vec![200u8; GRID_SAMPLES];
        let raster = decoder()
            .decode(&payload(typed(ElevationDataType::U8, 0.0), &data))
            .unwrap();
        assert!(raster.samples().iter().all(|&s| s == B + 200));
    }

    #[test]
    fn test_u8_tile_applies_truncated_offset() {
        let data = vec![10u8; GRID_SAMPLES];
        let raster = decoder()
            .decode(&payload(typed(ElevationDataType::U8, 12.7), &data))
            .unwrap();
        assert_eq!(raster.sample(0, 0), Some(B + 22));

        let raster = decoder()
            .decode(&payload(typed(ElevationDataType::U8, -3.9), &data))
            .unwrap();
        assert_eq!(raster.sample(255, 255), Some(B + 7));
    }

    #[test]
    fn test_border_is_discarded() {
        let stride = PADDED_GRID as usize;
        let mut data = vec![0u8; GRID_SAMPLES];
        for y in 1..=TILE_SIZE {
            for x in 1..=TILE_SIZE {
                data[y * stride + x] = ((x + y) % 256) as u8;
            }
        }
        let raster = decoder()
            .decode(&payload(typed(ElevationDataType::U8, 0.0), &data))
            .unwrap();

        assert_eq!(raster.sample(0, 0), Some(B + 2));
        assert_eq!(raster.sample(10, 3), Some(B + 15));
        assert_eq!(raster.sample(255, 255), Some(B + ((256 + 256) % 256) as u16));
        assert_eq!(raster.sample(256, 0), None);
    }

    #[test]
    fn test_i16_tile() {
        let raster = decoder()
            .decode(&payload(typed(ElevationDataType::I16, 0.0), &i16_grid(-450)))
            .unwrap();
        assert!(raster.samples().iter().all(|&s| s == B - 450));
    }

    #[test]
    fn test_i16_clamps_instead_of_wrapping() {
        let high = decoder()
            .decode(&payload(typed(ElevationDataType::I16, 10.0), &i16_grid(i16::MAX)))
            .unwrap();
        assert!(high.samples().iter().all(|&s| s == u16::MAX));

        let low = decoder()
            .decode(&payload(typed(ElevationDataType::I16, 0.0), &i16_grid(i16::MIN)))
            .unwrap();
        assert!(low.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_rejects_unpadded_grid() {
        let header = ElevationHeader {
            grid_width: 256,
            grid_height: 256,
            ..typed(ElevationDataType::U8, 0.0)
        };
        let err = decoder()
            .decode(&payload(header, &vec![0u8; GRID_SAMPLES]))
            .unwrap_err();
        assert!(matches!(err, DecodeError::GridMismatch { width: 256, height: 256, .. }));
    }

    #[test]
    fn test_rejects_single_bad_dimension() {
        let header = ElevationHeader {
            grid_height: 256,
            ..ElevationHeader::default()
        };
        assert!(decoder().decode(&payload(header, &[])).is_err());
    }

    #[test]
    fn test_rejects_short_buffers() {
        let err = decoder().decode(&[0u8; 40]).unwrap_err();
        assert_eq!(err, DecodeError::too_short(HEADER_LEN, 40));

        let data = vec![1u8; GRID_SAMPLES * 2 - 1];
        let err = decoder()
            .decode(&payload(typed(ElevationDataType::I16, 0.0), &data))
            .unwrap_err();
        assert!(matches!(err, DecodeError::BufferTooShort { .. }));
    }

    #[test]
    fn test_accepts_exact_and_oversized_buffers() {
        let exact = payload(typed(ElevationDataType::U8, 0.0), &vec![5u8; GRID_SAMPLES]);
        assert_eq!(exact.len(), HEADER_LEN + GRID_SAMPLES);
        assert!(decoder().decode(&exact).is_ok());

        let mut oversized = exact.clone();
        oversized.extend_from_slice(&[0u8; 64]);
        assert_eq!(decoder().decode(&oversized).unwrap(), decoder().decode(&exact).unwrap());
    }

    #[test]
    fn test_data_block_follows_declared_header_size() {
        let header = ElevationHeader {
            header_size: 128,
            ..typed(ElevationDataType::U8, 0.0)
        };
        let raster = decoder()
            .decode(&payload(header, &vec![42u8; GRID_SAMPLES]))
            .unwrap();
        assert!(raster.samples().iter().all(|&s| s == B + 42));
    }

    #[test]
    fn test_rejects_unsupported_data_type() {
        let header = ElevationHeader {
            data_type: 16,
            ..ElevationHeader::default()
        };
        let err = decoder()
            .decode(&payload(header, &vec![0u8; GRID_SAMPLES * 2]))
            .unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedDataType(16));
    }

    #[test]
    fn test_rejects_negative_header_size() {
        let mut bytes = payload(typed(ElevationDataType::U8, 0.0), &vec![0u8; GRID_SAMPLES]);
        bytes[4..8].copy_from_slice(&(-4i32).to_le_bytes());
        assert_eq!(
            decoder().decode(&bytes).unwrap_err(),
            DecodeError::NegativeHeaderSize(-4)
        );
    }

    #[test]
    fn test_decode_is_deterministic() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let data: Vec<u8> = (0..GRID_SAMPLES * 2).map(|_| rng.gen()).collect();
        let bytes = payload(typed(ElevationDataType::I16, rng.gen_range(-500.0..500.0)), &data);

        let first = decoder().decode(&bytes).unwrap();
        let second = decoder().decode(&bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_to_image() {
        let header = ElevationHeader {
            elev_mean: 12.0,
            ..ElevationHeader::default()
        };
        let raster = decoder().decode(&payload(header, &[])).unwrap();
        let image = raster.to_image();
        assert_eq!(image.dimensions(), (256, 256));
        assert_eq!(image.get_pixel(100, 100).0, [B + 12]);
        assert_eq!(raster.sample_range(), (B + 12, B + 12));
    }
}

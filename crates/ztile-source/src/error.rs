//! Error types for tile decoding and configuration.

use thiserror::Error;

/// Errors that can occur when decoding a tile payload.
///
/// These never escape [`TileSource`](crate::TileSource): a payload that fails
/// to decode is reported to callers as a missing tile.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer is shorter than a header or the data block it declares.
    #[error("Buffer too short: {actual} bytes (need {needed})")]
    BufferTooShort {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Elevation grid dimensions are not the padded tile size.
    #[error("Unexpected elevation grid {width}x{height} (expected {expected}x{expected})")]
    GridMismatch {
        /// Declared grid width.
        width: i32,
        /// Declared grid height.
        height: i32,
        /// Expected size of both dimensions.
        expected: i32,
    },

    /// Elevation header declares a negative header size.
    #[error("Negative header size: {0}")]
    NegativeHeaderSize(i32),

    /// Elevation data type code is not flat, uint8 or int16.
    #[error("Unsupported elevation data type: {0}")]
    UnsupportedDataType(i32),

    /// Image container could not be parsed.
    #[error("DDS error: {0}")]
    Dds(#[from] DdsError),
}

/// Errors that can occur when parsing or transforming a DDS container.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DdsError {
    /// Missing `"DDS "` magic.
    #[error("Invalid DDS magic: {0:02x?}")]
    BadMagic([u8; 4]),

    /// Header or pixel format size field is wrong.
    #[error("Invalid DDS {structure} size: {size}")]
    InvalidHeaderSize {
        /// Which structure carried the bad size.
        structure: &'static str,
        /// Declared size.
        size: u32,
    },

    /// Pixel format is not DXT1.
    #[error("Unsupported DDS pixel format: {0}")]
    UnsupportedFourCc(String),

    /// Zero width or height.
    #[error("Invalid DDS dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// Payload is shorter than the mip chain requires.
    #[error("DDS payload truncated: {actual} bytes (need {needed})")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        actual: usize,
    },

    /// A mip level cannot be flipped block-wise.
    #[error("Cannot flip mip level with height {0}")]
    UnflippableHeight(u32),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl DecodeError {
    /// Create a buffer-too-short error.
    pub fn too_short(needed: usize, actual: usize) -> Self {
        DecodeError::BufferTooShort { needed, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError::too_short(100, 12);
        assert_eq!(err.to_string(), "Buffer too short: 12 bytes (need 100)");

        let err = DecodeError::GridMismatch {
            width: 256,
            height: 256,
            expected: 259,
        };
        assert!(err.to_string().contains("256x256"));

        let err: DecodeError = DdsError::UnsupportedFourCc("DXT5".to_string()).into();
        assert!(err.to_string().contains("DXT5"));
    }
}

//! # ztile-source
//!
//! Quadtree tile resolution over Orbiter-style tree archives.
//!
//! A [`TileSource`] maps [`QuadTreeTileKey`]s (level 0 is the whole body) onto
//! an archive's native levels, reads the payload under a lock and decodes it
//! into a raster:
//!
//! - [`ElevationTileSource`]: 256x256 `u16` height samples ([`ElevationRaster`])
//! - [`ImageTileSource`]: DXT1 surface or land-mask tiles ([`ImageRaster`])
//!
//! When a tile is missing, [`TileSource::highest_available_level`] finds the
//! finest ancestor the archive does hold.
//!
//! ## Example
//!
//! ```no_run
//! use ztile_source::{ImageTileSource, QuadTreeTileKey, TileSourceConfig};
//!
//! let config = TileSourceConfig::load("ztile.yaml")?;
//! let mask = ImageTileSource::open_land_mask("Earth", &config);
//!
//! let key = QuadTreeTileKey::new(6, 40, 21);
//! if let Some(raster) = mask.create_image(key) {
//!     raster.to_rgba().save("mask.png")?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Failure Model
//!
//! Nothing here returns an error once a source exists. Missing archives,
//! missing tiles, read failures and undecodable payloads all surface as
//! `None` and are logged through `tracing`.

pub mod config;
pub mod dds;
pub mod decoder;
pub mod elevation;
mod error;
pub mod imagery;
pub mod key;
pub mod source;

pub use config::{TileSourceConfig, DEFAULT_LEVEL_OFFSET, DEFAULT_SEA_LEVEL};
pub use dds::{DdsSurface, PixelFormat};
pub use decoder::{TextureFormat, TileDecoder};
pub use elevation::{ElevationDataType, ElevationDecoder, ElevationHeader, ElevationRaster};
pub use error::{ConfigError, DdsError, DecodeError};
pub use imagery::{ImageDecoder, ImageRaster, ImageVariant};
pub use key::QuadTreeTileKey;
pub use source::{ElevationTileSource, ImageTileSource, TileSource};

pub use ztile_archive::LayerKind;

//! Quadtree tile resolution over a single archive.

use crate::config::TileSourceConfig;
use crate::decoder::TileDecoder;
use crate::elevation::ElevationDecoder;
use crate::imagery::ImageDecoder;
use crate::key::QuadTreeTileKey;
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, trace, warn};
use ztile_archive::{child_slot, LayerKind, TileArchive, TreeArchive, ROOT_LEVEL};

/// Resolves quadtree keys to decoded rasters from one archive layer.
///
/// The archive sits behind a single mutex that is held only while reading a
/// payload or querying the table of contents; decoding runs outside it, so
/// many threads can share one source.
///
/// A source whose archive failed to open, or opened with an empty table of
/// contents, is permanently unavailable: every query answers "absent"
/// without touching the archive.
///
/// # Example
///
/// ```no_run
/// use ztile_source::{ElevationTileSource, QuadTreeTileKey, TileSourceConfig};
///
/// let source = ElevationTileSource::open("Earth", &TileSourceConfig::default());
/// let key = QuadTreeTileKey::new(3, 5, 2);
/// match source.create_image(key) {
///     Some(raster) => println!("range {:?}", raster.sample_range()),
///     None => println!("best ancestor {:?}", source.highest_available_level(key)),
/// }
/// ```
pub struct TileSource<D> {
    archive: Option<Mutex<Box<dyn TileArchive>>>,
    decoder: D,
    layer: LayerKind,
    level_offset: u32,
}

/// Elevation tiles (`Elev` layer).
pub type ElevationTileSource = TileSource<ElevationDecoder>;

/// Surface or land-mask image tiles.
pub type ImageTileSource = TileSource<ImageDecoder>;

impl<D: TileDecoder> TileSource<D> {
    /// Wrap an opened archive.
    pub fn new<A: TileArchive + 'static>(archive: A, decoder: D, config: &TileSourceConfig) -> Self {
        let layer = archive.layer();
        if archive.node_count() == 0 {
            warn!(%layer, "Archive has an empty table of contents; tile source unavailable");
            return Self::unavailable(layer, decoder, config);
        }
        Self {
            archive: Some(Mutex::new(Box::new(archive))),
            decoder,
            layer,
            level_offset: config.level_offset,
        }
    }

    /// A source with no archive. Every query returns absence.
    pub fn unavailable(layer: LayerKind, decoder: D, config: &TileSourceConfig) -> Self {
        Self {
            archive: None,
            decoder,
            layer,
            level_offset: config.level_offset,
        }
    }

    fn open_layer<P: AsRef<Path>>(directory: P, layer: LayerKind, decoder: D, config: &TileSourceConfig) -> Self {
        let directory = directory.as_ref();
        match TreeArchive::open(directory, layer) {
            Ok(archive) => Self::new(archive, decoder, config),
            Err(e) => {
                warn!(%layer, directory = %directory.display(), error = %e, "Failed to open tile archive");
                Self::unavailable(layer, decoder, config)
            }
        }
    }

    /// True if the archive opened with a non-empty table of contents.
    pub fn is_available(&self) -> bool {
        self.archive.is_some()
    }

    /// Archive-native level of quadtree level 0.
    pub fn level_offset(&self) -> u32 {
        self.level_offset
    }

    /// Archive layer.
    pub fn layer(&self) -> LayerKind {
        self.layer
    }

    /// Decoder used for payloads.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    fn native_level(&self, level: u32) -> Option<u32> {
        level.checked_add(self.level_offset)
    }

    /// Read and decode the tile at `key`.
    ///
    /// Returns `None` if the tile is absent, the archive is unavailable or
    /// fails to read, or the payload does not decode.
    pub fn create_image(&self, key: QuadTreeTileKey) -> Option<D::Raster> {
        let archive = self.archive.as_ref()?;
        let level = self.native_level(key.level)?;

        let read = archive.lock().read_raw_tile(level, key.y, key.x);
        let raw = match read {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => {
                trace!(layer = %self.layer, %key, "Tile not present");
                return None;
            }
            Err(e) => {
                warn!(layer = %self.layer, %key, error = %e, "Failed to read tile");
                return None;
            }
        };

        match self.decoder.decode(&raw) {
            Ok(raster) => Some(raster),
            Err(e) => {
                debug!(layer = %self.layer, %key, bytes = raw.len(), error = %e, "Failed to decode tile");
                None
            }
        }
    }

    /// True if the tile at `key` exists and has at least one child.
    pub fn has_any_children(&self, key: QuadTreeTileKey) -> bool {
        let (Some(archive), Some(level)) = (self.archive.as_ref(), self.native_level(key.level)) else {
            return false;
        };
        let archive = archive.lock();
        archive
            .index_of(level, key.y, key.x)
            .and_then(|index| archive.child_slots(index))
            .is_some_and(|slots| slots.any())
    }

    /// Finest tile present along the ancestry of `key`, `key` included.
    ///
    /// The search starts at quadtree level 0 and walks down the ancestry.
    /// Levels above the hemisphere roots are looked up directly and skipped
    /// when missing; below the roots it descends through child slots and
    /// stops at the first missing child.
    pub fn highest_available_level(&self, key: QuadTreeTileKey) -> Option<QuadTreeTileKey> {
        let archive = self.archive.as_ref()?;
        self.native_level(key.level)?;

        let archive = archive.lock();
        let mut best = None;
        let mut index = None;

        for level in 0..=key.level {
            let Some(step) = key.ancestor_at(level) else {
                break;
            };
            let native = level + self.level_offset;
            let found = match index {
                Some(parent) if native > ROOT_LEVEL => archive
                    .child_slots(parent)
                    .and_then(|slots| slots.get(child_slot(step.y, step.x))),
                _ => archive.index_of(native, step.y, step.x),
            };
            match found {
                Some(found) => {
                    index = Some(found);
                    best = Some(step);
                }
                None if native < ROOT_LEVEL => continue,
                None => break,
            }
        }

        best
    }
}

impl ElevationTileSource {
    /// Open the elevation layer under a planet directory.
    pub fn open<P: AsRef<Path>>(directory: P, config: &TileSourceConfig) -> Self {
        let source = Self::open_layer(directory, LayerKind::Elevation, ElevationDecoder::new(config.sea_level), config);
        if source.is_available() {
            info!(sea_level = config.sea_level, "Elevation tile source ready");
        }
        source
    }
}

impl ImageTileSource {
    /// Open the surface color layer under a planet directory.
    pub fn open_surface<P: AsRef<Path>>(directory: P, config: &TileSourceConfig) -> Self {
        Self::open_layer(directory, LayerKind::Surface, ImageDecoder::surface(), config)
    }

    /// Open the land/water mask layer under a planet directory.
    pub fn open_land_mask<P: AsRef<Path>>(directory: P, config: &TileSourceConfig) -> Self {
        Self::open_layer(directory, LayerKind::LandMask, ImageDecoder::land_mask(), config)
    }
}

impl<D: fmt::Debug> fmt::Debug for TileSource<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileSource")
            .field("layer", &self.layer)
            .field("available", &self.archive.is_some())
            .field("level_offset", &self.level_offset)
            .field("decoder", &self.decoder)
            .finish()
    }
}

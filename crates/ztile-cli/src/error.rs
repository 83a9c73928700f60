//! CLI errors and exit handling.

use std::path::PathBuf;
use std::process;
use thiserror::Error;
use ztile_archive::{ArchiveError, LayerKind};
use ztile_source::{ConfigError, QuadTreeTileKey};

/// Errors reported by `ztile` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file could not be loaded.
    #[error("Failed to load config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// Archive could not be opened.
    #[error("Failed to open {layer} archive: {source}")]
    Archive {
        layer: LayerKind,
        #[source]
        source: ArchiveError,
    },

    /// The layer exists but tile sources do not decode it.
    #[error("Layer {0} has no tile decoder (use surf, mask or elev)")]
    UnsupportedLayer(LayerKind),

    /// The layer could not be opened as a tile source.
    #[error("No usable {0} archive")]
    Unavailable(LayerKind),

    /// No tile at the requested key.
    #[error("Tile {key} not present{}", describe_ancestor(.ancestor))]
    TileNotFound {
        key: QuadTreeTileKey,
        ancestor: Option<QuadTreeTileKey>,
    },

    /// The tile node exists but its payload is empty or does not decode.
    #[error("Tile {0} is present but has no decodable data")]
    Undecodable(QuadTreeTileKey),

    /// Exported image could not be written.
    #[error("Failed to write {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

fn describe_ancestor(ancestor: &Option<QuadTreeTileKey>) -> String {
    match ancestor {
        Some(key) => format!("; best available ancestor is {}", key),
        None => "; no ancestor available".to_string(),
    }
}

impl CliError {
    /// Print the error and exit with status 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);
        if let CliError::Unavailable(layer) = self {
            eprintln!();
            eprintln!("Expected an archive at <dir>/Archive/{}.tree", layer.file_stem());
        }
        process::exit(1)
    }
}

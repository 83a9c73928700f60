//! Archive layers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A data layer stored in its own tree file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Surface imagery (DXT1 textures).
    Surface,
    /// Land/water mask with night lights (DXT1 textures, alpha carries the mask).
    LandMask,
    /// Elevation tiles.
    Elevation,
    /// Elevation modification tiles.
    ElevationMod,
    /// Surface labels.
    Label,
}

impl LayerKind {
    /// All layers, in file-name order.
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Surface,
        LayerKind::LandMask,
        LayerKind::Elevation,
        LayerKind::ElevationMod,
        LayerKind::Label,
    ];

    /// Base name of the layer's tree file.
    pub fn file_stem(&self) -> &'static str {
        match self {
            LayerKind::Surface => "Surf",
            LayerKind::LandMask => "Mask",
            LayerKind::Elevation => "Elev",
            LayerKind::ElevationMod => "Elev_mod",
            LayerKind::Label => "Label",
        }
    }

    /// Path of the layer's tree file under a planet texture directory.
    pub fn tree_path(&self, directory: &Path) -> PathBuf {
        directory
            .join("Archive")
            .join(format!("{}.tree", self.file_stem()))
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

impl FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "surf" | "surface" => Ok(LayerKind::Surface),
            "mask" | "landmask" | "land-mask" => Ok(LayerKind::LandMask),
            "elev" | "elevation" => Ok(LayerKind::Elevation),
            "elev_mod" | "elev-mod" | "elevmod" => Ok(LayerKind::ElevationMod),
            "label" | "labels" => Ok(LayerKind::Label),
            other => Err(format!("unknown layer '{}'", other)),
        }
    }
}

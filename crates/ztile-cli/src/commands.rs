//! Command implementations.

use crate::error::CliError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use ztile_archive::{LayerKind, TileArchive, TreeArchive};
use ztile_source::{
    ElevationRaster, ElevationTileSource, ImageRaster, ImageTileSource, QuadTreeTileKey, TileDecoder, TileSource,
    TileSourceConfig,
};

/// Summary of one archive's table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub layer: LayerKind,
    pub nodes: usize,
    pub nodes_with_data: usize,
    pub inflated_bytes: u64,
    pub data_bytes: u64,
    pub hemispheres: [bool; 2],
}

/// Read the table of contents of one layer.
pub fn summarize(dir: &Path, layer: LayerKind) -> Result<ArchiveSummary, CliError> {
    let archive = TreeArchive::open(dir, layer).map_err(|source| CliError::Archive { layer, source })?;
    let nodes = archive.toc().nodes();

    Ok(ArchiveSummary {
        layer,
        nodes: archive.node_count(),
        nodes_with_data: nodes.iter().filter(|n| n.size > 0).count(),
        inflated_bytes: nodes.iter().map(|n| n.size as u64).sum(),
        data_bytes: archive.header().data_length,
        hemispheres: archive.header().roots.hemispheres.map(|r| r.is_some()),
    })
}

/// `ztile info`
pub fn info(dir: &Path, layer: Option<LayerKind>) -> Result<(), CliError> {
    let requested = layer.is_some();
    let layers = match layer {
        Some(layer) => vec![layer],
        None => LayerKind::ALL.to_vec(),
    };

    println!("Planet directory: {}", dir.display());
    for layer in layers {
        match summarize(dir, layer) {
            Ok(summary) => {
                println!();
                println!("{} ({})", layer, layer.tree_path(dir).display());
                println!("  Nodes:      {} ({} with data)", summary.nodes, summary.nodes_with_data);
                println!("  Compressed: {} bytes", summary.data_bytes);
                println!("  Inflated:   {} bytes", summary.inflated_bytes);
                println!(
                    "  Roots:      west={} east={}",
                    yes_no(summary.hemispheres[0]),
                    yes_no(summary.hemispheres[1])
                );
            }
            Err(e) if requested => return Err(e),
            Err(e) => {
                debug!(error = %e, "Skipping layer");
                println!();
                println!("{}: not available", layer);
            }
        }
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// `ztile tile`
pub fn tile(
    dir: &Path,
    layer: LayerKind,
    key: QuadTreeTileKey,
    out: Option<&PathBuf>,
    config: &TileSourceConfig,
) -> Result<(), CliError> {
    match layer {
        LayerKind::Elevation => {
            let source = ElevationTileSource::open(dir, config);
            let raster = fetch(&source, key)?;
            print_elevation(&raster, config.sea_level);
            if let Some(path) = out {
                export(path, raster.to_image().save(path))?;
            }
        }
        LayerKind::Surface | LayerKind::LandMask => {
            let source = if layer == LayerKind::Surface {
                ImageTileSource::open_surface(dir, config)
            } else {
                ImageTileSource::open_land_mask(dir, config)
            };
            let raster = fetch(&source, key)?;
            print_image(&raster);
            if let Some(path) = out {
                export(path, raster.to_rgba().save(path))?;
            }
        }
        other => return Err(CliError::UnsupportedLayer(other)),
    }
    Ok(())
}

/// `ztile ancestor`
pub fn ancestor(dir: &Path, layer: LayerKind, key: QuadTreeTileKey, config: &TileSourceConfig) -> Result<(), CliError> {
    let best = match layer {
        LayerKind::Elevation => search(&ElevationTileSource::open(dir, config), key)?,
        LayerKind::Surface => search(&ImageTileSource::open_surface(dir, config), key)?,
        LayerKind::LandMask => search(&ImageTileSource::open_land_mask(dir, config), key)?,
        other => return Err(CliError::UnsupportedLayer(other)),
    };

    match best {
        Some((best, children)) => {
            println!("Requested:      {}", key);
            println!("Best available: {}", best);
            println!("Levels missing: {}", key.level - best.level);
            println!("Has children:   {}", yes_no(children));
        }
        None => println!("No tile covers {}", key),
    }
    Ok(())
}

fn search<D: TileDecoder>(
    source: &TileSource<D>,
    key: QuadTreeTileKey,
) -> Result<Option<(QuadTreeTileKey, bool)>, CliError> {
    if !source.is_available() {
        return Err(CliError::Unavailable(source.layer()));
    }
    Ok(source
        .highest_available_level(key)
        .map(|best| (best, source.has_any_children(best))))
}

fn fetch<D: TileDecoder>(source: &TileSource<D>, key: QuadTreeTileKey) -> Result<D::Raster, CliError> {
    if !source.is_available() {
        return Err(CliError::Unavailable(source.layer()));
    }
    if let Some(raster) = source.create_image(key) {
        return Ok(raster);
    }
    match source.highest_available_level(key) {
        Some(best) if best == key => Err(CliError::Undecodable(key)),
        ancestor => Err(CliError::TileNotFound { key, ancestor }),
    }
}

fn export(path: &Path, result: image::ImageResult<()>) -> Result<(), CliError> {
    result.map_err(|source| CliError::Export {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Wrote tile image");
    Ok(())
}

fn print_elevation(raster: &ElevationRaster, sea_level: u16) {
    let header = raster.header();
    let (lo, hi) = raster.sample_range();
    let meters = |sample: u16| i32::from(sample) - i32::from(sea_level);

    println!("Format:    {:?} {}x{}", raster.texture_format(), raster.width(), raster.height());
    println!(
        "Extent:    lat {:.4}° to {:.4}°, lng {:.4}° to {:.4}°",
        header.lat_min.to_degrees(),
        header.lat_max.to_degrees(),
        header.lng_min.to_degrees(),
        header.lng_max.to_degrees()
    );
    println!("Elevation: {} to {} m (mean {:.1} m)", meters(lo), meters(hi), header.elev_mean);
}

fn print_image(raster: &ImageRaster) {
    println!(
        "Format: {:?} ({:?}) {}x{}",
        raster.pixel_format(),
        raster.texture_format(),
        raster.width(),
        raster.height()
    );
    println!("Mips:   {}", raster.mip_count());
    println!("Bytes:  {}", raster.data().len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use ztile_archive::fixture::TreeFixture;

    #[test]
    fn test_summarize() {
        let dir = tempfile::tempdir().unwrap();
        TreeFixture::new()
            .with_tile(4, 0, 1, vec![1u8; 40])
            .with_tile(5, 0, 2, vec![2u8; 60])
            .write_layer(dir.path(), LayerKind::Label)
            .unwrap();

        let summary = summarize(dir.path(), LayerKind::Label).unwrap();
        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.nodes_with_data, 2);
        assert_eq!(summary.inflated_bytes, 100);
        assert_eq!(summary.hemispheres, [false, true]);
    }

    #[test]
    fn test_summarize_missing_layer() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            summarize(dir.path(), LayerKind::Surface),
            Err(CliError::Archive {
                layer: LayerKind::Surface,
                ..
            })
        ));
    }

    #[test]
    fn test_tile_reports_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        TreeFixture::new()
            .with_tile(4, 0, 0, b"not an elevation tile".to_vec())
            .write_layer(dir.path(), LayerKind::Elevation)
            .unwrap();

        let key = QuadTreeTileKey::new(3, 1, 1);
        let err = tile(dir.path(), LayerKind::Elevation, key, None, &TileSourceConfig::default()).unwrap_err();
        match err {
            CliError::TileNotFound { key: missing, ancestor } => {
                assert_eq!(missing, key);
                assert_eq!(ancestor, Some(QuadTreeTileKey::new(0, 0, 0)));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_tile_present_but_undecodable() {
        let dir = tempfile::tempdir().unwrap();
        TreeFixture::new()
            .with_tile(4, 0, 0, b"not an elevation tile".to_vec())
            .write_layer(dir.path(), LayerKind::Elevation)
            .unwrap();

        let key = QuadTreeTileKey::new(0, 0, 0);
        let err = tile(dir.path(), LayerKind::Elevation, key, None, &TileSourceConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::Undecodable(k) if k == key));
    }

    #[test]
    fn test_unsupported_and_unavailable_layers() {
        let dir = tempfile::tempdir().unwrap();
        let key = QuadTreeTileKey::new(0, 0, 0);
        let config = TileSourceConfig::default();

        assert!(matches!(
            tile(dir.path(), LayerKind::Label, key, None, &config),
            Err(CliError::UnsupportedLayer(LayerKind::Label))
        ));
        assert!(matches!(
            ancestor(dir.path(), LayerKind::LandMask, key, &config),
            Err(CliError::Unavailable(LayerKind::LandMask))
        ));
    }
}

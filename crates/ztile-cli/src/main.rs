//! ztile - inspect quadtree tile archives from the command line.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use ztile_archive::LayerKind;
use ztile_source::{QuadTreeTileKey, TileSourceConfig};

#[derive(Parser)]
#[command(name = "ztile")]
#[command(about = "Inspect and extract tiles from Orbiter-style tree archives", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML configuration file (level_offset, sea_level)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the archives of a planet directory
    Info {
        /// Planet texture directory (contains Archive/)
        dir: PathBuf,

        /// Only show this layer (surf, mask, elev, elev_mod, label)
        #[arg(long)]
        layer: Option<LayerKind>,
    },

    /// Decode one tile, optionally exporting it as PNG
    Tile {
        /// Planet texture directory (contains Archive/)
        dir: PathBuf,
        /// Quadtree level (0 is the whole hemisphere pair)
        level: u32,
        /// Column
        x: u32,
        /// Row
        y: u32,

        /// Layer to read (surf, mask or elev)
        #[arg(long, default_value = "elev")]
        layer: LayerKind,

        /// Write the decoded tile to this PNG file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Find the finest tile available along a key's ancestry
    Ancestor {
        /// Planet texture directory (contains Archive/)
        dir: PathBuf,
        /// Quadtree level
        level: u32,
        /// Column
        x: u32,
        /// Row
        y: u32,

        /// Layer to search (surf, mask or elev)
        #[arg(long, default_value = "elev")]
        layer: LayerKind,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<TileSourceConfig, CliError> {
    match path {
        Some(path) => TileSourceConfig::load(path).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        }),
        None => Ok(TileSourceConfig::default()),
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Info { dir, layer } => commands::info(&dir, layer),
        Commands::Tile {
            dir,
            level,
            x,
            y,
            layer,
            out,
        } => commands::tile(&dir, layer, QuadTreeTileKey::new(level, x, y), out.as_ref(), &config),
        Commands::Ancestor { dir, level, x, y, layer } => {
            commands::ancestor(&dir, layer, QuadTreeTileKey::new(level, x, y), &config)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tile_command() {
        let cli = Cli::try_parse_from([
            "ztile", "tile", "Earth", "5", "12", "7", "--layer", "mask", "--out", "t.png", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Tile {
                level, x, y, layer, out, ..
            } => {
                assert_eq!((level, x, y), (5, 12, 7));
                assert_eq!(layer, LayerKind::LandMask);
                assert_eq!(out, Some(PathBuf::from("t.png")));
            }
            _ => panic!("expected tile command"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_layer() {
        assert!(Cli::try_parse_from(["ztile", "ancestor", "Earth", "1", "0", "0", "--layer", "clouds"]).is_err());
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ztile.yaml");
        std::fs::write(&path, "level_offset: 3\n").unwrap();

        assert_eq!(load_config(Some(&path)).unwrap().level_offset, 3);
        assert_eq!(load_config(None).unwrap(), TileSourceConfig::default());
        assert!(matches!(
            load_config(Some(&dir.path().join("missing.yaml"))),
            Err(CliError::Config { .. })
        ));
    }
}

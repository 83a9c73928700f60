//! Example: Resolve an elevation tile, falling back to its best ancestor.
//!
//! Usage: cargo run --example resolve_tile -- <planet_dir> <level> <x> <y>

use std::env;
use std::time::Instant;
use ztile_source::{ElevationTileSource, QuadTreeTileKey, TileSourceConfig};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 5 {
        eprintln!("Usage: {} <planet_dir> <level> <x> <y>", args[0]);
        eprintln!("Example: {} ./Earth 6 40 21", args[0]);
        std::process::exit(1);
    }

    let dir = &args[1];
    let level: u32 = args[2].parse().expect("Invalid level");
    let x: u32 = args[3].parse().expect("Invalid x");
    let y: u32 = args[4].parse().expect("Invalid y");

    let start = Instant::now();
    let source = ElevationTileSource::open(dir, &TileSourceConfig::default());
    if !source.is_available() {
        eprintln!("No elevation archive under {}", dir);
        std::process::exit(1);
    }
    println!("Opened elevation archive in {:.3}s", start.elapsed().as_secs_f64());

    let key = QuadTreeTileKey::new(level, x, y);
    let resolved = match source.highest_available_level(key) {
        Some(best) if best == key => key,
        Some(best) => {
            println!("Tile {} not present, using ancestor {}", key, best);
            best
        }
        None => {
            eprintln!("No tile covers {}", key);
            std::process::exit(1);
        }
    };

    let query_start = Instant::now();
    match source.create_image(resolved) {
        Some(raster) => {
            let sea_level = i32::from(source.decoder().sea_level());
            let (lo, hi) = raster.sample_range();
            println!(
                "Tile {}: {} to {} meters (decoded in {:.2}ms)",
                resolved,
                i32::from(lo) - sea_level,
                i32::from(hi) - sea_level,
                query_start.elapsed().as_secs_f64() * 1000.0
            );
        }
        None => println!("Tile {} carries no elevation data", resolved),
    }
}

//! # ztile-archive
//!
//! Reader for indexed, zlib-compressed quadtree tile archives.
//!
//! A planet's texture directory holds one tree file per data layer under
//! `Archive/` (for example `Archive/Surf.tree` or `Archive/Elev.tree`). Each
//! file carries a table of contents that links every tile to its four
//! children, followed by one compressed block per tile.
//!
//! Tiles are addressed by *native* level, row and column. Levels 1-3 hold a
//! single whole-body tile each; level 4 holds the two hemisphere roots of the
//! quadtree, and every deeper level doubles the resolution.
//!
//! ## Example
//!
//! ```no_run
//! use ztile_archive::{LayerKind, TileArchive, TreeArchive};
//!
//! let mut archive = TreeArchive::open("Textures/Earth", LayerKind::Surface)?;
//! println!("{} nodes", archive.node_count());
//!
//! if let Some(tile) = archive.read_raw_tile(5, 1, 2)? {
//!     println!("tile is {} bytes", tile.len());
//! }
//! # Ok::<(), ztile_archive::ArchiveError>(())
//! ```
//!
//! ## Thread Safety
//!
//! [`TileArchive::read_raw_tile`] moves the file cursor and takes `&mut self`.
//! Share an archive between threads only behind a lock.

mod archive;
mod error;
mod layer;
mod toc;
mod tree;

#[cfg(any(test, feature = "test-util"))]
pub mod fixture;

pub use archive::{RawTile, TileArchive};
pub use error::ArchiveError;
pub use layer::LayerKind;
pub use toc::{child_slot, ChildSlots, NodeIndex, RootIndices, TableOfContents, TocNode, NO_NODE, ROOT_LEVEL};
pub use tree::{TreeArchive, TreeHeader};

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

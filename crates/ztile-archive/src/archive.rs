//! The tile archive capability.

use crate::toc::{ChildSlots, NodeIndex};
use crate::{LayerKind, Result};
use std::ops::Deref;

/// Inflated payload of one tile.
///
/// The buffer is owned by the caller once returned; dropping it releases it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTile {
    bytes: Vec<u8>,
}

impl RawTile {
    /// Wrap an inflated payload.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the tile and return its buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Deref for RawTile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Read access to an indexed tile archive addressed by native (level, row, col).
///
/// Implementations are not required to support concurrent reads: `read_raw_tile`
/// takes `&mut self`, and callers sharing an archive between threads must
/// serialize every call, including the table-of-contents queries.
pub trait TileArchive: Send {
    /// Layer this archive holds.
    fn layer(&self) -> LayerKind;

    /// Number of table-of-contents entries. Zero means the archive failed to load.
    fn node_count(&self) -> usize;

    /// Table-of-contents index of a tile, if the tile exists.
    fn index_of(&self, level: u32, row: u32, col: u32) -> Option<NodeIndex>;

    /// Child slots of a table-of-contents entry.
    fn child_slots(&self, index: NodeIndex) -> Option<ChildSlots>;

    /// Read and inflate a tile's payload.
    ///
    /// Returns `Ok(None)` if the tile does not exist or carries no data.
    fn read_raw_tile(&mut self, level: u32, row: u32, col: u32) -> Result<Option<RawTile>>;
}

impl<A: TileArchive + ?Sized> TileArchive for Box<A> {
    fn layer(&self) -> LayerKind {
        (**self).layer()
    }

    fn node_count(&self) -> usize {
        (**self).node_count()
    }

    fn index_of(&self, level: u32, row: u32, col: u32) -> Option<NodeIndex> {
        (**self).index_of(level, row, col)
    }

    fn child_slots(&self, index: NodeIndex) -> Option<ChildSlots> {
        (**self).child_slots(index)
    }

    fn read_raw_tile(&mut self, level: u32, row: u32, col: u32) -> Result<Option<RawTile>> {
        (**self).read_raw_tile(level, row, col)
    }
}

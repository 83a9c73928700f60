//! In-memory builder for tree files, used by tests.
//!
//! Tiles are added by native address; every ancestor down to the level-4 root
//! is created as a data-less node so the quadtree stays connected.

use crate::toc::{child_slot, NO_NODE, ROOT_LEVEL};
use crate::tree::TreeHeader;
use crate::LayerKind;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

type Address = (u32, u32, u32);

/// Builder for a tree file.
#[derive(Debug, Default, Clone)]
pub struct TreeFixture {
    tiles: BTreeMap<Address, Option<Vec<u8>>>,
}

impl TreeFixture {
    /// Create an empty fixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tile with a payload.
    pub fn with_tile(mut self, level: u32, row: u32, col: u32, payload: impl Into<Vec<u8>>) -> Self {
        self.insert_ancestors(level, row, col);
        self.tiles.insert((level, row, col), Some(payload.into()));
        self
    }

    /// Add a node that exists in the table of contents but carries no data.
    pub fn with_empty_node(mut self, level: u32, row: u32, col: u32) -> Self {
        self.insert_ancestors(level, row, col);
        self.tiles.entry((level, row, col)).or_insert(None);
        self
    }

    fn insert_ancestors(&mut self, level: u32, row: u32, col: u32) {
        let (mut lvl, mut r, mut c) = (level, row, col);
        while lvl > ROOT_LEVEL {
            lvl -= 1;
            r /= 2;
            c /= 2;
            self.tiles.entry((lvl, r, c)).or_insert(None);
        }
    }

    /// Serialize to tree-file bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let index: HashMap<Address, u32> = self
            .tiles
            .keys()
            .enumerate()
            .map(|(i, addr)| (*addr, i as u32))
            .collect();
        let lookup = |addr: Address| index.get(&addr).copied().unwrap_or(NO_NODE);

        let mut data = Vec::new();
        let mut toc = Vec::with_capacity(self.tiles.len() * 28);
        for (&(level, row, col), payload) in &self.tiles {
            let pos = data.len() as u64;
            let size = match payload {
                Some(bytes) => {
                    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                    encoder.write_all(bytes).expect("in-memory write");
                    data.extend(encoder.finish().expect("in-memory write"));
                    bytes.len() as u32
                }
                None => 0,
            };

            let mut child = [NO_NODE; 4];
            if level >= ROOT_LEVEL {
                for r in 0..2 {
                    for c in 0..2 {
                        let (cr, cc) = (row * 2 + r, col * 2 + c);
                        child[child_slot(cr, cc)] = lookup((level + 1, cr, cc));
                    }
                }
            }

            toc.extend_from_slice(&pos.to_le_bytes());
            toc.extend_from_slice(&size.to_le_bytes());
            for c in child {
                toc.extend_from_slice(&c.to_le_bytes());
            }
        }

        let header_size = TreeHeader::ENCODED_LEN as u32;
        let node_count = self.tiles.len() as u32;
        let data_ofs = header_size + node_count * 28;

        let mut bytes = Vec::with_capacity(data_ofs as usize + data.len());
        bytes.extend_from_slice(&TreeHeader::MAGIC);
        bytes.extend_from_slice(&header_size.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&data_ofs.to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&node_count.to_le_bytes());
        for level in 1..=3 {
            bytes.extend_from_slice(&lookup((level, 0, 0)).to_le_bytes());
        }
        for col in 0..2 {
            bytes.extend_from_slice(&lookup((ROOT_LEVEL, 0, col)).to_le_bytes());
        }
        bytes.extend(toc);
        bytes.extend(data);
        bytes
    }

    /// Write the fixture as the tree file of `layer` under `directory`.
    pub fn write_layer(&self, directory: &Path, layer: LayerKind) -> io::Result<PathBuf> {
        let path = layer.tree_path(directory);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_bytes())?;
        Ok(path)
    }
}

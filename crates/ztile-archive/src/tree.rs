//! File-backed tree archive.
//!
//! ## File Format
//!
//! All fields are little-endian and packed.
//!
//! | Field        | Size (bytes) | Description                                          |
//! |--------------|--------------|------------------------------------------------------|
//! | magic        | 4            | `'T' 'X' 1 0`                                        |
//! | size         | 4            | Header size; the table of contents starts here       |
//! | flags        | 4            | Unused bit flags                                     |
//! | data_ofs     | 4            | Offset of the data section                           |
//! | data_length  | 8            | Length of the data section                           |
//! | node_count   | 4            | Number of table-of-contents entries                  |
//! | root_pos1..3 | 3 x 4        | Whole-body tiles at native levels 1-3                |
//! | root_pos4    | 2 x 4        | Hemisphere roots at native level 4                   |
//!
//! The table of contents is `node_count` packed [`TocNode`]s. Each node's
//! payload is a zlib stream stored from `data_ofs + pos` up to the start of the
//! next block.

use crate::archive::{RawTile, TileArchive};
use crate::toc::{ChildSlots, NodeIndex, RootIndices, TableOfContents, TocNode};
use crate::{ArchiveError, LayerKind, Result};
use flate2::read::ZlibDecoder;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{info, trace};

/// Upper bound of the deflate expansion ratio.
const MAX_INFLATE_RATIO: usize = 1032;

/// Decoded tree file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeHeader {
    /// Header size; offset of the table of contents.
    pub header_size: u32,
    /// Bit flags.
    pub flags: u32,
    /// Offset of the data section.
    pub data_ofs: u32,
    /// Length of the data section.
    pub data_length: u64,
    /// Number of table-of-contents entries.
    pub node_count: u32,
    /// Root node indices.
    pub roots: RootIndices,
}

impl TreeHeader {
    /// File magic and version.
    pub const MAGIC: [u8; 4] = [b'T', b'X', 1, 0];

    /// Size of the packed header.
    pub const ENCODED_LEN: usize = 48;

    /// Decode a header from its packed form.
    pub fn from_le_bytes(bytes: &[u8; Self::ENCODED_LEN]) -> Result<Self> {
        let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        if magic != Self::MAGIC {
            return Err(ArchiveError::BadMagic(magic));
        }

        let mut data_length = [0u8; 8];
        data_length.copy_from_slice(&bytes[16..24]);

        let header = TreeHeader {
            header_size: u32_at(4),
            flags: u32_at(8),
            data_ofs: u32_at(12),
            data_length: u64::from_le_bytes(data_length),
            node_count: u32_at(24),
            roots: RootIndices::from_raw(
                [u32_at(28), u32_at(32), u32_at(36)],
                [u32_at(40), u32_at(44)],
            ),
        };

        if (header.header_size as usize) < Self::ENCODED_LEN {
            return Err(ArchiveError::invalid_header(format!(
                "header size {} is smaller than {}",
                header.header_size,
                Self::ENCODED_LEN
            )));
        }
        if (header.data_ofs as u64) < header.toc_end() {
            return Err(ArchiveError::invalid_header(format!(
                "data offset {} overlaps the table of contents ending at {}",
                header.data_ofs,
                header.toc_end()
            )));
        }

        Ok(header)
    }

    /// File offset just past the table of contents.
    pub fn toc_end(&self) -> u64 {
        self.header_size as u64 + self.node_count as u64 * TocNode::ENCODED_LEN as u64
    }
}

/// A tree archive read from a seekable source.
///
/// Reads move the underlying cursor, so the archive must not be shared between
/// threads without external locking.
#[derive(Debug)]
pub struct TreeArchive<R = BufReader<File>> {
    layer: LayerKind,
    reader: R,
    file_len: u64,
    header: TreeHeader,
    toc: TableOfContents,
    /// End of each node's compressed block, relative to the data section.
    block_ends: Vec<u64>,
}

impl TreeArchive<BufReader<File>> {
    /// Open the tree file of `layer` under a planet texture directory.
    pub fn open<P: AsRef<Path>>(directory: P, layer: LayerKind) -> Result<Self> {
        let path = layer.tree_path(directory.as_ref());
        let file = File::open(&path)?;
        let archive = Self::from_reader(BufReader::new(file), layer)?;

        info!(
            path = %path.display(),
            %layer,
            nodes = archive.node_count(),
            "Opened tile archive"
        );

        Ok(archive)
    }
}

impl<R: Read + Seek> TreeArchive<R> {
    /// Load the header and table of contents from a reader.
    pub fn from_reader(mut reader: R, layer: LayerKind) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;

        let mut header_bytes = [0u8; TreeHeader::ENCODED_LEN];
        read_at(&mut reader, 0, &mut header_bytes, file_len)?;
        let header = TreeHeader::from_le_bytes(&header_bytes)?;

        let toc_len = header.toc_end() - header.header_size as u64;
        if header.toc_end() > file_len {
            return Err(ArchiveError::Truncated {
                offset: header.header_size as u64,
                needed: toc_len,
            });
        }
        let data_end = (header.data_ofs as u64).saturating_add(header.data_length);
        if data_end > file_len {
            return Err(ArchiveError::Truncated {
                offset: header.data_ofs as u64,
                needed: header.data_length,
            });
        }

        let mut toc_bytes = vec![0u8; to_usize(toc_len)?];
        read_at(&mut reader, header.header_size as u64, &mut toc_bytes, file_len)?;

        let nodes: Vec<TocNode> = toc_bytes
            .chunks_exact(TocNode::ENCODED_LEN)
            .map(|chunk| {
                let mut packed = [0u8; TocNode::ENCODED_LEN];
                packed.copy_from_slice(chunk);
                TocNode::from_le_bytes(&packed)
            })
            .collect();

        let block_ends = block_ends(&nodes, header.data_length);

        Ok(Self {
            layer,
            reader,
            file_len,
            header,
            toc: TableOfContents::new(header.roots, nodes),
            block_ends,
        })
    }

    /// Decoded file header.
    pub fn header(&self) -> &TreeHeader {
        &self.header
    }

    /// Table of contents.
    pub fn toc(&self) -> &TableOfContents {
        &self.toc
    }

    fn read_node(&mut self, index: NodeIndex) -> Result<Option<RawTile>> {
        let Some(node) = self.toc.node(index).copied() else {
            return Ok(None);
        };
        if node.size == 0 {
            return Ok(None);
        }

        let end = self.block_ends[index as usize];
        let compressed_len = end.checked_sub(node.pos).ok_or_else(|| {
            ArchiveError::invalid_header(format!(
                "node {} starts at {} beyond the data section ({} bytes)",
                index, node.pos, self.header.data_length
            ))
        })?;

        let offset = (self.header.data_ofs as u64).saturating_add(node.pos);
        if offset.saturating_add(compressed_len) > self.file_len {
            return Err(ArchiveError::Truncated {
                offset,
                needed: compressed_len,
            });
        }

        let mut compressed = vec![0u8; to_usize(compressed_len)?];
        read_at(&mut self.reader, offset, &mut compressed, self.file_len)?;

        // Stop one byte past the declared size so a longer stream is a mismatch.
        let capacity = (node.size as usize).min(compressed.len().saturating_mul(MAX_INFLATE_RATIO));
        let mut inflated = Vec::with_capacity(capacity);
        ZlibDecoder::new(compressed.as_slice())
            .take(node.size as u64 + 1)
            .read_to_end(&mut inflated)
            .map_err(|source| ArchiveError::Inflate { index, source })?;

        if inflated.len() != node.size as usize {
            return Err(ArchiveError::SizeMismatch {
                index,
                expected: node.size,
                actual: inflated.len(),
            });
        }

        trace!(index, compressed = compressed_len, inflated = inflated.len(), "Read tile node");
        Ok(Some(RawTile::new(inflated)))
    }
}

impl<R: Read + Seek + Send> TileArchive for TreeArchive<R> {
    fn layer(&self) -> LayerKind {
        self.layer
    }

    fn node_count(&self) -> usize {
        self.toc.len()
    }

    fn index_of(&self, level: u32, row: u32, col: u32) -> Option<NodeIndex> {
        self.toc.index_of(level, row, col)
    }

    fn child_slots(&self, index: NodeIndex) -> Option<ChildSlots> {
        self.toc.child_slots(index)
    }

    fn read_raw_tile(&mut self, level: u32, row: u32, col: u32) -> Result<Option<RawTile>> {
        match self.toc.index_of(level, row, col) {
            Some(index) => self.read_node(index),
            None => Ok(None),
        }
    }
}

/// For each node, the end of its compressed block: the next larger block start,
/// or the end of the data section.
fn block_ends(nodes: &[TocNode], data_length: u64) -> Vec<u64> {
    let mut starts: Vec<u64> = nodes.iter().map(|n| n.pos).collect();
    starts.sort_unstable();
    starts.dedup();

    nodes
        .iter()
        .map(|node| {
            let next = starts.partition_point(|&p| p <= node.pos);
            starts.get(next).copied().unwrap_or(data_length)
        })
        .collect()
}

fn read_at<R: Read + Seek>(reader: &mut R, offset: u64, buf: &mut [u8], file_len: u64) -> Result<()> {
    let needed = buf.len() as u64;
    if offset.saturating_add(needed) > file_len {
        return Err(ArchiveError::Truncated { offset, needed });
    }
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(buf)?;
    Ok(())
}

fn to_usize(len: u64) -> Result<usize> {
    usize::try_from(len)
        .map_err(|_| ArchiveError::invalid_header(format!("block length {} does not fit in memory", len)))
}

//! Table of contents for a tree archive.
//!
//! The table of contents is a flat array of nodes. Native levels 1-3 each hold
//! a single whole-body tile, and level 4 holds the two hemisphere roots of the
//! quadtree (column 0 and 1, row 0). Every deeper tile is reached by walking
//! child slots down from its level-4 root.

/// Linear index of a node in the table of contents.
pub type NodeIndex = u32;

/// On-disk marker for "no node".
pub const NO_NODE: u32 = u32::MAX;

/// Native level of the quadtree roots.
pub const ROOT_LEVEL: u32 = 4;

/// Child slot of a tile within its parent.
///
/// Slots are numbered `2 * (row & 1) + (col & 1)`.
pub fn child_slot(row: u32, col: u32) -> usize {
    (((row & 1) << 1) + (col & 1)) as usize
}

fn index_or_none(raw: u32) -> Option<NodeIndex> {
    (raw != NO_NODE).then_some(raw)
}

/// The four child slots of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildSlots(pub [Option<NodeIndex>; 4]);

impl ChildSlots {
    /// Child in the given slot, if populated.
    pub fn get(&self, slot: usize) -> Option<NodeIndex> {
        self.0.get(slot).copied().flatten()
    }

    /// True if any slot is populated.
    pub fn any(&self) -> bool {
        self.0.iter().any(Option::is_some)
    }
}

/// One table-of-contents entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocNode {
    /// Offset of the compressed block relative to the data section.
    pub pos: u64,
    /// Inflated size of the tile payload (0 = node carries no data).
    pub size: u32,
    /// Raw child indices (`NO_NODE` for none).
    pub child: [u32; 4],
}

impl TocNode {
    /// Size of a packed node on disk.
    pub const ENCODED_LEN: usize = 28;

    /// Decode a node from its packed little-endian form.
    pub fn from_le_bytes(bytes: &[u8; Self::ENCODED_LEN]) -> Self {
        let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let mut pos = [0u8; 8];
        pos.copy_from_slice(&bytes[0..8]);
        TocNode {
            pos: u64::from_le_bytes(pos),
            size: u32_at(8),
            child: [u32_at(12), u32_at(16), u32_at(20), u32_at(24)],
        }
    }
}

/// Root indices stored in the tree header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootIndices {
    /// Whole-body tiles at native levels 1, 2 and 3.
    pub whole_body: [Option<NodeIndex>; 3],
    /// Hemisphere roots at native level 4 (column 0 and 1).
    pub hemispheres: [Option<NodeIndex>; 2],
}

impl RootIndices {
    /// Build from raw header values.
    pub fn from_raw(whole_body: [u32; 3], hemispheres: [u32; 2]) -> Self {
        RootIndices {
            whole_body: whole_body.map(index_or_none),
            hemispheres: hemispheres.map(index_or_none),
        }
    }

    /// Roots for an archive with no tiles.
    pub fn empty() -> Self {
        Self::from_raw([NO_NODE; 3], [NO_NODE; 2])
    }
}

/// Node array plus roots, with quadtree lookup.
#[derive(Debug, Clone)]
pub struct TableOfContents {
    roots: RootIndices,
    nodes: Vec<TocNode>,
}

impl TableOfContents {
    /// Create a table of contents from decoded parts.
    pub fn new(roots: RootIndices, nodes: Vec<TocNode>) -> Self {
        Self { roots, nodes }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the archive holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at an index.
    pub fn node(&self, index: NodeIndex) -> Option<&TocNode> {
        self.nodes.get(index as usize)
    }

    /// All nodes in index order.
    pub fn nodes(&self) -> &[TocNode] {
        &self.nodes
    }

    /// Child slots of a node. Children pointing outside the table are treated as absent.
    pub fn child_slots(&self, index: NodeIndex) -> Option<ChildSlots> {
        let node = self.node(index)?;
        let len = self.nodes.len();
        Some(ChildSlots(node.child.map(|c| {
            index_or_none(c).filter(|&c| (c as usize) < len)
        })))
    }

    /// Resolve a native (level, row, col) address to a node index.
    pub fn index_of(&self, level: u32, row: u32, col: u32) -> Option<NodeIndex> {
        let found = match level {
            0 => None,
            1..=3 if row == 0 && col == 0 => self.roots.whole_body[(level - 1) as usize],
            1..=3 => None,
            ROOT_LEVEL if row == 0 => self.roots.hemispheres.get(col as usize).copied().flatten(),
            ROOT_LEVEL => None,
            _ => {
                let depth = level - ROOT_LEVEL;
                let mut index = self.index_of(ROOT_LEVEL, shr(row, depth), shr(col, depth))?;
                for lvl in ROOT_LEVEL + 1..=level {
                    let shift = level - lvl;
                    let slot = child_slot(shr(row, shift), shr(col, shift));
                    index = self.child_slots(index)?.get(slot)?;
                }
                Some(index)
            }
        };
        found.filter(|&i| (i as usize) < self.nodes.len())
    }
}

fn shr(value: u32, shift: u32) -> u32 {
    value.checked_shr(shift).unwrap_or(0)
}

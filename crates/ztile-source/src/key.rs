//! Quadtree tile addressing.

use std::fmt;

/// Address of one node of an implicit quadtree.
///
/// Level 0 is the coarsest. A key at level `L` is expected to have `x` and `y`
/// in `[0, 2^L)` (times the root grid size), but nothing here enforces it;
/// out-of-range keys simply resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadTreeTileKey {
    /// Subdivision level.
    pub level: u32,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl QuadTreeTileKey {
    /// Create a key.
    pub fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// Parent key, or `None` at level 0.
    pub fn parent(&self) -> Option<Self> {
        (self.level > 0).then(|| Self::new(self.level - 1, self.x / 2, self.y / 2))
    }

    /// The four children, ordered by child slot.
    pub fn children(&self) -> [Self; 4] {
        let (level, x, y) = (self.level + 1, self.x * 2, self.y * 2);
        [
            Self::new(level, x, y),
            Self::new(level, x + 1, y),
            Self::new(level, x, y + 1),
            Self::new(level, x + 1, y + 1),
        ]
    }

    /// Slot of this key within its parent: `2 * (y & 1) + (x & 1)`.
    pub fn child_slot(&self) -> usize {
        (((self.y & 1) << 1) + (self.x & 1)) as usize
    }

    /// Ancestor at a coarser (or equal) level.
    pub fn ancestor_at(&self, level: u32) -> Option<Self> {
        if level > self.level {
            return None;
        }
        let shift = self.level - level;
        Some(Self::new(
            level,
            self.x.checked_shr(shift).unwrap_or(0),
            self.y.checked_shr(shift).unwrap_or(0),
        ))
    }

    /// True if `other` is this key or one of its ancestors.
    pub fn is_descendant_of(&self, other: &Self) -> bool {
        self.ancestor_at(other.level).is_some_and(|a| a == *other)
    }
}

impl fmt::Display for QuadTreeTileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}

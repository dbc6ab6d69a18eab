use std::hash::{Hash as _, Hasher as _};

use rustc_hash::FxHasher;
use salsa::Database;

use crate::SyntaxKind;
use crate::green::{Green, GreenNode, NodeFlags};

const CACHE_SIZE_BITS: u32 = 11;
const CACHE_SIZE: usize = 1 << CACHE_SIZE_BITS;
const CACHE_MASK: u64 = (CACHE_SIZE - 1) as u64;

/// Nodes wider than this are unlikely to repeat and are not worth a slot.
const MAX_CACHED_WIDTH: u32 = 48;
const MAX_CACHED_SLOTS: usize = 3;

struct Entry<'db> {
    hash: u64,
    node: GreenNode<'db>,
}

/// Best-effort deduplication table for small context-free green nodes.
///
/// A hit must return a node whose kind and slots are identity-equal to the
/// query. Collisions simply miss, and inserting over a colliding entry
/// overwrites it; the cache only affects how much structure is shared, never
/// what a tree means.
pub struct NodeCache<'db> {
    entries: Vec<Option<Entry<'db>>>,
}

impl Default for NodeCache<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'db> NodeCache<'db> {
    pub fn new() -> Self {
        Self { entries: (0..CACHE_SIZE).map(|_| None).collect() }
    }

    fn hash_query(kind: SyntaxKind, slots: &[Option<Green<'db>>]) -> u64 {
        let mut hasher = FxHasher::default();
        kind.hash(&mut hasher);
        // Child identity, not deep structure: children are interned, so their
        // ids already stand for their contents.
        slots.hash(&mut hasher);
        hasher.finish()
    }

    fn cacheable(db: &dyn Database, node: GreenNode<'db>) -> bool {
        node.slot_count(db) <= MAX_CACHED_SLOTS
            && node.flags(db) == NodeFlags::EMPTY
            && node.text_len(db) <= MAX_CACHED_WIDTH.into()
    }

    /// Looks up a node for `kind` + `slots`; on a miss returns the query hash
    /// to pass back to [`NodeCache::add`].
    pub fn try_get(
        &self,
        db: &'db dyn Database,
        kind: SyntaxKind,
        slots: &[Option<Green<'db>>],
    ) -> Result<GreenNode<'db>, u64> {
        let hash = Self::hash_query(kind, slots);
        if slots.len() > MAX_CACHED_SLOTS {
            return Err(hash);
        }
        match &self.entries[(hash & CACHE_MASK) as usize] {
            Some(entry)
                if entry.hash == hash
                    && entry.node.kind(db) == kind
                    && entry.node.slots(db).as_slice() == slots =>
            {
                Ok(entry.node)
            }
            _ => Err(hash),
        }
    }

    pub fn add(&mut self, db: &'db dyn Database, node: GreenNode<'db>, hash: u64) {
        if Self::cacheable(db, node) {
            self.entries[(hash & CACHE_MASK) as usize] = Some(Entry { hash, node });
        }
    }

    /// Builder entry point: reuse a structurally identical node or build one.
    pub fn get_or_insert(
        &mut self,
        db: &'db dyn Database,
        kind: SyntaxKind,
        slots: Vec<Option<Green<'db>>>,
    ) -> GreenNode<'db> {
        match self.try_get(db, kind, &slots) {
            Ok(node) => node,
            Err(hash) => {
                let node = GreenNode::new(db, kind, slots);
                self.add(db, node, hash);
                node
            }
        }
    }
}

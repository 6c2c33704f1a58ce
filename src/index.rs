use hashbrown::{raw::RawTable, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

#[cfg(feature = "fast-hash")]
use rustc_hash::FxHasher;
#[cfg(feature = "fast-hash")]
use std::hash::BuildHasherDefault;

#[cfg(not(feature = "fast-hash"))]
use ahash::RandomState;

use crate::skiplist::NodeId;

#[cfg(feature = "fast-hash")]
type Build = BuildHasherDefault<FxHasher>;
#[cfg(not(feature = "fast-hash"))]
type Build = RandomState;

/// Hash map with the crate's configured hasher.
pub type FastHashMap<K, V> = HashMap<K, V, Build>;

// Entry we store in RawTable. The key bytes stay in the skiplist node.
struct Slot {
    hash: u64,
    id: NodeId,
}

/// Key → node lookup that never owns a copy of the key.
///
/// Probing compares the candidate's key through a caller-supplied resolver,
/// so the skiplist node remains the only record of a member. Removal and
/// re-pointing match on the handle instead, which lets callers drop entries
/// for nodes that are already gone.
pub(crate) struct MemberIndex {
    hasher: Build,
    table: RawTable<Slot>,
}

impl Default for MemberIndex {
    fn default() -> Self {
        Self {
            hasher: Build::default(),
            table: RawTable::new(),
        }
    }
}

impl fmt::Debug for MemberIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberIndex")
            .field("len", &self.table.len())
            .field("buckets", &self.table.buckets())
            .finish()
    }
}

impl MemberIndex {
    pub fn find<'a, F>(&self, key: &str, resolve: F) -> Option<NodeId>
    where
        F: Fn(NodeId) -> &'a str,
    {
        let hash = self.hash_key(key);
        self.table
            .get(hash, |slot| resolve(slot.id) == key)
            .map(|slot| slot.id)
    }

    /// Records a key known to be absent.
    pub fn insert(&mut self, key: &str, id: NodeId) {
        let hash = self.hash_key(key);
        self.table.insert(hash, Slot { hash, id }, |slot| slot.hash);
    }

    /// Moves `key` from handle `old` to handle `new`.
    pub fn repoint(&mut self, key: &str, old: NodeId, new: NodeId) -> bool {
        let hash = self.hash_key(key);
        match self.table.get_mut(hash, |slot| slot.id == old) {
            Some(slot) => {
                slot.id = new;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &str, id: NodeId) -> bool {
        let hash = self.hash_key(key);
        self.table
            .remove_entry(hash, |slot| slot.id == id)
            .is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    fn hash_key(&self, key: &str) -> u64 {
        let mut state = self.hasher.build_hasher();
        state.write(key.as_bytes());
        state.finish()
    }
}

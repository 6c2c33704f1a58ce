//! Span-augmented skip list ordered by `(score, key)`.
//!
//! Nodes live in an arena and link to each other by [`NodeId`]. The header is
//! not an arena slot: a position of `None` in the traversal helpers below
//! always means "the header". Every forward link carries a span, the number of
//! level-0 hops it covers, so rank queries never walk the base level. A link
//! with no forward node spans the rest of the list (`len - rank`).

use std::cmp::Ordering;
use std::fmt;

use ordered_float::OrderedFloat;
use rand::RngCore;
use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use crate::format::write_score;
use crate::interval::Interval;

/// Height ceiling of the list.
pub const MAX_LEVEL: usize = 16;

/// Arena slot of a live node. Slots are recycled after removal.
pub type NodeId = u32;

/// A key bound to its score.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub key: String,
    pub score: f64,
}

impl Member {
    /// Total order used by the list: score first, then key bytes.
    #[inline]
    pub fn cmp_to(&self, score: f64, key: &str) -> Ordering {
        OrderedFloat(self.score)
            .cmp(&OrderedFloat(score))
            .then_with(|| self.key.as_str().cmp(key))
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.key)?;
        write_score(f, self.score)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Level {
    forward: Option<NodeId>,
    span: usize,
}

#[derive(Debug)]
struct Node {
    member: Member,
    backward: Option<NodeId>,
    levels: SmallVec<[Level; 4]>,
}

/// Per-level predecessors of a position; `None` is the header.
type Update = [Option<NodeId>; MAX_LEVEL];

pub struct SkipList<R> {
    head: [Level; MAX_LEVEL],
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    tail: Option<NodeId>,
    len: usize,
    level: usize,
    rng: R,
}

impl<R> fmt::Debug for SkipList<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipList")
            .field("len", &self.len)
            .field("level", &self.level)
            .field("slots", &self.nodes.len())
            .field("free_slots", &self.free.len())
            .finish()
    }
}

impl<R: RngCore> SkipList<R> {
    pub fn new(rng: R) -> Self {
        Self {
            head: [Level::default(); MAX_LEVEL],
            nodes: Vec::new(),
            free: Vec::new(),
            tail: None,
            len: 0,
            level: 1,
            rng,
        }
    }

    /// Geometric height with p = 1/2, capped at [`MAX_LEVEL`].
    fn random_level(&mut self) -> usize {
        let bits = self.rng.next_u32() | (1 << (MAX_LEVEL - 1));
        bits.trailing_zeros() as usize + 1
    }

    /// Always links a new node; duplicate keys are the caller's concern.
    pub fn insert(&mut self, key: String, score: f64) -> NodeId {
        let (mut update, mut rank) =
            self.descend(|m, _| m.cmp_to(score, &key) == Ordering::Less);

        let level = self.random_level();
        if level > self.level {
            for i in self.level..level {
                rank[i] = 0;
                update[i] = None;
                self.head[i].span = self.len;
            }
            trace!(from = self.level, to = level, "raising skiplist level");
            self.level = level;
        }

        let id = self.alloc(Node {
            member: Member { key, score },
            backward: update[0],
            levels: smallvec![Level::default(); level],
        });

        for i in 0..level {
            let prev = self.link(update[i], i);
            let covered = rank[0] - rank[i];
            self.node_mut(id).levels[i] = Level {
                forward: prev.forward,
                span: prev.span - covered,
            };
            *self.link_mut(update[i], i) = Level {
                forward: Some(id),
                span: covered + 1,
            };
        }
        for i in level..self.level {
            self.link_mut(update[i], i).span += 1;
        }

        match self.node(id).levels[0].forward {
            Some(next) => self.node_mut(next).backward = Some(id),
            None => self.tail = Some(id),
        }
        self.len += 1;
        id
    }

    pub fn remove(&mut self, key: &str, score: f64) -> bool {
        self.take(key, score).is_some()
    }

    /// Like [`remove`](Self::remove) but hands back the unlinked record.
    pub fn take(&mut self, key: &str, score: f64) -> Option<Member> {
        let (update, _) = self.descend(|m, _| m.cmp_to(score, key) == Ordering::Less);
        let id = self.link(update[0], 0).forward?;
        let member = &self.node(id).member;
        if member.score != score || member.key != key {
            return None;
        }
        Some(self.unlink(id, &update))
    }

    /// 1-based rank of the exact `(score, key)` pair.
    pub fn rank(&self, key: &str, score: f64) -> Option<usize> {
        let (update, rank) = self.descend(|m, _| m.cmp_to(score, key) != Ordering::Greater);
        let id = update[0]?;
        let member = &self.node(id).member;
        (member.key == key && member.score == score).then_some(rank[0])
    }

    /// Node at 1-based `rank`.
    pub fn by_rank(&self, rank: usize) -> Option<NodeId> {
        if rank == 0 || rank > self.len {
            return None;
        }
        let (update, reached) = self.descend(|_, reach| reach <= rank);
        debug_assert_eq!(reached[0], rank);
        update[0]
    }

    /// Cheap rejection of ranges that cannot contain any member.
    pub fn has_overlap(&self, lower: &Interval, upper: &Interval) -> bool {
        if lower.value() > upper.value()
            || (lower.value() == upper.value() && (lower.is_exclusive() || upper.is_exclusive()))
        {
            return false;
        }
        let (Some(tail), Some(head)) = (self.tail, self.head[0].forward) else {
            return false;
        };
        lower.admits_above(self.node(tail).member.score)
            && upper.admits_below(self.node(head).member.score)
    }

    pub fn first_in_range(&self, lower: &Interval, upper: &Interval) -> Option<NodeId> {
        if !self.has_overlap(lower, upper) {
            return None;
        }
        let (update, _) = self.descend(|m, _| !lower.admits_above(m.score));
        // The tail is above `lower`, so a successor exists.
        let id = self.link(update[0], 0).forward?;
        upper
            .admits_below(self.node(id).member.score)
            .then_some(id)
    }

    pub fn last_in_range(&self, lower: &Interval, upper: &Interval) -> Option<NodeId> {
        if !self.has_overlap(lower, upper) {
            return None;
        }
        let (update, _) = self.descend(|m, _| upper.admits_below(m.score));
        let id = update[0]?;
        lower
            .admits_above(self.node(id).member.score)
            .then_some(id)
    }

    /// Unlinks members inside `[lower, upper]` in ascending order, at most
    /// `limit` of them when `limit > 0`.
    pub fn remove_range_by_score(
        &mut self,
        lower: &Interval,
        upper: &Interval,
        limit: usize,
    ) -> Vec<(NodeId, Member)> {
        let (update, _) = self.descend(|m, _| !lower.admits_above(m.score));
        let mut removed = Vec::new();
        let mut cursor = self.link(update[0], 0).forward;
        while let Some(id) = cursor {
            let node = self.node(id);
            if !upper.admits_below(node.member.score) {
                break;
            }
            cursor = node.levels[0].forward;
            removed.push((id, self.unlink(id, &update)));
            if limit > 0 && removed.len() == limit {
                break;
            }
        }
        debug!(removed = removed.len(), %lower, %upper, limit, "removed range by score");
        removed
    }

    /// Unlinks 1-based ranks `[start, stop)` in ascending order.
    pub fn remove_range_by_rank(&mut self, start: usize, stop: usize) -> Vec<(NodeId, Member)> {
        let (update, reached) = self.descend(|_, reach| reach < start);
        let mut rank = reached[0] + 1;
        let mut removed = Vec::new();
        let mut cursor = self.link(update[0], 0).forward;
        while let Some(id) = cursor {
            if rank >= stop {
                break;
            }
            cursor = self.node(id).levels[0].forward;
            removed.push((id, self.unlink(id, &update)));
            rank += 1;
        }
        debug!(removed = removed.len(), start, stop, "removed range by rank");
        removed
    }
}

impl<R> SkipList<R> {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of active levels, always at least one.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn first(&self) -> Option<NodeId> {
        self.head[0].forward
    }

    #[inline]
    pub fn last(&self) -> Option<NodeId> {
        self.tail
    }

    #[inline]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).levels[0].forward
    }

    #[inline]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).backward
    }

    #[inline]
    pub fn member(&self, id: NodeId) -> &Member {
        &self.node(id).member
    }

    #[inline]
    pub fn key(&self, id: NodeId) -> &str {
        &self.node(id).member.key
    }

    /// Drops every node but keeps the level source.
    pub fn clear(&mut self) {
        self.head = [Level::default(); MAX_LEVEL];
        self.nodes.clear();
        self.free.clear();
        self.tail = None;
        self.len = 0;
        self.level = 1;
    }

    /// Walks from the top level down, following forward links while
    /// `advance(next, rank_after_hop)` holds. Returns the last node reached on
    /// every level together with its rank.
    fn descend<F>(&self, mut advance: F) -> (Update, [usize; MAX_LEVEL])
    where
        F: FnMut(&Member, usize) -> bool,
    {
        let mut update: Update = [None; MAX_LEVEL];
        let mut rank = [0usize; MAX_LEVEL];
        let mut at: Option<NodeId> = None;
        let mut traversed = 0usize;
        for i in (0..self.level).rev() {
            loop {
                let Level { forward, span } = self.link(at, i);
                match forward {
                    Some(next) if advance(&self.node(next).member, traversed + span) => {
                        traversed += span;
                        at = Some(next);
                    }
                    _ => break,
                }
            }
            update[i] = at;
            rank[i] = traversed;
        }
        (update, rank)
    }

    fn unlink(&mut self, id: NodeId, update: &Update) -> Member {
        for i in 0..self.level {
            let own = self.node(id).levels.get(i).copied();
            let prev = self.link_mut(update[i], i);
            match own {
                Some(own) if prev.forward == Some(id) => {
                    prev.span = prev.span + own.span - 1;
                    prev.forward = own.forward;
                }
                _ => prev.span -= 1,
            }
        }

        let (forward, backward) = {
            let node = self.node(id);
            (node.levels[0].forward, node.backward)
        };
        match forward {
            Some(next) => self.node_mut(next).backward = backward,
            None => self.tail = backward,
        }

        while self.level > 1 && self.head[self.level - 1].forward.is_none() {
            self.level -= 1;
            trace!(to = self.level, "lowering skiplist level");
        }
        self.len -= 1;
        self.release(id)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            let slot = self
                .nodes
                .get_mut(id as usize)
                .expect("reused node id out of bounds");
            debug_assert!(slot.is_none(), "reused node slot must be empty");
            *slot = Some(node);
            id
        } else {
            let id = NodeId::try_from(self.nodes.len()).expect("too many nodes in skiplist");
            self.nodes.push(Some(node));
            id
        }
    }

    fn release(&mut self, id: NodeId) -> Member {
        let node = self
            .nodes
            .get_mut(id as usize)
            .and_then(Option::take)
            .expect("invalid node id");
        self.free.push(id);
        node.member
    }

    #[inline]
    fn node(&self, id: NodeId) -> &Node {
        self.nodes
            .get(id as usize)
            .and_then(|slot| slot.as_ref())
            .expect("invalid node id")
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes
            .get_mut(id as usize)
            .and_then(|slot| slot.as_mut())
            .expect("invalid node id")
    }

    #[inline]
    fn link(&self, at: Option<NodeId>, i: usize) -> Level {
        match at {
            None => self.head[i],
            Some(id) => self.node(id).levels[i],
        }
    }

    #[inline]
    fn link_mut(&mut self, at: Option<NodeId>, i: usize) -> &mut Level {
        match at {
            None => &mut self.head[i],
            Some(id) => &mut self.node_mut(id).levels[i],
        }
    }

    /// Panics if ordering, back links, tail or any span is inconsistent.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let mut order = Vec::with_capacity(self.len);
        let mut ranks = crate::index::FastHashMap::default();
        let mut prev: Option<NodeId> = None;
        let mut cursor = self.head[0].forward;
        while let Some(id) = cursor {
            let node = self.node(id);
            assert_eq!(node.backward, prev, "backward link of {}", node.member);
            assert!(node.levels.len() <= self.level, "node above list level");
            if let Some(p) = prev {
                let before = &self.node(p).member;
                assert_eq!(
                    before.cmp_to(node.member.score, &node.member.key),
                    Ordering::Less,
                    "{before} must sort before {}",
                    node.member
                );
            }
            order.push(id);
            ranks.insert(id, order.len());
            prev = Some(id);
            cursor = node.levels[0].forward;
        }
        assert_eq!(order.len(), self.len, "level-0 length");
        assert_eq!(self.tail, prev, "tail");
        assert_eq!(
            self.nodes.iter().filter(|slot| slot.is_some()).count(),
            self.len,
            "live arena slots"
        );

        for i in 0..self.level {
            let mut at: Option<NodeId> = None;
            let mut at_rank = 0usize;
            loop {
                let Level { forward, span } = self.link(at, i);
                match forward {
                    Some(next) => {
                        let next_rank = ranks[&next];
                        assert_eq!(span, next_rank - at_rank, "span at level {i}");
                        at = Some(next);
                        at_rank = next_rank;
                    }
                    None => {
                        assert_eq!(span, self.len - at_rank, "trailing span at level {i}");
                        break;
                    }
                }
            }
        }
        if self.level > 1 {
            assert!(self.head[self.level - 1].forward.is_some(), "empty top level");
        }
    }
}

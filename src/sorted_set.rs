use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::fmt;
use std::iter::FusedIterator;
use tracing::debug;

use crate::{
    error::{Error, Result},
    index::MemberIndex,
    interval::Interval,
    skiplist::{Member, NodeId, SkipList},
};

/// Unique string members ordered by `(score, key)`.
///
/// Point lookups go through a hash index, ordered access through a skiplist.
/// The skiplist node is the only record of a member; the index keeps a handle
/// to it. Ranks passed in and out are 0-based.
pub struct SortedSet<R = StdRng> {
    index: MemberIndex,
    list: SkipList<R>,
}

impl SortedSet<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible node heights.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for SortedSet<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for SortedSet<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|m| (&m.key, m.score)))
            .finish()
    }
}

impl<R: RngCore> SortedSet<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            index: MemberIndex::default(),
            list: SkipList::new(rng),
        }
    }

    /// Inserts or rescores `key`. Returns `true` only for a new member.
    ///
    /// A NaN score is ignored: the set is left unchanged and `false` is
    /// returned.
    pub fn add(&mut self, key: &str, score: f64) -> bool {
        if score.is_nan() {
            debug!(key, "ignoring NaN score");
            return false;
        }
        let Some(id) = self.lookup(key) else {
            let id = self.list.insert(key.to_owned(), score);
            self.index.insert(key, id);
            return true;
        };
        let old = self.list.member(id).score;
        if old == score {
            return false;
        }
        let member = self
            .list
            .take(key, old)
            .expect("indexed member must be linked in the skiplist");
        let new_id = self.list.insert(member.key, score);
        let repointed = self.index.repoint(key, id, new_id);
        debug_assert!(repointed, "index entry must follow a rescored member");
        false
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let Some(id) = self.lookup(key) else {
            return false;
        };
        let score = self.list.member(id).score;
        let removed = self.list.remove(key, score);
        debug_assert!(removed, "indexed member must be linked in the skiplist");
        self.index.remove(key, id)
    }

    /// Rank of `key` in the requested direction.
    pub fn rank(&self, key: &str, desc: bool) -> Option<usize> {
        let id = self.lookup(key)?;
        let member = self.list.member(id);
        let rank = self.list.rank(&member.key, member.score)?;
        Some(if desc { self.len() - rank } else { rank - 1 })
    }

    /// Visits ranks `[start, stop)` until `visitor` returns `false`.
    pub fn for_each<F>(&self, start: isize, stop: isize, desc: bool, visitor: F) -> Result<()>
    where
        F: FnMut(&Member) -> bool,
    {
        let (start, stop) = self.check_window(start, stop)?;
        self.visit_window(start, stop, desc, visitor);
        Ok(())
    }

    pub fn range(&self, start: isize, stop: isize, desc: bool) -> Result<Vec<Member>> {
        let (start, stop) = self.check_window(start, stop)?;
        let mut out = Vec::with_capacity(stop - start);
        self.visit_window(start, stop, desc, |m| {
            out.push(m.clone());
            true
        });
        Ok(out)
    }

    /// Number of members with a score inside `[lower, upper]`.
    pub fn count(&self, lower: &Interval, upper: &Interval) -> usize {
        let mut n = 0;
        let mut cursor = self.list.first_in_range(lower, upper);
        while let Some(id) = cursor {
            if !upper.admits_below(self.list.member(id).score) {
                break;
            }
            n += 1;
            cursor = self.list.next(id);
        }
        n
    }

    /// Visits members inside `[lower, upper]`, skipping `offset` of them and
    /// visiting at most `limit` (negative means no limit).
    pub fn for_each_by_score<F>(
        &self,
        lower: &Interval,
        upper: &Interval,
        offset: isize,
        limit: isize,
        desc: bool,
        mut visitor: F,
    ) where
        F: FnMut(&Member) -> bool,
    {
        let mut cursor = if desc {
            self.list.last_in_range(lower, upper)
        } else {
            self.list.first_in_range(lower, upper)
        };

        let mut offset = offset;
        while offset > 0 {
            let Some(id) = cursor else { return };
            cursor = self.step(id, desc);
            offset -= 1;
        }

        let mut visited = 0isize;
        while let Some(id) = cursor {
            if limit >= 0 && visited >= limit {
                break;
            }
            let member = self.list.member(id);
            if !(lower.admits_above(member.score) && upper.admits_below(member.score)) {
                break;
            }
            if !visitor(member) {
                break;
            }
            visited += 1;
            cursor = self.step(id, desc);
        }
    }

    pub fn range_by_score(
        &self,
        lower: &Interval,
        upper: &Interval,
        offset: isize,
        limit: isize,
        desc: bool,
    ) -> Vec<Member> {
        let mut out = Vec::new();
        if limit == 0 || offset < 0 {
            return out;
        }
        self.for_each_by_score(lower, upper, offset, limit, desc, |m| {
            out.push(m.clone());
            true
        });
        out
    }

    pub fn remove_by_score(&mut self, lower: &Interval, upper: &Interval) -> usize {
        let removed = self.list.remove_range_by_score(lower, upper, 0);
        self.forget(&removed);
        removed.len()
    }

    /// Removes ranks `[start, stop)`.
    pub fn remove_by_rank(&mut self, start: usize, stop: usize) -> usize {
        if start >= stop {
            return 0;
        }
        let removed = self.list.remove_range_by_rank(start + 1, stop + 1);
        self.forget(&removed);
        removed.len()
    }

    /// Removes and returns up to `count` lowest members, ascending.
    pub fn pop_min(&mut self, count: usize) -> Vec<Member> {
        if count == 0 {
            return Vec::new();
        }
        let Some(first) = self
            .list
            .first_in_range(&Interval::NEG_INFINITY, &Interval::POS_INFINITY)
        else {
            return Vec::new();
        };
        let lower = Interval::inclusive(self.list.member(first).score);
        let removed = self
            .list
            .remove_range_by_score(&lower, &Interval::POS_INFINITY, count);
        self.forget(&removed);
        removed.into_iter().map(|(_, m)| m).collect()
    }

    /// Removes and returns up to `count` highest members, descending.
    pub fn pop_max(&mut self, count: usize) -> Vec<Member> {
        let len = self.len();
        let take = count.min(len);
        if take == 0 {
            return Vec::new();
        }
        let removed = self.list.remove_range_by_rank(len - take + 1, len + 1);
        self.forget(&removed);
        removed.into_iter().rev().map(|(_, m)| m).collect()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.list.clear();
    }

    fn forget(&mut self, removed: &[(NodeId, Member)]) {
        for (id, member) in removed {
            let dropped = self.index.remove(&member.key, *id);
            debug_assert!(dropped, "removed node {member} had no index entry");
        }
    }

    /// Walks checked ranks `[start, stop)`.
    fn visit_window<F>(&self, start: usize, stop: usize, desc: bool, mut visitor: F)
    where
        F: FnMut(&Member) -> bool,
    {
        if start == stop {
            return;
        }
        let len = self.len();
        let mut cursor = match (desc, start) {
            (false, 0) => self.list.first(),
            (true, 0) => self.list.last(),
            (false, _) => self.list.by_rank(start + 1),
            (true, _) => self.list.by_rank(len - start),
        };
        for _ in start..stop {
            let Some(id) = cursor else { break };
            if !visitor(self.list.member(id)) {
                break;
            }
            cursor = self.step(id, desc);
        }
    }
}

impl<R> SortedSet<R> {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.lookup(key).map(|id| self.list.member(id).score)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All members in ascending order.
    pub fn iter(&self) -> Iter<'_, R> {
        Iter {
            list: &self.list,
            front: self.list.first(),
            back: self.list.last(),
            remaining: self.list.len(),
        }
    }

    #[inline]
    fn lookup(&self, key: &str) -> Option<NodeId> {
        self.index.find(key, |id| self.list.key(id))
    }

    #[inline]
    fn step(&self, id: NodeId, desc: bool) -> Option<NodeId> {
        if desc {
            self.list.prev(id)
        } else {
            self.list.next(id)
        }
    }

    fn check_window(&self, start: isize, stop: isize) -> Result<(usize, usize)> {
        let len = self.len();
        let size = isize::try_from(len).unwrap_or(isize::MAX);
        if start < 0 || start > size {
            debug!(start, len, "rejecting rank window start");
            return Err(Error::StartOutOfRange { start, len });
        }
        if stop < start || stop > size {
            debug!(start, stop, len, "rejecting rank window stop");
            return Err(Error::StopOutOfRange { start, stop, len });
        }
        Ok((start as usize, stop as usize))
    }

    /// Panics unless the index and the skiplist describe the same members.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.list.assert_invariants();
        assert_eq!(self.index.len(), self.list.len(), "index/list size mismatch");
        let mut cursor = self.list.first();
        while let Some(id) = cursor {
            let key = self.list.key(id);
            assert_eq!(self.lookup(key), Some(id), "index entry for {key:?}");
            cursor = self.list.next(id);
        }
    }
}

impl<'a, R> IntoIterator for &'a SortedSet<R> {
    type Item = &'a Member;
    type IntoIter = Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Double-ended walk over the level-0 links.
pub struct Iter<'a, R> {
    list: &'a SkipList<R>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, R> Clone for Iter<'a, R> {
    fn clone(&self) -> Self {
        Self {
            list: self.list,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, R> Iterator for Iter<'a, R> {
    type Item = &'a Member;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front?;
        self.remaining -= 1;
        self.front = self.list.next(id);
        Some(self.list.member(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, R> DoubleEndedIterator for Iter<'a, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.back?;
        self.remaining -= 1;
        self.back = self.list.prev(id);
        Some(self.list.member(id))
    }
}

impl<R> ExactSizeIterator for Iter<'_, R> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<R> FusedIterator for Iter<'_, R> {}

#![allow(dead_code)]

use rankset::{Member, SortedSet};

/// Fixed seed so node heights are identical across runs.
pub const SEED: u64 = 0x7d11_5eed_f065_cafe;

pub fn set_of(items: &[(&str, f64)]) -> SortedSet {
    let mut set = SortedSet::with_seed(SEED);
    for (key, score) in items {
        set.add(key, *score);
    }
    set.assert_invariants();
    set
}

pub fn keys(members: &[Member]) -> Vec<&str> {
    members.iter().map(|m| m.key.as_str()).collect()
}

pub fn all_keys(set: &SortedSet) -> Vec<String> {
    set.iter().map(|m| m.key.clone()).collect()
}

/// `n` members with distinct increasing scores: `m0000 → 0`, `m0001 → 1`, ...
pub fn numbered(n: usize) -> SortedSet {
    let mut set = SortedSet::with_seed(SEED);
    for i in 0..n {
        assert!(set.add(&format!("m{i:04}"), i as f64));
    }
    set
}

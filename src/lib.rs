#![deny(clippy::uninlined_format_args)]
#![deny(clippy::to_string_in_format_args)]
//! In-memory sorted set: unique string members bound to `f64` scores,
//! addressable by rank and by score interval.
//!
//! The set is not synchronized. Mutation needs `&mut self`, so a surrounding
//! engine provides whatever locking it needs around a [`SortedSet`].

pub mod error;
pub mod format;
mod index;
pub mod interval;
pub mod skiplist;
pub mod sorted_set;

pub use error::{Error, Result};
pub use index::FastHashMap;
pub use interval::Interval;
pub use skiplist::{Member, NodeId, SkipList, MAX_LEVEL};
pub use sorted_set::{Iter, SortedSet};

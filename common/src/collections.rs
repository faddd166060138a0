//! Collections and data structures.

pub use grid::*;
pub use smallvec::{smallvec, SmallVec};

mod grid;

/// A faster hash set that is not resilient to DoS attacks.
pub type FastHashSet<K> = rustc_hash::FxHashSet<K>;

/// A faster hash map that is not resilient to DoS attacks.
pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

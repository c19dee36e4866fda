//! Standard collection type aliases for Quarry.
//!
//! Use these instead of direct HashMap/HashSet to allow future optimization
//! and ensure consistent hashing across the codebase.
//!
//! # Example
//!
//! ```rust
//! use quarry_common::collections::{QuarryMap, QuarrySet};
//!
//! let mut map: QuarryMap<String, u32> = QuarryMap::default();
//! map.insert("test_1".to_string(), 1);
//!
//! let mut set: QuarrySet<u32> = QuarrySet::default();
//! set.insert(1);
//! ```

use rustc_hash::FxBuildHasher;

/// Standard HashMap with FxHash (fast, non-cryptographic).
///
/// Catalog keys are small integers and short names, which FxHash handles well.
pub type QuarryMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

/// Standard HashSet with FxHash.
pub type QuarrySet<T> = hashbrown::HashSet<T, FxBuildHasher>;

/// Create a new empty [`QuarryMap`].
#[inline]
#[must_use]
pub fn quarry_map<K, V>() -> QuarryMap<K, V> {
    QuarryMap::default()
}

/// Create a [`QuarryMap`] with pre-allocated capacity.
#[inline]
#[must_use]
pub fn quarry_map_with_capacity<K, V>(capacity: usize) -> QuarryMap<K, V> {
    QuarryMap::with_capacity_and_hasher(capacity, FxBuildHasher)
}

/// Create a new empty [`QuarrySet`].
#[inline]
#[must_use]
pub fn quarry_set<T>() -> QuarrySet<T> {
    QuarrySet::default()
}

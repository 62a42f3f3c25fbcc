//! A deterministic `HashMap`. The hashing data structures in the standard library are randomly
//! seeded, so iteration order differs between runs; the ledger's indexes use this one instead so
//! that logs and test failures are reproducible.
//!
//! `HashMap<K, V, S>` has no `new` method for a non-default hasher. Use `HashMap::default()`, or
//! bring `HashMapExt` into scope to keep the familiar API.

pub use rustc_hash::FxHashMap as HashMap;

/// Provides `new` for [`HashMap`].
pub trait HashMapExt {
    fn new() -> Self;
}

impl<K, V> HashMapExt for HashMap<K, V> {
    fn new() -> Self {
        HashMap::default()
    }
}

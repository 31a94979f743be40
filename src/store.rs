//! Ordered key/value store shared by headers, cookies and URL parameters.
//!
//! Every string-keyed collection in a request behaves the same way: lookups
//! never fail (a missing key reads as `""`), inserting an existing key
//! replaces its value in place, and iteration follows insertion order. The
//! only thing that varies between usage sites is how keys are compared, so
//! that is the type parameter.
//!
//! | Alias | Matching | Used for |
//! |---|---|---|
//! | [`Headers`] | ASCII case-insensitive | request headers, part headers, cookies, sub-header parameters |
//! | [`Parameters`] | exact | URL query parameters |

use std::fmt;
use std::marker::PhantomData;

// ── Key matching ──────────────────────────────────────────────────────────────

/// How a [`KeyedStore`] compares keys.
pub trait KeyMatch {
    fn matches(stored: &str, wanted: &str) -> bool;
}

/// ASCII case-insensitive keys (`Content-Type` == `content-type`).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IgnoreCase;

/// Byte-for-byte keys.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Exact;

impl KeyMatch for IgnoreCase {
    fn matches(stored: &str, wanted: &str) -> bool { stored.eq_ignore_ascii_case(wanted) }
}

impl KeyMatch for Exact {
    fn matches(stored: &str, wanted: &str) -> bool { stored == wanted }
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Insertion-ordered `String → String` map with upsert semantics.
#[derive(Clone, Eq, PartialEq)]
pub struct KeyedStore<M = IgnoreCase> {
    entries: Vec<(String, String)>,
    _match: PhantomData<M>,
}

/// Header-style store: case-insensitive keys.
pub type Headers = KeyedStore<IgnoreCase>;

/// Query-parameter store: exact keys.
pub type Parameters = KeyedStore<Exact>;

impl<M: KeyMatch> KeyedStore<M> {
    pub fn new() -> Self {
        Self { entries: Vec::new(), _match: PhantomData }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Returns the value for `key`, or `""` when absent.
    ///
    /// Use [`try_get`](Self::try_get) to tell "absent" from "present but empty".
    pub fn get(&self, key: &str) -> &str {
        self.try_get(key).unwrap_or("")
    }

    pub fn try_get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].1.as_str())
    }

    /// Inserts `key`, replacing the value of an existing matching key.
    ///
    /// A replaced entry keeps its original position and spelling.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => self.entries[i].1 = value,
            None    => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn clear(&mut self) { self.entries.clear() }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| M::matches(k, key))
    }
}

impl<M: KeyMatch> Default for KeyedStore<M> {
    fn default() -> Self { Self::new() }
}

impl<M> fmt::Debug for KeyedStore<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, v)| (k, v))).finish()
    }
}

impl<M: KeyMatch, K: Into<String>, V: Into<String>> Extend<(K, V)> for KeyedStore<M> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<M: KeyMatch, K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyedStore<M> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

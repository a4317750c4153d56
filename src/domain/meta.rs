//! Field metadata - `#[meta(key = "value")]` lookups.
//!
//! Every declared field (metric slot, nested group, label field) carries
//! an ordered list of string pairs. The binding core only inspects the keys
//! it owns (`name`, `help`, `namespace`, `label`, `default`); builders read
//! their own keys (`buckets`, `objectives`, `max_age`, ...) directly.

use std::fmt;

/// Metadata key holding a metric's name.
pub const NAME: &str = "name";
/// Metadata key holding a metric's help text.
pub const HELP: &str = "help";
/// Metadata key holding a nested group's namespace segment.
pub const NAMESPACE: &str = "namespace";
/// Metadata key holding a label field's wire name.
pub const LABEL: &str = "label";
/// Metadata key holding a label field's substitute for zero values.
pub const DEFAULT: &str = "default";

/// Ordered key/value metadata attached to one declared field.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Meta<'a> {
    entries: &'a [(&'a str, &'a str)],
}

impl<'a> Meta<'a> {
    /// Wrap a list of `(key, value)` pairs.
    pub const fn new(entries: &'a [(&'a str, &'a str)]) -> Self {
        Self { entries }
    }

    /// Metadata with no entries.
    pub const fn empty() -> Self {
        Self { entries: &[] }
    }

    /// Look up `key`. The first entry wins when a key is repeated.
    ///
    /// `Some("")` means the key is present with an empty value, which
    /// several builders treat differently from an absent key.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// Whether `key` is present, regardless of its value.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All entries in declaration order.
    pub fn entries(&self) -> &'a [(&'a str, &'a str)] {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Meta<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

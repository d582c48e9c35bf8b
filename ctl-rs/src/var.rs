//! Variable store.
//!
//! A fixed-capacity table of named numeric slots.  Scripts create a slot on
//! first assignment and overwrite it in place afterwards; the whole table is
//! dropped at once by [`VarStore::reset`].
//!
//! Lookups are lenient: an undefined name reads as `0.0`, matching the
//! scripting language's permissive semantics.  Only running out of slots is
//! an error.

use thiserror::Error;

/// Default number of slots.
pub const DEFAULT_MAX_VARS: usize = 32;

/// Default maximum name length; longer names are truncated.
pub const DEFAULT_MAX_NAME_LEN: usize = 15;

// ── StoreError ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Every slot is taken and `name` is not one of them.
    #[error("variable table full ({capacity} slots), cannot define '{name}'")]
    CapacityExceeded { name: String, capacity: usize },
}

// ── VarStore ──────────────────────────────────────────────────────────────────

/// Fixed-capacity name → value store.
///
/// Slots are kept in a flat vector; with a few dozen entries a linear scan
/// beats hashing and keeps iteration order stable for listings.
#[derive(Debug, Clone)]
pub struct VarStore {
    slots: Vec<(String, f32)>,
    capacity: usize,
    max_name_len: usize,
}

impl Default for VarStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VARS, DEFAULT_MAX_NAME_LEN)
    }
}

impl VarStore {
    pub fn new(capacity: usize, max_name_len: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            max_name_len: max_name_len.max(1),
        }
    }

    /// Set (or overwrite) a variable.
    ///
    /// Fails without touching the table when `name` is new and no free slot
    /// is left.
    pub fn set(&mut self, name: &str, value: f32) -> Result<(), StoreError> {
        let key = self.key(name);
        if let Some(slot) = self.slots.iter_mut().find(|(n, _)| n == key) {
            slot.1 = value;
            return Ok(());
        }
        if self.slots.len() >= self.capacity {
            return Err(StoreError::CapacityExceeded {
                name: key.to_owned(),
                capacity: self.capacity,
            });
        }
        self.slots.push((key.to_owned(), value));
        Ok(())
    }

    /// Value of `name`, or `0.0` if it was never assigned.
    pub fn get(&self, name: &str) -> f32 {
        self.lookup(name).unwrap_or(0.0)
    }

    /// Value of `name` if it exists.
    ///
    /// The expression evaluator needs to tell "defined as zero" apart from
    /// "not a variable at all".
    pub fn lookup(&self, name: &str) -> Option<f32> {
        let key = self.key(name);
        self.slots.iter().find(|(n, _)| n == key).map(|(_, v)| *v)
    }

    /// Returns `true` if the variable is set.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Drop every variable.
    pub fn reset(&mut self) {
        self.slots.clear();
    }

    /// Iterate over all variables in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.slots.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Truncate `name` to the configured length on a char boundary.
    fn key<'a>(&self, name: &'a str) -> &'a str {
        match name.char_indices().nth(self.max_name_len) {
            Some((idx, _)) => &name[..idx],
            None => name,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

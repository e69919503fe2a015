//! Save-state contract.
//!
//! A state image is an ordered list of named 32-bit integers. Components
//! write every field they own and read them back by name; the image is
//! opaque beyond that. File I/O belongs to the host.

use thiserror::Error;

/// Errors raised when importing or exporting a state image.
#[derive(Debug, Error)]
pub enum StateError {
    /// The image isn't valid JSON or doesn't have the expected shape.
    #[cfg(feature = "serde")]
    #[error("malformed state image: {0}")]
    Json(#[from] serde_json::Error),
    /// The same key appears twice in an imported image.
    #[error("duplicate state key `{0}`")]
    DuplicateKey(String),
}

/// One named field of a state image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateEntry {
    pub key: String,
    pub value: u32,
}

/// Ordered key/value store backing a state image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateStore {
    entries: Vec<StateEntry>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a field. Rewriting an existing key keeps its original position.
    pub fn set(&mut self, key: &str, value: u32) {
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(StateEntry {
                key: key.to_owned(),
                value,
            }),
        }
    }

    /// Read a field. Missing keys read as zero.
    #[must_use]
    pub fn get(&self, key: &str) -> u32 {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map_or(0, |entry| entry.value)
    }

    /// True if the key was written.
    #[cfg(test)]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    /// Fields in the order they were first written.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|entry| (entry.key.as_str(), entry.value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a store from an ordered list of fields, rejecting duplicates.
    pub fn from_entries(entries: Vec<StateEntry>) -> Result<Self, StateError> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|earlier| earlier.key == entry.key) {
                return Err(StateError::DuplicateKey(entry.key.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Export the image as a JSON array of `{ "key", "value" }` objects.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Import an image produced by [`StateStore::to_json`].
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        let entries: Vec<StateEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }
}

/// A component that can write itself into a state image and restore from one.
pub trait SaveState {
    /// Write every persisted field into `store`.
    fn save_state(&self, store: &mut StateStore);

    /// Overwrite the component's state from `store`.
    ///
    /// Never fails: fields missing from the image read as zero.
    fn load_state(&mut self, store: &StateStore);
}

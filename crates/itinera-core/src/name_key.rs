// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Matching keys for place names.
//!
//! Geocoder echoes of a query may differ from what was sent in casing,
//! accents or punctuation, so titles and response keys are joined on
//! [`normalize_key`] rather than on literal equality. Both sides of every
//! match must go through the same function.

use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics and drop everything that is not alphanumeric.
///
/// `"Santa María"` and `"santa maria"` both become `"santamaria"`.
pub fn normalize_key(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .nfd()
        .filter(|c| !is_combining_mark(*c) && c.is_alphanumeric())
        .collect()
}

pub fn normalize_key_opt(text: Option<&str>) -> String {
    text.map(normalize_key).unwrap_or_default()
}

/// Two distinct source strings that normalized to the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    pub key: String,
    pub kept: String,
    pub dropped: String,
}

/// Index from matching key to the first value inserted under it.
///
/// Later inserts with the same key never overwrite; when their source string
/// differs from the kept one the clash is recorded as a [`KeyCollision`].
#[derive(Debug, Clone)]
pub struct KeyIndex<T> {
    entries: HashMap<String, (String, T)>,
    collisions: Vec<KeyCollision>,
}

impl<T> Default for KeyIndex<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            collisions: Vec::new(),
        }
    }
}

impl<T> KeyIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the value was stored. Sources with an empty key
    /// (emoji or punctuation only) are never stored.
    pub fn insert(&mut self, source: &str, value: T) -> bool {
        let key = normalize_key(source);
        if key.is_empty() {
            return false;
        }
        match self.entries.get(&key) {
            Some((kept, _)) => {
                if kept != source {
                    self.collisions.push(KeyCollision {
                        key,
                        kept: kept.clone(),
                        dropped: source.to_string(),
                    });
                }
                false
            }
            None => {
                self.entries.insert(key, (source.to_string(), value));
                true
            }
        }
    }

    /// Looks up by an arbitrary string, normalizing it first.
    pub fn get(&self, source: &str) -> Option<&T> {
        let key = normalize_key(source);
        if key.is_empty() {
            return None;
        }
        self.entries.get(&key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }

    pub fn into_collisions(self) -> Vec<KeyCollision> {
        self.collisions
    }
}

impl<'a, T> FromIterator<(&'a str, T)> for KeyIndex<T> {
    fn from_iter<I: IntoIterator<Item = (&'a str, T)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (source, value) in iter {
            index.insert(source, value);
        }
        index
    }
}

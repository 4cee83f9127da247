//! Tag filter parsing.
//!
//! The filter is written as `key=value` pairs separated by `;`, e.g.
//! `env=prod;team=infra`. An entry without `=` is a fatal configuration
//! error. An empty filter places no tag constraint on discovery.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ConfigError, ConfigResult};

/// Tag key → tag value constraint applied during instance discovery.
///
/// Keys are unique. Entries are kept sorted by key so the requests built
/// from a filter are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: BTreeMap<String, String>,
}

impl TagFilter {
    /// A filter with no constraints.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a `;`-separated list of `key=value` pairs.
    ///
    /// Only the first `=` splits key from value, so values may contain `=`.
    /// A repeated key keeps its last value.
    pub fn parse(input: &str) -> ConfigResult<Self> {
        let input = input.trim();
        let mut tags = BTreeMap::new();
        if input.is_empty() {
            return Ok(Self { tags });
        }

        for entry in input.split(';') {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedTag(entry.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::MalformedTag(entry.to_string()));
            }
            tags.insert(key.to_string(), value.trim().to_string());
        }

        Ok(Self { tags })
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Iterate `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

//! Case-insensitive, case-retentive string keys
//!
//! Category names, capability names and parameter names are matched without
//! regard to case but displayed with the spelling they were created with.
//! [`CaselessKey`] carries both: a lower-cased form drives `Eq`/`Ord`/`Hash`,
//! the original spelling drives `Display`, [`as_str`](CaselessKey::as_str)
//! and serialization.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A string key compared case-insensitively, displayed case-retentively.
#[derive(Debug, Clone)]
pub struct CaselessKey {
    display: String,
    folded: String,
}

impl CaselessKey {
    /// Create a key from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        let display = name.into();
        let folded = display.to_lowercase();
        Self { display, folded }
    }

    /// The original spelling this key was created with.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The lower-cased form used for comparison and hashing.
    pub fn folded(&self) -> &str {
        &self.folded
    }

    /// Case-insensitive comparison against a plain string.
    pub fn matches(&self, name: &str) -> bool {
        self.folded == name.to_lowercase()
    }
}

impl PartialEq for CaselessKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for CaselessKey {}

impl PartialOrd for CaselessKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CaselessKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl Hash for CaselessKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl Borrow<str> for CaselessKey {
    fn borrow(&self) -> &str {
        &self.folded
    }
}

impl fmt::Display for CaselessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for CaselessKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CaselessKey {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

// On the wire a key is just its original spelling.
impl Serialize for CaselessKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

impl<'de> Deserialize<'de> for CaselessKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(CaselessKey::new)
    }
}

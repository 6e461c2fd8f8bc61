//! Priority-ordered aggregation of capabilities
//!
//! A [`CapabilitySet`] collects the full capability surface of one party:
//! capabilities grouped by category and, within a category, by capability
//! name. Everything added earlier outranks everything added later — the
//! insertion order within a `(category, name)` bucket is the priority order
//! used wherever a "best" or "first" result is needed.
//!
//! Set-level negotiation intersects two sets category by category: common
//! categories run the full cross product of their members, categories
//! present on one side only are dropped. The inputs are never mutated; a
//! negotiation always builds a new set.

use serde::{Deserialize, Serialize};

use super::capability::Capability;
use super::caseless::CaselessKey;
use crate::{Error, Result};

// =============================================================================
// SequentialMap
// =============================================================================

/// Insertion-ordered map from capability name to the list of capabilities
/// carrying that name, each list itself in insertion (priority) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SequentialMap {
    entries: Vec<(CaselessKey, Vec<Capability>)>,
}

impl SequentialMap {
    fn put(&mut self, capability: Capability) {
        let key = CaselessKey::new(capability.name());
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some((_, bucket)) => bucket.push(capability),
            None => self.entries.push((key, vec![capability])),
        }
    }

    /// Remove one structurally equal capability. Returns false when no
    /// match exists; prunes the name entry when its bucket empties.
    fn remove(&mut self, capability: &Capability) -> bool {
        let key = CaselessKey::new(capability.name());
        let Some(index) = self.entries.iter().position(|(name, _)| *name == key) else {
            return false;
        };
        let bucket = &mut self.entries[index].1;
        let Some(found) = bucket.iter().position(|member| member == capability) else {
            return false;
        };
        bucket.remove(found);
        if bucket.is_empty() {
            self.entries.remove(index);
        }
        true
    }

    fn bucket(&self, name: &str) -> &[Capability] {
        self.entries
            .iter()
            .find(|(key, _)| key.matches(name))
            .map(|(_, bucket)| bucket.as_slice())
            .unwrap_or(&[])
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// All members across names, in name-insertion then bucket order,
    /// de-duplicated by structural equality.
    fn members(&self) -> Vec<&Capability> {
        let mut all: Vec<&Capability> = Vec::new();
        for (_, bucket) in &self.entries {
            for member in bucket {
                if !all.iter().any(|seen| *seen == member) {
                    all.push(member);
                }
            }
        }
        all
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// CapabilitySet
// =============================================================================

/// The aggregated capabilities of one party, uniformly preference or
/// non-preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySet {
    is_preference: bool,
    categories: Vec<(CaselessKey, SequentialMap)>,
}

impl CapabilitySet {
    /// Create an empty set accepting only members whose preference flag
    /// equals `is_preference`.
    pub fn new(is_preference: bool) -> Self {
        Self {
            is_preference,
            categories: Vec::new(),
        }
    }

    /// Whether this set aggregates preference capabilities.
    pub fn is_preference(&self) -> bool {
        self.is_preference
    }

    /// True when no capability has been added.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total number of member capabilities.
    pub fn len(&self) -> usize {
        self.categories
            .iter()
            .map(|(_, map)| map.entries.iter().map(|(_, b)| b.len()).sum::<usize>())
            .sum()
    }

    /// Add a capability. Adding a member whose preference flag differs from
    /// the set's is a contract error.
    pub fn add(&mut self, capability: Capability) -> Result<()> {
        if capability.is_preference() != self.is_preference {
            return Err(Error::FlagMismatch(format!(
                "capability '{}:{}' is a {} but this set holds {}s",
                capability.category(),
                capability.name(),
                flag_word(capability.is_preference()),
                flag_word(self.is_preference),
            )));
        }
        self.category_map_mut(capability.category()).put(capability);
        Ok(())
    }

    /// Remove a previously added capability. Removing a capability that is
    /// not a member is a contract error.
    pub fn remove(&mut self, capability: &Capability) -> Result<()> {
        let key = CaselessKey::new(capability.category());
        let position = self.categories.iter().position(|(cat, _)| *cat == key);
        let removed = position
            .map(|index| self.categories[index].1.remove(capability))
            .unwrap_or(false);
        if !removed {
            return Err(Error::NotAMember {
                category: capability.category().to_string(),
                name: capability.name().to_string(),
            });
        }
        // Prune the category once its last bucket is gone.
        if let Some(index) = position {
            if self.categories[index].1.is_empty() {
                self.categories.remove(index);
            }
        }
        Ok(())
    }

    /// All member capabilities for a category, across names, in priority
    /// order, de-duplicated. Empty when the category is absent.
    pub fn get(&self, category: &str) -> Vec<&Capability> {
        self.category_map(category)
            .map(SequentialMap::members)
            .unwrap_or_default()
    }

    /// Member capabilities for one `(category, name)` bucket in priority
    /// order.
    pub fn get_by_name(&self, category: &str, name: &str) -> Vec<&Capability> {
        self.category_map(category)
            .map(|map| map.bucket(name).iter().collect())
            .unwrap_or_default()
    }

    /// Categories in insertion order (original spelling, no duplicates).
    pub fn categories(&self) -> Vec<&str> {
        self.categories.iter().map(|(key, _)| key.as_str()).collect()
    }

    /// Capability names present under a category, in insertion order.
    pub fn capability_names(&self, category: &str) -> Vec<&str> {
        self.category_map(category)
            .map(|map| map.names().collect())
            .unwrap_or_default()
    }

    /// Negotiate this set against another.
    ///
    /// Every category present in both sets runs the full cross product of
    /// its members (`self`'s list outer, `other`'s inner); every pairwise
    /// success lands in the result in the order produced. Categories unique
    /// to one side are dropped. A result with no members at all is a failed
    /// negotiation (`None`), not an empty set. The result set is a
    /// preference only when both operands are.
    pub fn negotiate(&self, other: &CapabilitySet) -> Option<CapabilitySet> {
        let mut negotiated = CapabilitySet::new(self.is_preference && other.is_preference);

        for (category, map) in &self.categories {
            if other.category_map(category.as_str()).is_none() {
                continue;
            }
            let ours = map.members();
            let theirs = other.get(category.as_str());
            for mine in &ours {
                for yours in &theirs {
                    if let Some(result) = mine.negotiate(yours) {
                        // Pairwise results always carry the AND of the two
                        // set flags, so this insert cannot flag-mismatch.
                        negotiated
                            .category_map_mut(result.category())
                            .put(result);
                    }
                }
            }
        }

        if negotiated.is_empty() {
            tracing::debug!("set negotiation failed: no pairwise result in any common category");
            return None;
        }

        Some(negotiated)
    }

    /// The highest-priority capability for a category, or `None` when the
    /// category is absent.
    pub fn negotiated_value(&self, category: &str) -> Option<&Capability> {
        self.get(category).first().copied()
    }

    /// Category-scoped negotiation against another set, returning the first
    /// pairwise success found scanning `self`'s members outer and `other`'s
    /// inner, both in priority order.
    pub fn negotiated_value_with(
        &self,
        other: &CapabilitySet,
        category: &str,
    ) -> Option<Capability> {
        let theirs = other.get(category);
        for mine in self.get(category) {
            for yours in &theirs {
                if let Some(result) = mine.negotiate(yours) {
                    return Some(result);
                }
            }
        }
        None
    }

    fn category_map(&self, category: &str) -> Option<&SequentialMap> {
        self.categories
            .iter()
            .find(|(key, _)| key.matches(category))
            .map(|(_, map)| map)
    }

    fn category_map_mut(&mut self, category: &str) -> &mut SequentialMap {
        let key = CaselessKey::new(category);
        let index = match self.categories.iter().position(|(cat, _)| *cat == key) {
            Some(index) => index,
            None => {
                self.categories.push((key, SequentialMap::default()));
                self.categories.len() - 1
            }
        };
        &mut self.categories[index].1
    }
}

fn flag_word(is_preference: bool) -> &'static str {
    if is_preference {
        "preference"
    } else {
        "non-preference"
    }
}

//! Capability descriptions and pairwise negotiation
//!
//! A [`Capability`] is a named, categorized bundle of parameters whose
//! values are [`Negotiable`] domains, flagged as either a *preference*
//! (a partial wishlist — unset parameters mean "no opinion") or a
//! *non-preference* (a complete description of a supported configuration —
//! every parameter must end up with a value). Negotiating two capabilities
//! intersects their parameter domains under a four-way case analysis on the
//! two flags.
//!
//! Capabilities are immutable once built: [`CapabilityBuilder`] collects the
//! parameter schema (name, class, default) and the values, and `build()`
//! freezes them. Negotiation always produces a new `Capability`.

use serde::{Deserialize, Serialize};

use super::caseless::CaselessKey;
use super::negotiable::{Negotiable, ParamValue, ValueClass};
use crate::{Error, Result};

// =============================================================================
// Generators
// =============================================================================

/// Opaque back-reference to the entity that produced a capability.
///
/// Carried through negotiation purely for downstream identification — a
/// successful negotiation concatenates the generators of both operands so
/// the consumer can locate, say, the encoder and decoder factories whose
/// descriptions were reconciled. The engine never inspects the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    /// Label identifying the generating entity (e.g. "TileDecoderFactory")
    pub label: String,
    /// Free-form payload supplied by the generating entity
    pub payload: serde_json::Value,
}

impl Generator {
    /// Create a generator reference with an empty payload.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Attach a payload to this generator reference.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// =============================================================================
// Parameter slots
// =============================================================================

/// One parameter of a capability: schema (name, class, default) plus the
/// current value. Slots keep declaration order; lookup is case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ParamSlot {
    name: CaselessKey,
    class: ValueClass,
    default: Option<Negotiable>,
    value: Option<Negotiable>,
}

// =============================================================================
// Capability
// =============================================================================

/// A named, categorized, typed description of what one party can do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    category: CaselessKey,
    name: CaselessKey,
    is_preference: bool,
    params: Vec<ParamSlot>,
    generators: Vec<Generator>,
}

impl Capability {
    /// Start building a preference capability for `category`/`name`.
    pub fn preference(category: impl Into<String>, name: impl Into<String>) -> CapabilityBuilder {
        CapabilityBuilder::new(category, name, true)
    }

    /// Start building a non-preference capability for `category`/`name`.
    pub fn non_preference(
        category: impl Into<String>,
        name: impl Into<String>,
    ) -> CapabilityBuilder {
        CapabilityBuilder::new(category, name, false)
    }

    /// Category this capability belongs to (original spelling).
    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    /// Name of this capability (original spelling).
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Whether this capability is a preference.
    pub fn is_preference(&self) -> bool {
        self.is_preference
    }

    /// Generator references carried by this capability.
    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    /// Parameter names in declaration order (original spelling).
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|slot| slot.name.as_str())
    }

    /// Number of declared parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Current value of the named parameter. `None` when the parameter is
    /// unknown or unset.
    pub fn value_of(&self, name: &str) -> Option<&Negotiable> {
        self.slot(name).and_then(|slot| slot.value.as_ref())
    }

    /// Declared class of the named parameter.
    pub fn class_of(&self, name: &str) -> Option<ValueClass> {
        self.slot(name).map(|slot| slot.class)
    }

    /// Declared default of the named parameter.
    pub fn default_of(&self, name: &str) -> Option<&Negotiable> {
        self.slot(name).and_then(|slot| slot.default.as_ref())
    }

    /// Single representative value of the named parameter's domain.
    ///
    /// `Ok(None)` is a legitimate answer on a preference whose parameter is
    /// unset. Naming an undeclared parameter is a contract error.
    pub fn negotiated_value(&self, name: &str) -> Result<Option<ParamValue>> {
        let slot = self.slot(name).ok_or_else(|| Error::UnknownParameter {
            name: name.to_string(),
        })?;
        Ok(slot.value.as_ref().and_then(Negotiable::value))
    }

    fn slot(&self, name: &str) -> Option<&ParamSlot> {
        self.params.iter().find(|slot| slot.name.matches(name))
    }

    /// Whether the parameter schemas of the two capabilities are compatible
    /// for negotiation.
    ///
    /// Two non-preferences must declare the same number of parameters with
    /// the same names and classes. As soon as either side is a preference,
    /// only the shared names must agree on class; extra names on either side
    /// never block compatibility.
    pub fn schemas_compatible(&self, other: &Capability) -> bool {
        if !self.is_preference && !other.is_preference {
            if self.params.len() != other.params.len() {
                return false;
            }
            return self.params.iter().all(|slot| {
                other
                    .slot(slot.name.folded())
                    .is_some_and(|theirs| theirs.class == slot.class)
            });
        }

        self.params.iter().all(|slot| {
            other
                .slot(slot.name.folded())
                .map_or(true, |theirs| theirs.class == slot.class)
        })
    }

    /// Negotiate this capability against another.
    ///
    /// Fails (`None`) when category or name differ (case-insensitively),
    /// when the schemas are incompatible, or when any shared parameter's
    /// domains fail to intersect. On success the result carries `self`'s
    /// category and name spelling, the concatenated generators of both
    /// operands, and one slot per parameter that survived: shared names
    /// first in `self`'s declaration order, then `self`-only extras, then
    /// `other`-only extras.
    ///
    /// The result is a preference only when both operands are preferences.
    /// Negotiation is pure: the operands are never mutated and repeated
    /// calls yield equal results.
    pub fn negotiate(&self, other: &Capability) -> Option<Capability> {
        if self.category != other.category || self.name != other.name {
            tracing::trace!(
                category = self.category.as_str(),
                name = self.name.as_str(),
                "negotiation failed: category or name mismatch"
            );
            return None;
        }

        if !self.schemas_compatible(other) {
            tracing::debug!(
                category = self.category.as_str(),
                name = self.name.as_str(),
                "negotiation failed: incompatible parameter schemas"
            );
            return None;
        }

        let params = match (self.is_preference, other.is_preference) {
            (true, true) => self.negotiate_params_pref_pref(other)?,
            (false, true) => self.negotiate_params_mixed(other, true)?,
            (true, false) => self.negotiate_params_mixed(other, false)?,
            (false, false) => self.negotiate_params_non_pref(other)?,
        };

        let mut generators = self.generators.clone();
        generators.extend(other.generators.iter().cloned());

        Some(Capability {
            category: self.category.clone(),
            name: self.name.clone(),
            is_preference: self.is_preference && other.is_preference,
            params,
            generators,
        })
    }

    /// Both operands are preferences. Shared names intersect, with either
    /// side's absent value deferring to the other (both absent stays absent
    /// without failing); names unique to either side copy through verbatim.
    /// Result order: shared names in `self`'s declaration order, then
    /// `self`-only extras, then `other`-only extras.
    fn negotiate_params_pref_pref(&self, other: &Capability) -> Option<Vec<ParamSlot>> {
        let mut result: Vec<ParamSlot> = Vec::with_capacity(self.params.len());

        for slot in &self.params {
            if let Some(theirs) = other.slot(slot.name.folded()) {
                let value = match (&slot.value, &theirs.value) {
                    (None, any) => any.clone(),
                    (any, None) => any.clone(),
                    (Some(mine), Some(yours)) => Some(mine.negotiate(yours)?),
                };
                result.push(ParamSlot {
                    name: slot.name.clone(),
                    class: slot.class,
                    default: slot.default.clone(),
                    value,
                });
            }
        }

        for slot in &self.params {
            if other.slot(slot.name.folded()).is_none() {
                result.push(slot.clone());
            }
        }

        for theirs in &other.params {
            if self.slot(theirs.name.folded()).is_none() {
                result.push(theirs.clone());
            }
        }

        Some(result)
    }

    /// One operand is a preference, the other a non-preference; the result
    /// is always a non-preference. `self_is_supported` says which role
    /// `self` plays.
    ///
    /// Shared names require a value on the non-preference side; an absent
    /// preference value takes the non-preference's value directly (an
    /// intersection against nothing must not fail the parameter). Shared
    /// intersections put the non-preference's domain on the left so set
    /// ordering follows the supported side. Non-preference extras copy
    /// through and must be set; preference extras are dropped. Shared slots
    /// keep `self`'s name spelling, class and default; the shared block
    /// comes first in `self`'s declaration order, the surviving extras
    /// after it.
    fn negotiate_params_mixed(
        &self,
        other: &Capability,
        self_is_supported: bool,
    ) -> Option<Vec<ParamSlot>> {
        let mut result: Vec<ParamSlot> = Vec::with_capacity(self.params.len());

        for slot in &self.params {
            let Some(theirs) = other.slot(slot.name.folded()) else {
                continue;
            };
            let (supported, preferred) = if self_is_supported {
                (&slot.value, &theirs.value)
            } else {
                (&theirs.value, &slot.value)
            };
            let supported = supported.as_ref()?;
            let value = match preferred {
                Some(wanted) => supported.negotiate(wanted)?,
                None => supported.clone(),
            };
            result.push(ParamSlot {
                name: slot.name.clone(),
                class: slot.class,
                default: slot.default.clone(),
                value: Some(value),
            });
        }

        let (supported_side, preference_side) = if self_is_supported {
            (self, other)
        } else {
            (other, self)
        };
        for slot in &supported_side.params {
            if preference_side.slot(slot.name.folded()).is_some() {
                continue;
            }
            // A non-preference extra still has to carry a value.
            slot.value.as_ref()?;
            result.push(slot.clone());
        }

        Some(result)
    }

    /// Both operands are non-preferences. The schema check already forced
    /// identical names; every parameter must be set on both sides and every
    /// intersection must succeed.
    fn negotiate_params_non_pref(&self, other: &Capability) -> Option<Vec<ParamSlot>> {
        let mut result: Vec<ParamSlot> = Vec::with_capacity(self.params.len());

        for slot in &self.params {
            let mine = slot.value.as_ref()?;
            let yours = other.slot(slot.name.folded())?.value.as_ref()?;
            let value = mine.negotiate(yours)?;
            result.push(ParamSlot {
                name: slot.name.clone(),
                class: slot.class,
                default: slot.default.clone(),
                value: Some(value),
            });
        }

        Some(result)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Accumulates a capability's parameter schema and values, then freezes
/// them into an immutable [`Capability`].
///
/// Defaults apply to non-preferences only: a non-preference parameter left
/// unset takes its declared default at build time (possibly staying unset
/// when no default exists, which then fails negotiation on that parameter).
/// A preference parameter left unset stays unset — that is its "no opinion"
/// state — and defaults are never substituted.
#[derive(Debug, Clone)]
pub struct CapabilityBuilder {
    category: CaselessKey,
    name: CaselessKey,
    is_preference: bool,
    declared: Vec<(CaselessKey, ValueClass, Option<Negotiable>)>,
    values: Vec<(CaselessKey, Negotiable)>,
    generators: Vec<Generator>,
}

impl CapabilityBuilder {
    fn new(category: impl Into<String>, name: impl Into<String>, is_preference: bool) -> Self {
        Self {
            category: CaselessKey::new(category),
            name: CaselessKey::new(name),
            is_preference,
            declared: Vec::new(),
            values: Vec::new(),
            generators: Vec::new(),
        }
    }

    /// Declare a parameter with no default.
    pub fn param(self, name: impl Into<String>, class: ValueClass) -> Self {
        self.param_with_default_opt(name, class, None)
    }

    /// Declare a parameter with a default domain.
    pub fn param_with_default(
        self,
        name: impl Into<String>,
        class: ValueClass,
        default: Negotiable,
    ) -> Self {
        self.param_with_default_opt(name, class, Some(default))
    }

    fn param_with_default_opt(
        mut self,
        name: impl Into<String>,
        class: ValueClass,
        default: Option<Negotiable>,
    ) -> Self {
        self.declared.push((CaselessKey::new(name), class, default));
        self
    }

    /// Set the value of a declared parameter. Later calls for the same name
    /// override earlier ones.
    pub fn value(mut self, name: impl Into<String>, value: Negotiable) -> Self {
        self.values.push((CaselessKey::new(name), value));
        self
    }

    /// Attach a generator reference.
    pub fn generator(mut self, generator: Generator) -> Self {
        self.generators.push(generator);
        self
    }

    /// Validate the accumulated schema and values and produce the immutable
    /// capability.
    ///
    /// Contract errors: a parameter declared twice, a value for an
    /// undeclared parameter, a default or value whose class differs from
    /// the declared class.
    pub fn build(self) -> Result<Capability> {
        let mut params: Vec<ParamSlot> = Vec::with_capacity(self.declared.len());

        for (name, class, default) in self.declared {
            if params.iter().any(|slot| slot.name == name) {
                return Err(Error::DuplicateParameter {
                    name: name.as_str().to_string(),
                });
            }
            if let Some(domain) = &default {
                check_class(&name, class, domain)?;
            }
            params.push(ParamSlot {
                name,
                class,
                default,
                value: None,
            });
        }

        for (name, value) in self.values {
            let slot = params
                .iter_mut()
                .find(|slot| slot.name == name)
                .ok_or_else(|| Error::UnknownParameter {
                    name: name.as_str().to_string(),
                })?;
            check_class(&slot.name, slot.class, &value)?;
            slot.value = Some(value);
        }

        // Non-preferences fall back to declared defaults; preferences keep
        // unset parameters as "no opinion".
        if !self.is_preference {
            for slot in &mut params {
                if slot.value.is_none() {
                    slot.value = slot.default.clone();
                }
            }
        }

        Ok(Capability {
            category: self.category,
            name: self.name,
            is_preference: self.is_preference,
            params,
            generators: self.generators,
        })
    }
}

fn check_class(name: &CaselessKey, declared: ValueClass, domain: &Negotiable) -> Result<()> {
    match domain.value_class() {
        Some(actual) if actual != declared => Err(Error::ClassMismatch {
            name: name.as_str().to_string(),
            declared,
            actual,
        }),
        _ => Ok(()),
    }
}

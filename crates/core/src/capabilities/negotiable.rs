//! Negotiable value domains
//!
//! A [`Negotiable`] describes the set of values one party can accept for a
//! single parameter: one exact value, a discrete collection, or a numeric
//! interval. Negotiating two domains intersects them; an empty intersection
//! fails the negotiation for that parameter. The three shapes are a closed
//! enum so every combination is matched exhaustively — two domains of
//! different shapes or element classes never intersect.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// =============================================================================
// Atomic values
// =============================================================================

/// One concrete element inside a negotiable domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Signed integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// Boolean value
    Flag(bool),
}

impl ParamValue {
    /// The class tag of this value.
    pub fn class(&self) -> ValueClass {
        match self {
            ParamValue::Integer(_) => ValueClass::Integer,
            ParamValue::Float(_) => ValueClass::Float,
            ParamValue::Text(_) => ValueClass::Text,
            ParamValue::Flag(_) => ValueClass::Flag,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Integer(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => f.write_str(v),
            ParamValue::Flag(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Flag(v)
    }
}

/// Element class of a [`ParamValue`] or of a whole negotiable domain.
///
/// Every non-empty domain has exactly one element class; negotiating two
/// domains of different classes always fails (it never errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueClass {
    /// Signed integers
    Integer,
    /// Floating point numbers
    Float,
    /// Text strings
    Text,
    /// Booleans
    Flag,
}

impl ValueClass {
    /// Whether values of this class can bound a numeric range.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueClass::Integer | ValueClass::Float)
    }

    /// The zero value of a numeric class. Used as the representative value
    /// of a range unbounded on both sides.
    fn zero(&self) -> Option<ParamValue> {
        match self {
            ValueClass::Integer => Some(ParamValue::Integer(0)),
            ValueClass::Float => Some(ParamValue::Float(0.0)),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueClass::Integer => "integer",
            ValueClass::Float => "float",
            ValueClass::Text => "text",
            ValueClass::Flag => "flag",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Numeric ranges
// =============================================================================

/// A possibly half- or fully-unbounded interval over one numeric class.
///
/// A `None` bound means unbounded on that side. Both present bounds must
/// belong to the range's class, and the lower bound must not exceed the
/// upper one; violations are contract errors at construction time, never
/// negotiation failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    class: ValueClass,
    lo: Option<ParamValue>,
    hi: Option<ParamValue>,
}

impl NumericRange {
    /// Create a range over `class` with optional bounds.
    pub fn new(
        class: ValueClass,
        lo: Option<ParamValue>,
        hi: Option<ParamValue>,
    ) -> Result<Self> {
        if !class.is_numeric() {
            return Err(Error::InvalidRange(format!(
                "ranges require a numeric class, got {}",
                class
            )));
        }
        for bound in [&lo, &hi].into_iter().flatten() {
            if bound.class() != class {
                return Err(Error::InvalidRange(format!(
                    "bound {} does not belong to class {}",
                    bound, class
                )));
            }
        }
        if let (Some(l), Some(h)) = (&lo, &hi) {
            if num_gt(l, h) {
                return Err(Error::InvalidRange(format!(
                    "lower bound {} exceeds upper bound {}",
                    l, h
                )));
            }
        }
        Ok(Self { class, lo, hi })
    }

    /// Bounded integer interval `[lo, hi]`.
    pub fn integers(lo: i64, hi: i64) -> Result<Self> {
        Self::new(
            ValueClass::Integer,
            Some(ParamValue::Integer(lo)),
            Some(ParamValue::Integer(hi)),
        )
    }

    /// Bounded float interval `[lo, hi]`.
    pub fn floats(lo: f64, hi: f64) -> Result<Self> {
        Self::new(
            ValueClass::Float,
            Some(ParamValue::Float(lo)),
            Some(ParamValue::Float(hi)),
        )
    }

    /// Numeric class of both bounds.
    pub fn class(&self) -> ValueClass {
        self.class
    }

    /// Lower bound, `None` when unbounded below.
    pub fn lo(&self) -> Option<&ParamValue> {
        self.lo.as_ref()
    }

    /// Upper bound, `None` when unbounded above.
    pub fn hi(&self) -> Option<&ParamValue> {
        self.hi.as_ref()
    }

    /// Interval intersection. `None` when the classes differ or the
    /// resulting interval is empty.
    pub fn intersect(&self, other: &NumericRange) -> Option<NumericRange> {
        if self.class != other.class {
            return None;
        }

        let lo = max_bound(self.lo.as_ref(), other.lo.as_ref());
        let hi = min_bound(self.hi.as_ref(), other.hi.as_ref());

        if let (Some(l), Some(h)) = (&lo, &hi) {
            if num_gt(l, h) {
                return None;
            }
        }

        Some(NumericRange {
            class: self.class,
            lo,
            hi,
        })
    }

    /// Representative value: the lower bound when bounded below, else the
    /// upper bound, else the class's zero.
    pub fn representative(&self) -> Option<ParamValue> {
        self.lo
            .clone()
            .or_else(|| self.hi.clone())
            .or_else(|| self.class.zero())
    }
}

// Numeric comparison between two values of the same class. Only called on
// bounds already validated to share one numeric class.
fn num_gt(a: &ParamValue, b: &ParamValue) -> bool {
    match (a, b) {
        (ParamValue::Integer(x), ParamValue::Integer(y)) => x > y,
        (ParamValue::Float(x), ParamValue::Float(y)) => x > y,
        _ => false,
    }
}

fn max_bound(a: Option<&ParamValue>, b: Option<&ParamValue>) -> Option<ParamValue> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if num_gt(x, y) { x.clone() } else { y.clone() }),
        (Some(x), None) => Some(x.clone()),
        (None, Some(y)) => Some(y.clone()),
        (None, None) => None,
    }
}

fn min_bound(a: Option<&ParamValue>, b: Option<&ParamValue>) -> Option<ParamValue> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if num_gt(x, y) { y.clone() } else { x.clone() }),
        (Some(x), None) => Some(x.clone()),
        (None, Some(y)) => Some(y.clone()),
        (None, None) => None,
    }
}

// =============================================================================
// Negotiable domains
// =============================================================================

/// The set of values one party accepts for a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Negotiable {
    /// Exactly one acceptable value
    Single(ParamValue),
    /// An ordered, duplicate-free collection of acceptable values
    Set(Vec<ParamValue>),
    /// A numeric interval of acceptable values
    Range(NumericRange),
}

impl Negotiable {
    /// Single-value domain.
    pub fn single(value: impl Into<ParamValue>) -> Self {
        Negotiable::Single(value.into())
    }

    /// Discrete-set domain. Duplicates are dropped keeping the first
    /// occurrence; an empty or class-mixed collection is a contract error.
    pub fn set(values: impl IntoIterator<Item = ParamValue>) -> Result<Self> {
        let mut unique: Vec<ParamValue> = Vec::new();
        for value in values {
            if let Some(first) = unique.first() {
                if value.class() != first.class() {
                    return Err(Error::MixedClasses {
                        first: first.class(),
                        second: value.class(),
                    });
                }
            }
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        if unique.is_empty() {
            return Err(Error::EmptyDomain(
                "a discrete set needs at least one value".to_string(),
            ));
        }
        Ok(Negotiable::Set(unique))
    }

    /// Range domain.
    pub fn range(range: NumericRange) -> Self {
        Negotiable::Range(range)
    }

    /// Element class of this domain, `None` only for a degenerate empty set.
    pub fn value_class(&self) -> Option<ValueClass> {
        match self {
            Negotiable::Single(v) => Some(v.class()),
            Negotiable::Set(values) => values.first().map(ParamValue::class),
            Negotiable::Range(range) => Some(range.class()),
        }
    }

    /// Intersect this domain with another of the same shape and class.
    ///
    /// Returns `None` when the shapes or element classes differ or the
    /// intersection is empty. A `Set` intersection preserves `self`'s
    /// relative ordering.
    pub fn negotiate(&self, other: &Negotiable) -> Option<Negotiable> {
        match (self, other) {
            (Negotiable::Single(a), Negotiable::Single(b)) => {
                if a == b {
                    Some(Negotiable::Single(a.clone()))
                } else {
                    None
                }
            }
            (Negotiable::Set(a), Negotiable::Set(b)) => {
                let mut common: Vec<ParamValue> = Vec::new();
                for value in a {
                    if b.contains(value) && !common.contains(value) {
                        common.push(value.clone());
                    }
                }
                if common.is_empty() {
                    None
                } else {
                    Some(Negotiable::Set(common))
                }
            }
            (Negotiable::Range(a), Negotiable::Range(b)) => {
                a.intersect(b).map(Negotiable::Range)
            }
            _ => None,
        }
    }

    /// Pick one representative value from this domain.
    ///
    /// `Single` yields its value, `Set` its first element, `Range` its lower
    /// bound (falling back to the upper bound, then to the class's zero).
    pub fn value(&self) -> Option<ParamValue> {
        match self {
            Negotiable::Single(v) => Some(v.clone()),
            Negotiable::Set(values) => values.first().cloned(),
            Negotiable::Range(range) => range.representative(),
        }
    }
}

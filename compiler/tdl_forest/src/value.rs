//! Attribute values and numeric literals.
//!
//! Floats are stored as their `u64` bit patterns, so values have exact
//! (bitwise) equality and can be hashed. This is what redefinition checks
//! need: a rebind is accepted only when the attributes are identical.

use std::collections::BTreeMap;
use std::fmt;

/// Committed attribute record of a node, keyed by attribute name.
pub type Attributes = BTreeMap<String, Value>;

/// A numeric or boolean literal usable directly as a child reference.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    /// `f64` bit pattern.
    Float(u64),
    /// Real and imaginary `f64` bit patterns.
    Complex(u64, u64),
}

impl Literal {
    pub fn float(v: f64) -> Self {
        Literal::Float(v.to_bits())
    }

    pub fn complex(re: f64, im: f64) -> Self {
        Literal::Complex(re.to_bits(), im.to_bits())
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Literal({self})")
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(bits) => write!(f, "{:?}", f64::from_bits(bits)),
            Literal::Complex(re, im) => {
                write!(f, "({:?}{:+?}j)", f64::from_bits(re), f64::from_bits(im))
            }
        }
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(i64::from(v))
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::float(v)
    }
}

/// A scalar, array or record attribute value.
#[derive(Clone, Eq, PartialEq, Hash)]
pub enum Value {
    Bool(bool),
    Int(i64),
    /// `f64` bit pattern.
    Float(u64),
    /// Real and imaginary `f64` bit patterns.
    Complex(u64, u64),
    Str(String),
    Array(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    pub fn float(v: f64) -> Self {
        Value::Float(v.to_bits())
    }

    pub fn complex(re: f64, im: f64) -> Self {
        Value::Complex(re.to_bits(), im.to_bits())
    }

    /// Numeric view of a scalar value.
    #[expect(
        clippy::cast_precision_loss,
        reason = "attribute integers are converted for display and arithmetic only"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(v) => Some(v as f64),
            Value::Float(bits) => Some(f64::from_bits(bits)),
            Value::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::Float(bits) => write!(f, "Float({:?})", f64::from_bits(*bits)),
            Value::Complex(re, im) => write!(
                f,
                "Complex({:?}, {:?})",
                f64::from_bits(*re),
                f64::from_bits(*im)
            ),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Record(fields) => f.debug_map().entries(fields).finish(),
        }
    }
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Bool(v) => Value::Bool(v),
            Literal::Int(v) => Value::Int(v),
            Literal::Float(bits) => Value::Float(bits),
            Literal::Complex(re, im) => Value::Complex(re, im),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(bits) => serializer.serialize_f64(f64::from_bits(*bits)),
            Value::Complex(re, im) => serde::Serialize::serialize(
                &(f64::from_bits(*re), f64::from_bits(*im)),
                serializer,
            ),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Array(items) => serde::Serialize::serialize(items, serializer),
            Value::Record(fields) => serde::Serialize::serialize(fields, serializer),
        }
    }
}

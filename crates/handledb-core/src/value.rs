//! Runtime cell values.
//!
//! This module defines the `Value` type stored in table cells. Values are
//! a small tagged union; `Null` doubles as the missing-value marker used
//! by outer joins and aggregation.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::schema::DataType;

/// A single cell value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Missing value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// String value.
    String(String),
}

impl Value {
    /// Creates an integer value.
    pub fn int(v: i64) -> Self {
        Value::Integer(v)
    }

    /// Creates a float value.
    pub fn float(v: f64) -> Self {
        Value::Float(v)
    }

    /// Creates a boolean value.
    pub fn boolean(v: bool) -> Self {
        Value::Boolean(v)
    }

    /// Creates a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Value::String(v.into())
    }

    /// Returns true if this value is missing.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts this value to an i64, if it has a numeric reading.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Null => None,
            Value::Boolean(b) => Some(i64::from(*b)),
            Value::Integer(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            Value::String(s) => s.parse().ok(),
        }
    }

    /// Converts this value to an f64, if it has a numeric reading.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.parse().ok(),
        }
    }

    /// Converts this value to a boolean.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Null => None,
            Value::Boolean(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::String(s) => Some(!s.is_empty()),
        }
    }

    /// Renders this value as the string used by column combination and
    /// CSV output. `Null` renders as the empty string.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }

    /// Returns the data type of this value, or `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Integer(_) => Some(DataType::Integer),
            Value::Float(_) => Some(DataType::Float),
            Value::String(_) => Some(DataType::Text),
        }
    }

    /// Numeric reading used by equality, ordering, and hashing. Unlike
    /// `to_f64` this never parses strings: a string is only ever equal
    /// to another string.
    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn tag_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Float(_) => 3,
            Value::String(_) => 4,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            // Cross-type comparison only between numeric tags
            (a, b) => match (a.numeric(), b.numeric()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Null sorts before any non-null value
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,

            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::String(a), Value::String(b)) => a.cmp(b),

            // Cross-type numeric comparison via f64; string/numeric
            // pairs fall back to the rendered form, tie-broken by tag
            // so equal ordering implies equality.
            (a, b) => match (a.numeric(), b.numeric()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => a
                    .render()
                    .cmp(&b.render())
                    .then_with(|| a.tag_rank().cmp(&b.tag_rank())),
            },
        }
    }
}

// Numeric tags hash through a normalized f64 so values the cross-type
// equality treats as equal (Integer(1), Float(1.0), Boolean(true)) land
// in the same hash bucket for join/group/dedup keys.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => state.write_u8(0),
            Value::String(s) => {
                state.write_u8(1);
                s.hash(state);
            }
            _ => {
                state.write_u8(2);
                if let Some(v) = self.numeric() {
                    // +0.0 and -0.0 compare equal; hash them alike.
                    let v = if v == 0.0 { 0.0 } else { v };
                    v.to_bits().hash(state);
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_null() {
        let v = Value::Null;
        assert!(v.is_null());
        assert_eq!(v.to_i64(), None);
        assert_eq!(v.render(), "");
        assert_eq!(v.to_string(), "NULL");
    }

    #[test]
    fn test_value_coercions() {
        assert_eq!(Value::int(42).to_f64(), Some(42.0));
        assert_eq!(Value::float(2.5).to_i64(), Some(2));
        assert_eq!(Value::boolean(true).to_i64(), Some(1));
        assert_eq!(Value::string("7").to_i64(), Some(7));
        assert_eq!(Value::string("abc").to_i64(), None);
    }

    #[test]
    fn test_value_comparison() {
        assert!(Value::int(10) < Value::int(20));
        assert_eq!(Value::int(10), Value::int(10));
        assert!(Value::Null < Value::int(0));
    }

    #[test]
    fn test_value_cross_type_comparison() {
        assert_eq!(Value::int(10), Value::float(10.0));
        assert!(Value::int(10) < Value::float(10.5));
        // Strings never compare equal to numbers, even numeric ones.
        assert_ne!(Value::string("10"), Value::int(10));
        assert_ne!(
            Value::string("10").cmp(&Value::int(10)),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn test_equal_numerics_hash_alike() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of(v: &Value) -> u64 {
            let mut hasher = DefaultHasher::new();
            v.hash(&mut hasher);
            hasher.finish()
        }

        assert_eq!(hash_of(&Value::int(1)), hash_of(&Value::float(1.0)));
        assert_eq!(hash_of(&Value::int(1)), hash_of(&Value::boolean(true)));
        assert_eq!(hash_of(&Value::int(0)), hash_of(&Value::float(-0.0)));

        // Cross-type keys land in the same map slot.
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(Value::int(1), "one");
        assert_eq!(map.get(&Value::float(1.0)), Some(&"one"));
    }

    #[test]
    fn test_value_hash() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(Value::int(1), "one");
        map.insert(Value::string("x"), "ex");

        assert_eq!(map.get(&Value::int(1)), Some(&"one"));
        assert_eq!(map.get(&Value::string("x")), Some(&"ex"));
    }

    #[test]
    fn test_value_data_type() {
        assert_eq!(Value::int(1).data_type(), Some(DataType::Integer));
        assert_eq!(Value::Null.data_type(), None);
    }
}

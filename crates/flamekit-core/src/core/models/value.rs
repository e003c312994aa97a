use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single lattice property value.
///
/// The lattice text format knows three value shapes: bare numbers, double-quoted
/// strings and bracketed numeric lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Str(String),
    Array(Vec<f64>),
}

/// Property map of one element (or of the lattice header), ordered by key.
pub type Properties = BTreeMap<String, Value>;

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Number of entries when the value is read as a list; a bare number counts as one.
    pub fn list_len(&self) -> usize {
        match self {
            Value::Number(_) => 1,
            Value::Str(_) => 0,
            Value::Array(a) => a.len(),
        }
    }

    /// Reads the value as a numeric list, promoting a bare number to a one-element list.
    pub fn to_list(&self) -> Option<Vec<f64>> {
        match self {
            Value::Number(n) => Some(vec![*n]),
            Value::Str(_) => None,
            Value::Array(a) => Some(a.clone()),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::Array(value)
    }
}

/// Writes a number in its shortest round-trip form (`400000.0`, `0.1`, `1e-6`).
pub(crate) fn write_number(f: &mut impl fmt::Write, n: f64) -> fmt::Result {
    write!(f, "{:?}", n)
}

/// Writes a numeric list as `[a, b, c]`.
pub(crate) fn write_list(f: &mut impl fmt::Write, values: &[f64]) -> fmt::Result {
    f.write_char('[')?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_number(f, *v)?;
    }
    f.write_char(']')
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write_number(f, *n),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Array(a) => write_list(f, a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_lattice_literal_syntax() {
        assert_eq!(Value::Number(400000.0).to_string(), "400000.0");
        assert_eq!(Value::Number(0.1).to_string(), "0.1");
        assert_eq!(Value::Number(1e-6).to_string(), "1e-6");
        assert_eq!(Value::from("thinlens").to_string(), "\"thinlens\"");
        assert_eq!(Value::from(vec![1.0, -0.5]).to_string(), "[1.0, -0.5]");
        assert_eq!(Value::Array(vec![]).to_string(), "[]");
    }

    #[test]
    fn list_helpers_promote_scalars() {
        assert_eq!(Value::Number(3.0).list_len(), 1);
        assert_eq!(Value::Number(3.0).to_list(), Some(vec![3.0]));
        assert_eq!(Value::from("P").to_list(), None);
        assert_eq!(Value::from(vec![1.0, 2.0]).list_len(), 2);
    }
}

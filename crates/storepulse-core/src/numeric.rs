//! Null-safe numeric coercion
//!
//! Monetary and quantity fields arrive either as JSON numbers or as decimal
//! strings (Postgres `numeric` columns are serialized as text to keep their
//! precision on the wire). Every KPI reads those fields through [`to_number`]
//! so that totals, averages, series and breakdowns agree on how nulls and
//! garbage are treated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A numeric value as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    /// Parse the value, `None` when it is not a finite number
    fn parse(&self) -> Option<f64> {
        let value = match self {
            Numeric::Number(n) => *n,
            Numeric::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Some(0.0);
                }
                trimmed.parse::<f64>().ok()?
            }
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Numeric::Number(value)
    }
}

impl From<&str> for Numeric {
    fn from(value: &str) -> Self {
        Numeric::Text(value.to_string())
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Number(n) => write!(f, "{}", n),
            Numeric::Text(s) => f.write_str(s),
        }
    }
}

/// Coerce a wire value to `f64`.
///
/// - absent / null → `0.0`
/// - non-numeric or non-finite text → `0.0`
/// - numeric text or number → the parsed value
///
/// Never fails. In debug builds a diagnostic is emitted when a null or
/// unparseable value is coerced to zero; `field` names the source field.
pub fn to_number(value: Option<&Numeric>, field: &str) -> f64 {
    match value {
        None => {
            #[cfg(debug_assertions)]
            tracing::debug!(field, "numeric field is null, using 0");
            0.0
        }
        Some(raw) => match raw.parse() {
            Some(n) => n,
            None => {
                #[cfg(debug_assertions)]
                tracing::debug!(field, raw = %raw, "numeric field is not a number, using 0");
                0.0
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_zero() {
        assert_eq!(to_number(None, "total"), 0.0);
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(to_number(Some(&"150.25".into()), "total"), 150.25);
        assert_eq!(to_number(Some(&"  42 ".into()), "total"), 42.0);
        assert_eq!(to_number(Some(&"-3.5".into()), "total"), -3.5);
        assert_eq!(to_number(Some(&"".into()), "total"), 0.0);
    }

    #[test]
    fn test_garbage_is_zero() {
        assert_eq!(to_number(Some(&"abc".into()), "total"), 0.0);
        assert_eq!(to_number(Some(&"12abc".into()), "total"), 0.0);
        assert_eq!(to_number(Some(&"NaN".into()), "total"), 0.0);
        assert_eq!(to_number(Some(&"inf".into()), "total"), 0.0);
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(to_number(Some(&Numeric::Number(7.0)), "qty"), 7.0);
        assert_eq!(to_number(Some(&Numeric::Number(f64::NAN)), "qty"), 0.0);
    }

    #[test]
    fn test_deserialize_wire_shapes() {
        let values: Vec<Option<Numeric>> =
            serde_json::from_str(r#"["10.50", 3, 2.25, null]"#).unwrap();
        let coerced: Vec<f64> = values
            .iter()
            .map(|v| to_number(v.as_ref(), "mixed"))
            .collect();
        assert_eq!(coerced, vec![10.5, 3.0, 2.25, 0.0]);
    }
}

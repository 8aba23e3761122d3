use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::FilterOp;

/// Evaluates a where-clause document against one JSON record, following SQL
/// semantics for missing values: a null or absent field fails every
/// comparison except an explicit comparison against null.
pub struct FilterMatch;

impl FilterMatch {
    pub fn matches(where_data: &Value, record: &Map<String, Value>) -> Result<bool, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(true),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        for (key, value) in obj {
            let ok = if key.starts_with('$') {
                Self::logical(key, value, record)?
            } else {
                Self::field(record.get(key).unwrap_or(&Value::Null), value)?
            };
            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn logical(op: &str, value: &Value, record: &Map<String, Value>) -> Result<bool, FilterError> {
        match FilterOp::parse(op) {
            Some(FilterOp::And) | Some(FilterOp::Or) => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut results = Vec::with_capacity(arr.len());
                for v in arr {
                    results.push(Self::matches(v, record)?);
                }
                Ok(if op == "$and" {
                    results.iter().all(|r| *r)
                } else {
                    results.iter().any(|r| *r)
                })
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn field(actual: &Value, expected: &Value) -> Result<bool, FilterError> {
        match expected {
            Value::Object(obj) => {
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key)
                        .filter(|op| !op.is_logical())
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    if !Self::condition(actual, operator, op_val)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Self::condition(actual, FilterOp::Eq, expected),
        }
    }

    fn condition(actual: &Value, operator: FilterOp, data: &Value) -> Result<bool, FilterError> {
        if data.is_null() {
            return Ok(match operator {
                FilterOp::Eq => actual.is_null(),
                FilterOp::Ne => !actual.is_null(),
                _ => false,
            });
        }
        if actual.is_null() {
            return Ok(false);
        }

        Ok(match operator {
            FilterOp::Eq => Self::compare(actual, data) == Some(Ordering::Equal),
            FilterOp::Ne => matches!(Self::compare(actual, data), Some(o) if o != Ordering::Equal),
            FilterOp::And | FilterOp::Or => false,
        })
    }

    /// Orders two scalars of the same kind; mismatched kinds are incomparable.
    fn compare(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }
}

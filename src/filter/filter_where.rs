use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::types::FilterOp;

/// Translates a where-clause document into a parameterised SQL predicate.
///
/// `{ "location": "Riverrun", "$or": [{ "attacker_king": "Joffrey" }, { "defender_king": "Joffrey" }] }`
/// becomes `("attacker_king" = $1 OR "defender_king" = $2) AND "location" = $3`.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.clause(where_data)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn clause(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let parts = self.parts(where_data)?;
        Ok(if parts.is_empty() { "1=1".to_string() } else { parts.join(" AND ") })
    }

    /// Like `clause`, but parenthesised when it joins more than one part.
    fn grouped(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let mut parts = self.parts(where_data)?;
        Ok(match parts.len() {
            0 => "1=1".to_string(),
            1 => parts.remove(0),
            _ => format!("({})", parts.join(" AND ")),
        })
    }

    fn parts(&mut self, where_data: &Value) -> Result<Vec<String>, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(vec![]),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut parts = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            if key.starts_with('$') {
                parts.push(self.logical(key, value)?);
            } else {
                parts.extend(self.field(key, value)?);
            }
        }
        Ok(parts)
    }

    fn logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match FilterOp::parse(op) {
            Some(FilterOp::And) | Some(FilterOp::Or) => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    // Empty conjunction is true, empty disjunction is false
                    return Ok(if op == "$and" { "1=1" } else { "1=0" }.to_string());
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    sql_parts.push(self.grouped(v)?);
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn field(&mut self, column: &str, value: &Value) -> Result<Vec<String>, FilterError> {
        Filter::validate_identifier(column)?;

        match value {
            Value::Object(obj) => {
                let mut out = Vec::with_capacity(obj.len());
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key)
                        .filter(|op| !op.is_logical())
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    out.push(self.condition(column, operator, op_val)?);
                }
                Ok(out)
            }
            // Implicit equality: { field: value }
            _ => Ok(vec![self.condition(column, FilterOp::Eq, value)?]),
        }
    }

    fn condition(&mut self, column: &str, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", column);
        let sql = match operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", quoted_column),
            FilterOp::Eq => format!("{} = {}", quoted_column, self.param(data.clone())),
            FilterOp::Ne if data.is_null() => format!("{} IS NOT NULL", quoted_column),
            FilterOp::Ne => format!("{} <> {}", quoted_column, self.param(data.clone())),
            FilterOp::And | FilterOp::Or => {
                return Err(FilterError::UnsupportedOperator(format!("{:?} on field {}", operator, column)))
            }
        };
        Ok(sql)
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

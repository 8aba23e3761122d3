use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, SqlResult};

pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_identifier(&table_name)
            .map_err(|_| FilterError::InvalidTableName(format!("Invalid table name format: {}", table_name)))?;
        Ok(Self {
            table_name,
            select_columns: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit)?; }
        Ok(self)
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        for column in columns.iter().filter(|c| c.as_str() != "*") {
            Self::validate_identifier(column)?;
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let select_clause = self.build_select_clause();
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_result.query),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(where_data, 0)?,
            None => ("1=1".to_string(), vec![]),
        };
        Ok(SqlResult { query: where_clause, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!(
            "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
            self.table_name, where_result.query
        );
        Ok(SqlResult { query, params: where_result.params })
    }

    /// Distinct non-null values of `column`, rendered as text and sorted.
    pub fn to_distinct_sql(&self, column: &str) -> Result<SqlResult, FilterError> {
        Self::validate_identifier(column)?;
        let where_result = self.to_where_sql()?;
        let query = format!(
            "SELECT DISTINCT \"{col}\"::text AS value FROM \"{table}\" WHERE {cond} AND \"{col}\" IS NOT NULL ORDER BY value",
            col = column,
            table = self.table_name,
            cond = where_result.query,
        );
        Ok(SqlResult { query, params: where_result.params })
    }

    /// Occurrence counts per non-null value of `column`, busiest first.
    /// Ties are broken by the value so repeated runs agree.
    pub fn to_group_count_sql(&self, column: &str) -> Result<SqlResult, FilterError> {
        Self::validate_identifier(column)?;
        let where_result = self.to_where_sql()?;
        let query = [
            format!(
                "SELECT \"{col}\"::text AS key, COUNT(*) AS count FROM \"{table}\" WHERE {cond} AND \"{col}\" IS NOT NULL",
                col = column,
                table = self.table_name,
                cond = where_result.query,
            ),
            format!("GROUP BY \"{}\" ORDER BY count DESC, key ASC", column),
            self.build_limit_clause(),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");
        Ok(SqlResult { query, params: where_result.params })
    }

    /// Single-row min/max/average/count over the non-null values of a numeric column.
    pub fn to_range_sql(&self, column: &str) -> Result<SqlResult, FilterError> {
        Self::validate_identifier(column)?;
        let where_result = self.to_where_sql()?;
        let query = format!(
            "SELECT MIN(\"{col}\")::bigint AS min, MAX(\"{col}\")::bigint AS max, AVG(\"{col}\")::float8 AS average, COUNT(\"{col}\") AS count FROM \"{table}\" WHERE {cond} AND \"{col}\" IS NOT NULL",
            col = column,
            table = self.table_name,
            cond = where_result.query,
        );
        Ok(SqlResult { query, params: where_result.params })
    }

    /// Identifiers are interpolated into SQL, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted.
    pub fn validate_identifier(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };
        if valid {
            Ok(())
        } else {
            Err(FilterError::InvalidColumn(format!("Invalid column name format: {:?}", name)))
        }
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        self.limit.map(|l| format!("LIMIT {}", l)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_without_conditions() {
        let filter = Filter::new("battles").unwrap();
        let sql = filter.to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM \"battles\" WHERE 1=1");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn select_with_where_order_and_limit() {
        let mut filter = Filter::new("battles").unwrap();
        filter
            .assign(FilterData {
                where_clause: Some(json!({ "location": "Riverrun" })),
                order: Some(json!("battle_number asc")),
                limit: Some(5),
                ..Default::default()
            })
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"battles\" WHERE \"location\" = $1 ORDER BY \"battle_number\" ASC NULLS LAST LIMIT 5"
        );
        assert_eq!(sql.params, vec![json!("Riverrun")]);
    }

    #[test]
    fn distinct_excludes_empty_values_through_where() {
        let mut filter = Filter::new("battles").unwrap();
        filter.where_clause(json!({ "battle_type": { "$ne": "" } })).unwrap();
        let sql = filter.to_distinct_sql("battle_type").unwrap();
        assert_eq!(
            sql.query,
            "SELECT DISTINCT \"battle_type\"::text AS value FROM \"battles\" WHERE \"battle_type\" <> $1 AND \"battle_type\" IS NOT NULL ORDER BY value"
        );
        assert_eq!(sql.params, vec![json!("")]);
    }

    #[test]
    fn group_count_with_top_limit() {
        let mut filter = Filter::new("battles").unwrap();
        filter.limit(1).unwrap();
        assert!(Filter::new("battles").unwrap().limit(-1).is_err());
        let sql = filter.to_group_count_sql("region").unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"region\"::text AS key, COUNT(*) AS count FROM \"battles\" WHERE 1=1 AND \"region\" IS NOT NULL GROUP BY \"region\" ORDER BY count DESC, key ASC LIMIT 1"
        );
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(Filter::new("battles; drop").is_err());
        assert!(Filter::new("").is_err());
        let filter = Filter::new("battles").unwrap();
        assert!(filter.to_range_sql("defender_size\"").is_err());
        assert!(filter.to_range_sql("defender_size").is_ok());
    }
}

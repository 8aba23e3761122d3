use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, FromRow, PgPool, Row};

use crate::config::DatabaseConfig;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{Battle, BattleField, GroupCount, SizeRange, User};
use crate::database::store::BattleStore;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData};

/// [`BattleStore`] over a Postgres pool.
#[derive(Clone)]
pub struct PgBattleStore {
    pool: PgPool,
    battles_table: String,
    users_table: String,
}

impl PgBattleStore {
    pub fn new(pool: PgPool, config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        Filter::validate_identifier(&config.battles_table)?;
        Filter::validate_identifier(&config.users_table)?;
        Ok(Self {
            pool,
            battles_table: config.battles_table.clone(),
            users_table: config.users_table.clone(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn battles(&self, filter_data: FilterData) -> Result<Filter, DatabaseError> {
        let mut filter = Filter::new(&self.battles_table)?;
        filter.assign(filter_data)?;
        Ok(filter)
    }
}

#[async_trait]
impl BattleStore for PgBattleStore {
    async fn find_user_by_name(&self, uname: &str) -> Result<Option<User>, DatabaseError> {
        let query = format!(
            "SELECT id, uname, created_at FROM \"{}\" WHERE uname = $1 LIMIT 1",
            self.users_table
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(uname)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn count(&self, filter: FilterData) -> Result<i64, DatabaseError> {
        let sql_result = self.battles(filter)?.to_count_sql()?;
        let row = bind_params(sqlx::query(&sql_result.query), &sql_result)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn select(&self, filter: FilterData) -> Result<Vec<Battle>, DatabaseError> {
        let mut filter = self.battles(filter)?;
        filter.select(Battle::COLUMNS.iter().map(|c| c.to_string()).collect())?;
        let sql_result = filter.to_sql()?;
        let rows = bind_params(sqlx::query(&sql_result.query), &sql_result)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| Battle::from_row(row).map_err(DatabaseError::from))
            .collect()
    }

    async fn distinct(&self, field: BattleField, filter: FilterData) -> Result<Vec<String>, DatabaseError> {
        let sql_result = self.battles(filter)?.to_distinct_sql(field.column())?;
        let rows = bind_params(sqlx::query(&sql_result.query), &sql_result)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("value").map_err(DatabaseError::from))
            .collect()
    }

    async fn group_count(&self, field: BattleField, limit: Option<i32>) -> Result<Vec<GroupCount>, DatabaseError> {
        let sql_result = self
            .battles(FilterData { limit, ..Default::default() })?
            .to_group_count_sql(field.column())?;
        let rows = bind_params(sqlx::query(&sql_result.query), &sql_result)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| GroupCount::from_row(row).map_err(DatabaseError::from))
            .collect()
    }

    async fn size_range(&self, field: BattleField) -> Result<Option<SizeRange>, DatabaseError> {
        let sql_result = self.battles(FilterData::default())?.to_range_sql(field.column())?;
        let row = bind_params(sqlx::query(&sql_result.query), &sql_result)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("count")?;
        if count == 0 {
            return Ok(None);
        }
        Ok(Some(SizeRange {
            min: row.try_get("min")?,
            max: row.try_get("max")?,
            average: row.try_get("average")?,
        }))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

fn bind_params<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    sql_result: &'q SqlResult,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    for v in sql_result.params.iter() {
        q = bind_param(q, v);
    }
    q
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Arrays are expanded into individual placeholders by FilterWhere
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}

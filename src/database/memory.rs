use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;
use crate::database::models::{Battle, BattleField, GroupCount, SizeRange, User};
use crate::database::store::BattleStore;
use crate::filter::filter_match::FilterMatch;
use crate::filter::filter_order::FilterOrder;
use crate::filter::{FilterData, SortDirection};

/// [`BattleStore`] over records held in memory, with the same filtering,
/// grouping and null semantics as the Postgres store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBattleStore {
    battles: Vec<Battle>,
    users: Vec<User>,
}

impl MemoryBattleStore {
    pub fn new(battles: Vec<Battle>, users: Vec<User>) -> Self {
        Self { battles, users }
    }

    /// Loads battles from a JSON array, as exported from the battles dataset.
    pub fn from_json(battles: &str, users: Vec<User>) -> Result<Self, DatabaseError> {
        let battles: Vec<Battle> = serde_json::from_str(battles)
            .map_err(|e| DatabaseError::QueryError(format!("Invalid battle fixture: {}", e)))?;
        Ok(Self::new(battles, users))
    }

    pub fn with_user(mut self, uname: &str) -> Self {
        self.users.push(User::new(uname));
        self
    }

    pub fn battles(&self) -> &[Battle] {
        &self.battles
    }

    fn matching(&self, filter: &FilterData) -> Result<Vec<(&Battle, Map<String, Value>)>, DatabaseError> {
        let where_data = filter.where_clause.clone().unwrap_or(Value::Null);
        let mut out = Vec::new();
        for battle in &self.battles {
            let record = to_record(battle)?;
            if FilterMatch::matches(&where_data, &record)? {
                out.push((battle, record));
            }
        }
        Ok(out)
    }

    fn field_values<'a>(records: &'a [(&'a Battle, Map<String, Value>)], field: BattleField) -> impl Iterator<Item = &'a Value> {
        records
            .iter()
            .filter_map(move |(_, record)| record.get(field.column()))
            .filter(|v| !v.is_null())
    }
}

#[async_trait]
impl BattleStore for MemoryBattleStore {
    async fn find_user_by_name(&self, uname: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.iter().find(|u| u.uname == uname).cloned())
    }

    async fn count(&self, filter: FilterData) -> Result<i64, DatabaseError> {
        Ok(self.matching(&filter)?.len() as i64)
    }

    async fn select(&self, filter: FilterData) -> Result<Vec<Battle>, DatabaseError> {
        let mut records = self.matching(&filter)?;

        if let Some(order) = &filter.order {
            let infos = FilterOrder::validate_and_parse(order)?;
            records.sort_by(|(_, a), (_, b)| {
                for info in &infos {
                    let ord = compare_nulls_last(a.get(&info.column), b.get(&info.column), &info.sort);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let limit = filter.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(records
            .into_iter()
            .take(limit)
            .map(|(battle, _)| battle.clone())
            .collect())
    }

    async fn distinct(&self, field: BattleField, filter: FilterData) -> Result<Vec<String>, DatabaseError> {
        let records = self.matching(&filter)?;
        let values: BTreeSet<String> = Self::field_values(&records, field).map(as_text).collect();
        Ok(values.into_iter().collect())
    }

    async fn group_count(&self, field: BattleField, limit: Option<i32>) -> Result<Vec<GroupCount>, DatabaseError> {
        let records = self.matching(&FilterData::default())?;
        let mut counts: HashMap<String, i64> = HashMap::new();
        for value in Self::field_values(&records, field) {
            *counts.entry(as_text(value)).or_insert(0) += 1;
        }

        let mut groups: Vec<GroupCount> = counts
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect();
        groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        if let Some(limit) = limit {
            groups.truncate(limit.max(0) as usize);
        }
        Ok(groups)
    }

    async fn size_range(&self, field: BattleField) -> Result<Option<SizeRange>, DatabaseError> {
        let records = self.matching(&FilterData::default())?;
        let sizes: Vec<i64> = Self::field_values(&records, field)
            .filter_map(Value::as_i64)
            .collect();

        let (Some(min), Some(max)) = (sizes.iter().min(), sizes.iter().max()) else {
            return Ok(None);
        };
        let average = sizes.iter().sum::<i64>() as f64 / sizes.len() as f64;
        Ok(Some(SizeRange { min: *min, max: *max, average }))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

fn to_record(battle: &Battle) -> Result<Map<String, Value>, DatabaseError> {
    match serde_json::to_value(battle) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DatabaseError::QueryError("battle did not serialize to an object".to_string())),
        Err(e) => Err(DatabaseError::QueryError(e.to_string())),
    }
}

/// Text rendering of a scalar, matching Postgres `::text` casts.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_nulls_last(a: Option<&Value>, b: Option<&Value>, sort: &SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = match (x, y) {
                (Value::Number(x), Value::Number(y)) => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
                _ => as_text(x).cmp(&as_text(y)),
            };
            match sort {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

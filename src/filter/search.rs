use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::database::models::battle::BattleField;

/// Query parameters accepted by `GET /api/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilter {
    pub king: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub battle_type: Option<String>,
}

impl SearchFilter {
    pub fn new(king: Option<&str>, location: Option<&str>, battle_type: Option<&str>) -> Self {
        Self {
            king: king.map(str::to_string),
            location: location.map(str::to_string),
            battle_type: battle_type.map(str::to_string),
        }
    }

    /// Builds the where-clause document. Parameters that are absent or blank
    /// contribute no clause; with none present the result is `None` and
    /// every record matches.
    pub fn to_where(&self) -> Option<Value> {
        let mut clauses = Vec::new();

        if let Some(king) = present(&self.king) {
            clauses.push(json!({
                "$or": [equals(BattleField::AttackerKing, king), equals(BattleField::DefenderKing, king)]
            }));
        }
        if let Some(location) = present(&self.location) {
            clauses.push(equals(BattleField::Location, location));
        }
        if let Some(battle_type) = present(&self.battle_type) {
            clauses.push(equals(BattleField::BattleType, battle_type));
        }

        match clauses.len() {
            0 => None,
            _ => Some(json!({ "$and": clauses })),
        }
    }
}

fn equals(field: BattleField, value: &str) -> Value {
    let mut clause = Map::new();
    clause.insert(field.column().to_string(), Value::String(value.to_string()));
    Value::Object(clause)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// One historical battle. Every column is nullable; an unknown army size is
/// `None` rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct Battle {
    pub battle_number: Option<i32>,
    pub name: Option<String>,
    pub year: Option<i32>,
    pub attacker_king: Option<String>,
    pub defender_king: Option<String>,
    pub attacker_outcome: Option<String>,
    pub battle_type: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub major_death: Option<i32>,
    #[serde(deserialize_with = "lenient_int")]
    pub major_capture: Option<i32>,
    #[serde(deserialize_with = "lenient_int")]
    pub attacker_size: Option<i32>,
    #[serde(deserialize_with = "lenient_int")]
    pub defender_size: Option<i32>,
    pub attacker_commander: Option<String>,
    pub defender_commander: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub summer: Option<i32>,
    pub location: Option<String>,
    pub region: Option<String>,
    pub note: Option<String>,
}

impl Battle {
    /// Columns read from the battles table, in struct order.
    pub const COLUMNS: [&'static str; 17] = [
        "battle_number",
        "name",
        "year",
        "attacker_king",
        "defender_king",
        "attacker_outcome",
        "battle_type",
        "major_death",
        "major_capture",
        "attacker_size",
        "defender_size",
        "attacker_commander",
        "defender_commander",
        "summer",
        "location",
        "region",
        "note",
    ];
}

/// Battle columns that queries may group, filter or aggregate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BattleField {
    Name,
    AttackerKing,
    DefenderKing,
    AttackerOutcome,
    BattleType,
    DefenderSize,
    Location,
    Region,
}

impl BattleField {
    pub fn column(&self) -> &'static str {
        match self {
            BattleField::Name => "name",
            BattleField::AttackerKing => "attacker_king",
            BattleField::DefenderKing => "defender_king",
            BattleField::AttackerOutcome => "attacker_outcome",
            BattleField::BattleType => "battle_type",
            BattleField::DefenderSize => "defender_size",
            BattleField::Location => "location",
            BattleField::Region => "region",
        }
    }
}

/// How many records share one value of a grouped column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

/// Min/max/average over the records where a numeric column is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: i64,
    pub max: i64,
    pub average: f64,
}

/// Accepts a number, a numeric string, `""` or null. The battles dataset
/// leaves unknown sizes as empty strings.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            let whole = match n.as_i64() {
                Some(i) => i,
                // `5000.0` is accepted, `5000.7` is not
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() <= i32::MAX as f64 => f as i64,
                    _ => return Err(D::Error::custom(format!("expected integer, got {}", n))),
                },
            };
            i32::try_from(whole)
                .map(Some)
                .map_err(|_| D::Error::custom(format!("number out of range: {}", n)))
        }
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected integer, got {:?}", s))),
        Some(other) => Err(D::Error::custom(format!("expected integer, got {}", other))),
    }
}

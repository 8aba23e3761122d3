use serde::{Serialize, Serializer};

use crate::database::models::{GroupCount, SizeRange};

/// Response body of `GET /api/stats`. Every field is always present; parts
/// with no data keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    pub most_active: MostActive,
    pub attacker_outcome: AttackerOutcome,
    pub battle_type: Vec<String>,
    pub defender_size: DefenderSize,
}

/// Busiest value of each grouped column, `""` when there were no groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MostActive {
    pub attacker_king: String,
    pub defender_king: String,
    pub region: String,
    pub name: String,
}

impl MostActive {
    /// Key of the first (highest-count) group.
    pub fn top(groups: &[GroupCount]) -> String {
        groups.first().map(|g| g.key.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttackerOutcome {
    pub win: i64,
    pub loss: i64,
}

impl AttackerOutcome {
    /// Counts for the exact keys `"win"` and `"loss"`; any other outcome is ignored.
    pub fn from_groups(groups: &[GroupCount]) -> Self {
        let mut outcome = Self::default();
        for group in groups {
            match group.key.as_str() {
                "win" => outcome.win = group.count,
                "loss" => outcome.loss = group.count,
                _ => {}
            }
        }
        outcome
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DefenderSize {
    pub average: Metric<f64>,
    pub min: Metric<i64>,
    pub max: Metric<i64>,
}

impl From<Option<SizeRange>> for DefenderSize {
    fn from(range: Option<SizeRange>) -> Self {
        match range {
            Some(range) => Self {
                average: Metric::Known(range.average),
                min: Metric::Known(range.min),
                max: Metric::Known(range.max),
            },
            None => Self::default(),
        }
    }
}

/// A measurement that may be unknown. Unknown serializes as `""` so clients
/// can tell "no data" apart from a real zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric<T> {
    Known(T),
    Unknown,
}

impl<T> Default for Metric<T> {
    fn default() -> Self {
        Metric::Unknown
    }
}

impl<T> Metric<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Metric::Known(v) => Some(v),
            Metric::Unknown => None,
        }
    }
}

impl<T: Serialize> Serialize for Metric<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Known(v) => v.serialize(serializer),
            Metric::Unknown => serializer.serialize_str(""),
        }
    }
}

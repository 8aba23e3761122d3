use std::fmt;

use crate::api::stats::{AttackerOutcome, DefenderSize, MostActive, StatsSummary};
use crate::config::PartialFailurePolicy;
use crate::database::manager::DatabaseError;
use crate::database::models::{BattleField, GroupCount, SizeRange};
use crate::database::BattleStore;
use crate::filter::FilterData;

pub const ATTACKER_KING: &str = "attacker_king";
pub const DEFENDER_KING: &str = "defender_king";
pub const REGION: &str = "region";
pub const NAME: &str = "name";
pub const ATTACKER_OUTCOME: &str = "attacker_outcome";
pub const BATTLE_TYPE: &str = "battle_type";
pub const DEFENDER_SIZE: &str = "defender_size";

/// One sub-query that did not settle successfully.
#[derive(Debug)]
pub struct SubQueryFailure {
    pub name: &'static str,
    pub error: DatabaseError,
}

impl fmt::Display for SubQueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Stats aggregation failed: {}", join_failures(.failed))]
    PartialAggregationFailure { failed: Vec<SubQueryFailure> },
}

fn join_failures(failed: &[SubQueryFailure]) -> String {
    failed.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Settled outcome of every stats sub-query, successful or not.
#[derive(Debug)]
pub struct SubQueryResults {
    pub attacker_king: Result<Vec<GroupCount>, DatabaseError>,
    pub defender_king: Result<Vec<GroupCount>, DatabaseError>,
    pub region: Result<Vec<GroupCount>, DatabaseError>,
    pub name: Result<Vec<GroupCount>, DatabaseError>,
    pub attacker_outcome: Result<Vec<GroupCount>, DatabaseError>,
    pub battle_type: Result<Vec<String>, DatabaseError>,
    pub defender_size: Result<Option<SizeRange>, DatabaseError>,
}

impl SubQueryResults {
    /// Dispatches all seven sub-queries together and waits for every one of
    /// them; a failure does not cancel the others.
    pub async fn collect(store: &dyn BattleStore) -> Self {
        let battle_types = FilterData::where_only(Some(serde_json::json!({
            BATTLE_TYPE: { "$ne": "" }
        })));

        let (attacker_king, defender_king, region, name, attacker_outcome, battle_type, defender_size) = futures::join!(
            store.group_count(BattleField::AttackerKing, Some(1)),
            store.group_count(BattleField::DefenderKing, Some(1)),
            store.group_count(BattleField::Region, Some(1)),
            store.group_count(BattleField::Name, None),
            store.group_count(BattleField::AttackerOutcome, None),
            store.distinct(BattleField::BattleType, battle_types),
            store.size_range(BattleField::DefenderSize),
        );

        Self {
            attacker_king,
            defender_king,
            region,
            name,
            attacker_outcome,
            battle_type,
            defender_size,
        }
    }

    /// Names of the sub-queries that failed, in dispatch order.
    pub fn failed_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.attacker_king.is_err() {
            names.push(ATTACKER_KING);
        }
        if self.defender_king.is_err() {
            names.push(DEFENDER_KING);
        }
        if self.region.is_err() {
            names.push(REGION);
        }
        if self.name.is_err() {
            names.push(NAME);
        }
        if self.attacker_outcome.is_err() {
            names.push(ATTACKER_OUTCOME);
        }
        if self.battle_type.is_err() {
            names.push(BATTLE_TYPE);
        }
        if self.defender_size.is_err() {
            names.push(DEFENDER_SIZE);
        }
        names
    }

    /// Builds the summary from whatever succeeded. Failed parts keep their defaults.
    pub fn merge(&self) -> StatsSummary {
        let top = |groups: &Result<Vec<GroupCount>, DatabaseError>| {
            groups.as_deref().map(MostActive::top).unwrap_or_default()
        };

        StatsSummary {
            most_active: MostActive {
                attacker_king: top(&self.attacker_king),
                defender_king: top(&self.defender_king),
                region: top(&self.region),
                name: top(&self.name),
            },
            attacker_outcome: self
                .attacker_outcome
                .as_deref()
                .map(AttackerOutcome::from_groups)
                .unwrap_or_default(),
            battle_type: self.battle_type.as_ref().cloned().unwrap_or_default(),
            defender_size: self
                .defender_size
                .as_ref()
                .ok()
                .copied()
                .flatten()
                .into(),
        }
    }

    pub fn into_failures(self) -> Vec<SubQueryFailure> {
        let settled: [(&'static str, Option<DatabaseError>); 7] = [
            (ATTACKER_KING, self.attacker_king.err()),
            (DEFENDER_KING, self.defender_king.err()),
            (REGION, self.region.err()),
            (NAME, self.name.err()),
            (ATTACKER_OUTCOME, self.attacker_outcome.err()),
            (BATTLE_TYPE, self.battle_type.err()),
            (DEFENDER_SIZE, self.defender_size.err()),
        ];
        settled
            .into_iter()
            .filter_map(|(name, error)| error.map(|error| SubQueryFailure { name, error }))
            .collect()
    }
}

/// Answers `/api/stats` from a store under a partial-failure policy.
pub struct StatsService<'a> {
    store: &'a dyn BattleStore,
    policy: PartialFailurePolicy,
}

impl<'a> StatsService<'a> {
    pub fn new(store: &'a dyn BattleStore, policy: PartialFailurePolicy) -> Self {
        Self { store, policy }
    }

    pub async fn summarize(&self) -> Result<StatsSummary, StatsError> {
        let results = SubQueryResults::collect(self.store).await;

        if results.failed_names().is_empty() {
            return Ok(results.merge());
        }

        match self.policy {
            PartialFailurePolicy::Reject => {
                let failed = results.into_failures();
                for failure in &failed {
                    tracing::error!(sub_query = failure.name, "Stats sub-query failed: {}", failure.error);
                }
                Err(StatsError::PartialAggregationFailure { failed })
            }
            PartialFailurePolicy::Degrade => {
                let summary = results.merge();
                for failure in results.into_failures() {
                    tracing::warn!(
                        sub_query = failure.name,
                        "Stats sub-query failed, using defaults: {}",
                        failure.error
                    );
                }
                Ok(summary)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stats::Metric;

    fn group(key: &str, count: i64) -> GroupCount {
        GroupCount { key: key.to_string(), count }
    }

    fn all_ok() -> SubQueryResults {
        SubQueryResults {
            attacker_king: Ok(vec![group("Joffrey", 14)]),
            defender_king: Ok(vec![group("Robb Stark", 14)]),
            region: Ok(vec![group("The Riverlands", 17)]),
            name: Ok(vec![group("Battle of the Blackwater", 1), group("Battle of the Fords", 1)]),
            attacker_outcome: Ok(vec![group("win", 32), group("loss", 5)]),
            battle_type: Ok(vec!["ambush".to_string(), "pitched battle".to_string()]),
            defender_size: Ok(Some(SizeRange { min: 100, max: 20000, average: 6428.157894736842 })),
        }
    }

    #[test]
    fn merges_every_part() {
        let summary = all_ok().merge();
        assert_eq!(summary.most_active.attacker_king, "Joffrey");
        assert_eq!(summary.most_active.name, "Battle of the Blackwater");
        assert_eq!(summary.attacker_outcome, AttackerOutcome { win: 32, loss: 5 });
        assert_eq!(summary.battle_type, vec!["ambush", "pitched battle"]);
        assert_eq!(summary.defender_size.min, Metric::Known(100));
    }

    #[test]
    fn failed_parts_fall_back_to_defaults() {
        let mut results = all_ok();
        results.region = Err(DatabaseError::QueryError("boom".into()));
        results.defender_size = Err(DatabaseError::QueryError("boom".into()));

        assert_eq!(results.failed_names(), vec![REGION, DEFENDER_SIZE]);

        let summary = results.merge();
        assert_eq!(summary.most_active.region, "");
        assert_eq!(summary.most_active.attacker_king, "Joffrey");
        assert_eq!(summary.defender_size, DefenderSize::default());

        let failures = results.into_failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].name, REGION);
    }

    #[test]
    fn failure_message_names_sub_queries() {
        let err = StatsError::PartialAggregationFailure {
            failed: vec![SubQueryFailure {
                name: BATTLE_TYPE,
                error: DatabaseError::QueryError("timeout".into()),
            }],
        };
        assert!(err.to_string().contains("battle_type"));
    }
}

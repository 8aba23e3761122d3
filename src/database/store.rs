use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{Battle, BattleField, GroupCount, SizeRange, User};
use crate::filter::FilterData;

/// Read-only access to battles and the users tokens are issued for.
///
/// Handlers receive the store through application state, so tests can swap
/// in [`MemoryBattleStore`](crate::database::memory::MemoryBattleStore) or a
/// failing double.
#[async_trait]
pub trait BattleStore: Send + Sync {
    /// Exact-name user lookup.
    async fn find_user_by_name(&self, uname: &str) -> Result<Option<User>, DatabaseError>;

    /// Number of battles matching the filter.
    async fn count(&self, filter: FilterData) -> Result<i64, DatabaseError>;

    /// Full battle records matching the filter.
    async fn select(&self, filter: FilterData) -> Result<Vec<Battle>, DatabaseError>;

    /// Distinct non-null values of `field` among matching battles.
    async fn distinct(&self, field: BattleField, filter: FilterData) -> Result<Vec<String>, DatabaseError>;

    /// Occurrence count per non-null value of `field`, highest count first,
    /// ties by value. `limit` keeps only the first groups.
    async fn group_count(&self, field: BattleField, limit: Option<i32>) -> Result<Vec<GroupCount>, DatabaseError>;

    /// Min/max/average of a numeric field over the battles where it is set;
    /// `None` when no battle has a value.
    async fn size_range(&self, field: BattleField) -> Result<Option<SizeRange>, DatabaseError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), DatabaseError>;
}

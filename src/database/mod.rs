pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryBattleStore;
pub use postgres::PgBattleStore;
pub use store::BattleStore;

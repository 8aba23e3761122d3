pub mod battle;
pub mod user;

pub use battle::{Battle, BattleField, GroupCount, SizeRange};
pub use user::User;

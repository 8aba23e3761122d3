// handlers/protected/mod.rs - Protected handlers
//
// Every route here sits behind `token_auth_middleware`.

pub mod battles;
pub mod stats;

pub use battles::{battles_count, battles_list, battles_search};
pub use stats::battles_stats;

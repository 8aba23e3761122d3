pub mod stats_service;
pub mod token_service;

pub use stats_service::{StatsError, StatsService};
pub use token_service::{IssueError, TokenIssuer};

pub mod stats;

pub use stats::{AttackerOutcome, DefenderSize, Metric, MostActive, StatsSummary};

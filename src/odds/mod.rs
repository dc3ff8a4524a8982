pub mod batch;
pub mod engine;
pub mod factors;
pub mod formatter;
pub mod orientation;
pub mod uncertainty;
pub mod weighting;

pub use batch::{MatchOddsOutcome, OddsBatch};
pub use engine::OddsEngine;

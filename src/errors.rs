/// Failures raised by the odds engine itself. Malformed input is rejected
/// before any factor math runs.
#[derive(Debug, thiserror::Error)]
pub enum OddsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Request-level rejections for a calculate-odds batch. Per-match failures
/// are never reported through this type.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BatchError {
    #[error("no match ids supplied")]
    Empty,

    #[error("too many matches: {requested} requested, limit is {limit}")]
    TooManyMatches { requested: usize, limit: usize },
}

pub type EngineResult<T> = Result<T, OddsError>;

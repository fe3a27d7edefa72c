use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpgradeError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpgradeError {
    /// `level` is the 1-based refine level the rate was supplied for.
    #[error("success rate {rate} for level +{level} is outside [0, 100]")]
    InvalidRate { level: usize, rate: f64 },

    #[error("no eligible method for free level +{level}")]
    EmptyCatalog { level: usize },

    #[error("upgrade configuration has no levels")]
    EmptyConfiguration,

    #[error("expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// `start` is the level the item already sits on (0-based).
    #[error("cannot start at +{start} on a path of {levels} levels")]
    InvalidStartLevel { start: usize, levels: usize },

    #[error("too many candidate paths to enumerate over {free_levels} free levels")]
    SearchSpaceTooLarge { free_levels: usize },

    #[error("item profile has no data for level +{level}")]
    MissingLevelData { level: usize },

    #[error("optimization cancelled")]
    Cancelled,
}

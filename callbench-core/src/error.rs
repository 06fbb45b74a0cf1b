use crate::load::AuthError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("`tiers` must be a non-empty list of positive concurrency levels")]
    InvalidTiers,

    #[error("`duration` must be a positive duration")]
    InvalidDuration,

    #[error("scenario catalog is empty")]
    EmptyScenarioCatalog,

    #[error("invalid base url: `{0}`")]
    InvalidBaseUrl(String),

    #[error("probe `{0}` must run at least one iteration")]
    InvalidIterations(String),

    #[error("sampling interval must be positive")]
    InvalidInterval,
}

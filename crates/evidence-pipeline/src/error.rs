use evidence_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown evidence source: {0}")]
    UnknownSource(String),

    #[error("fetch error: {0}")]
    Fetch(String),
}

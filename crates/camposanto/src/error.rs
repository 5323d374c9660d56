use thiserror::Error;

#[derive(Error, Debug)]
pub enum CamposantoError {
    #[error("Query error: {0}")]
    QueryError(#[from] crate::query::QueryError),
    #[error("Store error: {0}")]
    StoreError(#[from] camposanto_store::StoreError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CamposantoError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("log storage error: {0}")]
    Storage(#[from] csv::Error),

    #[error("invalid log row: {0}")]
    LogFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No data available")]
    NoData,
}

pub type Result<T> = std::result::Result<T, Error>;

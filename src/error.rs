use std::io;

use thiserror::Error;

/// Everything that can go wrong while serving.
///
/// Only `Bind` is fatal; the rest are rendered as an HTTP error response
/// or logged and dropped with their connection.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] io::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed request: {0}")]
    InvalidRequest(String),
    #[error("not found")]
    NotFound,
    #[error("handler panicked: {0}")]
    Panic(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::NotFound => 404,
            ServerError::Bind(_)
            | ServerError::Io(_)
            | ServerError::Panic(_)
            | ServerError::Internal(_) => 500,
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

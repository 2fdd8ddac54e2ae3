//! Domain Errors

use std::io;

use thiserror::Error;

use crate::infrastructure::server_impl::response::StatusCode;

/// Everything that can go wrong while servicing a single request.
///
/// All variants are terminal for the connection: each one turns into exactly
/// one best-effort response and the connection is closed afterwards.
/// A malformed `Content-Length` is deliberately absent here, it is read as 0.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("malformed request line")]
    Malformed,
    #[error("request or header line too long")]
    LineTooLong,
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    #[error("method not implemented")]
    NotImplemented,
    #[error("file not found")]
    NotFound,
    #[error("path escapes the serving directory")]
    OutsideDirectory,
    #[error(transparent)]
    Internal(#[from] io::Error),
}

impl HandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Malformed | Self::LineTooLong | Self::UnsupportedVersion => {
                StatusCode::BadRequest
            }
            Self::NotImplemented => StatusCode::NotImplemented,
            Self::NotFound | Self::OutsideDirectory => StatusCode::NotFound,
            Self::Internal(_) => StatusCode::InternalServerError,
        }
    }
}

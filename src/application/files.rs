//! The `/files/` routes: streaming downloads and whole-body uploads.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

use crate::application::ServerData;
use crate::domain::errors::HandlerError;
use crate::infrastructure::server_impl::request::RequestReader;
use crate::infrastructure::server_impl::response::{Response, StatusCode};
use crate::infrastructure::server_impl::server::Header;

/// An opened file ready to be streamed back with a `200 OK`.
#[derive(Debug)]
pub struct FileDownload {
    pub file: File,
    pub length: u64,
    pub path: PathBuf,
}

/// Stats and opens the file behind `name`. Nothing is written to the client
/// here, so every failure can still become a proper status.
pub async fn download_route(
    server_data: &ServerData,
    name: &[u8],
) -> Result<FileDownload, HandlerError> {
    let path = server_data.resolve(name)?;

    let metadata = fs::metadata(&path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => HandlerError::NotFound,
        _ => HandlerError::Internal(e),
    })?;
    if metadata.is_dir() {
        return Err(HandlerError::Internal(io::Error::other(format!(
            "{} is a directory",
            path.display()
        ))));
    }

    let file = File::open(&path).await?;
    let length = file.metadata().await?.len();

    Ok(FileDownload { file, length, path })
}

/// Reads `Content-Length` bytes of body into the file behind `name`,
/// truncating whatever was there.
///
/// The body is accumulated across as many reads as it takes. A stream that
/// ends before the declared length is an error and the partial file is
/// removed.
pub async fn upload_route<S>(
    server_data: &ServerData,
    reader: &mut RequestReader<S>,
    name: &[u8],
) -> Result<Response, HandlerError>
where
    S: AsyncRead + Unpin,
{
    let path = server_data.resolve(name)?;
    let headers = reader.scan_headers(&[Header::ContentLength]).await?;
    let expected = headers.content_length();

    let mut file = File::create(&path).await?;
    let mut body = reader.body().take(expected);
    let received = match tokio::io::copy(&mut body, &mut file).await {
        Ok(received) => received,
        Err(e) => {
            drop(file);
            discard(&path).await;
            return Err(e.into());
        }
    };

    if received < expected {
        drop(file);
        discard(&path).await;
        return Err(HandlerError::Internal(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("body ended after {received} of {expected} bytes"),
        )));
    }

    file.flush().await?;
    info!(path = %path.display(), bytes = received, "received file");

    Ok(Response::from_status_code(StatusCode::Created, Bytes::new()))
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove partial upload");
    }
}

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::api::encoding::negotiate;
use crate::domain::errors::HandlerError;
use crate::infrastructure::server_impl::request::RequestReader;
use crate::infrastructure::server_impl::response::{Response, StatusCode};
use crate::infrastructure::server_impl::server::Header;

pub mod encoding;

const USER_AGENT_PATH: &[u8] = b"/user-agent";
const ECHO_PREFIX: &[u8] = b"/echo/";
const FILES_PREFIX: &[u8] = b"/files/";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Route<'a> {
    Root,
    UserAgent,
    /// Text to echo back.
    Echo(&'a [u8]),
    /// File name relative to the serving directory.
    Files(&'a [u8]),
    Unknown,
}

impl<'a> Route<'a> {
    pub fn recognize(path: &'a [u8]) -> Self {
        if path == b"/" {
            Route::Root
        } else if path == USER_AGENT_PATH {
            Route::UserAgent
        } else if let Some(text) = path.strip_prefix(ECHO_PREFIX) {
            Route::Echo(text)
        } else if let Some(name) = path.strip_prefix(FILES_PREFIX) {
            Route::Files(name)
        } else {
            Route::Unknown
        }
    }
}

pub fn root_route() -> Response {
    Response::from_status_code(StatusCode::Ok, Bytes::new())
}

pub async fn user_agent_route<S>(reader: &mut RequestReader<S>) -> Result<Response, HandlerError>
where
    S: AsyncRead + Unpin,
{
    let headers = reader.scan_headers(&[Header::UserAgent]).await?;
    let agent = headers.get(Header::UserAgent).unwrap_or_default();

    Ok(Response::from_status_code(
        StatusCode::Ok,
        Bytes::copy_from_slice(agent),
    ))
}

pub async fn echo_route<S>(
    reader: &mut RequestReader<S>,
    text: &[u8],
) -> Result<Response, HandlerError>
where
    S: AsyncRead + Unpin,
{
    let headers = reader.scan_headers(&[Header::AcceptEncoding]).await?;
    let body = Bytes::copy_from_slice(text);

    let response = match negotiate(headers.get_str(Header::AcceptEncoding)) {
        Some(coding) => Response::from_status_code(StatusCode::Ok, coding.encode(&body)?)
            .with_header(Header::ContentEncoding, coding.as_str()),
        None => Response::from_status_code(StatusCode::Ok, body),
    };
    Ok(response)
}

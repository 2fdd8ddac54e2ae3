use std::fmt::Write;
use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use compact_str::CompactString;
use strum::{EnumMessage, EnumString, IntoStaticStr};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::domain::errors::HandlerError;
use crate::infrastructure::server_impl::server::Header;

pub const HTTP_VERSION: &str = "HTTP/1.1";

const STREAM_CHUNK: usize = 16 * 1024;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IntoStaticStr, EnumString, EnumMessage)]
pub enum StatusCode {
    #[strum(serialize = "200", message = "OK")]
    Ok,
    #[strum(serialize = "201", message = "Created")]
    Created,
    #[strum(serialize = "400", message = "Bad Request")]
    BadRequest,
    #[strum(serialize = "404", message = "Not Found")]
    NotFound,
    #[strum(serialize = "500", message = "Internal Server Error")]
    InternalServerError,
    #[strum(serialize = "501", message = "Not Implemented")]
    NotImplemented,
}

impl StatusCode {
    pub fn code(self) -> &'static str {
        self.into()
    }

    pub fn reason(self) -> &'static str {
        self.get_message().unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoStaticStr)]
pub enum ContentType {
    #[strum(serialize = "text/plain")]
    TextPlain,
    #[strum(serialize = "application/octet-stream")]
    OctetStream,
}

/// A response whose body is fully generated in memory.
#[derive(Debug)]
pub struct Response {
    pub status_code: StatusCode,
    /// Route specific headers, emitted in insertion order before the defaults.
    pub headers: Vec<(Header, CompactString)>,
    pub body: Bytes,
}

impl Response {
    pub fn from_status_code(value: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status_code: value,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, header: Header, value: impl Into<CompactString>) -> Self {
        self.headers.push((header, value.into()));
        self
    }

    /// Serializes the whole response. The body is followed by a bare CRLF that
    /// is not counted in `Content-Length`; the connection is closed right after,
    /// so clients never read it as part of a following message.
    pub fn into_http(self) -> Bytes {
        let length = self.body.len();
        let mut head = head_line(self.status_code);
        for (header, value) in &self.headers {
            let name = header.as_str();
            write!(head, "{name}: {value}\r\n").expect("No reason to fail.");
        }
        write_entity_headers(&mut head, ContentType::TextPlain, length as u64);

        let mut buf = BytesMut::with_capacity(head.len() + length + 2);
        buf.put_slice(head.as_bytes());
        buf.put_slice(&self.body);
        buf.put_slice(b"\r\n");
        buf.freeze()
    }
}

impl From<HandlerError> for Response {
    fn from(value: HandlerError) -> Self {
        Response::from_status_code(value.status_code(), Bytes::new())
    }
}

fn head_line(status_code: StatusCode) -> String {
    let mut head = String::with_capacity(96);
    let code = status_code.code();
    let reason = status_code.reason();
    write!(head, "{HTTP_VERSION} {code} {reason}\r\n").expect("No reason to fail.");
    head
}

fn write_entity_headers(head: &mut String, content_type: ContentType, length: u64) {
    let content_type: &str = content_type.into();
    write!(
        head,
        "Content-Type: {content_type}\r\n\
         Content-Length: {length}\r\n\r\n"
    )
    .expect("No reason to fail.");
}

/// Header block of a streamed `200 OK` octet-stream response of `length` bytes.
pub fn stream_head(length: u64) -> Bytes {
    let mut head = head_line(StatusCode::Ok);
    write_entity_headers(&mut head, ContentType::OctetStream, length);
    head.into()
}

#[derive(Debug, Error)]
pub enum SendError {
    /// Nothing useful reached the client; the status line may be incomplete.
    #[error("failed to send response head")]
    Head(#[source] io::Error),
    /// The head is committed, the status can no longer change.
    #[error("body interrupted after {sent} of {expected} bytes")]
    Body {
        sent: u64,
        expected: u64,
        #[source]
        source: io::Error,
    },
}

/// Writes a generated response in one shot. Returns the number of bytes sent.
pub async fn send_response<W>(writer: &mut W, response: Response) -> Result<usize, SendError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = response.into_http();
    writer.write_all(&bytes).await.map_err(SendError::Head)?;
    writer.flush().await.map_err(SendError::Head)?;
    Ok(bytes.len())
}

/// Two-phase send of a streamed body: the head is written and flushed first,
/// then exactly `length` bytes are copied from `body`.
///
/// Failures are reported once and never retried. A body source that ends early
/// is a [`SendError::Body`] with `UnexpectedEof`.
pub async fn send_stream<W, R>(writer: &mut W, mut body: R, length: u64) -> Result<u64, SendError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let head = stream_head(length);
    writer.write_all(&head).await.map_err(SendError::Head)?;
    writer.flush().await.map_err(SendError::Head)?;

    let mut chunk = vec![0u8; STREAM_CHUNK];
    let mut sent = 0u64;
    let interrupted = |sent, source| SendError::Body {
        sent,
        expected: length,
        source,
    };

    while sent < length {
        let want = (length - sent).min(STREAM_CHUNK as u64) as usize;
        let n = body
            .read(&mut chunk[..want])
            .await
            .map_err(|e| interrupted(sent, e))?;
        if n == 0 {
            return Err(interrupted(sent, io::ErrorKind::UnexpectedEof.into()));
        }
        writer
            .write_all(&chunk[..n])
            .await
            .map_err(|e| interrupted(sent, e))?;
        sent += n as u64;
    }

    writer.flush().await.map_err(|e| interrupted(sent, e))?;
    Ok(sent)
}

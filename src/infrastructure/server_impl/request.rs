use std::str::FromStr;

use bytes::Bytes;
use enum_map::EnumMap;
use memchr::memchr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::domain::errors::HandlerError;
use crate::infrastructure::server_impl::server::{Header, Method};

/// Longest request or header line accepted, line ending included.
pub const MAX_LINE_LEN: usize = 64 * 1024;

const HTTP_1_1: &[u8] = b"HTTP/1.1";

/// The parsed request line. Headers are not part of it: each route scans for
/// the few it needs through [`RequestReader::scan_headers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Request target exactly as sent, without any decoding.
    pub resource: Bytes,
}

/// Headers of interest collected by a single scan. Anything not asked for is
/// skipped and never stored.
#[derive(Debug, Default)]
pub struct Headers(EnumMap<Header, Option<Bytes>>);

impl Headers {
    /// Raw value bytes, as they appeared after `Name: `.
    pub fn get(&self, header: Header) -> Option<&[u8]> {
        self.0[header].as_deref()
    }

    /// The value when it is valid UTF-8.
    pub fn get_str(&self, header: Header) -> Option<&str> {
        self.get(header)
            .and_then(|value| std::str::from_utf8(value).ok())
    }

    /// Declared body length. Missing or unparsable values count as 0.
    pub fn content_length(&self) -> u64 {
        self.get_str(Header::ContentLength)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Cursor over the connection that hands out the request in stages: request
/// line, then one header scan, then the body. Bytes past the blank line stay
/// buffered for the body read.
#[derive(Debug)]
pub struct RequestReader<S> {
    stream: BufReader<S>,
    line: Vec<u8>,
}

impl<S> RequestReader<S>
where
    S: AsyncRead + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            line: Vec::with_capacity(256),
        }
    }

    /// Reads exactly one line and parses it with [`parse_request_line`].
    pub async fn read_request_line(&mut self) -> Result<Request, HandlerError> {
        if self.next_line().await? == 0 {
            return Err(HandlerError::Malformed);
        }
        parse_request_line(&self.line)
    }

    /// Reads header lines up to the first empty line (or end of stream),
    /// keeping only the values of `wanted`. Names match case-sensitively and
    /// the first occurrence of a header wins.
    pub async fn scan_headers(&mut self, wanted: &[Header]) -> Result<Headers, HandlerError> {
        let mut headers = Headers::default();

        loop {
            if self.next_line().await? == 0 {
                break;
            }
            let line = trim_line_ending(&self.line);
            if line.is_empty() {
                break;
            }

            let Some(colon) = memchr(b':', line) else {
                continue;
            };
            let (name, value) = (&line[..colon], &line[colon + 1..]);
            let Some(header) = wanted.iter().find(|h| h.as_bytes() == name) else {
                continue;
            };
            let slot = &mut headers.0[*header];
            if slot.is_none() {
                let value = value.strip_prefix(b" ").unwrap_or(value);
                *slot = Some(Bytes::copy_from_slice(value));
            }
        }

        Ok(headers)
    }

    /// The buffered reader positioned right after whatever has been consumed.
    /// Used for body reads after [`Self::scan_headers`].
    pub fn body(&mut self) -> &mut BufReader<S> {
        &mut self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.stream.get_mut()
    }

    async fn next_line(&mut self) -> Result<usize, HandlerError> {
        self.line.clear();
        let n = (&mut self.stream)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut self.line)
            .await?;
        if n == MAX_LINE_LEN && self.line.last() != Some(&b'\n') {
            return Err(HandlerError::LineTooLong);
        }
        Ok(n)
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Parses a single request line, terminator included, as
/// `METHOD PATH VERSION` separated by runs of ASCII whitespace.
///
/// Version is checked before the method, so `FOO / HTTP/1.0` is a version
/// error rather than an unimplemented method. The path is kept byte for byte.
pub fn parse_request_line(line: &[u8]) -> Result<Request, HandlerError> {
    let mut fields = trim_line_ending(line)
        .split(u8::is_ascii_whitespace)
        .filter(|field| !field.is_empty());

    let (Some(method), Some(resource), Some(version), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(HandlerError::Malformed);
    };

    if version != HTTP_1_1 {
        return Err(HandlerError::UnsupportedVersion);
    }

    let method = std::str::from_utf8(method)
        .ok()
        .and_then(|method| Method::from_str(method).ok())
        .ok_or(HandlerError::NotImplemented)?;
    if !method.is_supported() {
        return Err(HandlerError::NotImplemented);
    }

    Ok(Request {
        method,
        resource: Bytes::copy_from_slice(resource),
    })
}

//! `Accept-Encoding` negotiation. gzip is the only coding the server produces.

use std::io::{self, Write};
use std::str::FromStr;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use strum::{EnumString, IntoStaticStr};

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumString, IntoStaticStr)]
pub enum ContentCoding {
    #[strum(serialize = "gzip")]
    Gzip,
}

impl ContentCoding {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn encode(self, body: &[u8]) -> io::Result<Bytes> {
        match self {
            ContentCoding::Gzip => {
                let buf = Vec::with_capacity(body.len() + 32);
                let mut encoder = GzEncoder::new(buf, Compression::default());
                encoder.write_all(body)?;
                Ok(encoder.finish()?.into())
            }
        }
    }
}

/// Picks the first supported coding in a comma separated `Accept-Encoding`
/// value. Tokens are compared exactly after trimming surrounding spaces;
/// quality values are not understood.
pub fn negotiate(accept_encoding: Option<&str>) -> Option<ContentCoding> {
    accept_encoding?
        .split(',')
        .find_map(|token| ContentCoding::from_str(token.trim_matches(' ')).ok())
}

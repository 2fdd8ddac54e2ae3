use std::sync::Arc;

use either::Either;
use enum_map::Enum;
use strum::{EnumString, IntoStaticStr};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::api::{echo_route, root_route, user_agent_route, Route};
use crate::application::files::{download_route, upload_route, FileDownload};
use crate::application::ServerData;
use crate::domain::errors::HandlerError;
use crate::infrastructure::server_impl::request::{Request, RequestReader};
use crate::infrastructure::server_impl::response::{
    send_response, send_stream, Response, SendError,
};
use crate::AnyResult;

/// Accepts connections forever, one task per connection.
///
/// Accept failures are logged and skipped. There is no connection limit and
/// no per-connection timeout: a silent client keeps its task alive.
pub async fn serve(listener: TcpListener, server_data: Arc<ServerData>) -> AnyResult<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "failed to accept connection");
                continue;
            }
        };
        info!(%peer, "client connected");

        let server_data = server_data.clone();
        tokio::spawn(
            async move { handle_connection(socket, &server_data).await }
                .instrument(info_span!("conn", %peer)),
        );
    }
}

/// Services exactly one request on `stream`, then shuts it down.
pub async fn handle_connection<S>(stream: S, server_data: &ServerData)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = RequestReader::new(stream);

    let outcome = match reader.read_request_line().await {
        Ok(request) => {
            debug!(
                method = ?request.method,
                path = %String::from_utf8_lossy(&request.resource),
                "request line"
            );
            match_routes(server_data, &mut reader, &request).await
        }
        Err(e) => {
            debug!(reason = %e, "request line rejected");
            Either::Left(e.into())
        }
    };

    let writer = reader.get_mut();
    match outcome {
        Either::Left(response) => {
            let status = response.status_code;
            match send_response(writer, response).await {
                Ok(bytes) => info!(status = status.code(), bytes, "response sent"),
                Err(e) => error!(status = status.code(), error = %e, "error sending response"),
            }
        }
        Either::Right(download) => {
            let FileDownload { file, length, path } = download;
            match send_stream(writer, file, length).await {
                Ok(bytes) => info!(path = %path.display(), bytes, "served file"),
                Err(e @ SendError::Head(_)) => {
                    error!(path = %path.display(), error = %e, "error sending response")
                }
                Err(e @ SendError::Body { .. }) => {
                    error!(path = %path.display(), error = %e, "file body cut short, status already sent")
                }
            }
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "shutdown failed");
    }
}

/// Selects the behavior for `request`. Left is a generated response, right is a
/// file that still has to be streamed.
pub async fn match_routes<S>(
    server_data: &ServerData,
    reader: &mut RequestReader<S>,
    request: &Request,
) -> Either<Response, FileDownload>
where
    S: AsyncRead + Unpin,
{
    let result = match Route::recognize(&request.resource) {
        Route::Root => Ok(root_route()),
        Route::UserAgent => user_agent_route(reader).await,
        Route::Echo(text) => echo_route(reader, text).await,
        Route::Files(name) => match request.method {
            Method::GET => match download_route(server_data, name).await {
                Ok(download) => return Either::Right(download),
                Err(e) => Err(e),
            },
            Method::POST => upload_route(server_data, reader, name).await,
            _ => Err(HandlerError::NotImplemented),
        },
        Route::Unknown => Err(HandlerError::NotFound),
    };

    Either::Left(result.unwrap_or_else(|e| {
        match &e {
            HandlerError::Internal(source) => warn!(error = %source, "request failed"),
            other => debug!(reason = %other, "request rejected"),
        }
        e.into()
    }))
}

/// Request and response header names this server knows about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, IntoStaticStr)]
pub enum Header {
    #[strum(serialize = "Accept-Encoding")]
    AcceptEncoding,
    #[strum(serialize = "Content-Encoding")]
    ContentEncoding,
    #[strum(serialize = "Content-Length")]
    ContentLength,
    #[strum(serialize = "User-Agent")]
    UserAgent,
}

impl Header {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString, IntoStaticStr)]
pub enum Method {
    CONNECT,
    DELETE,
    GET,
    HEAD,
    OPTIONS,
    PATCH,
    POST,
    PUT,
    TRACE,
}

impl Method {
    pub fn is_supported(self) -> bool {
        matches!(self, Method::GET | Method::POST)
    }
}

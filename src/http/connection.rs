use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::http::error::RequestError;
use crate::http::handler::{error_response, handle_request};
use crate::http::parser::{parse_http_request, ParseError};
use crate::http::request::Request;
use crate::http::writer::ResponseWriter;
use crate::static_files::DocumentRoot;

/// Per-connection I/O deadlines.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Time allowed for the complete request head to arrive
    pub read: Duration,
    /// Time allowed to transmit the whole response
    pub write: Duration,
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("timed out waiting for the request head")]
    ReadTimeout,

    #[error("timed out writing the response")]
    WriteTimeout,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// One accepted socket, carrying exactly one request and one response.
pub struct Connection<S = TcpStream> {
    stream: S,
    buffer: BytesMut,
    state: ConnectionState,
    root: Arc<DocumentRoot>,
    timeouts: Timeouts,
    shutdown: CancellationToken,
}

pub enum ConnectionState {
    ReadingHeaders,
    Dispatching(Request),
    Responding(ResponseWriter),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        root: Arc<DocumentRoot>,
        timeouts: Timeouts,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::ReadingHeaders,
            root,
            timeouts,
            shutdown,
        }
    }

    /// Drives the connection to `Closed` and shuts the stream down.
    ///
    /// The stream is shut down on every path, including errors.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        let outcome = self.drive().await;

        if let Ok(Err(e)) = timeout(self.timeouts.write, self.stream.shutdown()).await {
            tracing::trace!(error = %e, "Shutdown of connection stream failed");
        }

        outcome
    }

    async fn drive(&mut self) -> Result<(), ConnectionError> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::ReadingHeaders => {
                    self.state = match self.read_request_with_deadline().await {
                        Ok(Some(req)) => ConnectionState::Dispatching(req),
                        Ok(None) => ConnectionState::Closed,
                        Err(RequestError::ConnectionTimeout) => {
                            return Err(ConnectionError::ReadTimeout);
                        }
                        Err(e) => {
                            tracing::info!(error = %e, "Rejecting malformed request");
                            ConnectionState::Responding(ResponseWriter::new(error_response(&e)))
                        }
                    };
                }

                ConnectionState::Dispatching(req) => {
                    let response = handle_request(&req, &self.root).await;

                    tracing::info!(
                        method = %req.method,
                        path = %req.path,
                        user_agent = req.header("user-agent").unwrap_or("-"),
                        status = response.status.as_u16(),
                        bytes = response.body.len(),
                        "Request served"
                    );

                    self.state = ConnectionState::Responding(ResponseWriter::new(response));
                }

                ConnectionState::Responding(mut writer) => {
                    timeout(self.timeouts.write, writer.write_to_stream(&mut self.stream))
                        .await
                        .map_err(|_| ConnectionError::WriteTimeout)??;
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => return Ok(()),
            }
        }
    }

    /// Waits for a request head, bounded by the read timeout and the shutdown
    /// signal. Shutdown closes the connection without a response.
    async fn read_request_with_deadline(&mut self) -> Result<Option<Request>, RequestError> {
        let shutdown = self.shutdown.clone();
        let read_timeout = self.timeouts.read;

        tokio::select! {
            _ = shutdown.cancelled() => Ok(None),
            res = timeout(read_timeout, self.read_request()) => match res {
                Ok(parsed) => parsed.map_err(RequestError::from),
                Err(_) => Err(RequestError::ConnectionTimeout),
            },
        }
    }

    /// Reads until a complete request head is buffered.
    ///
    /// Returns `Ok(None)` if the client closed the connection without sending
    /// anything or the read itself failed.
    pub async fn read_request(&mut self) -> Result<Option<Request>, ParseError> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => return Err(e),
            }

            let n = match self.stream.read_buf(&mut self.buffer).await {
                Ok(n) => n,
                Err(e) => {
                    // Nobody left to answer
                    tracing::debug!(error = %e, "Read from client failed");
                    return Ok(None);
                }
            };

            if n == 0 {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(ParseError::UnexpectedEof)
                };
            }
        }
    }
}

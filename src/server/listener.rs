use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionError, Timeouts};
use crate::static_files::DocumentRoot;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Whether the accept loop is still taking connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Running,
    Stopped,
}

/// Cloneable control for a [`Server`], usable from any thread or task.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    shutdown: CancellationToken,
}

impl ServerHandle {
    /// Stops accepting and tells in-flight connections to wind down.
    ///
    /// Calling it more than once has no further effect.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn state(&self) -> ServerState {
        if self.shutdown.is_cancelled() {
            ServerState::Stopped
        } else {
            ServerState::Running
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }
}

/// A bound listening socket plus everything connections share.
pub struct Server {
    listener: TcpListener,
    root: Arc<DocumentRoot>,
    timeouts: Timeouts,
    max_connections: usize,
    shutdown_grace: Duration,
    shutdown: CancellationToken,
}

impl Server {
    /// Binds the listening socket. No connection is accepted until [`run`](Self::run).
    pub async fn bind(cfg: &Config, root: DocumentRoot) -> io::Result<Self> {
        let listener = TcpListener::bind(cfg.listen_addr()).await?;

        Ok(Self {
            listener,
            root: Arc::new(root),
            timeouts: cfg.timeouts(),
            max_connections: cfg.max_connections.clamp(1, Semaphore::MAX_PERMITS),
            shutdown_grace: cfg.shutdown_grace(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Accepts connections until stopped, one task per connection.
    ///
    /// A connection slot is taken before `accept`, so once `max_connections`
    /// are in flight new clients wait in the kernel backlog. On stop the
    /// listener is closed and in-flight connections get `shutdown_grace` to
    /// finish.
    pub async fn run(self) -> anyhow::Result<()> {
        let Server {
            listener,
            root,
            timeouts,
            max_connections,
            shutdown_grace,
            shutdown,
        } = self;

        let slots = Arc::new(Semaphore::new(max_connections));
        info!(
            addr = %listener.local_addr()?,
            root = %root.path().display(),
            max_connections,
            "Listening"
        );

        loop {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&slots).acquire_owned() => {
                    permit.context("connection slots closed")?
                }
            };

            let (socket, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        // Transient (e.g. out of file descriptors); keep serving
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };
            tracing::debug!(%peer, "Accepted connection");

            let root = Arc::clone(&root);
            let shutdown = shutdown.child_token();
            tokio::spawn(async move {
                let _permit = permit;
                let conn = Connection::new(socket, root, timeouts, shutdown);
                match conn.run().await {
                    Ok(()) => {}
                    Err(ConnectionError::ReadTimeout) => {
                        tracing::debug!(%peer, "Closing idle connection");
                    }
                    Err(e) => {
                        tracing::warn!(%peer, error = %e, "Connection error");
                    }
                }
            });
        }

        drop(listener);
        info!("Listener closed, draining connections");

        let in_flight = u32::try_from(max_connections).unwrap_or(u32::MAX);
        if tokio::time::timeout(shutdown_grace, slots.acquire_many(in_flight))
            .await
            .is_err()
        {
            tracing::warn!("Shutdown grace period elapsed with connections still open");
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Opens the document root and binds the listener described by `cfg`.
///
/// Both failures are fatal at startup.
pub async fn start(cfg: &Config) -> anyhow::Result<Server> {
    let root = DocumentRoot::open(&cfg.document_root)?;
    Server::bind(cfg, root)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr()))
}

//! TCP front end of the chat service.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::session::{ChatSession, SessionSettings};
use crate::chat::ServiceRegistry;
use crate::config::ServerConfig;
use crate::{CamixError, Result};

/// Accepts chat clients and runs one [`ChatSession`] per connection.
///
/// At most `max_connections` sessions run at once; further clients wait in
/// the listen backlog until a session ends.
pub struct ChatServer {
    listener: TcpListener,
    slots: Arc<Semaphore>,
}

impl ChatServer {
    /// Bind the configured address.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        info!(
            "Chat server listening on {} ({} connections max)",
            listener.local_addr()?,
            config.max_connections
        );

        Ok(Self {
            listener,
            slots: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Get the address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve clients until the task is cancelled.
    ///
    /// A free slot is taken before each accept and released when the
    /// session ends. Accept errors are logged and do not stop the server.
    pub async fn serve(
        self,
        registry: Arc<ServiceRegistry>,
        settings: SessionSettings,
    ) -> Result<()> {
        loop {
            let slot = Arc::clone(&self.slots)
                .acquire_owned()
                .await
                .map_err(|_| CamixError::Io(std::io::Error::other("connection slots closed")))?;

            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };
            debug!(
                "Accepted {} ({} slots left)",
                peer,
                self.slots.available_permits()
            );

            let registry = Arc::clone(&registry);
            let settings = settings.clone();
            tokio::spawn(async move {
                if let Err(e) = ChatSession::run(stream, peer, registry, settings).await {
                    warn!("Session {} ended with error: {}", peer, e);
                }
                drop(slot);
            });
        }
    }
}

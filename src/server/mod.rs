pub mod service;

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

use crate::bookmark_v1::bookmark_service_server::BookmarkServiceServer;
use crate::config::ServerConfig;
use crate::db::BookmarkDb;
use crate::error::StartupError;
use self::service::BookmarkServiceImpl;

/// Where the server is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Serving,
    Draining,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initializing => "initializing",
            Phase::Serving => "serving",
            Phase::Draining => "draining",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

pub struct BookmarkServer {
    db: BookmarkDb,
    listener: TcpListener,
    local_addr: SocketAddr,
    phase_tx: watch::Sender<Phase>,
}

impl BookmarkServer {
    /// Opens storage, applies the schema and binds the listener. Nothing is
    /// served until [`BookmarkServer::serve_with_shutdown`] runs.
    pub async fn initialize(config: &ServerConfig) -> Result<Self, StartupError> {
        let (phase_tx, _) = watch::channel(Phase::Initializing);
        info!(phase = %Phase::Initializing, "Server phase changed.");

        let port = config.port()?;
        let address = format!("{}:{}", config.grpc_host, port);
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| StartupError::InvalidAddress(address.clone()))?;

        let db = BookmarkDb::open(&config.database_file()).await?;
        if let Err(e) = db.apply_schema().await {
            db.close().await;
            return Err(e);
        }

        let bound = bind_listener(addr).and_then(|listener| {
            let local_addr = listener.local_addr()?;
            Ok((listener, local_addr))
        });
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                db.close().await;
                return Err(StartupError::Bind { address, source });
            }
        };

        Ok(Self {
            db,
            listener,
            local_addr,
            phase_tx,
        })
    }

    /// The address actually bound, useful when the configured port is 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase_tx.subscribe()
    }

    /// Serves until `signal` resolves, then stops accepting, lets in-flight
    /// requests finish and closes the database.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()>,
    {
        let BookmarkServer {
            db,
            listener,
            local_addr,
            phase_tx,
        } = self;

        let service = BookmarkServiceServer::new(BookmarkServiceImpl::new(db.clone()));
        let draining = async {
            signal.await;
            set_phase(&phase_tx, Phase::Draining);
            info!("Stopping the server...");
        };

        set_phase(&phase_tx, Phase::Serving);
        info!(address = %local_addr, "Server successfully started.");

        let result = Server::builder()
            .add_service(service)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), draining)
            .await;
        if let Err(e) = &result {
            error!(error = %e, "Failed to serve.");
        }

        db.close().await;
        set_phase(&phase_tx, Phase::Stopped);
        info!("Done.");
        result.map_err(StartupError::from)
    }
}

fn set_phase(phase_tx: &watch::Sender<Phase>, phase: Phase) {
    phase_tx.send_replace(phase);
    info!(phase = %phase, "Server phase changed.");
}

fn bind_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.set_keepalive(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

/// Resolves on the first Ctrl-C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received interrupt signal."),
        Err(e) => {
            // Without a handler the default SIGINT action still ends the process.
            error!(error = %e, "Failed to listen for interrupt signal.");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Initializing.to_string(), "initializing");
        assert_eq!(Phase::Draining.to_string(), "draining");
    }

    #[tokio::test]
    async fn test_bind_listener_on_ephemeral_port() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}

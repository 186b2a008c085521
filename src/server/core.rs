use log::{error, info};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::client::handle_client;
use crate::config::ServerConfig;
use crate::error::FileServerError;
use crate::protocol::RequestLimits;
use crate::protocol::router::{ENTITY_ROUTE, FILENAME_PARAM};
use crate::storage::FileStore;

pub struct Server {
    listener: TcpListener,
    store: Arc<FileStore>,
    limits: RequestLimits,
}

impl Server {
    /// Prepares the root directory and binds the listener.
    ///
    /// Failing to create the root directory is fatal: the caller is
    /// expected to exit rather than serve without one.
    pub async fn bind(config: ServerConfig) -> Result<Self, FileServerError> {
        config.validate()?;

        let root = config.server_root_path();
        let store = match FileStore::open(&root).await {
            Ok(store) => store,
            Err(e) => {
                error!(
                    "Failed to create server root directory {}: {}",
                    root.display(),
                    e
                );
                return Err(FileServerError::IoError(e));
            }
        };

        let socket = config.listen_socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(FileServerError::IoError(e));
            }
        };
        info!("Server bound to {}", listener.local_addr()?);

        Ok(Self {
            listener,
            store: Arc::new(store),
            limits: config.limits(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Accepts connections forever
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if let Ok(addr) = self.local_addr() {
            info!("File management server running at http://{}/", addr);
        }
        info!("Endpoints:");
        info!("  GET    {ENTITY_ROUTE}?{FILENAME_PARAM}=<name>    read file");
        info!("  POST   {ENTITY_ROUTE}?{FILENAME_PARAM}=<name>    create/overwrite file (body = file content)");
        info!("  DELETE {ENTITY_ROUTE}?{FILENAME_PARAM}=<name>    delete file");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let store = Arc::clone(&self.store);
                        let limits = self.limits;

                        // Spawn a task for each client so accept loop doesn't block
                        tokio::spawn(async move {
                            handle_client(stream, addr, store, limits).await;
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                },
            }
        }
    }
}

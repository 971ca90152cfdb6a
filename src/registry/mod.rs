//! Client admission control.
//!
//! Connected clients register here; the registry enforces a hard capacity
//! limit and broadcasts the occupancy count to every client whenever it
//! changes. Structurally this is the same backpressure idea as the decode
//! queue: reject at the boundary instead of degrading everyone.

use crate::config::Config;
use crate::error::{Result, SigchopError};
use log::info;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// A connected client, as seen by the registry.
pub trait Client: Send + Sync {
    /// Called with the current total client count after every change.
    fn on_client_count(&self, count: usize);
}

/// Registry settings.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// Hard limit on concurrently connected clients.
    pub max_clients: usize,
    /// Log a line on every occupancy change.
    pub log_connections: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_clients: crate::defaults::MAX_CLIENTS,
            log_connections: false,
        }
    }
}

impl From<&Config> for RegistryConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_clients: config.clients.max_clients,
            log_connections: config.clients.log_connections,
        }
    }
}

/// Admission control over concurrently connected clients.
pub struct ClientRegistry {
    clients: Mutex<Vec<Arc<dyn Client>>>,
    config: RegistryConfig,
}

impl ClientRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Returns the process-wide shared registry, creating it on first access
    /// from the default configuration.
    pub fn shared() -> &'static ClientRegistry {
        static SHARED: OnceLock<ClientRegistry> = OnceLock::new();
        SHARED.get_or_init(|| {
            let config = Config::load_or_default(&Config::default_path()).with_env_overrides();
            ClientRegistry::new(RegistryConfig::from(&config))
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Client>>> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a client.
    ///
    /// Fails with [`SigchopError::TooManyClients`] when the registry is at
    /// capacity; the connection layer uses that to refuse the client.
    pub fn add_client(&self, client: Arc<dyn Client>) -> Result<()> {
        {
            let mut clients = self.lock();
            if clients.len() >= self.config.max_clients {
                return Err(SigchopError::TooManyClients {
                    max: self.config.max_clients,
                });
            }
            clients.push(client);
        }
        self.broadcast();
        Ok(())
    }

    /// Removes a client if present. Removing an unknown client is a no-op.
    pub fn remove_client(&self, client: &Arc<dyn Client>) {
        {
            let mut clients = self.lock();
            clients.retain(|c| !Arc::ptr_eq(c, client));
        }
        self.broadcast();
    }

    /// Current occupancy.
    pub fn client_count(&self) -> usize {
        self.lock().len()
    }

    /// Notifies every registered client of the current total count.
    ///
    /// Callbacks run outside the registry lock, so a client may call back
    /// into the registry.
    pub fn broadcast(&self) {
        let clients: Vec<Arc<dyn Client>> = self.lock().clone();
        let count = clients.len();
        if self.config.log_connections {
            info!("total clients connected: {}", count);
        }
        for client in clients {
            client.on_client_count(count);
        }
    }
}

//! Shared store connection lifecycle.
//!
//! The manager holds at most one live handle for the whole process:
//! - `acquire` reuses the handle while it answers a liveness ping
//! - a failed ping or a missing handle triggers a fresh connect
//! - a failed connect leaves the manager in `Failed`, and the next
//!   `acquire` starts over as if unconnected
//!
//! At most one connect is in flight. Callers arriving while it runs await the
//! same shared future and all see its outcome, so a stalled handshake costs
//! each of them one connect timeout. The lock is never held across network I/O.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::StoreError;

/// Opens, checks and closes store handles
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    /// Establish a new connection
    async fn connect(&self) -> Result<Self::Handle, StoreError>;

    /// Liveness check on an existing handle
    async fn ping(&self, handle: &Self::Handle) -> Result<(), StoreError>;

    /// Close a handle on shutdown
    async fn close(&self, handle: Self::Handle);
}

type ConnectFuture<H> = Shared<BoxFuture<'static, Result<H, StoreError>>>;

/// Connection state machine
///
/// Every connect attempt gets a new generation, so a caller finishing late
/// never overwrites the outcome of a newer attempt.
pub enum ConnectionState<H> {
    Unconnected,
    Connecting {
        generation: u64,
        connect: ConnectFuture<H>,
    },
    Connected {
        generation: u64,
        handle: H,
    },
    /// Last connect attempt failed; treated as `Unconnected` on the next acquire
    Failed,
}

impl<H> ConnectionState<H> {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Unconnected => "unconnected",
            ConnectionState::Connecting { .. } => "connecting",
            ConnectionState::Connected { .. } => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

/// Owns the single shared store handle
pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    state: Mutex<ConnectionState<C::Handle>>,
    generation: AtomicU64,
    connect_timeout: Duration,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager; no connection is opened until the first `acquire`
    pub fn new(connector: C, connect_timeout: Duration) -> Self {
        Self {
            connector: Arc::new(connector),
            state: Mutex::new(ConnectionState::Unconnected),
            generation: AtomicU64::new(0),
            connect_timeout,
        }
    }

    /// Return a ready-to-use handle, connecting or reconnecting as needed
    pub async fn acquire(&self) -> Result<C::Handle, StoreError> {
        let current = match &*self.state.lock().await {
            ConnectionState::Connected { generation, handle } => Some((*generation, handle.clone())),
            _ => None,
        };

        let Some((generation, handle)) = current else {
            return self.join_connect(None).await;
        };

        match self.ping(&handle).await {
            Ok(()) => {
                debug!("Reusing store connection");
                Ok(handle)
            }
            Err(e) => {
                warn!("Store connection lost ({}), reconnecting", e);
                self.join_connect(Some(generation)).await
            }
        }
    }

    /// Close the shared handle and return to `Unconnected`
    pub async fn release(&self) {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, ConnectionState::Unconnected)
        };

        if let ConnectionState::Connected { handle, .. } = previous {
            self.connector.close(handle).await;
            info!("Store connection closed");
        }
    }

    /// Label of the current state
    pub async fn state_label(&self) -> &'static str {
        self.state.lock().await.label()
    }

    #[cfg(test)]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Await the in-flight connect, starting one if none is running.
    ///
    /// `stale` is the generation whose handle just failed its ping; a handle
    /// from any other generation was connected meanwhile and is returned as is.
    async fn join_connect(&self, stale: Option<u64>) -> Result<C::Handle, StoreError> {
        let (generation, connect) = {
            let mut state = self.state.lock().await;

            let joined = match &*state {
                ConnectionState::Connecting { generation, connect } => {
                    Some((*generation, connect.clone()))
                }
                ConnectionState::Connected { generation, handle } if Some(*generation) != stale => {
                    return Ok(handle.clone());
                }
                ConnectionState::Failed => {
                    debug!("Previous connect failed, retrying");
                    None
                }
                _ => None,
            };

            match joined {
                Some(joined) => joined,
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let connect = self.start_connect();
                    *state = ConnectionState::Connecting {
                        generation,
                        connect: connect.clone(),
                    };
                    (generation, connect)
                }
            }
        };

        let result = connect.await;

        let mut state = self.state.lock().await;
        if matches!(&*state, ConnectionState::Connecting { generation: g, .. } if *g == generation) {
            *state = match &result {
                Ok(handle) => ConnectionState::Connected {
                    generation,
                    handle: handle.clone(),
                },
                Err(_) => ConnectionState::Failed,
            };
        }

        result
    }

    fn start_connect(&self) -> ConnectFuture<C::Handle> {
        let connector = Arc::clone(&self.connector);
        let timeout = self.connect_timeout;

        async move {
            info!("Connecting to store");
            let result = match tokio::time::timeout(timeout, connector.connect()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout("connect", timeout)),
            };

            match &result {
                Ok(_) => info!("Store connected"),
                Err(e) => warn!("Store connection failed: {}", e),
            }
            result
        }
        .boxed()
        .shared()
    }

    async fn ping(&self, handle: &C::Handle) -> Result<(), StoreError> {
        match tokio::time::timeout(self.connect_timeout, self.connector.ping(handle)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout("liveness ping", self.connect_timeout)),
        }
    }
}

//! Bounded pool of reusable HTTP clients
//!
//! Handles are created lazily up to `max_clients`, reused while idle and
//! evicted by a periodic sweep once they stay idle longer than `idle_timeout`.
//! When every handle is busy, `acquire` backs off for a fixed delay and
//! retries. Callers are not FIFO-ordered.

use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, Response};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::shared::config::HttpClientCfg;
use crate::shared::errors::PoolError;

/// Client pool configuration
#[derive(Debug, Clone)]
pub struct ClientPoolConfig {
    pub max_clients: usize,
    pub request_timeout: Duration,
    pub idle_timeout: Duration,
    pub sweep_period: Duration,
    pub acquire_backoff: Duration,
    pub no_proxy: bool,
}

impl Default for ClientPoolConfig {
    fn default() -> Self {
        Self::from(&HttpClientCfg::default())
    }
}

impl From<&HttpClientCfg> for ClientPoolConfig {
    fn from(cfg: &HttpClientCfg) -> Self {
        Self {
            max_clients: cfg.max_clients,
            request_timeout: cfg.timeout(),
            idle_timeout: cfg.idle_timeout(),
            sweep_period: cfg.sweep_period(),
            acquire_backoff: cfg.acquire_backoff(),
            no_proxy: cfg.no_proxy,
        }
    }
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub busy: usize,
    pub idle: usize,
}

struct ClientSlot {
    id: u64,
    client: Client,
    busy: bool,
    last_used: Instant,
}

/// Live clients plus capacity promised to clients still being built
#[derive(Default)]
struct Slots {
    clients: Vec<ClientSlot>,
    reserved: usize,
}

struct PoolInner {
    config: ClientPoolConfig,
    // Held only for check-and-mark, never across a request.
    slots: Mutex<Slots>,
    next_id: AtomicU64,
    shut_down: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl PoolInner {
    fn sweep_idle(&self) -> usize {
        let now = Instant::now();
        let idle_timeout = self.config.idle_timeout;
        let mut slots = self.slots.lock();
        let before = slots.clients.len();
        slots
            .clients
            .retain(|slot| slot.busy || now.duration_since(slot.last_used) <= idle_timeout);
        let removed = before - slots.clients.len();
        info!("🧹 Idle sweep completed: removed {}, {} clients remaining", removed, slots.clients.len());
        removed
    }

    fn mark_idle(&self, id: u64) -> bool {
        let mut slots = self.slots.lock();
        match slots.clients.iter_mut().find(|slot| slot.id == id) {
            Some(slot) => {
                slot.busy = false;
                true
            }
            None => false,
        }
    }

    fn touch(&self, id: u64) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.clients.iter_mut().find(|slot| slot.id == id) {
            slot.last_used = Instant::now();
        }
    }
}

/// Shared, cloneable handle to one client pool
#[derive(Clone)]
pub struct ClientPool {
    inner: Arc<PoolInner>,
}

impl ClientPool {
    pub fn new(config: ClientPoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                slots: Mutex::new(Slots::default()),
                next_id: AtomicU64::new(1),
                shut_down: AtomicBool::new(false),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Spawn the periodic idle sweep. Calling it again while running is a no-op.
    pub fn start(&self) {
        if self.is_shut_down() {
            return;
        }
        let mut sweeper = self.inner.sweeper.lock();
        if sweeper.is_some() {
            return;
        }

        let weak: Weak<PoolInner> = Arc::downgrade(&self.inner);
        let period = self.inner.config.sweep_period;
        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // first tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.shut_down.load(Ordering::SeqCst) {
                    break;
                }
                inner.sweep_idle();
            }
        }));
        info!(
            "🚀 Client pool started (max {} clients, sweep every {:?})",
            self.inner.config.max_clients, period
        );
    }

    /// Check out a free client, creating one if under capacity.
    /// Waits `acquire_backoff` and retries while the pool is saturated.
    pub async fn acquire(&self) -> Result<PooledClient, PoolError> {
        let mut attempts: u32 = 0;
        loop {
            if let Some(handle) = self.try_acquire()? {
                if attempts > 0 {
                    debug!("Client {} acquired after {} retries", handle.id, attempts);
                }
                return Ok(handle);
            }
            if attempts == 0 {
                warn!("⏳ All clients busy. Waiting for an available client.");
            }
            attempts = attempts.saturating_add(1);
            sleep(self.inner.config.acquire_backoff).await;
        }
    }

    /// Non-blocking acquire: `Ok(None)` when the pool is saturated
    pub fn try_acquire(&self) -> Result<Option<PooledClient>, PoolError> {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }

        {
            let mut slots = self.inner.slots.lock();
            if let Some(slot) = slots.clients.iter_mut().find(|slot| !slot.busy) {
                slot.busy = true;
                slot.last_used = Instant::now();
                return Ok(Some(PooledClient::new(self.clone(), slot.id, slot.client.clone())));
            }
            if slots.clients.len() + slots.reserved >= self.inner.config.max_clients {
                return Ok(None);
            }
            slots.reserved += 1;
        }

        // the reservation holds capacity while the client is built unlocked
        let built = self.build_client();

        let mut slots = self.inner.slots.lock();
        slots.reserved -= 1;
        let client = built?;
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        slots.clients.push(ClientSlot {
            id,
            client: client.clone(),
            busy: true,
            last_used: Instant::now(),
        });
        debug!("Created client {} ({}/{})", id, slots.clients.len(), self.inner.config.max_clients);
        Ok(Some(PooledClient::new(self.clone(), id, client)))
    }

    fn build_client(&self) -> Result<Client, PoolError> {
        let mut builder = Client::builder().timeout(self.inner.config.request_timeout);
        if self.inner.config.no_proxy {
            builder = builder.no_proxy();
        }
        builder.build().map_err(|e| PoolError::ClientBuild(e.to_string()))
    }

    /// Return a handle to the pool. Returns `false` when the handle was
    /// already evicted, in which case nothing changes.
    pub fn release(&self, mut handle: PooledClient) -> bool {
        handle.released = true;
        self.inner.mark_idle(handle.id)
    }

    /// Drop every idle client whose idle time exceeds the timeout.
    /// Busy clients are never evicted.
    pub fn sweep_idle(&self) -> usize {
        self.inner.sweep_idle()
    }

    /// Stop the sweep task and drop every client. Safe to call twice.
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            debug!("Client pool already shut down");
            return;
        }

        let sweeper = self.inner.sweeper.lock().take();
        if let Some(task) = sweeper {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("Idle sweep task failed: {}", e);
                }
            }
        }

        let disposed = {
            let mut slots = self.inner.slots.lock();
            let count = slots.clients.len();
            slots.clients.clear();
            count
        };
        info!("✅ All clients disposed ({})", disposed);
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        let slots = self.inner.slots.lock();
        let busy = slots.clients.iter().filter(|slot| slot.busy).count();
        PoolStats {
            total: slots.clients.len(),
            busy,
            idle: slots.clients.len() - busy,
        }
    }
}

/// Checked-out client. Returned to the pool when dropped.
pub struct PooledClient {
    pool: ClientPool,
    id: u64,
    client: Client,
    released: bool,
}

impl PooledClient {
    fn new(pool: ClientPool, id: u64, client: Client) -> Self {
        Self {
            pool,
            id,
            client,
            released: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request built from this client. Usage time is recorded on
    /// completion whether the request succeeded or not.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, PoolError> {
        let result = request.send().await;
        self.pool.inner.touch(self.id);
        result.map_err(|e| {
            error!("Request error: {}", e);
            PoolError::Request(e)
        })
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            self.pool.inner.mark_idle(self.id);
        }
    }
}

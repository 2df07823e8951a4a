use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use storefront_shared::types::product::Product;
use storefront_shared::types::sse::BroadcastMessage;

use super::sse::SseStreamBuilder;
use crate::database::{StoreError, products};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Authoritative, consistent read of the full catalog.
pub trait ProductSource: Send + Sync + 'static {
    fn read_all_products(&self) -> impl Future<Output = Result<Vec<Product>, StoreError>> + Send;
}

impl ProductSource for SqlitePool {
    fn read_all_products(&self) -> impl Future<Output = Result<Vec<Product>, StoreError>> + Send {
        products::list_products(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("subscriber disconnected")]
    Disconnected,
    #[error("subscriber is not draining its stream")]
    Backpressure,
    #[error("sink already closed")]
    Closed,
}

/// One subscriber's outgoing stream.
///
/// `send` must not block: the broadcaster calls it for every subscriber in
/// turn and never waits on an individual client.
pub trait ClientSink: Send + Sync {
    fn send(&self, frame: Bytes) -> Result<(), DeliveryError>;
    fn close(&self);
}

/// [`ClientSink`] feeding a bounded channel that backs a streaming response.
///
/// A full channel counts as a failed delivery, which bounds how long an
/// unresponsive client stays registered.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Mutex<Option<mpsc::Sender<Bytes>>>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }
}

impl ClientSink for ChannelSink {
    fn send(&self, frame: Bytes) -> Result<(), DeliveryError> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = guard.as_ref().ok_or(DeliveryError::Closed)?;
        tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backpressure,
            TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }

    fn close(&self) {
        // Dropping the sender ends the response body once queued frames drain.
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

// ---------------------------------------------------------------------------
// Change events
// ---------------------------------------------------------------------------

/// A committed write that changed what the catalog looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductsChanged {
    Created { product_id: String },
    Updated { product_id: String },
    Deleted { product_id: String },
    StockChanged { product_ids: Vec<String> },
}

/// What mutation code depends on. Call exactly once per committed mutation
/// and never for a write that failed.
pub trait ChangeNotifier: Send + Sync {
    fn products_changed(&self, event: ProductsChanged);
}

// ---------------------------------------------------------------------------
// ProductBroadcaster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of one subscriber: `Registering -> Active -> (Closed | Errored)`.
///
/// Only `Active` connections are in the registry; the terminal states are
/// never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Registering,
    Active,
    Closed,
    Errored,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Registering => "registering",
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Errored => "errored",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("failed to read product catalog: {0}")]
    StoreRead(#[from] StoreError),

    #[error("failed to deliver initial snapshot: {0}")]
    InitialDelivery(DeliveryError),
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

type Registry = HashMap<ConnectionId, Arc<dyn ClientSink>>;

struct BroadcasterInner<S> {
    source: S,
    clients: Mutex<Registry>,
    // Serializes read-then-deliver so the newest read is delivered last.
    gate: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
}

/// Pushes full catalog snapshots to every open product stream.
///
/// Cheap to clone; clones share one registry. Every broadcast re-reads the
/// store. Reads and their deliveries are serialized, so once mutations stop
/// the last message every subscriber holds equals the final store state.
/// Back-to-back mutations may still collapse into identical snapshots.
pub struct ProductBroadcaster<S> {
    inner: Arc<BroadcasterInner<S>>,
}

impl<S> Clone for ProductBroadcaster<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for ProductBroadcaster<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductBroadcaster")
            .field("subscribers", &self.lock_clients().len())
            .finish()
    }
}

impl<S> ProductBroadcaster<S> {
    // Never held across an await.
    fn lock_clients(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_clients().len()
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.lock_clients().contains_key(&id)
    }

    /// Remove a connection. Unknown or already-removed ids are a no-op.
    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        self.retire(id, ConnectionState::Closed)
    }

    fn retire(&self, id: ConnectionId, state: ConnectionState) -> bool {
        let removed = self.lock_clients().remove(&id);
        match removed {
            Some(sink) => {
                sink.close();
                info!("SSE connection {} {}", id, state);
                true
            }
            None => false,
        }
    }

    /// Push one frame to a snapshot of the registry, pruning every
    /// connection whose write fails.
    fn deliver(&self, frame: Bytes) -> BroadcastReport {
        let targets: Vec<(ConnectionId, Arc<dyn ClientSink>)> = self
            .lock_clients()
            .iter()
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect();

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        for (id, sink) in targets {
            match sink.send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("SSE delivery to {} failed: {}", id, e);
                    failed.push(id);
                }
            }
        }

        for id in failed {
            if self.retire(id, ConnectionState::Errored) {
                report.pruned += 1;
            }
        }

        report
    }

    /// Send the keep-alive comment to every subscriber.
    pub fn heartbeat(&self) -> BroadcastReport {
        let report = self.deliver(SseStreamBuilder::heartbeat());
        debug!(
            "SSE heartbeat: {} delivered, {} pruned",
            report.delivered, report.pruned
        );
        report
    }
}

impl<S: ProductSource> ProductBroadcaster<S> {
    pub fn new(source: S) -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                source,
                clients: Mutex::new(HashMap::new()),
                gate: tokio::sync::Mutex::new(()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a sink and push it the current catalog.
    ///
    /// On a failed read the sink gets an `error` frame instead, is closed and
    /// is never registered.
    pub async fn subscribe(&self, sink: Arc<dyn ClientSink>) -> Result<ConnectionId, BroadcastError> {
        let id = ConnectionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        debug!("SSE connection {} {}", id, ConnectionState::Registering);

        let _gate = self.inner.gate.lock().await;
        let products = match self.inner.source.read_all_products().await {
            Ok(products) => products,
            Err(e) => {
                error!("SSE connection {} initial read failed: {}", id, e);
                let frame = SseStreamBuilder::format_message(&BroadcastMessage::Error {
                    message: e.to_string(),
                });
                if let Err(send_err) = sink.send(frame) {
                    debug!("SSE connection {} missed error frame: {}", id, send_err);
                }
                sink.close();
                return Err(BroadcastError::StoreRead(e));
            }
        };

        let frame = SseStreamBuilder::format_message(&BroadcastMessage::Initial { products });

        let mut clients = self.lock_clients();
        if let Err(e) = sink.send(frame) {
            drop(clients);
            warn!("SSE connection {} dropped before initial snapshot: {}", id, e);
            sink.close();
            return Err(BroadcastError::InitialDelivery(e));
        }
        clients.insert(id, sink);
        info!(
            "SSE connection {} {} ({} subscribers)",
            id,
            ConnectionState::Active,
            clients.len()
        );

        Ok(id)
    }

    /// Re-read the catalog and push it to every subscriber.
    ///
    /// A failed read abandons this broadcast; subscribers stay on their last
    /// snapshot until the next successful one.
    pub async fn notify_changed(&self) -> Result<BroadcastReport, BroadcastError> {
        let _gate = self.inner.gate.lock().await;
        let products = self.inner.source.read_all_products().await.map_err(|e| {
            error!("Error broadcasting product update: {}", e);
            BroadcastError::StoreRead(e)
        })?;

        let count = products.len();
        let frame = SseStreamBuilder::format_message(&BroadcastMessage::ProductsUpdated {
            products,
            timestamp: Utc::now(),
        });

        let report = self.deliver(frame);
        info!(
            "Broadcast {} products to {} clients ({} pruned)",
            count, report.delivered, report.pruned
        );
        Ok(report)
    }

    /// Start the periodic heartbeat. The first beat fires one `period` from now.
    pub fn spawn_heartbeat(&self, period: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                this.heartbeat();
            }
        })
    }
}

impl<S: ProductSource> ChangeNotifier for ProductBroadcaster<S> {
    fn products_changed(&self, event: ProductsChanged) {
        debug!("Catalog changed: {:?}", event);
        let this = self.clone();
        tokio::spawn(async move {
            // Failures are logged inside; nothing to retry.
            let _ = this.notify_changed().await;
        });
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Unsubscribes when dropped. Owned by the response body, so a client
/// disconnect removes the connection as soon as hyper drops the body.
pub struct Subscription<S> {
    broadcaster: ProductBroadcaster<S>,
    id: ConnectionId,
}

impl<S> Subscription<S> {
    pub fn new(broadcaster: ProductBroadcaster<S>, id: ConnectionId) -> Self {
        Self { broadcaster, id }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<S> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.id);
    }
}

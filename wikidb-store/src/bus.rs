//! In-process request/reply bus
//!
//! Services register as consumers of a named address; callers send a
//! `Request` to the address and await a single `Reply`. Several consumers
//! on one address compete: each request goes to exactly one of them,
//! picked round-robin among those still alive.
//!
//! ```text
//!   caller ──request──▶ EventBus ──Delivery──▶ MessageConsumer (1 of N)
//!     ▲                                            │
//!     └──────────────── oneshot Reply ◀────────────┘
//! ```
//!
//! Sending never waits on a busy consumer (queues are unbounded); the only
//! wait is for the reply, bounded by the caller's timeout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::BusError;
use crate::protocol::{Reply, Request};

/// A request in flight, paired with the slot its reply goes into.
#[derive(Debug)]
pub struct Delivery {
    request: Request,
    reply_to: ReplyTo,
}

impl Delivery {
    pub fn into_parts(self) -> (Request, ReplyTo) {
        (self.request, self.reply_to)
    }
}

/// Single-use reply slot.
#[derive(Debug)]
pub struct ReplyTo(oneshot::Sender<Reply>);

impl ReplyTo {
    /// Fulfil the request. Returns `false` if the caller stopped waiting.
    pub fn send(self, reply: Reply) -> bool {
        self.0.send(reply).is_ok()
    }
}

#[derive(Debug, Clone)]
struct Consumer {
    id: u64,
    tx: mpsc::UnboundedSender<Delivery>,
}

#[derive(Debug, Default)]
struct Group {
    consumers: Vec<Consumer>,
    cursor: usize,
}

impl Group {
    fn next(&mut self) -> Option<Consumer> {
        self.consumers.retain(|c| !c.tx.is_closed());
        if self.consumers.is_empty() {
            return None;
        }
        let picked = self.consumers[self.cursor % self.consumers.len()].clone();
        self.cursor = self.cursor.wrapping_add(1);
        Some(picked)
    }
}

#[derive(Debug, Default)]
struct BusInner {
    routes: Mutex<HashMap<String, Group>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn routes(&self) -> MutexGuard<'_, HashMap<String, Group>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unregister(&self, address: &str, id: u64) {
        let mut routes = self.routes();
        if let Some(group) = routes.get_mut(address) {
            group.consumers.retain(|c| c.id != id);
            if group.consumers.is_empty() {
                routes.remove(address);
            }
        }
    }
}

/// Process-wide message bus. Cloning shares the same routing table.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new competing consumer on `address`.
    ///
    /// The consumer is routable as soon as this returns and stops being
    /// routable when it is dropped.
    pub fn consumer(&self, address: impl Into<String>) -> MessageConsumer {
        let address = address.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .routes()
            .entry(address.clone())
            .or_default()
            .consumers
            .push(Consumer { id, tx });
        debug!(address = %address, consumer = id, "consumer registered");

        MessageConsumer {
            address,
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Live consumers on `address`.
    pub fn handler_count(&self, address: &str) -> usize {
        self.inner
            .routes()
            .get(address)
            .map(|g| g.consumers.iter().filter(|c| !c.tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Send `request` to one consumer of `address` and wait for its reply.
    ///
    /// Fails immediately with `NoHandlers` when nobody is registered.
    /// Dropping the returned future abandons the wait; the consumer still
    /// runs the request to completion.
    pub async fn request(
        &self,
        address: &str,
        request: Request,
        timeout: Duration,
    ) -> Result<Reply, BusError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let mut delivery = Delivery {
            request,
            reply_to: ReplyTo(reply_tx),
        };

        loop {
            let picked = self.inner.routes().get_mut(address).and_then(Group::next);
            let Some(consumer) = picked else {
                warn!(address, "no handlers for request");
                return Err(BusError::NoHandlers {
                    address: address.to_owned(),
                });
            };

            match consumer.tx.send(delivery) {
                Ok(()) => break,
                Err(mpsc::error::SendError(returned)) => {
                    // Consumer closed between pick and send; try the next one
                    self.inner.unregister(address, consumer.id);
                    delivery = returned;
                }
            }
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BusError::ReplyDropped {
                address: address.to_owned(),
            }),
            Err(_) => {
                warn!(address, ?timeout, "request timed out");
                Err(BusError::Timeout {
                    address: address.to_owned(),
                    after: timeout,
                })
            }
        }
    }
}

/// Receiving end of a registration.
#[derive(Debug)]
pub struct MessageConsumer {
    address: String,
    id: u64,
    rx: mpsc::UnboundedReceiver<Delivery>,
    bus: Weak<BusInner>,
}

impl MessageConsumer {
    /// Next delivery, in arrival order. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for MessageConsumer {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.unregister(&self.address, self.id);
            debug!(address = %self.address, consumer = self.id, "consumer unregistered");
        }
    }
}

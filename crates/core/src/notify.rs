//! Notification bridge
//!
//! Keeps the admin-facing unread counter for newly created requests and
//! propagates creation events to other open sessions of the same
//! browser profile through a shared local-storage key. Delivery is
//! best-effort: no retry, and events raised while a session is not
//! listening are lost.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::account::Role;
use crate::session::LocalStorage;

/// Storage key the creation signal is written to.
pub const SIGNAL_KEY: &str = "dsp.notifications.signal";

/// Payload written to the signal key. The nonce makes each write
/// distinct so repeated creations are observable.
#[derive(Debug, Serialize, Deserialize)]
struct Signal {
    nonce: Uuid,
}

/// Per-session unread counter with cross-session propagation.
#[derive(Clone)]
pub struct NotificationBridge {
    origin: Uuid,
    unread: Arc<AtomicUsize>,
    storage: LocalStorage,
}

impl NotificationBridge {
    pub fn new(storage: LocalStorage) -> Self {
        Self {
            origin: storage.handle_id(),
            unread: Arc::new(AtomicUsize::new(0)),
            storage,
        }
    }

    /// Start listening for creation signals raised by other sessions.
    ///
    /// The counter is shown to roles that see notifications; for any
    /// other role no listener is started. Events originating from this
    /// bridge's own storage handle are skipped; the local counter was
    /// already incremented by [`Self::record_created`].
    pub fn listen(&self, role: Role) -> Option<JoinHandle<()>> {
        if !role.sees_notifications() {
            return None;
        }
        let mut events = self.storage.subscribe();
        let unread = Arc::clone(&self.unread);
        let origin = self.origin;
        Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.key == SIGNAL_KEY && event.origin != origin => {
                        unread.fetch_add(1, Ordering::SeqCst);
                        debug!("Received cross-session request notification");
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Notification listener lagged; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    }

    /// Record a request created in this session: bump the local counter
    /// and signal other sessions.
    pub fn record_created(&self) {
        self.unread.fetch_add(1, Ordering::SeqCst);
        let signal = Signal { nonce: Uuid::new_v4() };
        match serde_json::to_string(&signal) {
            Ok(payload) => {
                if let Err(err) = self.storage.set(SIGNAL_KEY, &payload) {
                    warn!("Failed to publish creation signal: {}", err);
                }
            }
            Err(err) => warn!("Failed to encode creation signal: {}", err),
        }
    }

    /// Current unread count.
    pub fn unread(&self) -> usize {
        self.unread.load(Ordering::SeqCst)
    }

    /// Reset the unread count, as when the admin views the list.
    pub fn acknowledge(&self) {
        self.unread.store(0, Ordering::SeqCst);
    }
}

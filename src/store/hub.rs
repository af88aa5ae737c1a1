//! In-process change-notification fan-out.
//!
//! The hub plays the role the gossip layer plays in a networked deployment:
//! every committed row change is routed to the subscriptions whose scope
//! covers it. Delivery is best-effort; a subscriber that fell away simply
//! stops receiving.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc::{self, UnboundedSender};

use crate::platform::{ChangeScope, ChangeSubscription, RowChange};

#[derive(Default)]
pub(super) struct EventHub {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, (ChangeScope, UnboundedSender<RowChange>)>>,
}

impl EventHub {
    pub fn subscribe(&self, scope: ChangeScope) -> ChangeSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (scope, tx));
        ChangeSubscription { id, receiver: rx }
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    pub fn publish(&self, change: RowChange) {
        let mut dropped = Vec::new();
        {
            let subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            for (id, (scope, tx)) in subscribers.iter() {
                if scope.covers(&change) && tx.send(change.clone()).is_err() {
                    dropped.push(*id);
                }
            }
        }
        if !dropped.is_empty() {
            let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            for id in dropped {
                subscribers.remove(&id);
            }
            tracing::debug!("pruned closed change-feed subscriptions");
        }
    }
}

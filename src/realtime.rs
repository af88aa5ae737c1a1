//! Live reconciliation of loaded views against row changes.
//!
//! Change events carry only row ids; a watcher collects them over a short
//! debounce window, re-fetches the full joined records once, and merges the
//! results into the view it guards. Merging dedupes by id, so an event for
//! a row the viewer already added locally is a no-op.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::comments::CommentThread;
use crate::listings::OwnerListings;
use crate::platform::{
    ChangeFeed, ChangeScope, ChangeSubscription, CommentStore, Platform, PropertyStore, RowChange,
};

pub struct Reconciler {
    platform: Arc<dyn Platform>,
    debounce: Duration,
}

/// Keeps a watcher alive; dropping it tears the subscription down.
pub struct ReconcilerHandle {
    platform: Arc<dyn Platform>,
    sub_id: u64,
    task: JoinHandle<()>,
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        self.platform.unsubscribe(self.sub_id);
        self.task.abort();
    }
}

impl Reconciler {
    pub fn new(platform: Arc<dyn Platform>, debounce: Duration) -> Self {
        Self { platform, debounce }
    }

    /// Watches comment changes for the thread's property and reconciles
    /// the thread until either the handle or the thread itself is dropped.
    pub fn watch_comments(&self, thread: &Arc<Mutex<CommentThread>>) -> ReconcilerHandle {
        let property_id = match thread.lock() {
            Ok(thread) => thread.property_id.clone(),
            Err(poisoned) => poisoned.into_inner().property_id.clone(),
        };
        let subscription = self
            .platform
            .subscribe(ChangeScope::PropertyComments { property_id });
        let sub_id = subscription.id;
        let platform = Arc::clone(&self.platform);
        let debounce = self.debounce;
        let target = Arc::downgrade(thread);
        let task = tokio::spawn(async move {
            run_comment_watcher(platform, subscription, debounce, target).await;
        });
        ReconcilerHandle {
            platform: Arc::clone(&self.platform),
            sub_id,
            task,
        }
    }

    /// Watches the owner's listing changes, keeping the dashboard current.
    pub fn watch_owner_listings(&self, listings: &Arc<Mutex<OwnerListings>>) -> ReconcilerHandle {
        let user_id = match listings.lock() {
            Ok(listings) => listings.user_id.clone(),
            Err(poisoned) => poisoned.into_inner().user_id.clone(),
        };
        let subscription = self
            .platform
            .subscribe(ChangeScope::OwnerListings { user_id });
        let sub_id = subscription.id;
        let platform = Arc::clone(&self.platform);
        let debounce = self.debounce;
        let target = Arc::downgrade(listings);
        let task = tokio::spawn(async move {
            run_listing_watcher(platform, subscription, debounce, target).await;
        });
        ReconcilerHandle {
            platform: Arc::clone(&self.platform),
            sub_id,
            task,
        }
    }
}

/// Collects one debounced batch, resetting the window on every arrival.
/// Returns `None` once the channel closes with nothing buffered.
async fn next_batch(
    subscription: &mut ChangeSubscription,
    debounce: Duration,
) -> Option<Vec<RowChange>> {
    let first = subscription.receiver.recv().await?;
    let mut batch = vec![first];
    let sleep = time::sleep(debounce);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => break,
            maybe = subscription.receiver.recv() => match maybe {
                Some(change) => {
                    batch.push(change);
                    sleep.as_mut().reset(Instant::now() + debounce);
                }
                None => break,
            },
        }
    }
    Some(batch)
}

async fn run_comment_watcher(
    platform: Arc<dyn Platform>,
    mut subscription: ChangeSubscription,
    debounce: Duration,
    target: Weak<Mutex<CommentThread>>,
) {
    while let Some(batch) = next_batch(&mut subscription, debounce).await {
        let mut inserted: Vec<String> = Vec::new();
        let mut deleted: HashSet<String> = HashSet::new();
        for change in batch {
            match change {
                RowChange::CommentInserted { id, .. } => inserted.push(id),
                RowChange::CommentDeleted { id, .. } => {
                    deleted.insert(id);
                }
                _ => {}
            }
        }
        let mut fetched = Vec::new();
        for id in inserted {
            if deleted.contains(&id) {
                continue;
            }
            match platform.get_comment(&id).await {
                Ok(Some(view)) => fetched.push(view),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(comment_id = %id, error = ?err, "comment re-fetch failed");
                }
            }
        }
        let Some(thread) = target.upgrade() else {
            return;
        };
        let Ok(mut thread) = thread.lock() else {
            return;
        };
        for view in fetched {
            thread.merge_insert(view);
        }
        for id in &deleted {
            thread.remove(id);
        }
    }
}

async fn run_listing_watcher(
    platform: Arc<dyn Platform>,
    mut subscription: ChangeSubscription,
    debounce: Duration,
    target: Weak<Mutex<OwnerListings>>,
) {
    while let Some(batch) = next_batch(&mut subscription, debounce).await {
        let mut inserted: Vec<String> = Vec::new();
        let mut deleted: HashSet<String> = HashSet::new();
        for change in batch {
            match change {
                RowChange::PropertyInserted { id, .. } => inserted.push(id),
                RowChange::PropertyDeleted { id, .. } => {
                    deleted.insert(id);
                }
                _ => {}
            }
        }
        let mut fetched = Vec::new();
        for id in inserted {
            if deleted.contains(&id) {
                continue;
            }
            match platform.get_property(&id).await {
                Ok(Some(record)) => fetched.push(record),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(property_id = %id, error = ?err, "property re-fetch failed");
                }
            }
        }
        let Some(listings) = target.upgrade() else {
            return;
        };
        let Ok(mut listings) = listings.lock() else {
            return;
        };
        for record in fetched {
            listings.merge_insert(record);
        }
        for id in &deleted {
            listings.remove(id);
        }
    }
}

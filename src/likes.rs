//! Optimistic like toggling.
//!
//! The feed is flipped immediately, the remote write follows, and a failed
//! write rolls the flip back. One write per (user, property) pair may be in
//! flight at a time; overlapping toggles are skipped rather than queued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{ClientError, ClientResult};
use crate::feed::{self, FeedState};
use crate::platform::{LikeStore, Platform, PropertyStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The flip was applied locally and confirmed remotely.
    Applied { liked: bool, like_count: u64 },
    /// A toggle for the same pair is still outstanding; nothing changed.
    InFlight,
}

pub struct LikeCoordinator {
    platform: Arc<dyn Platform>,
    in_flight: Arc<Mutex<HashSet<(String, String)>>>,
}

struct InFlightGuard {
    set: Arc<Mutex<HashSet<(String, String)>>>,
    key: (String, String),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

impl LikeCoordinator {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Flips the viewer's like on `property_id` within an already-loaded
    /// feed. On a remote failure the local flip is undone, unless the
    /// property itself has disappeared, in which case it is dropped from
    /// the feed and the error still propagates.
    pub async fn toggle(
        &self,
        state: &mut FeedState,
        property_id: &str,
    ) -> ClientResult<ToggleOutcome> {
        let user_id = state
            .user_id
            .clone()
            .ok_or(ClientError::Unauthenticated)?;

        let key = (user_id.clone(), property_id.to_string());
        let _guard = {
            let mut set = self
                .in_flight
                .lock()
                .map_err(|_| anyhow::anyhow!("in-flight lock poisoned"))?;
            if !set.insert(key.clone()) {
                return Ok(ToggleOutcome::InFlight);
            }
            InFlightGuard {
                set: Arc::clone(&self.in_flight),
                key,
            }
        };

        let item = state
            .items
            .iter()
            .find(|item| item.property.id == property_id)
            .ok_or_else(|| ClientError::not_found(format!("property {property_id}")))?;
        let was_liked = item.liked_by_me;
        let old_count = item.like_count;
        let now_liked = !was_liked;
        let new_count = if now_liked {
            old_count + 1
        } else {
            old_count.saturating_sub(1)
        };

        feed::apply_like(state, property_id, now_liked, new_count);

        let write = if now_liked {
            self.platform.insert_like(&user_id, property_id).await
        } else {
            self.platform.delete_like(&user_id, property_id).await
        };

        match write {
            Ok(()) => Ok(ToggleOutcome::Applied {
                liked: now_liked,
                like_count: new_count,
            }),
            Err(err) => {
                self.roll_back(state, property_id, was_liked, old_count)
                    .await;
                Err(err.into())
            }
        }
    }

    async fn roll_back(&self, state: &mut FeedState, property_id: &str, liked: bool, count: u64) {
        match self.platform.get_property(property_id).await {
            Ok(Some(_)) | Err(_) => {
                feed::apply_like(state, property_id, liked, count);
            }
            Ok(None) => {
                tracing::debug!(property_id, "liked property vanished, dropping from feed");
                state.items.retain(|item| item.property.id != property_id);
            }
        }
    }
}

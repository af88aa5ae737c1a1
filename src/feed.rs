//! Home feed assembly.
//!
//! Properties and likes live in separate stores and are fetched
//! concurrently, then stitched together per property. A failure on the like
//! side degrades to a feed with zero like annotations; a failure on the
//! property side fails the load.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ClientResult;
use crate::models::{FeedCursor, FeedPage, FilterCriteria, PropertyRecord};
use crate::platform::{LikeStore, Platform, PropertyStore};

/// One property as the feed renders it.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub property: PropertyRecord,
    pub like_count: u64,
    pub liked_by_me: bool,
}

/// A loaded page plus the cursor for the one after it.
#[derive(Debug, Clone)]
pub struct FeedState {
    pub items: Vec<FeedItem>,
    pub next_page: Option<FeedCursor>,
    /// Viewer the `liked_by_me` flags were computed for, if any.
    pub user_id: Option<String>,
}

pub struct FeedAggregator {
    platform: Arc<dyn Platform>,
    page_size: usize,
}

impl FeedAggregator {
    pub fn new(platform: Arc<dyn Platform>, page_size: usize) -> Self {
        Self {
            platform,
            page_size,
        }
    }

    pub async fn load_first(
        &self,
        filter: &FilterCriteria,
        user_id: Option<&str>,
    ) -> ClientResult<FeedState> {
        self.load(filter, FeedPage::first(self.page_size), user_id)
            .await
    }

    pub async fn load_after(
        &self,
        filter: &FilterCriteria,
        cursor: FeedCursor,
        user_id: Option<&str>,
    ) -> ClientResult<FeedState> {
        self.load(filter, FeedPage::after(cursor, self.page_size), user_id)
            .await
    }

    async fn load(
        &self,
        filter: &FilterCriteria,
        page: FeedPage,
        user_id: Option<&str>,
    ) -> ClientResult<FeedState> {
        let limit = page.limit;
        let (properties, likes) = tokio::join!(
            self.platform.list_properties(filter, &page),
            self.platform.list_likes(&[]),
        );
        let properties = properties?;
        let likes = match likes {
            Ok(likes) => likes,
            Err(err) => {
                tracing::warn!(error = ?err, "like lookup failed, rendering feed without likes");
                Vec::new()
            }
        };

        let mut counts: HashMap<&str, u64> = HashMap::new();
        let mut mine: HashMap<&str, bool> = HashMap::new();
        for like in &likes {
            *counts.entry(like.property_id.as_str()).or_default() += 1;
            if user_id == Some(like.user_id.as_str()) {
                mine.insert(like.property_id.as_str(), true);
            }
        }

        let items: Vec<FeedItem> = properties
            .into_iter()
            .map(|property| {
                let like_count = counts.get(property.id.as_str()).copied().unwrap_or(0);
                let liked_by_me = mine.get(property.id.as_str()).copied().unwrap_or(false);
                FeedItem {
                    property,
                    like_count,
                    liked_by_me,
                }
            })
            .collect();

        // A short page means the store ran out of rows.
        let next_page = if items.len() == limit {
            items.last().map(|item| FeedCursor {
                created_at: item.property.created_at.clone(),
                id: item.property.id.clone(),
            })
        } else {
            None
        };

        Ok(FeedState {
            items,
            next_page,
            user_id: user_id.map(str::to_string),
        })
    }
}

/// Applies a like state change to an already-loaded feed in place.
pub fn apply_like(state: &mut FeedState, property_id: &str, liked: bool, like_count: u64) {
    if let Some(item) = state
        .items
        .iter_mut()
        .find(|item| item.property.id == property_id)
    {
        item.liked_by_me = liked;
        item.like_count = like_count;
    }
}

//! Comment threads under a property.

use std::sync::Arc;

use crate::error::{ClientError, ClientResult};
use crate::models::CommentView;
use crate::platform::{CommentStore, Platform};
use crate::session::SessionState;

/// The loaded thread for one property, oldest first.
#[derive(Debug, Clone)]
pub struct CommentThread {
    pub property_id: String,
    pub comments: Vec<CommentView>,
}

impl CommentThread {
    /// Inserts a comment arriving out of band (realtime, or the local
    /// add echo) unless it is already present, preserving ascending
    /// `(created_at, id)` order.
    pub fn merge_insert(&mut self, comment: CommentView) {
        if self.comments.iter().any(|c| c.id == comment.id) {
            return;
        }
        let at = self
            .comments
            .partition_point(|c| (c.created_at.as_str(), c.id.as_str()) <= (comment.created_at.as_str(), comment.id.as_str()));
        self.comments.insert(at, comment);
    }

    pub fn remove(&mut self, comment_id: &str) {
        self.comments.retain(|c| c.id != comment_id);
    }
}

pub struct CommentService {
    platform: Arc<dyn Platform>,
}

impl CommentService {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    pub async fn load(&self, property_id: &str) -> ClientResult<CommentThread> {
        let comments = self.platform.list_comments(property_id).await?;
        Ok(CommentThread {
            property_id: property_id.to_string(),
            comments,
        })
    }

    /// Validates and submits a comment, appending the stored row to the
    /// thread only once the write has succeeded.
    pub async fn add(
        &self,
        thread: &mut CommentThread,
        session: &SessionState,
        content: &str,
    ) -> ClientResult<CommentView> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::validation("comment cannot be empty"));
        }
        let author = session.require()?;
        let view = self
            .platform
            .insert_comment(&thread.property_id, &author.user_id, content)
            .await?;
        thread.merge_insert(view.clone());
        Ok(view)
    }

    /// Deletes the viewer's own comment. Rows authored by someone else are
    /// refused by the store and reported as not found.
    pub async fn delete(
        &self,
        thread: &mut CommentThread,
        session: &SessionState,
        comment_id: &str,
    ) -> ClientResult<()> {
        let author = session.require()?;
        let deleted = self
            .platform
            .delete_comment(comment_id, &author.user_id)
            .await?;
        if !deleted {
            return Err(ClientError::not_found(format!("comment {comment_id}")));
        }
        thread.remove(comment_id);
        Ok(())
    }
}

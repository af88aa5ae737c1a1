//! Collaborator contracts for the managed backend platform.
//!
//! Everything the client needs from the outside world — auth, relational
//! queries, object storage, change notifications — is expressed as an
//! object-safe trait here. Services hold an `Arc<dyn Platform>` and never
//! see a concrete backend; [`crate::store::Store`] is the in-process
//! implementation used by the demo binary and the test suite.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::models::{
    CommentView, FeedPage, FilterCriteria, LikeRecord, ProfileRecord, PropertyDraft,
    PropertyImageRecord, PropertyRecord,
};

/// The authenticated identity for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// The current session, if any. Errors mean the gateway is unreachable,
    /// not that the user is signed out.
    async fn current_session(&self) -> Result<Option<SessionInfo>>;

    /// `Ok(None)` means the credentials were rejected.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<SessionInfo>>;

    async fn sign_up(&self, input: &SignupInput) -> Result<SessionInfo>;

    async fn sign_out(&self) -> Result<()>;
}

#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Properties joined with their image sets, `created_at DESC, id DESC`,
    /// constrained by every present filter field and by the page cursor.
    async fn list_properties(
        &self,
        filter: &FilterCriteria,
        page: &FeedPage,
    ) -> Result<Vec<PropertyRecord>>;

    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<PropertyRecord>>;

    async fn get_property(&self, id: &str) -> Result<Option<PropertyRecord>>;

    async fn insert_property(&self, owner_id: &str, draft: &PropertyDraft)
        -> Result<PropertyRecord>;

    async fn attach_image(
        &self,
        property_id: &str,
        image_url: &str,
        is_primary: bool,
    ) -> Result<PropertyImageRecord>;

    /// Deletes only when both id and owner match; `Ok(false)` when no row
    /// satisfied the predicate.
    async fn delete_property(&self, id: &str, owner_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Uniqueness on (user, property) is a store-level constraint; inserting
    /// an existing pair is a no-op.
    async fn insert_like(&self, user_id: &str, property_id: &str) -> Result<()>;

    async fn delete_like(&self, user_id: &str, property_id: &str) -> Result<()>;

    /// All like rows, or only those for the given properties when the slice
    /// is non-empty.
    async fn list_likes(&self, property_ids: &[String]) -> Result<Vec<LikeRecord>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Insert-returning: the stored row joined with its author's profile.
    async fn insert_comment(
        &self,
        property_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<CommentView>;

    async fn get_comment(&self, id: &str) -> Result<Option<CommentView>>;

    /// Ascending by creation time.
    async fn list_comments(&self, property_id: &str) -> Result<Vec<CommentView>>;

    /// Deletes only when both id and author match; `Ok(false)` when no row
    /// satisfied the predicate.
    async fn delete_comment(&self, id: &str, author_id: &str) -> Result<bool>;
}

/// Fields left `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.username.is_none()
            && self.bio.is_none()
            && self.profile_picture.is_none()
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>>;

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> Result<ProfileRecord>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// What a subscription listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeScope {
    /// Comment changes for one property.
    PropertyComments { property_id: String },
    /// Listing changes for one owner.
    OwnerListings { user_id: String },
}

/// A row change delivered over a subscription. Insert payloads are partial
/// (id only); subscribers re-fetch the full joined record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    CommentInserted { id: String, property_id: String },
    CommentDeleted { id: String, property_id: String },
    PropertyInserted { id: String, user_id: String },
    PropertyDeleted { id: String, user_id: String },
}

impl ChangeScope {
    pub fn covers(&self, change: &RowChange) -> bool {
        match (self, change) {
            (
                ChangeScope::PropertyComments { property_id },
                RowChange::CommentInserted { property_id: p, .. }
                | RowChange::CommentDeleted { property_id: p, .. },
            ) => property_id == p,
            (
                ChangeScope::OwnerListings { user_id },
                RowChange::PropertyInserted { user_id: u, .. }
                | RowChange::PropertyDeleted { user_id: u, .. },
            ) => user_id == u,
            _ => false,
        }
    }
}

/// A live change-notification channel. Dropping the receiver alone does not
/// release the registration; callers go through [`ChangeFeed::unsubscribe`]
/// (the reconciler handle does this on drop).
pub struct ChangeSubscription {
    pub id: u64,
    pub receiver: UnboundedReceiver<RowChange>,
}

pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, scope: ChangeScope) -> ChangeSubscription;

    fn unsubscribe(&self, id: u64);
}

/// The full capability set the client depends on.
pub trait Platform:
    AuthGateway
    + PropertyStore
    + LikeStore
    + CommentStore
    + ProfileStore
    + ObjectStorage
    + ChangeFeed
{
}

impl<T> Platform for T where
    T: AuthGateway
        + PropertyStore
        + LikeStore
        + CommentStore
        + ProfileStore
        + ObjectStorage
        + ChangeFeed
{
}

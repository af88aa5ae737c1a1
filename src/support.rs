//! Test-only platform wrapper with failure injection and call counting.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::watch;

use crate::models::{
    CommentView, FeedPage, FilterCriteria, LikeRecord, ProfileRecord, PropertyDraft,
    PropertyImageRecord, PropertyRecord,
};
use crate::platform::{
    AuthGateway, ChangeFeed, ChangeScope, ChangeSubscription, CommentStore, LikeStore,
    ObjectStorage, ProfileChanges, ProfileStore, PropertyStore, SessionInfo, SignupInput,
};
use crate::store::Store;

/// An in-memory [`Store`] whose auth and like paths can be made to fail
/// or stall on demand, with counters for asserting which paths were
/// reached.
pub(crate) struct FlakyPlatform {
    inner: Store,
    fail_auth: AtomicBool,
    fail_likes: AtomicBool,
    hold_likes: watch::Sender<bool>,
    auth_calls: AtomicU64,
    like_calls: AtomicU64,
    comment_calls: AtomicU64,
}

impl FlakyPlatform {
    pub(crate) fn new() -> Self {
        let inner = Store::open_in_memory().expect("in-memory store");
        let (hold_likes, _) = watch::channel(false);
        Self {
            inner,
            fail_auth: AtomicBool::new(false),
            fail_likes: AtomicBool::new(false),
            hold_likes,
            auth_calls: AtomicU64::new(0),
            like_calls: AtomicU64::new(0),
            comment_calls: AtomicU64::new(0),
        }
    }

    pub(crate) fn fail_auth(&self, fail: bool) {
        self.fail_auth.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_likes(&self, fail: bool) {
        self.fail_likes.store(fail, Ordering::SeqCst);
    }

    /// While held, like-path calls pass the entry counter and then park
    /// until released.
    pub(crate) fn hold_likes(&self, hold: bool) {
        self.hold_likes.send_replace(hold);
    }

    pub(crate) fn auth_calls(&self) -> u64 {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn like_calls(&self) -> u64 {
        self.like_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn comment_calls(&self) -> u64 {
        self.comment_calls.load(Ordering::SeqCst)
    }

    fn auth_gate(&self) -> Result<()> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth.load(Ordering::SeqCst) {
            bail!("injected auth failure");
        }
        Ok(())
    }

    async fn like_gate(&self) -> Result<()> {
        self.like_calls.fetch_add(1, Ordering::SeqCst);
        let mut held = self.hold_likes.subscribe();
        while *held.borrow_and_update() {
            held.changed().await?;
        }
        if self.fail_likes.load(Ordering::SeqCst) {
            bail!("injected like failure");
        }
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for FlakyPlatform {
    async fn current_session(&self) -> Result<Option<SessionInfo>> {
        self.auth_gate()?;
        self.inner.current_session().await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<SessionInfo>> {
        self.auth_gate()?;
        self.inner.sign_in(email, password).await
    }

    async fn sign_up(&self, input: &SignupInput) -> Result<SessionInfo> {
        self.auth_gate()?;
        self.inner.sign_up(input).await
    }

    async fn sign_out(&self) -> Result<()> {
        self.auth_gate()?;
        self.inner.sign_out().await
    }
}

#[async_trait]
impl PropertyStore for FlakyPlatform {
    async fn list_properties(
        &self,
        filter: &FilterCriteria,
        page: &FeedPage,
    ) -> Result<Vec<PropertyRecord>> {
        self.inner.list_properties(filter, page).await
    }

    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<PropertyRecord>> {
        self.inner.list_for_owner(user_id).await
    }

    async fn get_property(&self, id: &str) -> Result<Option<PropertyRecord>> {
        self.inner.get_property(id).await
    }

    async fn insert_property(
        &self,
        owner_id: &str,
        draft: &PropertyDraft,
    ) -> Result<PropertyRecord> {
        self.inner.insert_property(owner_id, draft).await
    }

    async fn attach_image(
        &self,
        property_id: &str,
        image_url: &str,
        is_primary: bool,
    ) -> Result<PropertyImageRecord> {
        self.inner.attach_image(property_id, image_url, is_primary).await
    }

    async fn delete_property(&self, id: &str, owner_id: &str) -> Result<bool> {
        self.inner.delete_property(id, owner_id).await
    }
}

#[async_trait]
impl LikeStore for FlakyPlatform {
    async fn insert_like(&self, user_id: &str, property_id: &str) -> Result<()> {
        self.like_gate().await?;
        self.inner.insert_like(user_id, property_id).await
    }

    async fn delete_like(&self, user_id: &str, property_id: &str) -> Result<()> {
        self.like_gate().await?;
        self.inner.delete_like(user_id, property_id).await
    }

    async fn list_likes(&self, property_ids: &[String]) -> Result<Vec<LikeRecord>> {
        self.like_gate().await?;
        self.inner.list_likes(property_ids).await
    }
}

#[async_trait]
impl CommentStore for FlakyPlatform {
    async fn insert_comment(
        &self,
        property_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<CommentView> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_comment(property_id, user_id, content).await
    }

    async fn get_comment(&self, id: &str) -> Result<Option<CommentView>> {
        self.inner.get_comment(id).await
    }

    async fn list_comments(&self, property_id: &str) -> Result<Vec<CommentView>> {
        self.inner.list_comments(property_id).await
    }

    async fn delete_comment(&self, id: &str, author_id: &str) -> Result<bool> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_comment(id, author_id).await
    }
}

#[async_trait]
impl ProfileStore for FlakyPlatform {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>> {
        self.inner.get_profile(user_id).await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> Result<ProfileRecord> {
        self.inner.update_profile(user_id, changes).await
    }
}

#[async_trait]
impl ObjectStorage for FlakyPlatform {
    async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<()> {
        self.inner.upload(bucket, path, bytes).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.inner.public_url(bucket, path)
    }
}

impl ChangeFeed for FlakyPlatform {
    fn subscribe(&self, scope: ChangeScope) -> ChangeSubscription {
        self.inner.subscribe(scope)
    }

    fn unsubscribe(&self, id: u64) {
        self.inner.unsubscribe(id)
    }
}

//! Viewing and editing user profiles.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::listings::ImageUpload;
use crate::models::ProfileRecord;
use crate::platform::{ObjectStorage, Platform, ProfileChanges, ProfileStore};
use crate::session::SessionState;

const AVATAR_BUCKET: &str = "avatars";

pub struct ProfileService {
    platform: Arc<dyn Platform>,
}

impl ProfileService {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    pub async fn get(&self, user_id: &str) -> ClientResult<ProfileRecord> {
        self.platform
            .get_profile(user_id)
            .await?
            .ok_or_else(|| ClientError::not_found(format!("profile {user_id}")))
    }

    /// Applies partial edits to the viewer's own profile.
    pub async fn update(
        &self,
        session: &SessionState,
        changes: &ProfileChanges,
    ) -> ClientResult<ProfileRecord> {
        let viewer = session.require()?;
        if changes.is_empty() {
            return self.get(&viewer.user_id).await;
        }
        if let Some(name) = &changes.full_name {
            if name.trim().is_empty() {
                return Err(ClientError::validation("name cannot be blank"));
            }
        }
        Ok(self
            .platform
            .update_profile(&viewer.user_id, changes)
            .await?)
    }

    /// Uploads a new avatar and points the profile at it.
    pub async fn set_picture(
        &self,
        session: &SessionState,
        image: &ImageUpload,
    ) -> ClientResult<ProfileRecord> {
        let viewer = session.require()?;
        let ext = infer::get(&image.bytes)
            .map(|kind| kind.extension())
            .unwrap_or("bin");
        let path = format!("{}/{}.{ext}", viewer.user_id, Uuid::new_v4());
        self.platform
            .upload(AVATAR_BUCKET, &path, &image.bytes)
            .await?;
        let url = self.platform.public_url(AVATAR_BUCKET, &path);
        let changes = ProfileChanges {
            profile_picture: Some(url),
            ..ProfileChanges::default()
        };
        Ok(self
            .platform
            .update_profile(&viewer.user_id, &changes)
            .await?)
    }
}

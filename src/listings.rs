//! Listing creation, the owner dashboard, and owner-scoped deletion.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::models::{PropertyDraft, PropertyRecord};
use crate::platform::{ObjectStorage, Platform, PropertyStore};
use crate::session::SessionState;

const IMAGE_BUCKET: &str = "property-images";
const ALLOWED_IMAGE_MIMES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Raw image bytes as picked by the user, prior to any gating.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Sort orders offered on the owner dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerSort {
    NewestFirst,
    OldestFirst,
    PriceLowHigh,
    PriceHighLow,
}

/// The viewer's own listings, as the dashboard renders them.
#[derive(Debug, Clone)]
pub struct OwnerListings {
    pub user_id: String,
    pub posts: Vec<PropertyRecord>,
}

impl OwnerListings {
    pub fn merge_insert(&mut self, property: PropertyRecord) {
        if property.user_id != self.user_id {
            return;
        }
        if self.posts.iter().any(|p| p.id == property.id) {
            return;
        }
        self.posts.push(property);
    }

    pub fn remove(&mut self, property_id: &str) {
        self.posts.retain(|p| p.id != property_id);
    }

    pub fn sort_by(&mut self, order: OwnerSort) {
        match order {
            OwnerSort::NewestFirst => self
                .posts
                .sort_by(|a, b| (&b.created_at, &b.id).cmp(&(&a.created_at, &a.id))),
            OwnerSort::OldestFirst => self
                .posts
                .sort_by(|a, b| (&a.created_at, &a.id).cmp(&(&b.created_at, &b.id))),
            OwnerSort::PriceLowHigh => self
                .posts
                .sort_by(|a, b| a.price.total_cmp(&b.price)),
            OwnerSort::PriceHighLow => self
                .posts
                .sort_by(|a, b| b.price.total_cmp(&a.price)),
        }
    }

    /// Keeps only sale or rental listings; `None` keeps everything.
    pub fn filter_rent(&mut self, is_for_rent: Option<bool>) {
        if let Some(wanted) = is_for_rent {
            self.posts.retain(|p| p.is_for_rent == wanted);
        }
    }
}

pub struct ListingService {
    platform: Arc<dyn Platform>,
    max_upload_bytes: u64,
}

impl ListingService {
    pub fn new(platform: Arc<dyn Platform>, max_upload_bytes: u64) -> Self {
        Self {
            platform,
            max_upload_bytes,
        }
    }

    /// Creates a listing and uploads its images. Size and type checks run
    /// on every image before the property row is written, so a rejected
    /// image never creates the listing; a remote failure partway through
    /// the uploads surfaces the error with the images attached so far.
    /// The first image becomes the primary one.
    pub async fn create(
        &self,
        session: &SessionState,
        draft: &PropertyDraft,
        images: &[ImageUpload],
    ) -> ClientResult<PropertyRecord> {
        let owner = session.require()?;
        if draft.title.trim().is_empty() {
            return Err(ClientError::validation("a listing needs a title"));
        }
        if !draft.price.is_finite() || draft.price <= 0.0 {
            return Err(ClientError::validation("price must be positive"));
        }
        for image in images {
            self.check_image(image)?;
        }

        let property = self.platform.insert_property(&owner.user_id, draft).await?;
        for (index, image) in images.iter().enumerate() {
            let ext = infer::get(&image.bytes)
                .map(|kind| kind.extension())
                .unwrap_or("bin");
            let path = format!("{}/{}.{ext}", owner.user_id, Uuid::new_v4());
            self.platform
                .upload(IMAGE_BUCKET, &path, &image.bytes)
                .await?;
            let url = self.platform.public_url(IMAGE_BUCKET, &path);
            self.platform
                .attach_image(&property.id, &url, index == 0)
                .await?;
        }
        self.platform
            .get_property(&property.id)
            .await?
            .ok_or_else(|| ClientError::not_found(format!("property {}", property.id)))
    }

    fn check_image(&self, image: &ImageUpload) -> ClientResult<()> {
        if image.bytes.len() as u64 > self.max_upload_bytes {
            return Err(ClientError::validation(format!(
                "{} exceeds the {} byte upload limit",
                image.file_name, self.max_upload_bytes
            )));
        }
        let mime = infer::get(&image.bytes).map(|kind| kind.mime_type());
        match mime {
            Some(mime) if ALLOWED_IMAGE_MIMES.contains(&mime) => Ok(()),
            _ => Err(ClientError::validation(format!(
                "{} is not a JPEG, PNG, or WebP image",
                image.file_name
            ))),
        }
    }

    pub async fn load_for_owner(
        &self,
        session: &SessionState,
        order: OwnerSort,
        is_for_rent: Option<bool>,
    ) -> ClientResult<OwnerListings> {
        let owner = session.require()?;
        let posts = self.platform.list_for_owner(&owner.user_id).await?;
        let mut listings = OwnerListings {
            user_id: owner.user_id.clone(),
            posts,
        };
        listings.filter_rent(is_for_rent);
        listings.sort_by(order);
        Ok(listings)
    }

    /// Deletes a listing the viewer owns. Rows owned by someone else are
    /// refused by the store and reported as not found.
    pub async fn delete(&self, session: &SessionState, property_id: &str) -> ClientResult<()> {
        let owner = session.require()?;
        let deleted = self
            .platform
            .delete_property(property_id, &owner.user_id)
            .await?;
        if !deleted {
            return Err(ClientError::not_found(format!("property {property_id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
    use crate::platform::{AuthGateway, SignupInput};
    use crate::support::FlakyPlatform;

    // Smallest parseable headers for the formats the gate accepts.
    fn png_bytes() -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0; 16]);
        bytes
    }

    fn jpeg_bytes() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend_from_slice(&[0; 16]);
        bytes
    }

    async fn signed_in(platform: &FlakyPlatform) -> SessionState {
        let info = platform
            .sign_up(&SignupInput {
                email: "alice@example.com".into(),
                password: "password123".into(),
                full_name: None,
                username: None,
            })
            .await
            .expect("signup");
        SessionState::Authenticated(info)
    }

    fn draft(title: &str, price: f64) -> PropertyDraft {
        PropertyDraft {
            title: title.into(),
            price,
            ..PropertyDraft::default()
        }
    }

    fn service(platform: &Arc<FlakyPlatform>) -> ListingService {
        ListingService::new(platform.clone(), DEFAULT_MAX_UPLOAD_BYTES)
    }

    #[tokio::test]
    async fn create_attaches_images_with_the_first_as_primary() {
        let platform = Arc::new(FlakyPlatform::new());
        let session = signed_in(&platform).await;
        let service = service(&platform);

        let property = service
            .create(
                &session,
                &draft("Loft", 250_000.0),
                &[
                    ImageUpload {
                        file_name: "front.png".into(),
                        bytes: png_bytes(),
                    },
                    ImageUpload {
                        file_name: "kitchen.jpg".into(),
                        bytes: jpeg_bytes(),
                    },
                ],
            )
            .await
            .expect("create");

        assert_eq!(property.images.len(), 2);
        assert_eq!(property.images.iter().filter(|i| i.is_primary).count(), 1);
        let primary = property.primary_image().expect("primary");
        assert!(primary.image_url.contains(".png"));
    }

    #[tokio::test]
    async fn non_image_bytes_are_rejected_without_creating_anything() {
        let platform = Arc::new(FlakyPlatform::new());
        let session = signed_in(&platform).await;
        let service = service(&platform);

        let err = service
            .create(
                &session,
                &draft("Loft", 250_000.0),
                &[ImageUpload {
                    file_name: "notes.txt".into(),
                    bytes: b"just some text".to_vec(),
                }],
            )
            .await;
        assert!(matches!(err, Err(ClientError::Validation(_))));
        let posts = service
            .load_for_owner(&session, OwnerSort::NewestFirst, None)
            .await
            .expect("load");
        assert!(posts.posts.is_empty());
    }

    #[tokio::test]
    async fn oversized_image_is_rejected() {
        let platform = Arc::new(FlakyPlatform::new());
        let session = signed_in(&platform).await;
        let service = ListingService::new(platform.clone(), 8);

        let err = service
            .create(
                &session,
                &draft("Loft", 250_000.0),
                &[ImageUpload {
                    file_name: "front.png".into(),
                    bytes: png_bytes(),
                }],
            )
            .await;
        assert!(matches!(err, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn invalid_draft_fields_are_rejected() {
        let platform = Arc::new(FlakyPlatform::new());
        let session = signed_in(&platform).await;
        let service = service(&platform);

        let err = service.create(&session, &draft("   ", 100.0), &[]).await;
        assert!(matches!(err, Err(ClientError::Validation(_))));
        let err = service.create(&session, &draft("Loft", 0.0), &[]).await;
        assert!(matches!(err, Err(ClientError::Validation(_))));
        let err = service.create(&session, &draft("Loft", f64::NAN), &[]).await;
        assert!(matches!(err, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn owner_dashboard_sorts_and_filters() {
        let platform = Arc::new(FlakyPlatform::new());
        let session = signed_in(&platform).await;
        let service = service(&platform);

        service
            .create(
                &session,
                &PropertyDraft {
                    title: "Cheap rental".into(),
                    price: 900.0,
                    is_for_rent: true,
                    ..PropertyDraft::default()
                },
                &[],
            )
            .await
            .expect("create");
        service
            .create(&session, &draft("Pricey sale", 900_000.0), &[])
            .await
            .expect("create");

        let listings = service
            .load_for_owner(&session, OwnerSort::PriceHighLow, None)
            .await
            .expect("load");
        assert_eq!(listings.posts[0].title, "Pricey sale");

        let rentals = service
            .load_for_owner(&session, OwnerSort::NewestFirst, Some(true))
            .await
            .expect("load");
        assert_eq!(rentals.posts.len(), 1);
        assert_eq!(rentals.posts[0].title, "Cheap rental");
    }

    #[tokio::test]
    async fn delete_is_owner_scoped() {
        let platform = Arc::new(FlakyPlatform::new());
        let session = signed_in(&platform).await;
        let service = service(&platform);
        let property = service
            .create(&session, &draft("Loft", 250_000.0), &[])
            .await
            .expect("create");

        let intruder = platform
            .sign_up(&SignupInput {
                email: "mallory@example.com".into(),
                password: "password123".into(),
                full_name: None,
                username: None,
            })
            .await
            .expect("signup");
        let err = service
            .delete(&SessionState::Authenticated(intruder), &property.id)
            .await;
        assert!(matches!(err, Err(ClientError::NotFound(_))));

        service
            .delete(&session, &property.id)
            .await
            .expect("own delete");
        let listings = service
            .load_for_owner(&session, OwnerSort::NewestFirst, None)
            .await
            .expect("load");
        assert!(listings.posts.is_empty());
    }
}

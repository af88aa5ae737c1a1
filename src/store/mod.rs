//! SQLite-backed implementation of the platform collaborator traits.
//!
//! One [`Store`] plays every backend role at once: relational store, auth
//! gateway, object storage, and change feed. The demo binary and the tests
//! run against it; production deployments would substitute a remote-backed
//! `Platform` implementation without touching the services.

mod auth;
mod hub;
mod objects;
mod tables;

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::{
    CommentView, FeedPage, FilterCriteria, LikeRecord, ProfileRecord, PropertyDraft,
    PropertyImageRecord, PropertyRecord,
};
use crate::platform::{
    AuthGateway, ChangeFeed, ChangeScope, ChangeSubscription, CommentStore, LikeStore,
    ObjectStorage, ProfileChanges, ProfileStore, PropertyStore, RowChange, SessionInfo,
    SignupInput,
};
use crate::utils::now_utc_iso;

pub(crate) const MIGRATIONS: &str = r#"
    PRAGMA journal_mode = WAL;
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_digest TEXT NOT NULL,
        full_name TEXT,
        username TEXT,
        profile_picture TEXT,
        bio TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS properties (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        price REAL NOT NULL,
        currency TEXT NOT NULL DEFAULT 'NGN',
        is_for_rent INTEGER NOT NULL DEFAULT 0,
        location TEXT,
        bedrooms INTEGER,
        bathrooms INTEGER,
        square_feet INTEGER,
        contact_phone TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id)
    );

    CREATE TABLE IF NOT EXISTS property_images (
        id TEXT PRIMARY KEY,
        property_id TEXT NOT NULL,
        image_url TEXT NOT NULL,
        is_primary INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        FOREIGN KEY (property_id) REFERENCES properties(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS likes (
        user_id TEXT NOT NULL,
        property_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, property_id),
        FOREIGN KEY (user_id) REFERENCES users(id),
        FOREIGN KEY (property_id) REFERENCES properties(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY,
        property_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (property_id) REFERENCES properties(id) ON DELETE CASCADE,
        FOREIGN KEY (user_id) REFERENCES users(id)
    );

    CREATE INDEX IF NOT EXISTS idx_properties_owner ON properties(user_id);
    CREATE INDEX IF NOT EXISTS idx_properties_created ON properties(created_at DESC, id DESC);
    CREATE INDEX IF NOT EXISTS idx_images_property ON property_images(property_id);
    CREATE INDEX IF NOT EXISTS idx_likes_property ON likes(property_id);
    CREATE INDEX IF NOT EXISTS idx_comments_property ON comments(property_id);
"#;

pub struct Store {
    conn: Arc<Mutex<Connection>>,
    session: Mutex<Option<SessionInfo>>,
    hub: hub::EventHub,
    objects: objects::ObjectStore,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening database at {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(MIGRATIONS)
            .context("applying base migrations")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            session: Mutex::new(None),
            hub: hub::EventHub::default(),
            objects: objects::ObjectStore::default(),
        })
    }

    fn with_tables<T>(&self, f: impl FnOnce(tables::Tables<'_>) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database lock poisoned"))?;
        f(tables::Tables::new(&conn))
    }

    fn set_session(&self, session: Option<SessionInfo>) -> Result<()> {
        *self
            .session
            .lock()
            .map_err(|_| anyhow!("session lock poisoned"))? = session;
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for Store {
    async fn current_session(&self) -> Result<Option<SessionInfo>> {
        Ok(self
            .session
            .lock()
            .map_err(|_| anyhow!("session lock poisoned"))?
            .clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<SessionInfo>> {
        let found = self.with_tables(|t| t.profiles().credentials_by_email(email))?;
        match found {
            Some((profile, digest)) if auth::verify_digest(&digest, password) => {
                let info = SessionInfo {
                    user_id: profile.id,
                    email: profile.email,
                };
                self.set_session(Some(info.clone()))?;
                Ok(Some(info))
            }
            _ => Ok(None),
        }
    }

    async fn sign_up(&self, input: &SignupInput) -> Result<SessionInfo> {
        let record = ProfileRecord {
            id: Uuid::new_v4().to_string(),
            email: input.email.clone(),
            full_name: input.full_name.clone(),
            username: input.username.clone(),
            profile_picture: None,
            bio: None,
            created_at: now_utc_iso(),
        };
        let digest = auth::new_digest(&input.password);
        self.with_tables(|t| {
            if t.profiles().credentials_by_email(&input.email)?.is_some() {
                bail!("email already registered: {}", input.email);
            }
            t.profiles().create_user(&record, &digest)
        })?;
        let info = SessionInfo {
            user_id: record.id,
            email: record.email,
        };
        self.set_session(Some(info.clone()))?;
        Ok(info)
    }

    async fn sign_out(&self) -> Result<()> {
        self.set_session(None)?;
        Ok(())
    }
}

#[async_trait]
impl PropertyStore for Store {
    async fn list_properties(
        &self,
        filter: &FilterCriteria,
        page: &FeedPage,
    ) -> Result<Vec<PropertyRecord>> {
        self.with_tables(|t| t.properties().list_filtered(filter, page))
    }

    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<PropertyRecord>> {
        self.with_tables(|t| t.properties().list_for_owner(user_id))
    }

    async fn get_property(&self, id: &str) -> Result<Option<PropertyRecord>> {
        self.with_tables(|t| t.properties().get(id))
    }

    async fn insert_property(
        &self,
        owner_id: &str,
        draft: &PropertyDraft,
    ) -> Result<PropertyRecord> {
        let record = PropertyRecord {
            id: Uuid::new_v4().to_string(),
            user_id: owner_id.to_string(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            price: draft.price,
            currency: draft.currency.clone(),
            is_for_rent: draft.is_for_rent,
            location: draft.location.clone(),
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            square_feet: draft.square_feet,
            contact_phone: draft.contact_phone.clone(),
            created_at: now_utc_iso(),
            images: Vec::new(),
        };
        self.with_tables(|t| t.properties().insert(&record))?;
        self.hub.publish(RowChange::PropertyInserted {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
        });
        Ok(record)
    }

    async fn attach_image(
        &self,
        property_id: &str,
        image_url: &str,
        is_primary: bool,
    ) -> Result<PropertyImageRecord> {
        let image = PropertyImageRecord {
            id: Uuid::new_v4().to_string(),
            property_id: property_id.to_string(),
            image_url: image_url.to_string(),
            is_primary,
            created_at: now_utc_iso(),
        };
        self.with_tables(|t| t.properties().attach_image(&image))?;
        Ok(image)
    }

    async fn delete_property(&self, id: &str, owner_id: &str) -> Result<bool> {
        let deleted = self.with_tables(|t| t.properties().delete(id, owner_id))?;
        if deleted {
            self.hub.publish(RowChange::PropertyDeleted {
                id: id.to_string(),
                user_id: owner_id.to_string(),
            });
        }
        Ok(deleted)
    }
}

#[async_trait]
impl LikeStore for Store {
    async fn insert_like(&self, user_id: &str, property_id: &str) -> Result<()> {
        let created_at = now_utc_iso();
        self.with_tables(|t| t.likes().insert(user_id, property_id, &created_at))
    }

    async fn delete_like(&self, user_id: &str, property_id: &str) -> Result<()> {
        self.with_tables(|t| t.likes().delete(user_id, property_id))
    }

    async fn list_likes(&self, property_ids: &[String]) -> Result<Vec<LikeRecord>> {
        self.with_tables(|t| {
            if property_ids.is_empty() {
                t.likes().list_all()
            } else {
                t.likes().list_for_properties(property_ids)
            }
        })
    }
}

#[async_trait]
impl CommentStore for Store {
    async fn insert_comment(
        &self,
        property_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<CommentView> {
        let id = Uuid::new_v4().to_string();
        let created_at = now_utc_iso();
        let view = self.with_tables(|t| {
            t.comments()
                .insert(&id, property_id, user_id, content, &created_at)?;
            t.comments()
                .get_view(&id)?
                .context("comment insert lost newly created row")
        })?;
        self.hub.publish(RowChange::CommentInserted {
            id: view.id.clone(),
            property_id: view.property_id.clone(),
        });
        Ok(view)
    }

    async fn get_comment(&self, id: &str) -> Result<Option<CommentView>> {
        self.with_tables(|t| t.comments().get_view(id))
    }

    async fn list_comments(&self, property_id: &str) -> Result<Vec<CommentView>> {
        self.with_tables(|t| t.comments().list_views(property_id))
    }

    async fn delete_comment(&self, id: &str, author_id: &str) -> Result<bool> {
        let existing = self.with_tables(|t| t.comments().get_view(id))?;
        let deleted = self.with_tables(|t| t.comments().delete(id, author_id))?;
        if deleted {
            if let Some(view) = existing {
                self.hub.publish(RowChange::CommentDeleted {
                    id: view.id,
                    property_id: view.property_id,
                });
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl ProfileStore for Store {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>> {
        self.with_tables(|t| t.profiles().get(user_id))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> Result<ProfileRecord> {
        self.with_tables(|t| {
            t.profiles().update(user_id, changes)?;
            t.profiles()
                .get(user_id)?
                .context("profile update lost the user row")
        })
    }
}

#[async_trait]
impl ObjectStorage for Store {
    async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<()> {
        self.objects.put(bucket, path, bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.objects.url(bucket, path)
    }
}

impl ChangeFeed for Store {
    fn subscribe(&self, scope: ChangeScope) -> ChangeSubscription {
        self.hub.subscribe(scope)
    }

    fn unsubscribe(&self, id: u64) {
        self.hub.unsubscribe(id)
    }
}

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::ProfileRecord;
use crate::platform::ProfileChanges;

pub(in crate::store) struct ProfileTable<'conn> {
    pub(in crate::store) conn: &'conn Connection,
}

const PROFILE_COLUMNS: &str =
    "id, email, full_name, username, profile_picture, bio, created_at";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileRecord> {
    Ok(ProfileRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        username: row.get(3)?,
        profile_picture: row.get(4)?,
        bio: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl<'conn> ProfileTable<'conn> {
    pub fn create_user(&self, record: &ProfileRecord, password_digest: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (id, email, password_digest, full_name, username,
                               profile_picture, bio, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.id,
                record.email,
                password_digest,
                record.full_name,
                record.username,
                record.profile_picture,
                record.bio,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Result<Option<ProfileRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = ?1"),
                params![user_id],
                profile_from_row,
            )
            .optional()?)
    }

    pub fn credentials_by_email(&self, email: &str) -> Result<Option<(ProfileRecord, String)>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {PROFILE_COLUMNS}, password_digest FROM users WHERE email = ?1"
                ),
                params![email],
                |row| {
                    let profile = profile_from_row(row)?;
                    let digest: String = row.get(7)?;
                    Ok((profile, digest))
                },
            )
            .optional()?)
    }

    /// Applies only the fields present in `changes`; absent fields keep
    /// their stored value.
    pub fn update(&self, user_id: &str, changes: &ProfileChanges) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE users SET
                full_name = COALESCE(?2, full_name),
                username = COALESCE(?3, username),
                bio = COALESCE(?4, bio),
                profile_picture = COALESCE(?5, profile_picture)
            WHERE id = ?1
            "#,
            params![
                user_id,
                changes.full_name,
                changes.username,
                changes.bio,
                changes.profile_picture,
            ],
        )?;
        Ok(())
    }
}

use anyhow::Result;
use rusqlite::{params, params_from_iter, Connection};

use crate::models::LikeRecord;

pub(in crate::store) struct LikeTable<'conn> {
    pub(in crate::store) conn: &'conn Connection,
}

impl<'conn> LikeTable<'conn> {
    /// The composite primary key makes re-inserting an existing pair a
    /// no-op, so a duplicate toggle can never double-count.
    pub fn insert(&self, user_id: &str, property_id: &str, created_at: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO likes (user_id, property_id, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, property_id) DO NOTHING
            "#,
            params![user_id, property_id, created_at],
        )?;
        Ok(())
    }

    pub fn delete(&self, user_id: &str, property_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM likes WHERE user_id = ?1 AND property_id = ?2",
            params![user_id, property_id],
        )?;
        Ok(())
    }

    pub fn list_all(&self) -> Result<Vec<LikeRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, property_id, created_at FROM likes")?;
        let rows = stmt.query_map([], |row| {
            Ok(LikeRecord {
                user_id: row.get(0)?,
                property_id: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        let mut likes = Vec::new();
        for row in rows {
            likes.push(row?);
        }
        Ok(likes)
    }

    pub fn list_for_properties(&self, property_ids: &[String]) -> Result<Vec<LikeRecord>> {
        if property_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = property_ids
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT user_id, property_id, created_at FROM likes \
             WHERE property_id IN ({placeholders})"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(property_ids.iter()), |row| {
            Ok(LikeRecord {
                user_id: row.get(0)?,
                property_id: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        let mut likes = Vec::new();
        for row in rows {
            likes.push(row?);
        }
        Ok(likes)
    }
}

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::CommentView;

pub(in crate::store) struct CommentTable<'conn> {
    pub(in crate::store) conn: &'conn Connection,
}

const VIEW_SELECT: &str = "SELECT c.id, c.property_id, c.user_id, c.content, c.created_at, \
     u.full_name, u.profile_picture \
     FROM comments c JOIN users u ON u.id = c.user_id";

fn view_from_row(row: &Row<'_>) -> rusqlite::Result<CommentView> {
    Ok(CommentView {
        id: row.get(0)?,
        property_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        author_name: row.get(5)?,
        author_picture: row.get(6)?,
    })
}

impl<'conn> CommentTable<'conn> {
    pub fn insert(
        &self,
        id: &str,
        property_id: &str,
        user_id: &str,
        content: &str,
        created_at: &str,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO comments (id, property_id, user_id, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id, property_id, user_id, content, created_at],
        )?;
        Ok(())
    }

    pub fn get_view(&self, id: &str) -> Result<Option<CommentView>> {
        Ok(self
            .conn
            .query_row(
                &format!("{VIEW_SELECT} WHERE c.id = ?1"),
                params![id],
                view_from_row,
            )
            .optional()?)
    }

    pub fn list_views(&self, property_id: &str) -> Result<Vec<CommentView>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VIEW_SELECT} WHERE c.property_id = ?1 ORDER BY c.created_at ASC, c.id ASC"
        ))?;
        let rows = stmt.query_map(params![property_id], view_from_row)?;
        let mut views = Vec::new();
        for row in rows {
            views.push(row?);
        }
        Ok(views)
    }

    /// Author id appears in the predicate, not just in caller-side gating.
    pub fn delete(&self, id: &str, author_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM comments WHERE id = ?1 AND user_id = ?2",
            params![id, author_id],
        )?;
        Ok(affected > 0)
    }
}

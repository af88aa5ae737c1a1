mod comments;
mod likes;
mod profiles;
mod properties;

use rusqlite::Connection;

pub(super) use comments::CommentTable;
pub(super) use likes::LikeTable;
pub(super) use profiles::ProfileTable;
pub(super) use properties::PropertyTable;

/// Thin accessor bundle over one borrowed connection.
pub(super) struct Tables<'conn> {
    conn: &'conn Connection,
}

impl<'conn> Tables<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn properties(&self) -> PropertyTable<'_> {
        PropertyTable { conn: self.conn }
    }

    pub fn likes(&self) -> LikeTable<'_> {
        LikeTable { conn: self.conn }
    }

    pub fn comments(&self) -> CommentTable<'_> {
        CommentTable { conn: self.conn }
    }

    pub fn profiles(&self) -> ProfileTable<'_> {
        ProfileTable { conn: self.conn }
    }
}

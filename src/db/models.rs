use chrono::NaiveDateTime;
use sqlx::FromRow;

use crate::bookmark_v1;

/// A row of the `bookmarks` table.
#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub created_at: NaiveDateTime,
}

impl From<Bookmark> for bookmark_v1::Bookmark {
    fn from(row: Bookmark) -> Self {
        bookmark_v1::Bookmark {
            id: row.id,
            url: row.url,
            created_at: row.created_at.and_utc().timestamp(),
        }
    }
}

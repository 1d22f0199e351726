use sqlx::SqliteConnection;

use crate::db::models::Bookmark;
use crate::error::ServiceError;

/// Rows selected by a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteFilter {
    Id(i64),
    Url(String),
}

/// Inserts a bookmark; storage assigns `id` and `created_at`.
pub async fn create_bookmark(
    conn: &mut SqliteConnection,
    url: &str,
) -> Result<Bookmark, ServiceError> {
    let created = sqlx::query_as::<_, Bookmark>(
        "INSERT INTO bookmarks (url) VALUES (?) RETURNING id, url, created_at",
    )
    .bind(url)
    .fetch_optional(conn)
    .await
    .map_err(|e| ServiceError::from_statement("insert into", e))?;

    match created {
        Some(bookmark) if bookmark.id != 0 => Ok(bookmark),
        _ => Err(ServiceError::InsertFailed),
    }
}

/// Every bookmark whose URL contains `needle`, compared case-sensitively.
///
/// `instr` treats the needle as plain text, so `%` and `_` match literally.
pub async fn find_bookmarks_by_url_substring(
    conn: &mut SqliteConnection,
    needle: &str,
) -> Result<Vec<Bookmark>, ServiceError> {
    sqlx::query_as::<_, Bookmark>(
        "SELECT id, url, created_at FROM bookmarks WHERE instr(url, ?) > 0 ORDER BY id",
    )
    .bind(needle)
    .fetch_all(conn)
    .await
    .map_err(|e| ServiceError::from_statement("select from", e))
}

pub async fn list_bookmarks(conn: &mut SqliteConnection) -> Result<Vec<Bookmark>, ServiceError> {
    sqlx::query_as::<_, Bookmark>("SELECT id, url, created_at FROM bookmarks ORDER BY id")
        .fetch_all(conn)
        .await
        .map_err(|e| ServiceError::from_statement("select from", e))
}

/// Deletes every row matching `filter` and returns the deleted rows.
pub async fn delete_bookmarks(
    conn: &mut SqliteConnection,
    filter: &DeleteFilter,
) -> Result<Vec<Bookmark>, ServiceError> {
    let query = match filter {
        DeleteFilter::Id(id) => sqlx::query_as::<_, Bookmark>(
            "DELETE FROM bookmarks WHERE id = ? RETURNING id, url, created_at",
        )
        .bind(*id),
        DeleteFilter::Url(url) => sqlx::query_as::<_, Bookmark>(
            "DELETE FROM bookmarks WHERE url = ? RETURNING id, url, created_at",
        )
        .bind(url.as_str()),
    };

    let mut deleted = query
        .fetch_all(conn)
        .await
        .map_err(|e| ServiceError::from_statement("delete from", e))?;
    // RETURNING order is unspecified in SQLite.
    deleted.sort_by_key(|bookmark| bookmark.id);
    Ok(deleted)
}

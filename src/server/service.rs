use tonic::{Request, Response, Status};
use tracing::{debug, error, info, warn};

use crate::bookmark_v1::{
    self, CreateBookmarkReq, CreateBookmarkRes, DeleteBookmarkReq, DeleteBookmarkRes,
    ListBookmarksReq, ListBookmarksRes, ReadBookmarkReq, ReadBookmarkRes,
    bookmark_service_server::BookmarkService,
};
use crate::db::BookmarkDb;
use crate::db::bookmark_service::{self, DeleteFilter};
use crate::db::models::Bookmark;
use crate::error::ServiceError;

/// API version implemented by this service.
pub const API_VERSION: &str = "v1";

/// Checks the API version requested by the client. An empty version means the
/// current one.
pub fn check_api(api: &str) -> Result<(), ServiceError> {
    if !api.is_empty() && api != API_VERSION {
        return Err(ServiceError::UnsupportedApi {
            supported: API_VERSION,
            requested: api.to_string(),
        });
    }
    Ok(())
}

/// A non-zero id wins over the url; with neither set there is nothing to delete.
pub fn delete_filter(bookmark: Option<&bookmark_v1::Bookmark>) -> Result<DeleteFilter, ServiceError> {
    match bookmark {
        Some(b) if b.id != 0 => Ok(DeleteFilter::Id(b.id)),
        Some(b) if !b.url.is_empty() => Ok(DeleteFilter::Url(b.url.clone())),
        _ => Err(ServiceError::InvalidArgument(
            "either bookmark id or url is required to delete".to_string(),
        )),
    }
}

fn log_failure(operation: &str, err: &ServiceError) {
    if err.is_client_error() {
        warn!(operation, error = %err, "Rejected bookmark request.");
    } else {
        error!(operation, error = %err, "Bookmark request failed.");
    }
}

fn into_messages(rows: Vec<Bookmark>) -> Vec<bookmark_v1::Bookmark> {
    rows.into_iter().map(Into::into).collect()
}

#[derive(Clone, Debug)]
pub struct BookmarkServiceImpl {
    db: BookmarkDb,
}

impl BookmarkServiceImpl {
    pub fn new(db: BookmarkDb) -> Self {
        Self { db }
    }

    async fn create(&self, req: CreateBookmarkReq) -> Result<CreateBookmarkRes, ServiceError> {
        check_api(&req.api)?;
        let url = req
            .bookmark
            .map(|b| b.url)
            .ok_or_else(|| ServiceError::InvalidArgument("bookmark is required".to_string()))?;

        let mut conn = self.db.acquire().await?;
        let created = bookmark_service::create_bookmark(&mut conn, &url).await?;
        info!(id = created.id, url = %created.url, "Bookmark created.");

        Ok(CreateBookmarkRes {
            api: API_VERSION.to_string(),
            bookmark: Some(created.into()),
        })
    }

    async fn read(&self, req: ReadBookmarkReq) -> Result<ReadBookmarkRes, ServiceError> {
        check_api(&req.api)?;
        let needle = req.bookmark.map(|b| b.url).unwrap_or_default();
        if needle.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "bookmark url to search for is required".to_string(),
            ));
        }

        let mut conn = self.db.acquire().await?;
        let found = bookmark_service::find_bookmarks_by_url_substring(&mut conn, &needle).await?;
        debug!(count = found.len(), "Read bookmarks by url substring.");

        Ok(ReadBookmarkRes {
            api: API_VERSION.to_string(),
            bookmarks: into_messages(found),
        })
    }

    async fn list(&self, req: ListBookmarksReq) -> Result<ListBookmarksRes, ServiceError> {
        check_api(&req.api)?;

        let mut conn = self.db.acquire().await?;
        let bookmarks = bookmark_service::list_bookmarks(&mut conn).await?;
        debug!(count = bookmarks.len(), "Listed bookmarks.");

        Ok(ListBookmarksRes {
            api: API_VERSION.to_string(),
            bookmarks: into_messages(bookmarks),
        })
    }

    async fn delete(&self, req: DeleteBookmarkReq) -> Result<DeleteBookmarkRes, ServiceError> {
        check_api(&req.api)?;
        let filter = delete_filter(req.bookmark.as_ref())?;

        let mut conn = self.db.acquire().await?;
        let deleted = bookmark_service::delete_bookmarks(&mut conn, &filter).await?;
        info!(filter = ?filter, count = deleted.len(), "Bookmarks deleted.");

        Ok(DeleteBookmarkRes {
            api: API_VERSION.to_string(),
            bookmarks: into_messages(deleted),
        })
    }
}

#[tonic::async_trait]
impl BookmarkService for BookmarkServiceImpl {
    async fn create_bookmark(
        &self,
        request: Request<CreateBookmarkReq>,
    ) -> Result<Response<CreateBookmarkRes>, Status> {
        self.create(request.into_inner())
            .await
            .map(Response::new)
            .map_err(|e| {
                log_failure("create", &e);
                e.into()
            })
    }

    async fn read_bookmark(
        &self,
        request: Request<ReadBookmarkReq>,
    ) -> Result<Response<ReadBookmarkRes>, Status> {
        self.read(request.into_inner())
            .await
            .map(Response::new)
            .map_err(|e| {
                log_failure("read", &e);
                e.into()
            })
    }

    async fn list_bookmarks(
        &self,
        request: Request<ListBookmarksReq>,
    ) -> Result<Response<ListBookmarksRes>, Status> {
        self.list(request.into_inner())
            .await
            .map(Response::new)
            .map_err(|e| {
                log_failure("list", &e);
                e.into()
            })
    }

    async fn delete_bookmark(
        &self,
        request: Request<DeleteBookmarkReq>,
    ) -> Result<Response<DeleteBookmarkRes>, Status> {
        self.delete(request.into_inner())
            .await
            .map(Response::new)
            .map_err(|e| {
                log_failure("delete", &e);
                e.into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bookmark(id: i64, url: &str) -> bookmark_v1::Bookmark {
        bookmark_v1::Bookmark {
            id,
            url: url.to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn test_check_api_accepts_empty_and_current() {
        assert!(check_api("").is_ok());
        assert!(check_api("v1").is_ok());
    }

    #[test]
    fn test_check_api_rejects_other_versions() {
        let err = check_api("v2").unwrap_err();
        assert!(matches!(
            err,
            ServiceError::UnsupportedApi { requested, .. } if requested == "v2"
        ));
        assert!(check_api("V1").is_err());
    }

    #[test]
    fn test_delete_filter_prefers_id() {
        let filter = delete_filter(Some(&bookmark(7, "http://example.com"))).unwrap();
        assert_eq!(filter, DeleteFilter::Id(7));
    }

    #[test]
    fn test_delete_filter_falls_back_to_url() {
        let filter = delete_filter(Some(&bookmark(0, "http://example.com"))).unwrap();
        assert_eq!(filter, DeleteFilter::Url("http://example.com".to_string()));
    }

    #[test]
    fn test_delete_filter_requires_id_or_url() {
        assert!(matches!(
            delete_filter(Some(&bookmark(0, ""))),
            Err(ServiceError::InvalidArgument(_))
        ));
        assert!(matches!(
            delete_filter(None),
            Err(ServiceError::InvalidArgument(_))
        ));
    }
}

//! Boots the server on an ephemeral port and drives it through the generated
//! gRPC client.

use bookmark_service::bookmark_v1::bookmark_service_client::BookmarkServiceClient;
use bookmark_service::bookmark_v1::{Bookmark, CreateBookmarkReq, ListBookmarksReq};
use bookmark_service::config::ServerConfig;
use bookmark_service::error::StartupError;
use bookmark_service::server::{BookmarkServer, Phase};
use sqlx::ConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

fn test_config(db_path: &std::path::Path) -> ServerConfig {
    ServerConfig {
        grpc_port: "0".to_string(),
        grpc_host: "127.0.0.1".to_string(),
        db_path: db_path.to_path_buf(),
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn test_serve_then_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let server = BookmarkServer::initialize(&test_config(dir.path()))
        .await
        .unwrap();
    let addr = server.local_addr();
    let mut phase = server.subscribe();
    assert_eq!(*phase.borrow(), Phase::Initializing);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    phase
        .wait_for(|current| *current == Phase::Serving)
        .await
        .unwrap();
    let mut client = BookmarkServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap();

    let created = client
        .create_bookmark(CreateBookmarkReq {
            api: "v1".to_string(),
            bookmark: Some(Bookmark {
                url: "http://example.com".to_string(),
                ..Bookmark::default()
            }),
        })
        .await
        .unwrap()
        .into_inner()
        .bookmark
        .unwrap();
    assert_ne!(created.id, 0);

    let listed = client
        .list_bookmarks(ListBookmarksReq { api: String::new() })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(listed.api, "v1");
    assert_eq!(listed.bookmarks, vec![created]);

    drop(client);
    stop_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(*phase.borrow(), Phase::Stopped);
    assert!(dir.path().join("bookmark.db").exists());
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_request() {
    let dir = tempfile::tempdir().unwrap();
    let server = BookmarkServer::initialize(&test_config(dir.path()))
        .await
        .unwrap();
    let addr = server.local_addr();
    let mut phase = server.subscribe();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_with_shutdown(async {
        let _ = stop_rx.await;
    }));
    phase
        .wait_for(|current| *current == Phase::Serving)
        .await
        .unwrap();

    // Hold the write lock so the insert below blocks inside the handler.
    let mut locker = SqliteConnectOptions::new()
        .filename(dir.path().join("bookmark.db"))
        .connect()
        .await
        .unwrap();
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut locker)
        .await
        .unwrap();

    let mut client = BookmarkServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap();
    let in_flight = tokio::spawn(async move {
        client
            .create_bookmark(CreateBookmarkReq {
                api: String::new(),
                bookmark: Some(Bookmark {
                    url: "http://example.com".to_string(),
                    ..Bookmark::default()
                }),
            })
            .await
    });
    sleep(Duration::from_millis(200)).await;

    stop_tx.send(()).unwrap();
    phase
        .wait_for(|current| *current == Phase::Draining)
        .await
        .unwrap();
    assert!(!handle.is_finished());

    sqlx::query("COMMIT").execute(&mut locker).await.unwrap();

    let created = in_flight
        .await
        .unwrap()
        .unwrap()
        .into_inner()
        .bookmark
        .unwrap();
    assert_ne!(created.id, 0);
    assert_eq!(created.url, "http://example.com");

    handle.await.unwrap().unwrap();
    assert_eq!(*phase.borrow(), Phase::Stopped);
}

#[tokio::test]
async fn test_empty_port_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        grpc_port: String::new(),
        ..test_config(dir.path())
    };

    let err = BookmarkServer::initialize(&config).await.err().unwrap();
    assert!(matches!(err, StartupError::InvalidPort(_)));
    assert!(!dir.path().join("bookmark.db").exists());
}

#[tokio::test]
async fn test_missing_storage_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("does").join("not").join("exist"));

    let err = BookmarkServer::initialize(&config).await.err().unwrap();
    assert!(matches!(err, StartupError::OpenStorage { .. }));
}

#[tokio::test]
async fn test_port_in_use_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let first = BookmarkServer::initialize(&test_config(dir.path()))
        .await
        .unwrap();

    let other_dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        grpc_port: first.local_addr().port().to_string(),
        ..test_config(other_dir.path())
    };

    let err = BookmarkServer::initialize(&config).await.err().unwrap();
    assert!(matches!(err, StartupError::Bind { .. }));
}

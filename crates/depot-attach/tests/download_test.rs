//! Remote download tests against a loopback server.

use axum::http::{header, StatusCode};
use axum::response::Redirect;
use axum::{routing::get, Router};
use depot_attach::{AttachError, Attacher, ValidationFault};
use depot_storage::MemoryBackend;
use std::net::SocketAddr;
use std::sync::Arc;

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/files/hello.txt",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "remote content") }),
        )
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/loop", get(|| async { Redirect::temporary("/loop") }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn attacher() -> Attacher {
    Attacher::new(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()))
}

#[tokio::test]
async fn test_download_stages_remote_content() {
    let addr = spawn_server().await;
    let mut attacher = attacher();

    attacher
        .download(&format!("http://{addr}/files/hello.txt"))
        .await
        .unwrap();

    assert!(attacher.cached());
    assert_eq!(attacher.filename(), Some("hello.txt".to_string()));
    assert_eq!(attacher.content_type(), Some("text/plain".to_string()));
    assert_eq!(attacher.size(), Some(14));

    let file = attacher.get().await.unwrap().unwrap();
    assert_eq!(file.read_to_bytes().await.unwrap(), "remote content");
}

#[tokio::test]
async fn test_download_error_status_escalates_by_default() {
    let addr = spawn_server().await;
    let mut attacher = attacher();

    let result = attacher.download(&format!("http://{addr}/missing")).await;

    assert!(matches!(result, Err(AttachError::Download(_))));
    assert_eq!(attacher.errors(), &[ValidationFault::DownloadFailed]);
    assert!(!attacher.cached());
}

#[tokio::test]
async fn test_download_error_status_collected_when_suppressed() {
    let addr = spawn_server().await;
    let mut attacher = attacher().collect_errors();

    attacher
        .download(&format!("http://{addr}/missing"))
        .await
        .unwrap();

    assert_eq!(attacher.errors(), &[ValidationFault::DownloadFailed]);
    assert!(!attacher.cached());
}

#[tokio::test]
async fn test_redirect_loop_is_a_validation_fault_not_an_error() {
    let addr = spawn_server().await;
    let mut attacher = attacher();

    // Raising is on, but a redirect loop is caller input: recorded, not raised.
    attacher
        .download(&format!("http://{addr}/loop"))
        .await
        .unwrap();

    assert_eq!(attacher.errors(), &[ValidationFault::DownloadFailed]);
    assert!(!attacher.cached());
}

#[tokio::test]
async fn test_connection_failure_collected_when_suppressed() {
    let mut attacher = attacher().collect_errors();

    attacher.download("http://127.0.0.1:1/unreachable").await.unwrap();

    assert_eq!(attacher.errors(), &[ValidationFault::DownloadFailed]);
    assert!(!attacher.cached());
}

#[tokio::test]
async fn test_blank_url_is_a_noop() {
    let mut attacher = attacher();
    attacher.download("").await.unwrap();
    assert!(!attacher.cached());
    assert!(attacher.errors().is_empty());
}

//! Integration tests for the resolver
//!
//! These tests use wiremock to stand up mock document servers and exercise
//! the full resolve cycle end-to-end, including the filesystem snapshot
//! store and cross-run revalidation.

use std::sync::Arc;
use weft::{
    FsGraphStore, GraphStore, HttpTransport, NodeOutcome, Resolver, ResolverConfig,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn make_resolver(cache_dir: &std::path::Path, max_depth: u32) -> Resolver<HttpTransport, FsGraphStore> {
    Resolver::new(
        HttpTransport::new().expect("failed to build HTTP client"),
        FsGraphStore::new(cache_dir),
        ResolverConfig {
            max_depth,
            concurrency: 3,
        },
    )
}

async fn mount_html(server: &MockServer, at: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(html),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_resolve_of_mixed_site() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_html(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <h1>Welcome</h1>
            <p>Start here, then read <a href="{uri}/guide.md">the guide</a>.</p>
            </body></html>"#
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/guide.md"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/markdown")
                .set_body_string("# Guide\n\nEverything you need."),
        )
        .mount(&server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let resolver = make_resolver(cache.path(), 2);
    let resolved = resolver.resolve(&uri).await.unwrap();

    assert_eq!(resolved.graph.len(), 2);
    assert_eq!(resolved.graph.root_id, format!("{uri}/"));

    let root = resolved.graph.get(&format!("{uri}/")).unwrap();
    assert_eq!(root.outcome, NodeOutcome::Completed);
    assert_eq!(root.title.as_deref(), Some("Home"));

    let guide = resolved.graph.get(&format!("{uri}/guide.md")).unwrap();
    assert_eq!(guide.title.as_deref(), Some("Guide"));
    assert_eq!(guide.depth, 1);

    assert_eq!(
        resolved.content,
        format!(
            "# Welcome\n\nStart here, then read [the guide]({uri}/guide.md).\nGuide\n\nEverything you need."
        )
    );

    // The snapshot landed in the cache directory.
    assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_second_run_is_served_by_revalidation() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .insert_header("etag", "\"home-v1\"")
                .set_body_string(format!(
                    r#"<html><body><p>Stable home.</p><a href="{uri}/a">A</a></body></html>"#
                )),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .insert_header("last-modified", "Mon, 01 Jan 2024 00:00:00 GMT")
                .set_body_string("<html><body><p>Stable leaf.</p></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(304))
        .expect(2)
        .mount(&server)
        .await;

    let cache = tempfile::tempdir().unwrap();

    let first = make_resolver(cache.path(), 2).resolve(&uri).await.unwrap();
    // A fresh resolver instance proves the snapshot round-trips through disk.
    let second = make_resolver(cache.path(), 2).resolve(&uri).await.unwrap();

    assert_eq!(first.content, second.content);
    assert_eq!(first.graph, second.graph);
}

#[tokio::test]
async fn test_dead_link_recorded_without_stopping_crawl() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_html(
        &server,
        "/",
        format!(
            r#"<html><body><p>Root.</p><a href="{uri}/dead">Dead</a><a href="{uri}/alive">Alive</a></body></html>"#
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/dead"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/alive",
        "<html><body><p>Still here.</p></body></html>".to_string(),
    )
    .await;

    let cache = tempfile::tempdir().unwrap();
    let resolved = make_resolver(cache.path(), 2).resolve(&uri).await.unwrap();

    assert_eq!(resolved.graph.len(), 3);

    let dead = resolved.graph.get(&format!("{uri}/dead")).unwrap();
    assert_eq!(dead.outcome, NodeOutcome::Error);
    assert!(dead.error_message.is_some());

    assert!(resolved.content.contains("Still here."));
    assert!(!resolved.content.contains("Dead page"));
}

#[tokio::test]
async fn test_root_failure_leaves_no_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let result = make_resolver(cache.path(), 2).resolve(&server.uri()).await;

    assert!(result.is_err());

    let store = Arc::new(FsGraphStore::new(cache.path()));
    assert!(store.load(&format!("{}/", server.uri())).await.is_none());
}

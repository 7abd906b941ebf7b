//! Integration tests for the subscription lifecycle: preview, subscribe,
//! unsubscribe, list.
//!
//! Each test creates its own in-memory SQLite database for isolation and a
//! wiremock server standing in for the remote feed host.

use std::time::Duration;

use crier::api::{ApiError, Subscriptions};
use crier::engine::run_cycle;
use crier::feed::{FetchError, Fetcher};
use crier::storage::Database;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_UPDATED: &str = "2024-01-01T00:00:00Z";
const FEED_UPDATED_TS: i64 = 1704067200;

fn atom_feed(title: &str, updated: &str, items: &[(&str, &str, &str)]) -> String {
    let mut doc = format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>{title}</title>
    <id>urn:test:{title}</id>
    <updated>{updated}</updated>
"#
    );
    for (item_title, link, published) in items {
        doc.push_str(&format!(
            r#"    <entry>
        <id>urn:test:{link}</id>
        <title>{item_title}</title>
        <link href="{link}"/>
        <published>{published}</published>
        <updated>{published}</updated>
    </entry>
"#
        ));
    }
    doc.push_str("</feed>\n");
    doc
}

async fn harness() -> (Database, Subscriptions) {
    let db = Database::open(":memory:").await.unwrap();
    let fetcher = Fetcher::new(reqwest::Client::new(), Duration::from_secs(5));
    // wiremock binds to loopback, so the tests opt in to private hosts
    let api = Subscriptions::new(db.clone(), fetcher).allow_private_hosts(true);
    (db, api)
}

async fn mount_feed(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/atom+xml"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn subscribe_stores_watermark_at_subscribe_time() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/feed",
        atom_feed(
            "Example",
            FEED_UPDATED,
            &[("Current Post", "https://x.example/0", FEED_UPDATED)],
        ),
    )
    .await;

    let (db, api) = harness().await;
    let sub = api
        .subscribe(&format!("{}/feed", server.uri()), "chan-1")
        .await
        .unwrap();
    assert_eq!(sub.title, "Example");

    let rows = db.list_all().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].updated_at, FEED_UPDATED_TS);
    assert_eq!(rows[0].channel_id, "chan-1");

    // An immediate cycle with an unchanged feed reports nothing new: the
    // item that was current at subscribe time is already covered.
    let fetcher = Fetcher::new(reqwest::Client::new(), Duration::from_secs(5));
    let report = run_cycle(&db, &fetcher).await.unwrap();
    assert_eq!(report.events.len(), 1);
    assert!(report.events[0].new_items.is_empty());
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn duplicate_subscribe_fails_other_channel_succeeds() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/feed",
        atom_feed(
            "Example",
            FEED_UPDATED,
            &[("Post", "https://x.example/0", FEED_UPDATED)],
        ),
    )
    .await;

    let (db, api) = harness().await;
    let url = format!("{}/feed", server.uri());

    api.subscribe(&url, "chan-1").await.unwrap();

    let err = api.subscribe(&url, "chan-1").await.unwrap_err();
    assert!(matches!(err, ApiError::AlreadySubscribed));

    // Same URL, different channel: its own watermark, its own row
    api.subscribe(&url, "chan-2").await.unwrap();
    assert_eq!(db.list_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_feed_is_refused_and_nothing_is_stored() {
    let server = MockServer::start().await;
    mount_feed(&server, "/feed", atom_feed("Hollow", FEED_UPDATED, &[])).await;

    let (db, api) = harness().await;
    let err = api
        .subscribe(&format!("{}/feed", server.uri()), "chan-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Fetch(FetchError::EmptyFeed)));
    assert!(db.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_feed_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (db, api) = harness().await;
    let err = api
        .subscribe(&format!("{}/feed", server.uri()), "chan-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Fetch(FetchError::HttpStatus(404))));
    assert!(db.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_url_is_refused_before_any_fetch() {
    let db = Database::open(":memory:").await.unwrap();
    let fetcher = Fetcher::new(reqwest::Client::new(), Duration::from_secs(5));
    // Default policy: private hosts are not acceptable feed sources
    let api = Subscriptions::new(db.clone(), fetcher);

    assert!(matches!(
        api.subscribe("file:///etc/passwd", "chan-1").await,
        Err(ApiError::InvalidUrl(_))
    ));
    assert!(matches!(
        api.subscribe("http://127.0.0.1/feed", "chan-1").await,
        Err(ApiError::InvalidUrl(_))
    ));
    assert!(db.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn unsubscribe_is_idempotent_and_list_reflects_it() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/feed",
        atom_feed(
            "Example",
            FEED_UPDATED,
            &[("Post", "https://x.example/0", FEED_UPDATED)],
        ),
    )
    .await;

    let (_db, api) = harness().await;
    let url = format!("{}/feed", server.uri());

    // Unsubscribing something that was never subscribed succeeds
    assert!(!api.unsubscribe(&url, "chan-1").await.unwrap());

    api.subscribe(&url, "chan-1").await.unwrap();
    assert_eq!(api.list("chan-1").await.unwrap().len(), 1);

    assert!(api.unsubscribe(&url, "chan-1").await.unwrap());
    assert!(api.list("chan-1").await.unwrap().is_empty());

    // And again: benign no-op
    assert!(!api.unsubscribe(&url, "chan-1").await.unwrap());
}

#[tokio::test]
async fn list_only_shows_the_requested_channel() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/a",
        atom_feed("Feed A", FEED_UPDATED, &[("A", "https://x.example/a", FEED_UPDATED)]),
    )
    .await;
    mount_feed(
        &server,
        "/b",
        atom_feed("Feed B", FEED_UPDATED, &[("B", "https://x.example/b", FEED_UPDATED)]),
    )
    .await;

    let (_db, api) = harness().await;
    api.subscribe(&format!("{}/a", server.uri()), "chan-1")
        .await
        .unwrap();
    api.subscribe(&format!("{}/b", server.uri()), "chan-2")
        .await
        .unwrap();

    let listed = api.list("chan-1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Feed A");
}

#[tokio::test]
async fn preview_returns_latest_item_without_persisting() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        "/feed",
        atom_feed(
            "Example",
            FEED_UPDATED,
            &[
                ("Newest", "https://x.example/2", FEED_UPDATED),
                ("Older", "https://x.example/1", "2023-12-01T00:00:00Z"),
            ],
        ),
    )
    .await;

    let (db, api) = harness().await;
    let preview = api
        .preview(&format!("{}/feed", server.uri()))
        .await
        .unwrap();
    assert_eq!(preview.feed_title, "Example");
    assert_eq!(preview.latest_title, "Newest");
    assert_eq!(preview.latest_link.as_deref(), Some("https://x.example/2"));
    assert!(db.list_all().await.unwrap().is_empty());
}

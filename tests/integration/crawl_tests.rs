//! Integration tests for the crawler
//!
//! These tests use wiremock to serve small tileset hierarchies and run
//! full crawls end-to-end against a temporary output directory.

use std::path::Path;
use tempfile::TempDir;
use tile_ripple::config::{Config, Traversal};
use tile_ripple::crawler::run_crawl;
use tile_ripple::storage::{SqliteStorage, Storage};
use tile_ripple::{ContentKind, CrawlStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `dir`
fn test_config(dir: &Path, traversal: Traversal) -> Config {
    let mut config = Config::default();
    config.output.directory = dir.to_path_buf();
    config.crawler.traversal = traversal;
    config.crawler.workers = 4;
    config.crawler.request_timeout_secs = 5;
    config
}

fn open_store(config: &Config) -> SqliteStorage {
    SqliteStorage::new(&config.output.database_path()).expect("Failed to open store")
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_bytes(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn status_of(storage: &SqliteStorage, uri: &str) -> Option<CrawlStatus> {
    storage.lookup(uri).unwrap().map(|r| r.status)
}

#[tokio::test]
async fn test_single_leaf_is_mirrored() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "tile.b3dm" } } }),
    )
    .await;
    mount_bytes(&server, "/tile.b3dm", b"b3dm-payload").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    let summary = run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .expect("Crawl failed");

    assert_eq!(summary.failed, 0);

    let storage = open_store(&config);
    assert_eq!(storage.count_total().unwrap(), 2);
    assert_eq!(
        status_of(&storage, &format!("{}/tileset.json", base)),
        Some(CrawlStatus::Done)
    );
    assert_eq!(
        status_of(&storage, &format!("{}/tile.b3dm", base)),
        Some(CrawlStatus::Done)
    );

    assert!(dir.path().join("tileset.json").exists());
    assert_eq!(
        std::fs::read(dir.path().join("tile.b3dm")).unwrap(),
        b"b3dm-payload"
    );
}

#[tokio::test]
async fn test_nested_reference_resolves_against_its_document() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({
            "root": { "children": [ { "content": { "uri": "child/tileset.json" } } ] }
        }),
    )
    .await;
    mount_json(
        &server,
        "/child/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "tile.pnts" } } }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/child/tile.pnts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"points".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    let summary = run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .unwrap();

    // The child document lands in its own wave
    assert_eq!(summary.wave_sizes, vec![1, 1]);

    let storage = open_store(&config);
    assert_eq!(storage.count_records(ContentKind::SubTree, CrawlStatus::Done).unwrap(), 2);
    assert_eq!(storage.count_records(ContentKind::Leaf, CrawlStatus::Done).unwrap(), 1);
    assert_eq!(
        status_of(&storage, &format!("{}/child/tile.pnts", base)),
        Some(CrawlStatus::Done)
    );
    assert!(dir.path().join("child").join("tile.pnts").exists());
}

#[tokio::test]
async fn test_rerun_of_finished_crawl_makes_no_requests() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "tile.b3dm" } } }),
    )
    .await;
    mount_bytes(&server, "/tile.b3dm", b"b3dm").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    let roots = [format!("{}/tileset.json", base)];

    run_crawl(config.clone(), &roots).await.unwrap();

    server.reset().await;
    let summary = run_crawl(config.clone(), &roots).await.unwrap();

    assert_eq!(summary.waves(), 0);
    assert_eq!(summary.succeeded + summary.failed, 0);
    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty(), "unexpected requests: {:?}", requests);
}

#[tokio::test]
async fn test_failed_leaf_stays_pending_and_siblings_proceed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({
            "root": {
                "children": [
                    { "content": { "uri": "missing.b3dm" } },
                    { "content": { "uri": "present.b3dm" } }
                ]
            }
        }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing.b3dm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_bytes(&server, "/present.b3dm", b"present").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    let summary = run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .unwrap();

    // The leaf failed inline, so no dispatched unit failed, but the run
    // still reports it
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.progress.failed, 1);
    assert!(summary.has_failures());

    let storage = open_store(&config);
    let missing = storage
        .lookup(&format!("{}/missing.b3dm", base))
        .unwrap()
        .unwrap();
    assert_eq!(missing.status, CrawlStatus::Pending);
    assert!(missing.last_error.unwrap().contains("404"));

    assert_eq!(
        status_of(&storage, &format!("{}/present.b3dm", base)),
        Some(CrawlStatus::Done)
    );
    assert_eq!(
        status_of(&storage, &format!("{}/tileset.json", base)),
        Some(CrawlStatus::Done)
    );
    assert!(!dir.path().join("missing.b3dm").exists());
}

#[tokio::test]
async fn test_pending_leaf_is_swept_on_next_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "flaky.b3dm" } } }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/flaky.b3dm"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    let roots = [format!("{}/tileset.json", base)];
    run_crawl(config.clone(), &roots).await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/flaky.b3dm"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"recovered".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tileset.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let summary = run_crawl(config.clone(), &roots).await.unwrap();
    assert_eq!(summary.leaves_swept, 1);

    let storage = open_store(&config);
    assert_eq!(
        status_of(&storage, &format!("{}/flaky.b3dm", base)),
        Some(CrawlStatus::Done)
    );
    assert_eq!(
        std::fs::read(dir.path().join("flaky.b3dm")).unwrap(),
        b"recovered"
    );
}

#[tokio::test]
async fn test_transient_failure_retried_within_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "tile.b3dm" } } }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/tile.b3dm"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_bytes(&server, "/tile.b3dm", b"second-try").await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), Traversal::BreadthFirst);
    config.retry.max_attempts = 3;
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 20;

    let summary = run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .unwrap();
    assert_eq!(summary.failed, 0);

    let storage = open_store(&config);
    assert_eq!(
        status_of(&storage, &format!("{}/tile.b3dm", base)),
        Some(CrawlStatus::Done)
    );
}

#[tokio::test]
async fn test_breadth_first_waves_follow_depth() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "a/tileset.json" } } }),
    )
    .await;
    mount_json(
        &server,
        "/a/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "b/tileset.json" } } }),
    )
    .await;
    mount_json(
        &server,
        "/a/b/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "tile.b3dm" } } }),
    )
    .await;
    mount_bytes(&server, "/a/b/tile.b3dm", b"deep").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    let summary = run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .unwrap();

    assert_eq!(summary.wave_sizes, vec![1, 1, 1]);

    let storage = open_store(&config);
    assert_eq!(storage.count_total().unwrap(), 4);
    assert_eq!(
        status_of(&storage, &format!("{}/a/b/tile.b3dm", base)),
        Some(CrawlStatus::Done)
    );
}

#[tokio::test]
async fn test_depth_first_crawls_in_single_wave() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({
            "root": {
                "children": [
                    { "content": { "uri": "a/tileset.json" } },
                    { "content": { "uri": "leaf.glb" } }
                ]
            }
        }),
    )
    .await;
    mount_json(
        &server,
        "/a/tileset.json",
        serde_json::json!({ "root": { "content": { "url": "tile.i3dm" } } }),
    )
    .await;
    mount_bytes(&server, "/a/tile.i3dm", b"instanced").await;
    mount_bytes(&server, "/leaf.glb", b"glb").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::DepthFirst);
    let summary = run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .unwrap();

    assert_eq!(summary.wave_sizes, vec![1]);
    assert_eq!(summary.failed, 0);

    let storage = open_store(&config);
    assert_eq!(storage.count_total().unwrap(), 4);
    assert_eq!(storage.count_records(ContentKind::SubTree, CrawlStatus::Done).unwrap(), 2);
    assert_eq!(storage.count_records(ContentKind::Leaf, CrawlStatus::Done).unwrap(), 2);
    assert!(dir.path().join("a").join("tile.i3dm").exists());
}

#[tokio::test]
async fn test_depth_first_incomplete_subtree_resumes() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "a/tileset.json" } } }),
    )
    .await;
    mount_json(
        &server,
        "/a/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "tile.b3dm" } } }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a/tile.b3dm"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_bytes(&server, "/a/tile.b3dm", b"later").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::DepthFirst);
    let roots = [format!("{}/tileset.json", base)];

    let first = run_crawl(config.clone(), &roots).await.unwrap();
    assert_eq!(first.failed, 1);
    {
        let storage = open_store(&config);
        assert_eq!(
            status_of(&storage, &format!("{}/tileset.json", base)),
            Some(CrawlStatus::Pending)
        );
        assert_eq!(
            status_of(&storage, &format!("{}/a/tileset.json", base)),
            Some(CrawlStatus::Pending)
        );
    }

    let second = run_crawl(config.clone(), &roots).await.unwrap();
    assert_eq!(second.failed, 0);

    let storage = open_store(&config);
    assert_eq!(storage.count_records(ContentKind::SubTree, CrawlStatus::Done).unwrap(), 2);
    assert_eq!(storage.count_records(ContentKind::Leaf, CrawlStatus::Done).unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_references_yield_one_record() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({
            "root": {
                "children": [
                    { "content": { "uri": "a/tileset.json" } },
                    { "content": { "uri": "b/tileset.json" } }
                ]
            }
        }),
    )
    .await;
    for route in ["/a/tileset.json", "/b/tileset.json"] {
        mount_json(
            &server,
            route,
            serde_json::json!({ "root": { "content": { "uri": "../shared.b3dm" } } }),
        )
        .await;
    }
    mount_bytes(&server, "/shared.b3dm", b"shared").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .unwrap();

    let storage = open_store(&config);
    assert_eq!(storage.count_total().unwrap(), 4);
    assert_eq!(
        status_of(&storage, &format!("{}/shared.b3dm", base)),
        Some(CrawlStatus::Done)
    );
    assert_eq!(
        std::fs::read(dir.path().join("shared.b3dm")).unwrap(),
        b"shared"
    );
}

#[tokio::test]
async fn test_malformed_document_stays_pending() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/tileset.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    let summary = run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);

    let storage = open_store(&config);
    let record = storage
        .lookup(&format!("{}/tileset.json", base))
        .unwrap()
        .unwrap();
    assert_eq!(record.status, CrawlStatus::Pending);
    assert!(record.last_error.is_some());
}

#[tokio::test]
async fn test_mirror_write_failure_keeps_leaf_pending() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "blocked/tile.b3dm" } } }),
    )
    .await;
    mount_bytes(&server, "/blocked/tile.b3dm", b"payload").await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("blocked"), b"a file, not a directory").unwrap();

    let config = test_config(dir.path(), Traversal::BreadthFirst);
    run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .unwrap();

    let storage = open_store(&config);
    let record = storage
        .lookup(&format!("{}/blocked/tile.b3dm", base))
        .unwrap()
        .unwrap();
    assert_eq!(record.status, CrawlStatus::Pending);
    assert!(record.last_error.is_some());
}

#[tokio::test]
async fn test_unknown_suffixes_are_ignored() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({
            "root": {
                "children": [
                    { "content": { "uri": "readme.txt" } },
                    { "content": { "uri": "tile.cmpt" } }
                ]
            }
        }),
    )
    .await;
    mount_bytes(&server, "/tile.cmpt", b"composite").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .unwrap();

    let storage = open_store(&config);
    assert_eq!(storage.count_total().unwrap(), 2);
    assert!(storage.lookup(&format!("{}/readme.txt", base)).unwrap().is_none());
}

#[tokio::test]
async fn test_missing_subdocument_stays_pending() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({
            "root": {
                "children": [
                    { "content": { "uri": "gone/tileset.json" } },
                    { "content": { "uri": "here/tileset.json" } }
                ]
            }
        }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone/tileset.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/here/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "tile.b3dm" } } }),
    )
    .await;
    mount_bytes(&server, "/here/tile.b3dm", b"here").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    let summary = run_crawl(config.clone(), &[format!("{}/tileset.json", base)])
        .await
        .unwrap();

    assert_eq!(summary.wave_sizes, vec![1, 2]);
    assert_eq!(summary.failed, 1);

    let storage = open_store(&config);
    assert_eq!(
        status_of(&storage, &format!("{}/gone/tileset.json", base)),
        Some(CrawlStatus::Pending)
    );
    assert_eq!(
        status_of(&storage, &format!("{}/here/tile.b3dm", base)),
        Some(CrawlStatus::Done)
    );
}

fn requests_to(requests: &[wiremock::Request], route: &str) -> usize {
    requests.iter().filter(|r| r.url.path() == route).count()
}

#[tokio::test]
async fn test_failed_leaf_fetched_once_per_run_on_depth_first_resume() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "a/tileset.json" } } }),
    )
    .await;
    mount_json(
        &server,
        "/a/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "tile.b3dm" } } }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a/tile.b3dm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::DepthFirst);
    let roots = [format!("{}/tileset.json", base)];

    run_crawl(config.clone(), &roots).await.unwrap();
    let first = server.received_requests().await.unwrap();
    assert_eq!(requests_to(&first, "/a/tile.b3dm"), 1);

    // Second run: the leaf sweep tries the leaf, and the re-walk of its
    // pending parents must not try it again
    run_crawl(config.clone(), &roots).await.unwrap();
    let all = server.received_requests().await.unwrap();
    assert_eq!(requests_to(&all, "/a/tile.b3dm"), 2);

    let storage = open_store(&config);
    assert_eq!(
        status_of(&storage, &format!("{}/a/tile.b3dm", base)),
        Some(CrawlStatus::Pending)
    );
    assert_eq!(
        status_of(&storage, &format!("{}/tileset.json", base)),
        Some(CrawlStatus::Pending)
    );
}

#[tokio::test]
async fn test_pending_subdocument_resumes_on_next_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_json(
        &server,
        "/tileset.json",
        serde_json::json!({
            "root": {
                "children": [
                    { "content": { "uri": "gone/tileset.json" } },
                    { "content": { "uri": "here/tileset.json" } }
                ]
            }
        }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone/tileset.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/here/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "tile.b3dm" } } }),
    )
    .await;
    mount_bytes(&server, "/here/tile.b3dm", b"here").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), Traversal::BreadthFirst);
    let roots = [format!("{}/tileset.json", base)];
    run_crawl(config.clone(), &roots).await.unwrap();

    server.reset().await;
    mount_json(
        &server,
        "/gone/tileset.json",
        serde_json::json!({ "root": { "content": { "uri": "tile.b3dm" } } }),
    )
    .await;
    mount_bytes(&server, "/gone/tile.b3dm", b"back").await;
    for route in ["/tileset.json", "/here/tileset.json", "/here/tile.b3dm"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
    }

    let summary = run_crawl(config.clone(), &roots).await.unwrap();
    assert_eq!(summary.wave_sizes, vec![1]);
    assert!(!summary.has_failures());

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path().starts_with("/gone/")));
    assert_eq!(requests_to(&requests, "/gone/tileset.json"), 1);
    assert_eq!(requests_to(&requests, "/gone/tile.b3dm"), 1);

    let storage = open_store(&config);
    assert_eq!(storage.count_total().unwrap(), 5);
    assert_eq!(storage.count_records(ContentKind::SubTree, CrawlStatus::Pending).unwrap(), 0);
    assert_eq!(storage.count_records(ContentKind::Leaf, CrawlStatus::Pending).unwrap(), 0);
    assert!(dir.path().join("gone").join("tile.b3dm").exists());
}

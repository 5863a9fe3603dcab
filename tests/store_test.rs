//! Read-through behaviour of the link stores.

use std::time::Duration;

use link_resolver::{Config, FileStore, LinkResolver, LinkStore, NullStore, StoreError};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn page_server(expected_hits: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><head></head></html>", "text/html"),
        )
        .expect(expected_hits)
        .mount(&server)
        .await;
    server
}

fn resolver(config: &Config) -> LinkResolver {
    LinkResolver::from_config(config).expect("Failed to build resolver")
}

#[tokio::test]
async fn test_file_store_resolves_once() {
    let server = page_server(1).await;
    let dir = TempDir::new().unwrap();
    let config = Config::for_testing();
    let store = FileStore::open(dir.path(), false, resolver(&config), config)
        .await
        .unwrap();
    let url = format!("{}/page?utm_source=feed", server.uri());

    let first = store.get(&url).await;
    assert!(store.path_for(&url).exists());

    let second = store.get(&url).await;
    assert_eq!(first, second);
    assert_eq!(
        second.final_url().unwrap().as_str(),
        format!("{}/page", server.uri())
    );

    let lookup = store.find(&url).await.unwrap();
    assert!(lookup.found);
    assert!(!lookup.expired);
}

#[tokio::test]
async fn test_expired_records_are_resolved_again() {
    let server = page_server(2).await;
    let dir = TempDir::new().unwrap();
    let config = Config {
        store_ttl: Some(Duration::ZERO),
        ..Config::for_testing()
    };
    let store = FileStore::open(dir.path(), false, resolver(&config), config)
        .await
        .unwrap();
    let url = format!("{}/page", server.uri());

    store.get(&url).await;
    let lookup = store.find(&url).await.unwrap();
    assert!(lookup.found);
    assert!(lookup.expired);

    store.get(&url).await;
}

#[tokio::test]
async fn test_open_missing_directory() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("links");
    let config = Config::for_testing();

    let result = FileStore::open(&missing, false, resolver(&config), config.clone()).await;
    assert!(matches!(result, Err(StoreError::MissingDirectory(p)) if p == missing));

    FileStore::open(&missing, true, resolver(&config), config)
        .await
        .unwrap();
    assert!(missing.is_dir());
}

#[tokio::test]
async fn test_temporary_store_removed_on_close() {
    let server = page_server(1).await;
    let config = Config::for_testing();
    let store = FileStore::temporary(true, resolver(&config), config).unwrap();
    let dir = store.dir().to_path_buf();

    store.get(&format!("{}/page", server.uri())).await;
    assert!(dir.is_dir());

    store.close().await.unwrap();
    assert!(!dir.exists());
}

#[tokio::test]
async fn test_temporary_store_kept_after_close() {
    let config = Config::for_testing();
    let store = FileStore::temporary(false, resolver(&config), config).unwrap();
    let dir = store.dir().to_path_buf();

    store.close().await.unwrap();
    assert!(dir.is_dir());
    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn test_null_store_always_resolves() {
    let server = page_server(2).await;
    let config = Config::for_testing();
    let store = NullStore::new(resolver(&config), config);
    let url = format!("{}/page", server.uri());

    let first = store.get(&url).await;
    store.get(&url).await;

    assert!(first.destination_valid);
    assert!(!store.find(&url).await.unwrap().found);
    store.close().await.unwrap();
}

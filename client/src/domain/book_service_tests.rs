//! Tests for the catalogue service.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use super::*;
use crate::domain::ports::{MockRemoteClient, RemoteClientError};
use crate::outbound::storage::InMemoryLocalStore;
use crate::test_support::FixtureClock;

fn make_service(remote: MockRemoteClient) -> BookService<MockRemoteClient> {
    BookService::new(ResilientRepository::new(
        Arc::new(remote),
        Arc::new(InMemoryLocalStore::default()),
        Arc::new(FixtureClock::new(Utc::now())),
        true,
    ))
}

#[test]
fn search_sync_matches_title_or_author_ignoring_case() {
    let service = make_service(MockRemoteClient::new());

    let by_author = service.search_sync("FOWLER");
    let by_title = service.search_sync("patrones");

    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].title, "Refactoring");
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].id, EntityId::new("b8"));
}

#[tokio::test]
async fn search_async_encodes_the_query() {
    let mut remote = MockRemoteClient::new();
    remote
        .expect_list()
        .withf(|path| path == "/search?q=clean+code")
        .times(1)
        .returning(|_| {
            Ok(vec![json!({"id": 40, "title": "Clean Code", "author": "Robert C. Martin"})])
        });
    let mut service = make_service(remote);

    let found = service.search_async(" clean code ").await;

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, EntityId::new("40"));
    assert_eq!(service.get_all_sync().len(), 9);
}

#[tokio::test]
async fn search_async_falls_back_to_the_cache() {
    let mut remote = MockRemoteClient::new();
    remote
        .expect_list()
        .returning(|_| Err(RemoteClientError::timeout("5s")));
    let mut service = make_service(remote);

    let found = service.search_async("tanenbaum").await;

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Sistemas Operativos");
}

#[test]
fn filter_by_category_ignores_case_and_accepts_all() {
    let service = make_service(MockRemoteClient::new());

    assert_eq!(service.filter_by_category("programación").len(), 4);
    assert_eq!(service.filter_by_category("all").len(), 8);
    assert!(service.filter_by_category("Poesía").is_empty());
}

#[test]
fn categories_are_distinct_and_sorted() {
    let service = make_service(MockRemoteClient::new());

    assert_eq!(
        service.categories(),
        vec!["Arquitectura", "Base de Datos", "Programación", "Redes", "Sistemas"]
    );
}

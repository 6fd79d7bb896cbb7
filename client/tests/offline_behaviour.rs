//! Behavioural tests for the library services with scripted remote services.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use library_client::app::{LibraryServices, Remotes};
use library_client::domain::ports::{LocalStore, RemoteClientError};
use library_client::domain::{
    CanonicalStatus, EntityId, LegacyStatus, LoanLifecycle, Provenance, TransitionOutcome,
    UserDraft, ValidationError,
};
use library_client::outbound::storage::InMemoryLocalStore;
use library_client::test_support::{Call, FixtureClock, ScriptedRemoteClient};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

struct Harness {
    services: LibraryServices<ScriptedRemoteClient>,
    books: Arc<ScriptedRemoteClient>,
    loans: Arc<ScriptedRemoteClient>,
    clock: Arc<FixtureClock>,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 5, 10, 0, 0)
        .single()
        .expect("valid date")
}

#[fixture]
fn harness() -> Harness {
    let books = Arc::new(ScriptedRemoteClient::new());
    let users = Arc::new(ScriptedRemoteClient::new());
    let loans = Arc::new(ScriptedRemoteClient::new());
    let clock = Arc::new(FixtureClock::new(start()));
    let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::default());
    let services = LibraryServices::new(
        Remotes {
            books: books.clone(),
            users,
            loans: loans.clone(),
        },
        store,
        clock.clone(),
        true,
        LoanLifecycle::default(),
    );
    Harness {
        services,
        books,
        loans,
        clock,
    }
}

fn remote_book(id: u64, title: &str) -> Value {
    json!({"id": id, "title": title, "author": "Anon", "status": "AVAILABLE"})
}

fn remote_loan(id: u64, status: &str, return_date: Option<&str>) -> Value {
    let mut loan = json!({
        "id": id,
        "userId": 2,
        "bookId": 1,
        "loanDate": "2025-05-01",
        "dueDate": "2025-05-15",
        "status": status,
    });
    if let Some(date) = return_date {
        loan["returnDate"] = json!(date);
    }
    loan
}

#[rstest]
#[tokio::test]
async fn offline_loan_requests_are_pending_local_records(harness: Harness) {
    let Harness { mut services, .. } = harness;

    let created = services
        .loans
        .request(&EntityId::new("b1"), &EntityId::new("u1"))
        .await
        .expect("request accepted");

    assert_eq!(created.provenance, Provenance::LocalOnly);
    let loan = created.value;
    assert_eq!(loan.status, LegacyStatus::Pendiente);
    assert!(loan.id.is_local_only());
    assert_eq!(loan.loan_date, start());
    assert_eq!(loan.due_date, start() + Duration::days(14));
    assert_eq!(services.loans.get_all_sync(), [loan]);
}

#[rstest]
#[tokio::test]
async fn a_second_approval_is_an_invalid_transition(harness: Harness) {
    let Harness { mut services, .. } = harness;
    let loan = services
        .loans
        .request(&EntityId::new("b2"), &EntityId::new("u1"))
        .await
        .expect("request")
        .value;

    let approved = services.loans.approve(&loan.id).await.expect("approve");
    let again = services.loans.approve(&loan.id).await.expect("approve again");

    let approved = approved.expect("cached").into_result().expect("applied");
    assert_eq!(approved.value.status, LegacyStatus::Aprobado);
    let Some(TransitionOutcome::Unchanged { loan: unchanged, rejection }) = again else {
        panic!("second approval must be refused");
    };
    assert_eq!(unchanged.status, LegacyStatus::Aprobado);
    assert_eq!(rejection.from, CanonicalStatus::Active);
    assert_eq!(
        rejection.to_string(),
        "cannot approve a loan that is ACTIVE"
    );
}

#[rstest]
#[tokio::test]
async fn not_found_reads_are_absent(harness: Harness) {
    let Harness {
        mut services,
        books,
        loans,
        ..
    } = harness;
    loans.reply(Call::Get, "/5", Err(RemoteClientError::status(404_u16, "no loan")));
    books.reply(Call::Get, "/1", Err(RemoteClientError::status(404_u16, "no book")));

    assert_eq!(services.loans.get_by_id_async(&EntityId::new("5")).await, None);
    assert_eq!(services.books.get_by_id_async(&EntityId::new("1")).await, None);
}

#[rstest]
#[tokio::test]
async fn duplicate_offline_registration_is_refused(harness: Harness) {
    let Harness { mut services, .. } = harness;

    services
        .users
        .register(UserDraft::new("Ana", "a@b.com", "secret"))
        .await
        .expect("first registration");
    let error = services
        .users
        .register(UserDraft::new("Ana", "a@b.com", "secret"))
        .await
        .expect_err("duplicate rejected");

    assert_eq!(error.to_string(), "email already registered");
    assert!(matches!(
        error.as_validation(),
        Some(ValidationError::EmailTaken { .. })
    ));
}

#[rstest]
#[tokio::test]
async fn listing_replaces_the_cache_with_the_remote_set(harness: Harness) {
    let Harness {
        mut services,
        books,
        ..
    } = harness;
    assert_eq!(services.books.get_all_sync().len(), 8);
    books.reply(
        Call::List,
        "/all",
        Ok(json!([remote_book(1, "Dune"), remote_book(2, "Emma")])),
    );

    let listed = services.books.get_all_async().await;

    assert_eq!(services.books.get_all_sync(), listed.as_slice());
    let ids: Vec<&str> = listed.iter().map(|book| book.id.as_str()).collect();
    assert_eq!(ids, ["1", "2"]);
    assert_eq!(listed[0].category, "General");
}

#[rstest]
#[tokio::test]
async fn outages_serve_the_last_listing(harness: Harness) {
    let Harness {
        mut services,
        loans,
        ..
    } = harness;
    loans.reply(
        Call::List,
        "",
        Ok(json!([
            remote_loan(1, "ACTIVE", None),
            remote_loan(2, "RETURNED", Some("2025-05-03T12:00:00")),
        ])),
    );
    let online = services.loans.get_all_async().await;

    loans.set_offline(true);
    let offline = services.loans.get_all_async().await;

    assert_eq!(offline, online);
    assert_eq!(loans.count(Call::List, ""), 2);
}

#[rstest]
#[tokio::test]
async fn return_dates_follow_the_returned_state(harness: Harness) {
    let Harness {
        mut services,
        loans,
        clock,
        ..
    } = harness;
    loans.reply(
        Call::List,
        "",
        Ok(json!([
            remote_loan(1, "ACTIVE", Some("2025-05-02")),
            remote_loan(2, "RETURNED", None),
            remote_loan(3, "PENDING", None),
        ])),
    );
    services.loans.get_all_async().await;
    loans.set_offline(true);
    clock.advance(Duration::days(1));

    let returned = services
        .loans
        .return_book(&EntityId::new("1"))
        .await
        .expect("return")
        .expect("cached");
    services
        .loans
        .reject(&EntityId::new("3"))
        .await
        .expect("reject");

    assert_eq!(
        returned.loan().return_date,
        Some(start() + Duration::days(1))
    );
    for loan in services.loans.get_all_sync() {
        assert_eq!(
            loan.return_date.is_some(),
            loan.status == LegacyStatus::Devuelto,
            "{loan:?}"
        );
    }
}

#[rstest]
#[tokio::test]
async fn remote_rejections_are_not_applied_locally(harness: Harness) {
    let Harness {
        mut services,
        loans,
        ..
    } = harness;
    loans.reply(Call::List, "", Ok(json!([remote_loan(4, "PENDING", None)])));
    loans.reply(
        Call::Put,
        "/4/approve",
        Err(RemoteClientError::status(409_u16, "book unavailable")),
    );
    services.loans.get_all_async().await;

    let error = services
        .loans
        .approve(&EntityId::new("4"))
        .await
        .expect_err("rejected");

    assert!(error.to_string().contains("book unavailable"), "{error}");
    assert_eq!(
        services
            .loans
            .get_by_id_sync(&EntityId::new("4"))
            .map(|loan| loan.status),
        Some(LegacyStatus::Pendiente)
    );
}

#[rstest]
#[tokio::test]
async fn local_only_records_never_reach_the_remote(harness: Harness) {
    let Harness {
        mut services,
        loans,
        ..
    } = harness;
    let loan = services
        .loans
        .request(&EntityId::new("b3"), &EntityId::new("u1"))
        .await
        .expect("request")
        .value;

    services.loans.approve(&loan.id).await.expect("approve");
    services.loans.extend(&loan.id).await.expect("extend");
    assert!(services.loans.delete(&loan.id).await);

    assert!(loans.calls().is_empty(), "{:?}", loans.calls());
}

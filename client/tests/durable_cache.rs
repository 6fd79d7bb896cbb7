//! Behavioural tests for caches persisted across restarts in a directory.

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use library_client::app::{LibraryServices, Remotes};
use library_client::domain::ports::{LocalStore, LocalStoreExt};
use library_client::domain::{BookDraft, EntityId, LoanLifecycle, Session, UserDraft};
use library_client::outbound::storage::FileLocalStore;
use library_client::test_support::{FixtureClock, ScriptedRemoteClient};

fn offline_services(dir: &Path) -> LibraryServices<ScriptedRemoteClient> {
    let remote = Arc::new(ScriptedRemoteClient::new());
    remote.set_offline(true);
    let store: Arc<dyn LocalStore> = Arc::new(FileLocalStore::open(dir).expect("open store"));
    let now = Utc
        .with_ymd_and_hms(2025, 6, 1, 8, 30, 0)
        .single()
        .expect("valid date");
    LibraryServices::new(
        Remotes {
            books: remote.clone(),
            users: remote.clone(),
            loans: remote,
        },
        store,
        Arc::new(FixtureClock::new(now)),
        true,
        LoanLifecycle::default(),
    )
}

#[tokio::test]
async fn offline_writes_survive_a_restart() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = temp.path().join("library");

    let (book, loan) = {
        let mut services = offline_services(&dir);
        let book = services
            .books
            .create(BookDraft::new("Kindred", "Octavia E. Butler").category("Novel"))
            .await
            .expect("create book")
            .value;
        let loan = services
            .loans
            .request(&book.id, &EntityId::new("2"))
            .await
            .expect("request")
            .value;
        services.loans.approve(&loan.id).await.expect("approve");
        (book, loan)
    };

    let services = offline_services(&dir);

    assert_eq!(services.books.get_all_sync().len(), 9);
    assert_eq!(services.books.get_by_id_sync(&book.id), Some(&book));
    let reloaded = services
        .loans
        .get_by_id_sync(&loan.id)
        .expect("loan persisted");
    assert_eq!(reloaded.status.as_str(), "aprobado");
    assert!(services.books.categories().contains(&"Novel".to_owned()));
}

#[tokio::test]
async fn sessions_survive_a_restart_until_logout() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = temp.path().join("library");

    {
        let mut services = offline_services(&dir);
        services
            .users
            .register(UserDraft::new("Grace", "grace@example.com", "cobol"))
            .await
            .expect("register");
    }

    let mut services = offline_services(&dir);
    let session = services.users.session().expect("session persisted");
    assert_eq!(session.user.email, "grace@example.com");

    services.users.logout();
    services
        .users
        .login("GRACE@example.com", "cobol")
        .await
        .expect("offline login with the persisted credential");
    services.users.logout();

    let store = FileLocalStore::open(&dir).expect("reopen store");
    let stored: Option<Session> = store.read_or("session", None);
    assert!(stored.is_none());
}

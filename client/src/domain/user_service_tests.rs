//! Tests for the accounts service.

use chrono::Utc;
use rstest::rstest;
use serde_json::Value;

use super::*;
use crate::domain::ports::MockRemoteClient;
use crate::domain::repository::Provenance;
use crate::outbound::storage::InMemoryLocalStore;
use crate::test_support::FixtureClock;

fn offline() -> RemoteClientError {
    RemoteClientError::transport("connection refused")
}

fn make_service(remote: MockRemoteClient) -> UserService<MockRemoteClient> {
    let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::default());
    let users = ResilientRepository::new(
        Arc::new(remote),
        store.clone(),
        Arc::new(FixtureClock::new(Utc::now())),
        true,
    );
    UserService::new(users, store)
}

fn offline_service() -> UserService<MockRemoteClient> {
    let mut remote = MockRemoteClient::new();
    remote.expect_post().returning(|_, _| Err(offline()));
    remote.expect_patch().returning(|_, _| Err(offline()));
    make_service(remote)
}

fn remote_user(id: u64, email: &str) -> Value {
    json!({"id": id, "name": "Ada", "email": email, "role": "USUARIO", "roleFrontend": "User"})
}

#[tokio::test]
async fn registering_a_taken_email_offline_fails() {
    let mut service = offline_service();

    let first = service
        .register(UserDraft::new("Ada", "a@b.com", "pw"))
        .await
        .expect("first registration");
    let error = service
        .register(UserDraft::new("Ada again", "A@B.com", "pw2"))
        .await
        .expect_err("duplicate");

    assert_eq!(first.provenance, Provenance::LocalOnly);
    assert_eq!(error.to_string(), "email already registered");
    assert_eq!(
        service
            .get_all_sync()
            .iter()
            .filter(|user| user.has_email("a@b.com"))
            .count(),
        1
    );
}

#[tokio::test]
async fn registration_signs_in_a_regular_account() {
    let mut service = offline_service();

    let created = service
        .register(UserDraft::new("Ada", "ada@example.com", "pw").with_role(Role::Admin))
        .await
        .expect("register");

    assert_eq!(created.value.role, Role::User);
    let session = service.session().expect("session saved");
    assert_eq!(session.user, created.value);
    assert_eq!(session.token, None);
}

#[tokio::test]
async fn remote_registration_keeps_a_credential_for_offline_login() {
    let mut remote = MockRemoteClient::new();
    let mut sequence = mockall::Sequence::new();
    remote
        .expect_post()
        .withf(|path, body| path == "/register" && body["email"] == "ada@example.com")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| Ok(remote_user(12, "ada@example.com")));
    remote
        .expect_post()
        .withf(|path, _| path == "/login")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| Err(offline()));
    let mut service = make_service(remote);

    let created = service
        .register(UserDraft::new("Ada", "Ada@Example.com", "s3cret"))
        .await
        .expect("register");
    let session = service.login("ada@example.com", "s3cret").await.expect("login");

    assert!(created.persisted_remotely());
    assert_eq!(session.user.id, EntityId::new("12"));
}

#[tokio::test]
async fn create_by_admin_leaves_the_session_alone() {
    let mut service = offline_service();

    let created = service
        .create_by_admin(UserDraft::new("Root", "root@example.com", "pw").with_role(Role::Admin))
        .await
        .expect("create");

    assert_eq!(created.value.role, Role::Admin);
    assert!(service.session().is_none());
}

#[tokio::test]
async fn remote_login_stores_the_token() {
    let mut remote = MockRemoteClient::new();
    remote.expect_post().returning(|_, _| {
        Ok(json!({
            "token": "jwt",
            "user": remote_user(2, "usuario@biblioteca.com"),
            "expiresIn": 3600,
        }))
    });
    let mut service = make_service(remote);

    let session = service
        .login("usuario@biblioteca.com", "whatever")
        .await
        .expect("login");

    assert_eq!(session.token.as_deref(), Some("jwt"));
    assert_eq!(session.expires_in, Some(3600));
    assert_eq!(service.session(), Some(session.clone()));
    assert!(!format!("{session:?}").contains("jwt"));
}

#[rstest]
#[case("admin@biblioteca.com", "admin123", true)]
#[case("ADMIN@biblioteca.com", "admin123", true)]
#[case("admin@biblioteca.com", "wrong", false)]
#[case("nobody@biblioteca.com", "admin123", false)]
#[tokio::test]
async fn offline_login_checks_cached_credentials(
    #[case] email: &str,
    #[case] password: &str,
    #[case] accepted: bool,
) {
    let mut service = offline_service();

    let result = service.login(email, password).await;

    match result {
        Ok(session) => {
            assert!(accepted);
            assert_eq!(session.user.role, Role::Admin);
        }
        Err(error) => {
            assert!(!accepted);
            assert_eq!(
                error.as_validation(),
                Some(&ValidationError::InvalidCredentials)
            );
        }
    }
}

#[tokio::test]
async fn unauthorised_logins_do_not_fall_back() {
    let mut remote = MockRemoteClient::new();
    remote
        .expect_post()
        .returning(|_, _| Err(RemoteClientError::status(401_u16, "bad credentials")));
    let mut service = make_service(remote);

    let error = service
        .login("admin@biblioteca.com", "admin123")
        .await
        .expect_err("remote verdict wins");

    assert_eq!(
        error.as_validation(),
        Some(&ValidationError::InvalidCredentials)
    );
}

#[tokio::test]
async fn logout_clears_the_session() {
    let mut service = offline_service();
    service
        .login("usuario@biblioteca.com", "user123")
        .await
        .expect("login");

    service.logout();

    assert!(service.session().is_none());
}

#[tokio::test]
async fn change_role_applies_locally_when_offline() {
    let mut service = offline_service();

    let updated = service
        .change_role(&EntityId::new("2"), Role::Admin)
        .await
        .expect("change role")
        .expect("cached");

    assert_eq!(updated.provenance, Provenance::LocalOnly);
    assert_eq!(updated.value.role, Role::Admin);
}

#[test]
fn find_by_email_ignores_case() {
    let service = make_service(MockRemoteClient::new());

    let found = service.find_by_email_sync(" Usuario@Biblioteca.com ");

    assert_eq!(found.map(|user| user.id.as_str()), Some("2"));
}

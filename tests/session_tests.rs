use equipment_dashboard::data_types::User;
use equipment_dashboard::errors::AuthError;
use equipment_dashboard::session_gate::{resolve, Route, Session, SessionStatus};
use std::sync::Arc;
use std::time::Duration;

use equipment_dashboard::session_store::{
    Credential, IdentityProvider, SessionStore, SignInPrompt, TokenStore, ACCESS_TOKEN_KEY,
};

struct FakeProvider {
    outcome: Result<Credential, AuthError>,
    remembered: Option<User>,
    sign_out_fails: bool,
}

impl FakeProvider {
    fn returning(outcome: Result<Credential, AuthError>) -> Self {
        FakeProvider {
            outcome,
            remembered: None,
            sign_out_fails: false,
        }
    }
}

impl IdentityProvider for FakeProvider {
    async fn sign_in(&self, _prompt: &SignInPrompt) -> Result<Credential, AuthError> {
        self.outcome.clone()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.sign_out_fails {
            Err(AuthError::Provider("network unreachable".into()))
        } else {
            Ok(())
        }
    }

    fn remembered_user(&self) -> Option<User> {
        self.remembered.clone()
    }
}

/// Shows the authorization address, then waits for a redirect that never comes.
struct AbandonedBrowser;

impl IdentityProvider for AbandonedBrowser {
    async fn sign_in(&self, prompt: &SignInPrompt) -> Result<Credential, AuthError> {
        prompt.show("https://login.example/authorize", "http://localhost:8400");
        std::future::pending().await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }

    fn remembered_user(&self) -> Option<User> {
        None
    }
}

fn aino() -> User {
    User {
        display_name: Some("Aino".into()),
        email: Some("aino@example.com".into()),
    }
}

fn issued(token: Option<&str>) -> Result<Credential, AuthError> {
    Ok(Credential {
        user: aino(),
        access_token: token.map(str::to_string),
    })
}

#[tokio::test]
async fn boot_discards_tokens_from_earlier_sessions() {
    let tokens = TokenStore::new();
    tokens.set(ACCESS_TOKEN_KEY, "left over");
    let store = SessionStore::boot(FakeProvider::returning(issued(Some("t"))), tokens);
    assert_eq!(store.stored_token(), None);
}

#[tokio::test]
async fn sign_in_persists_token_and_notifies() {
    let store = SessionStore::boot(FakeProvider::returning(issued(Some("t-1"))), TokenStore::new());
    let mut changes = store.on_auth_state_changed();
    assert_eq!(changes.next().await, Some(None));

    let (user, token) = store.sign_in().await.unwrap();
    assert_eq!(user, aino());
    assert_eq!(token, "t-1");
    assert_eq!(store.stored_token().as_deref(), Some("t-1"));
    assert_eq!(changes.next().await, Some(Some(aino())));
    assert_eq!(store.current_user(), Some(aino()));
}

#[tokio::test]
async fn sign_in_without_token_fails() {
    for token in [None, Some("")] {
        let store = SessionStore::boot(FakeProvider::returning(issued(token)), TokenStore::new());
        assert_eq!(store.sign_in().await, Err(AuthError::NoToken));
        assert_eq!(store.stored_token(), None);
        assert_eq!(store.current_user(), None);
    }
}

#[tokio::test]
async fn denied_sign_in_is_reported() {
    let denied = AuthError::Denied("access_denied".into());
    let store = SessionStore::boot(FakeProvider::returning(Err(denied.clone())), TokenStore::new());
    assert_eq!(store.sign_in().await, Err(denied));
    assert_eq!(store.stored_token(), None);
}

#[tokio::test]
async fn sign_out_clears_local_state_even_when_provider_fails() {
    let mut provider = FakeProvider::returning(issued(Some("t")));
    provider.sign_out_fails = true;
    let store = SessionStore::boot(provider, TokenStore::new());
    store.sign_in().await.unwrap();

    let mut changes = store.on_auth_state_changed();
    assert_eq!(changes.next().await, Some(Some(aino())));

    store.sign_out().await;
    assert_eq!(store.stored_token(), None);
    assert_eq!(changes.next().await, Some(None));
}

#[tokio::test]
async fn subscription_ends_when_store_is_dropped() {
    let store = SessionStore::boot(FakeProvider::returning(issued(Some("t"))), TokenStore::new());
    let mut changes = store.on_auth_state_changed();
    assert_eq!(changes.next().await, Some(None));
    drop(store);
    assert_eq!(changes.next().await, None);
}

#[tokio::test]
async fn remembered_account_without_token_lands_on_login() {
    let mut provider = FakeProvider::returning(issued(Some("t")));
    provider.remembered = Some(aino());
    let store = SessionStore::boot(provider, TokenStore::new());

    let mut changes = store.on_auth_state_changed();
    let user = changes.next().await.unwrap();
    assert_eq!(user, Some(aino()));

    let mut session = Session::loading();
    session.auth_state_changed(user, store.stored_token());
    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert_eq!(resolve(Route::Dashboard, &session), Some(Route::Login));
}

#[tokio::test]
async fn signed_in_user_reaches_dashboard_through_the_gate() {
    let store = SessionStore::boot(FakeProvider::returning(issued(Some("t"))), TokenStore::new());
    let mut changes = store.on_auth_state_changed();
    let _ = changes.next().await;

    store.sign_in().await.unwrap();
    let user = changes.next().await.unwrap();

    let mut session = Session::loading();
    session.auth_state_changed(user, store.stored_token());
    assert_eq!(session.status(), SessionStatus::Authenticated);
    assert_eq!(session.bearer_token(), Some("t"));
    assert_eq!(resolve(Route::Login, &session), Some(Route::Dashboard));
}

#[tokio::test]
async fn abandoned_sign_in_times_out() {
    let store = SessionStore::boot(AbandonedBrowser, TokenStore::new())
        .with_sign_in_timeout(Duration::from_millis(20));
    let prompts = store.sign_in_prompts();

    assert_eq!(
        store.sign_in().await,
        Err(AuthError::Denied("timed out".into()))
    );
    assert_eq!(store.stored_token(), None);
    assert_eq!(*prompts.borrow(), None);
}

#[tokio::test]
async fn sign_in_can_be_cancelled_while_waiting_for_the_browser() {
    let store = Arc::new(SessionStore::boot(AbandonedBrowser, TokenStore::new()));
    let mut prompts = store.sign_in_prompts();

    let pending = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.sign_in().await }
    });

    prompts.changed().await.unwrap();
    let shown = prompts.borrow_and_update().clone().unwrap();
    assert_eq!(shown.auth_url, "https://login.example/authorize");

    store.cancel_sign_in();
    let outcome = pending.await.unwrap();
    assert_eq!(outcome, Err(AuthError::Denied("cancelled".into())));
    assert_eq!(*prompts.borrow(), None);
    assert_eq!(store.current_user(), None);
}

#[tokio::test]
async fn cancel_without_sign_in_is_harmless() {
    let store = SessionStore::boot(FakeProvider::returning(issued(Some("t"))), TokenStore::new());
    store.cancel_sign_in();
    assert!(store.sign_in().await.is_ok());
}

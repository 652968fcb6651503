// src/session_store.rs
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tracing::{info, warn};

use crate::data_types::User;
use crate::errors::AuthError;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const DEFAULT_SIGN_IN_TIMEOUT: Duration = Duration::from_secs(300);

/// What a completed interactive sign-in hands back. The token may be missing
/// when the provider authenticated the user but issued no API credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user: User,
    pub access_token: Option<String>,
}

/// What the login view shows while an interactive sign-in waits for the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDisplay {
    pub auth_url: String,
    pub listen_addr: String,
}

/// Handle a provider uses to publish the address the user has to open.
#[derive(Debug, Clone)]
pub struct SignInPrompt {
    sender: Arc<watch::Sender<Option<AuthDisplay>>>,
}

impl SignInPrompt {
    fn new() -> Self {
        let (sender, _) = watch::channel(None);
        SignInPrompt {
            sender: Arc::new(sender),
        }
    }

    pub fn show(&self, auth_url: &str, listen_addr: &str) {
        self.sender.send_replace(Some(AuthDisplay {
            auth_url: auth_url.to_string(),
            listen_addr: listen_addr.to_string(),
        }));
    }

    fn clear(&self) {
        self.sender.send_replace(None);
    }
}

pub trait IdentityProvider: Send + Sync {
    /// Runs the interactive sign-in flow, publishing the authorization address on `prompt`.
    fn sign_in(
        &self,
        prompt: &SignInPrompt,
    ) -> impl Future<Output = Result<Credential, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// The account the provider still remembers from an earlier run, if any.
    fn remembered_user(&self) -> Option<User>;
}

/// Key/value storage that lives for one run of the application.
#[derive(Debug, Default)]
pub struct TokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        TokenStore::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Boot policy: nothing stored by a previous session survives a start.
    pub fn reset_on_boot(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

pub struct SessionStore<P> {
    provider: P,
    tokens: TokenStore,
    users: watch::Sender<Option<User>>,
    prompt: SignInPrompt,
    cancel: Notify,
    sign_in_timeout: Duration,
}

impl<P: IdentityProvider> SessionStore<P> {
    /// Starts a session store. The token store is reset before anything reads it.
    pub fn boot(provider: P, tokens: TokenStore) -> Self {
        tokens.reset_on_boot();
        let (users, _) = watch::channel(provider.remembered_user());
        SessionStore {
            provider,
            tokens,
            users,
            prompt: SignInPrompt::new(),
            cancel: Notify::new(),
            sign_in_timeout: DEFAULT_SIGN_IN_TIMEOUT,
        }
    }

    pub fn with_sign_in_timeout(mut self, timeout: Duration) -> Self {
        self.sign_in_timeout = timeout;
        self
    }

    /// Fails with `AuthError::Denied` when the flow is cancelled or outlives the timeout.
    pub async fn sign_in(&self) -> Result<(User, String), AuthError> {
        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();
        let flow = tokio::time::timeout(self.sign_in_timeout, self.provider.sign_in(&self.prompt));

        let outcome = tokio::select! {
            result = flow => result.unwrap_or_else(|_| Err(AuthError::Denied("timed out".into()))),
            _ = cancelled => Err(AuthError::Denied("cancelled".into())),
        };
        self.prompt.clear();

        let credential = outcome.map_err(|err| {
            warn!(error = %err, "Microsoft sign-in failed");
            err
        })?;

        let Some(token) = credential.access_token.filter(|token| !token.is_empty()) else {
            warn!("sign-in succeeded but no access token was returned");
            return Err(AuthError::NoToken);
        };

        self.tokens.set(ACCESS_TOKEN_KEY, &token);
        info!(user = credential.user.greeting_name(), "signed in");
        self.users.send_replace(Some(credential.user.clone()));

        Ok((credential.user, token))
    }

    /// Always leaves the local session signed out, whatever the provider says.
    pub async fn sign_out(&self) {
        if let Err(err) = self.provider.sign_out().await {
            warn!(error = %err, "provider sign-out failed");
        }
        self.tokens.remove(ACCESS_TOKEN_KEY);
        self.users.send_replace(None);
        info!("signed out");
    }

    /// Abandons a sign-in that is waiting on the browser. No effect when none is running.
    pub fn cancel_sign_in(&self) {
        self.cancel.notify_waiters();
    }

    /// The authorization address of the sign-in in progress, `None` when idle.
    pub fn sign_in_prompts(&self) -> watch::Receiver<Option<AuthDisplay>> {
        self.prompt.sender.subscribe()
    }

    pub fn stored_token(&self) -> Option<String> {
        self.tokens.get(ACCESS_TOKEN_KEY)
    }

    pub fn current_user(&self) -> Option<User> {
        self.users.borrow().clone()
    }

    pub fn on_auth_state_changed(&self) -> AuthStateSubscription {
        AuthStateSubscription {
            receiver: self.users.subscribe(),
            delivered_initial: false,
        }
    }
}

/// Yields the current user right away, then once per change. Dropping it unsubscribes.
#[derive(Debug)]
pub struct AuthStateSubscription {
    receiver: watch::Receiver<Option<User>>,
    delivered_initial: bool,
}

impl AuthStateSubscription {
    /// `None` once the store is gone; `Some(None)` means nobody is signed in.
    pub async fn next(&mut self) -> Option<Option<User>> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(self.receiver.borrow_and_update().clone());
        }
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

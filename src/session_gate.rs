// src/session_gate.rs
use crate::data_types::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Anonymous,
    Authenticated,
    TokenExpired,
}

/// Who is signed in and with which token. A token is held exactly while the
/// session is `Authenticated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    current_user: Option<User>,
    bearer_token: Option<String>,
    status: SessionStatus,
}

impl Default for Session {
    fn default() -> Self {
        Session::loading()
    }
}

impl Session {
    pub fn loading() -> Self {
        Session {
            current_user: None,
            bearer_token: None,
            status: SessionStatus::Loading,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// The provider reported `user`; `stored_token` is what the token store holds.
    /// A remembered account without a token still has to sign in again.
    pub fn auth_state_changed(&mut self, user: Option<User>, stored_token: Option<String>) {
        match (user, stored_token.filter(|token| !token.is_empty())) {
            (Some(user), Some(token)) => self.signed_in(user, token),
            (user, _) => {
                self.current_user = user;
                self.bearer_token = None;
                self.status = SessionStatus::Anonymous;
            }
        }
    }

    pub fn signed_in(&mut self, user: User, token: String) {
        self.current_user = Some(user);
        self.bearer_token = Some(token);
        self.status = SessionStatus::Authenticated;
    }

    /// The API refused the token.
    pub fn token_rejected(&mut self) {
        if self.status == SessionStatus::Authenticated {
            self.bearer_token = None;
            self.status = SessionStatus::TokenExpired;
        }
    }

    pub fn signed_out(&mut self) {
        self.current_user = None;
        self.bearer_token = None;
        self.status = SessionStatus::Anonymous;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

impl Route {
    /// Unknown paths go to the login view.
    pub fn from_path(path: &str) -> Route {
        match path.trim_end_matches('/') {
            "/dashboard" | "dashboard" => Route::Dashboard,
            _ => Route::Login,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// The view to mount for `requested`, or `None` while the session is still loading.
pub fn resolve(requested: Route, session: &Session) -> Option<Route> {
    match session.status() {
        SessionStatus::Loading => None,
        SessionStatus::Anonymous => Some(Route::Login),
        // the dashboard shows the sign-in-again prompt
        SessionStatus::TokenExpired => Some(Route::Dashboard),
        SessionStatus::Authenticated => match requested {
            Route::Login => Some(Route::Dashboard),
            Route::Dashboard => Some(Route::Dashboard),
        },
    }
}

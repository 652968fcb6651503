// src/identity.rs
use std::fs;
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use yup_oauth2::authenticator_delegate::InstalledFlowDelegate;
use yup_oauth2::{ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod};

use crate::config::AppConfig;
use crate::data_types::User;
use crate::errors::AuthError;
use crate::session_store::{Credential, IdentityProvider, SignInPrompt};

/// Read access to the profile, the user's files and SharePoint sites.
pub const SCOPES: [&str; 3] = ["User.Read", "Files.Read", "Sites.Read.All"];

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    mail: Option<String>,
    #[serde(rename = "userPrincipalName")]
    user_principal_name: Option<String>,
}

impl From<Profile> for User {
    fn from(profile: Profile) -> Self {
        User {
            display_name: profile.display_name,
            email: profile.mail.or(profile.user_principal_name),
        }
    }
}

/// Hands the authorization URL to the login view; the redirect is caught on the loopback port.
struct BrowserPrompt {
    prompt: SignInPrompt,
    listen_addr: String,
}

impl InstalledFlowDelegate for BrowserPrompt {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        _need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            info!(%url, "open this address to sign in with Microsoft");
            self.prompt.show(url, &self.listen_addr);
            Ok(String::new())
        })
    }
}

/// Microsoft identity platform sign-in through the installed-app flow.
#[derive(Debug, Clone)]
pub struct MicrosoftIdentity {
    config: Arc<AppConfig>,
    http: reqwest::Client,
}

impl MicrosoftIdentity {
    pub fn new(config: Arc<AppConfig>) -> Self {
        MicrosoftIdentity {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn secret(&self) -> Result<ApplicationSecret, AuthError> {
        let client_id = self.config.client_id().ok_or(AuthError::NotConfigured)?;
        Ok(ApplicationSecret {
            client_id: client_id.to_string(),
            auth_uri: self.config.authorize_url(),
            token_uri: self.config.token_url(),
            redirect_uris: vec![self.redirect_uri()],
            ..ApplicationSecret::default()
        })
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}", self.config.redirect_port)
    }

    async fn fetch_profile(&self, token: &str) -> Result<User, AuthError> {
        let url = format!("{}/me", self.config.graph_base.trim_end_matches('/'));
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| AuthError::Provider(err.to_string()))?;

        let profile: Profile = response
            .json()
            .await
            .map_err(|err| AuthError::Provider(err.to_string()))?;
        Ok(profile.into())
    }

    fn account_file(&self) -> Option<PathBuf> {
        self.config.account_file()
    }

    async fn remember(&self, user: &User) {
        let Some(path) = self.account_file() else {
            return;
        };
        if let Err(err) = write_account(&path, user).await {
            warn!(error = %err, path = %path.display(), "could not remember account");
        }
    }
}

async fn write_account(path: &Path, user: &User) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(user)?;
    tokio::fs::write(path, json).await
}

impl IdentityProvider for MicrosoftIdentity {
    async fn sign_in(&self, prompt: &SignInPrompt) -> Result<Credential, AuthError> {
        let secret = self.secret()?;

        let authenticator = InstalledFlowAuthenticator::builder(
            secret,
            InstalledFlowReturnMethod::HTTPPortRedirect(self.config.redirect_port),
        )
        .flow_delegate(Box::new(BrowserPrompt {
            prompt: prompt.clone(),
            listen_addr: self.redirect_uri(),
        }))
        .build()
        .await
        .map_err(|err| AuthError::Provider(err.to_string()))?;

        let token = authenticator.token(&SCOPES).await.map_err(|err| match err {
            yup_oauth2::Error::AuthError(denied) => AuthError::Denied(denied.to_string()),
            other => AuthError::Provider(other.to_string()),
        })?;

        let Some(access_token) = token.token().map(str::to_owned) else {
            return Ok(Credential {
                user: User::default(),
                access_token: None,
            });
        };

        let user = self.fetch_profile(&access_token).await?;
        self.remember(&user).await;

        Ok(Credential {
            user,
            access_token: Some(access_token),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(path) = self.account_file() else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Provider(err.to_string())),
        }
    }

    fn remembered_user(&self) -> Option<User> {
        let path = self.account_file()?;
        let json = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&json) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(error = %err, path = %path.display(), "ignoring unreadable account file");
                None
            }
        }
    }
}

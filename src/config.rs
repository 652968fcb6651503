// src/config.rs
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{AppError, AppResult};

pub const CONFIG_PATH_ENV: &str = "EQUIPMENT_DASHBOARD_CONFIG";
pub const CLIENT_ID_ENV: &str = "EQUIPMENT_DASHBOARD_CLIENT_ID";
const DEFAULT_CONFIG_FILE: &str = "dashboard.json";

const DEFAULT_ITEM_ID: &str = "33aa4076-dadd-4e4b-aa36-187a55943921";
const DEFAULT_SHARE_LINK: &str =
    "https://1drv.ms/x/c/664d2a3caa281035/EXZAqjPd2ktOqjYYelWUOSEBB2Qj5IeQMkacTX3XNCOOhg?e=ZtiEvd";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application (client) id registered with the Microsoft identity platform.
    pub client_id: Option<String>,
    pub tenant: String,
    /// Loopback port the sign-in redirect lands on.
    pub redirect_port: u16,
    pub graph_base: String,
    pub item_id: String,
    pub share_link: String,
    pub worksheet: String,
    /// Where the last signed-in account is remembered between runs.
    pub account_file: Option<PathBuf>,
    /// How long a sign-in may wait for the browser redirect.
    pub sign_in_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            client_id: None,
            tenant: "common".to_string(),
            redirect_port: 8400,
            graph_base: "https://graph.microsoft.com/v1.0".to_string(),
            item_id: DEFAULT_ITEM_ID.to_string(),
            share_link: DEFAULT_SHARE_LINK.to_string(),
            worksheet: "Sheet1".to_string(),
            account_file: None,
            sign_in_timeout_secs: 300,
        }
    }
}

impl AppConfig {
    /// Loads the file named by `EQUIPMENT_DASHBOARD_CONFIG`, else `dashboard.json`.
    /// A missing file yields the defaults.
    pub fn load() -> AppResult<Self> {
        let path = env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = Self::from_file(&path)?;
        if let Ok(client_id) = env::var(CLIENT_ID_ENV) {
            config.client_id = Some(client_id);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json)
                .map_err(|err| AppError::Config(format!("{}: {err}", path.display()))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn from_json(json: &str) -> AppResult<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        if config.worksheet.trim().is_empty() {
            return Err(AppError::Config("worksheet name must not be empty".into()));
        }
        Ok(config)
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn account_file(&self) -> Option<PathBuf> {
        self.account_file.clone().or_else(|| {
            dirs::data_local_dir().map(|dir| dir.join("equipment-dashboard").join("account.json"))
        })
    }

    pub fn sign_in_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_in_timeout_secs.max(1))
    }

    pub fn authorize_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/authorize",
            self.tenant
        )
    }

    pub fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant
        )
    }
}

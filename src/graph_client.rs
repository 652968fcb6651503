// src/graph_client.rs
use std::future::Future;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::data_types::RawRecord;
use crate::errors::FetchError;

/// Body of a `usedRange` response. Row 0 of `values` is the header row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UsedRange {
    #[serde(default)]
    pub values: Vec<RawRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEndpoint {
    /// The workbook item in the signed-in user's drive.
    Primary,
    /// The same workbook reached through its sharing link.
    SharedLink,
}

/// Anything that can hand back the used range of the submissions worksheet.
pub trait RangeSource {
    fn used_range(
        &self,
        endpoint: RangeEndpoint,
        token: &str,
    ) -> impl Future<Output = Result<UsedRange, FetchError>> + Send;
}

/// Share id for `/shares/u!{id}`: URL-safe base64 of the link without padding.
pub fn encode_sharing_link(link: &str) -> String {
    URL_SAFE_NO_PAD.encode(link)
}

#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    config: Arc<AppConfig>,
}

impl GraphClient {
    pub fn new(config: Arc<AppConfig>) -> Self {
        GraphClient {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn url_for(&self, endpoint: RangeEndpoint) -> String {
        let base = self.config.graph_base.trim_end_matches('/');
        let sheet = &self.config.worksheet;
        match endpoint {
            RangeEndpoint::Primary => format!(
                "{base}/me/drive/items/{}/workbook/worksheets('{sheet}')/usedRange",
                self.config.item_id
            ),
            RangeEndpoint::SharedLink => format!(
                "{base}/shares/u!{}/driveItem/workbook/worksheets('{sheet}')/usedRange",
                encode_sharing_link(&self.config.share_link)
            ),
        }
    }
}

impl RangeSource for GraphClient {
    async fn used_range(
        &self,
        endpoint: RangeEndpoint,
        token: &str,
    ) -> Result<UsedRange, FetchError> {
        let url = self.url_for(endpoint);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<UsedRange>()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))
    }
}

// src/fetcher.rs
use tracing::{debug, warn};

use crate::data_types::{Query, ResultPage};
use crate::errors::FetchError;
use crate::graph_client::{RangeEndpoint, RangeSource, UsedRange};
use crate::sheet_transform;

/// Fetches the submissions sheet and returns the requested page of it.
///
/// The whole used range is downloaded every time; filtering and paging happen
/// here. When the workbook cannot be read from the user's drive it is read
/// again through its sharing link with the same token.
pub async fn fetch_page<S: RangeSource>(
    source: &S,
    token: Option<&str>,
    query: &Query,
) -> Result<ResultPage, FetchError> {
    let token = token
        .filter(|token| !token.is_empty())
        .ok_or(FetchError::MissingToken)?;

    let range = fetch_range(source, token).await?;
    debug!(rows = range.values.len(), "used range received");

    Ok(sheet_transform::transform(&range.values).into_page(query))
}

async fn fetch_range<S: RangeSource>(source: &S, token: &str) -> Result<UsedRange, FetchError> {
    match source.used_range(RangeEndpoint::Primary, token).await {
        Ok(range) => Ok(range),
        Err(FetchError::Status { status }) => {
            warn!(status, "workbook not readable from drive, retrying through sharing link");
            source.used_range(RangeEndpoint::SharedLink, token).await
        }
        Err(err) => Err(err),
    }
}

use std::sync::Mutex;

use serde_json::json;

use equipment_dashboard::errors::FetchError;
use equipment_dashboard::fetcher::fetch_page;
use equipment_dashboard::graph_client::{RangeEndpoint, RangeSource, UsedRange};
use equipment_dashboard::Query;

struct FakeWorkbook {
    primary: Result<UsedRange, FetchError>,
    shared: Result<UsedRange, FetchError>,
    calls: Mutex<Vec<(RangeEndpoint, String)>>,
}

impl FakeWorkbook {
    fn new(
        primary: Result<UsedRange, FetchError>,
        shared: Result<UsedRange, FetchError>,
    ) -> Self {
        FakeWorkbook {
            primary,
            shared,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(RangeEndpoint, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RangeSource for FakeWorkbook {
    async fn used_range(
        &self,
        endpoint: RangeEndpoint,
        token: &str,
    ) -> Result<UsedRange, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint, token.to_string()));
        match endpoint {
            RangeEndpoint::Primary => self.primary.clone(),
            RangeEndpoint::SharedLink => self.shared.clone(),
        }
    }
}

fn submissions() -> UsedRange {
    serde_json::from_value(json!({
        "values": [
            ["Id", "Start time", "Completion time", "Email", "Name", "Name1", "Equipment"],
            [1, 44927.4, 44927.5, "a@example.com", "Anonymous", "Aino", "Football"],
            [2, 44928.4, 44928.5, "b@example.com", "Anonymous", "Bertil", "Tennis racket"],
            [3, 44929.4, 44929.5, "c@example.com", "Anonymous", "Cecilia", "Football net"],
            [4, 44930.4, 44930.5, "d@example.com", "Anonymous", "Daniel", "Hockey stick"],
            [5, 44931.4, 44931.5, "e@example.com", "Anonymous", "Eeva", "Floorball"]
        ]
    }))
    .unwrap()
}

fn names(records: &[equipment_dashboard::TransformedRecord]) -> Vec<&str> {
    records.iter().map(|r| r.cell("Name")).collect()
}

fn page(page: usize, page_size: usize) -> Query {
    Query {
        page,
        page_size,
        ..Query::default()
    }
}

#[tokio::test]
async fn missing_token_needs_reauth_without_network() {
    let workbook = FakeWorkbook::new(Ok(submissions()), Ok(submissions()));

    let err = fetch_page(&workbook, None, &Query::default()).await.unwrap_err();
    assert_eq!(err, FetchError::MissingToken);
    assert!(err.needs_reauth());

    let err = fetch_page(&workbook, Some(""), &Query::default()).await.unwrap_err();
    assert!(err.needs_reauth());

    assert!(workbook.calls().is_empty());
}

#[tokio::test]
async fn primary_success_skips_fallback() {
    let workbook = FakeWorkbook::new(Ok(submissions()), Err(FetchError::Status { status: 500 }));

    let result = fetch_page(&workbook, Some("token"), &page(1, 2)).await.unwrap();

    assert_eq!(workbook.calls(), vec![(RangeEndpoint::Primary, "token".to_string())]);
    assert_eq!(result.total_matching, 5);
    assert_eq!(names(&result.records), vec!["Eeva", "Daniel"]);
    assert_eq!(result.columns, vec!["Submitted Time", "Name", "Equipment"]);
}

#[tokio::test]
async fn fallback_result_matches_fallback_only_fetch() {
    let query = Query {
        equipment_filter: "ball".into(),
        ..page(1, 10)
    };

    let failing_primary = FakeWorkbook::new(Err(FetchError::Status { status: 404 }), Ok(submissions()));
    let via_fallback = fetch_page(&failing_primary, Some("token"), &query).await.unwrap();
    assert_eq!(
        failing_primary.calls(),
        vec![
            (RangeEndpoint::Primary, "token".to_string()),
            (RangeEndpoint::SharedLink, "token".to_string()),
        ]
    );

    let direct = FakeWorkbook::new(Ok(submissions()), Err(FetchError::Status { status: 500 }));
    let direct = fetch_page(&direct, Some("token"), &query).await.unwrap();

    assert_eq!(via_fallback, direct);
    assert_eq!(names(&via_fallback.records), vec!["Eeva", "Cecilia", "Aino"]);
}

#[tokio::test]
async fn unauthorized_primary_still_tries_fallback() {
    let workbook = FakeWorkbook::new(Err(FetchError::Status { status: 401 }), Ok(submissions()));
    let result = fetch_page(&workbook, Some("token"), &Query::default()).await.unwrap();
    assert_eq!(result.total_matching, 5);
}

#[tokio::test]
async fn fallback_status_is_propagated() {
    let workbook = FakeWorkbook::new(
        Err(FetchError::Status { status: 403 }),
        Err(FetchError::Status { status: 401 }),
    );
    let err = fetch_page(&workbook, Some("token"), &Query::default()).await.unwrap_err();
    assert_eq!(err, FetchError::Status { status: 401 });
    assert!(err.needs_reauth());

    let workbook = FakeWorkbook::new(
        Err(FetchError::Status { status: 403 }),
        Err(FetchError::Status { status: 404 }),
    );
    let err = fetch_page(&workbook, Some("token"), &Query::default()).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 404");
    assert!(!err.needs_reauth());
}

#[tokio::test]
async fn transport_failure_is_not_retried() {
    let workbook = FakeWorkbook::new(
        Err(FetchError::Transport("connection reset".into())),
        Ok(submissions()),
    );
    let err = fetch_page(&workbook, Some("token"), &Query::default()).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
    assert_eq!(workbook.calls().len(), 1);
}

#[tokio::test]
async fn out_of_range_page_is_empty_with_total() {
    let workbook = FakeWorkbook::new(Ok(submissions()), Ok(submissions()));
    let result = fetch_page(&workbook, Some("token"), &page(4, 2)).await.unwrap();
    assert!(result.records.is_empty());
    assert_eq!(result.total_matching, 5);
    assert_eq!(result.matching.len(), 5);
}

#[tokio::test]
async fn page_lengths_follow_the_filtered_total() {
    let workbook = FakeWorkbook::new(Ok(submissions()), Ok(submissions()));
    for page_size in [1, 2, 3, 5, 10] {
        for number in 1..=6 {
            let result = fetch_page(&workbook, Some("token"), &page(number, page_size))
                .await
                .unwrap();
            let expected = page_size.min(result.total_matching.saturating_sub((number - 1) * page_size));
            assert_eq!(result.records.len(), expected, "page {number} of size {page_size}");
        }
    }
}

#[tokio::test]
async fn empty_workbook_gives_empty_page() {
    let workbook = FakeWorkbook::new(Ok(UsedRange::default()), Ok(UsedRange::default()));
    let result = fetch_page(&workbook, Some("token"), &Query::default()).await.unwrap();
    assert!(result.columns.is_empty());
    assert_eq!(result.total_matching, 0);
}

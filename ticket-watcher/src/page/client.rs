//! HTTP client for the left-ticket query API.
//!
//! Speaks the booking site's JSON query endpoint directly instead of
//! scraping the rendered page. The session is established elsewhere;
//! this client only carries the caller-supplied cookie on every request
//! and reports `SessionExpired` when the remote side stops accepting it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{FareClass, Telecode};

use super::convert::{TrainRow, parse_board};
use super::error::{BookError, PageError};
use super::types::{QueryResponse, SubmitResponse};
use super::{BookingDesk, TicketBoard};

/// Default base URL for the booking site.
const DEFAULT_BASE_URL: &str = "https://kyfw.12306.cn";

/// Browser-like user agent; the query endpoint rejects obvious bots.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36";

/// Initial delay between readiness polls in `wait_for_results`.
const POLL_START: Duration = Duration::from_millis(100);

/// Cap on the readiness poll delay.
const POLL_CAP: Duration = Duration::from_secs(1);

/// Configuration for the query client.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Live session cookie supplied (and owned) by the caller.
    pub session_cookie: String,
    /// Base URL for the booking site.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl BoardConfig {
    /// Create a new config with the given session cookie.
    pub fn new(session_cookie: impl Into<String>) -> Self {
        Self {
            session_cookie: session_cookie.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// The itinerary a client queries for. Fixed for the whole run.
#[derive(Debug, Clone)]
pub struct BoardQuery {
    pub travel_date: NaiveDate,
    pub from: Telecode,
    pub to: Telecode,
    pub fare: FareClass,
}

/// HTTP implementation of [`TicketBoard`] and [`BookingDesk`].
pub struct QueryClient {
    http: reqwest::Client,
    base_url: String,
    query: BoardQuery,
    /// Rows from the most recent successful query within the current
    /// attempt. Cleared by `reload`.
    rows: Mutex<Option<Vec<TrainRow>>>,
}

impl QueryClient {
    /// Create a new client with the given configuration and itinerary.
    pub fn new(config: BoardConfig, query: BoardQuery) -> Result<Self, PageError> {
        let mut headers = HeaderMap::new();

        let cookie = HeaderValue::from_str(&config.session_cookie).map_err(|_| {
            PageError::Malformed("session cookie contains invalid header characters".to_string())
        })?;
        headers.insert(COOKIE, cookie);
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            query,
            rows: Mutex::new(None),
        })
    }

    /// Issue one left-ticket query and cache the parsed rows.
    async fn query_once(&self) -> Result<Vec<TrainRow>, PageError> {
        let url = format!("{}/otn/leftTicket/query", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                (
                    "leftTicketDTO.train_date",
                    self.query.travel_date.format("%Y-%m-%d").to_string(),
                ),
                (
                    "leftTicketDTO.from_station",
                    self.query.from.as_str().to_string(),
                ),
                (
                    "leftTicketDTO.to_station",
                    self.query.to.as_str().to_string(),
                ),
                (
                    "purpose_codes",
                    self.query.fare.purpose_code().to_string(),
                ),
            ])
            .send()
            .await?;

        let status = response.status();
        check_session(status)?;
        if !status.is_success() {
            return Err(PageError::Api {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| PageError::Malformed(e.to_string()))?;

        if !body.status {
            return Err(PageError::Api {
                status: status.as_u16(),
                message: join_messages(&body.messages, "query flagged unsuccessful"),
            });
        }

        // A success envelope without data means the session was bounced
        // back to the login page.
        let data = body.data.ok_or(PageError::SessionExpired)?;

        let rows = parse_board(&data.result);
        debug!(
            records = data.result.len(),
            rows = rows.len(),
            "board query completed"
        );

        *self.rows.lock().await = Some(rows.clone());
        Ok(rows)
    }

    async fn submit_once(&self, token: &str) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}/otn/leftTicket/submitOrderRequest", self.base_url);
        let date = self.query.travel_date.format("%Y-%m-%d").to_string();

        self.http
            .post(&url)
            .form(&[
                ("secretStr", token),
                ("train_date", date.as_str()),
                ("back_train_date", date.as_str()),
                ("tour_flag", "dc"),
                ("purpose_codes", self.query.fare.purpose_code()),
                ("query_from_station_name", self.query.from.as_str()),
                ("query_to_station_name", self.query.to.as_str()),
            ])
            .send()
            .await
    }
}

#[async_trait]
impl TicketBoard for QueryClient {
    async fn wait_for_results(&self, timeout: Duration) -> Result<(), PageError> {
        let start = tokio::time::Instant::now();
        let mut poll = POLL_START;

        loop {
            match self.query_once().await {
                Ok(_) => return Ok(()),
                Err(PageError::SessionExpired) => return Err(PageError::SessionExpired),
                Err(err) => {
                    if start.elapsed() >= timeout {
                        return Err(PageError::Timeout(timeout));
                    }
                    debug!(error = %err, "results not ready, polling again");
                }
            }

            tokio::time::sleep(poll).await;
            poll = (poll * 2).min(POLL_CAP);
        }
    }

    async fn snapshot(&self) -> Result<Vec<TrainRow>, PageError> {
        if let Some(rows) = self.rows.lock().await.clone() {
            return Ok(rows);
        }
        self.query_once().await
    }

    async fn refresh(&self) -> Result<(), PageError> {
        self.query_once().await.map(|_| ())
    }

    async fn reload(&self) -> Result<(), PageError> {
        let url = format!("{}/otn/leftTicket/init", self.base_url);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        check_session(status)?;
        if !status.is_success() {
            return Err(PageError::Api {
                status: status.as_u16(),
                message: "init page unavailable".to_string(),
            });
        }

        *self.rows.lock().await = None;
        self.query_once().await.map(|_| ())
    }
}

#[async_trait]
impl BookingDesk for QueryClient {
    async fn submit(&self, row: &TrainRow) -> Result<(), BookError> {
        let token = row
            .booking_token
            .as_deref()
            .ok_or(BookError::NotActionable)?;

        // One documented fallback: a transport-level failure is retried
        // once before giving up on this attempt.
        let response = match self.submit_once(token).await {
            Ok(response) => response,
            Err(first) => {
                warn!(error = %first, "order submission failed, retrying once");
                self.submit_once(token).await.map_err(BookError::Transport)?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(BookError::Rejected {
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let body: SubmitResponse = response.json().await.map_err(BookError::Transport)?;
        if !body.status {
            return Err(BookError::Rejected {
                message: join_messages(&body.messages, "submission refused"),
            });
        }

        Ok(())
    }
}

/// Map authentication status codes to `SessionExpired`.
fn check_session(status: StatusCode) -> Result<(), PageError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PageError::SessionExpired);
    }
    Ok(())
}

fn join_messages(messages: &[String], fallback: &str) -> String {
    if messages.is_empty() {
        fallback.to_string()
    } else {
        messages.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query() -> BoardQuery {
        BoardQuery {
            travel_date: NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
            from: Telecode::parse("BJP").unwrap(),
            to: Telecode::parse("SHH").unwrap(),
            fare: FareClass::Adult,
        }
    }

    fn client(server: &MockServer) -> QueryClient {
        let config = BoardConfig::new("JSESSIONID=abc123").with_base_url(server.uri());
        QueryClient::new(config, query()).unwrap()
    }

    fn record(secret: &str, code: &str, start: &str, can_buy: &str) -> String {
        let mut fields = vec![""; 12];
        fields[0] = secret;
        fields[3] = code;
        fields[8] = start;
        fields[11] = can_buy;
        fields.join("|")
    }

    #[tokio::test]
    async fn query_parses_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/otn/leftTicket/query"))
            .and(query_param("leftTicketDTO.train_date", "2026-08-15"))
            .and(query_param("leftTicketDTO.from_station", "BJP"))
            .and(query_param("leftTicketDTO.to_station", "SHH"))
            .and(query_param("purpose_codes", "ADULT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "messages": [],
                "data": { "result": [record("tok", "G101", "08:05", "Y")] }
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let rows = client.snapshot().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code.as_ref().unwrap().as_str(), "G101");
        assert!(rows[0].bookable);
    }

    #[tokio::test]
    async fn missing_data_is_session_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/otn/leftTicket/query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": true, "messages": [] })),
            )
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.snapshot().await.unwrap_err();
        assert!(matches!(err, PageError::SessionExpired));
    }

    #[tokio::test]
    async fn forbidden_is_session_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/otn/leftTicket/query"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.refresh().await.unwrap_err();
        assert!(matches!(err, PageError::SessionExpired));
    }

    #[tokio::test]
    async fn rejected_query_surfaces_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/otn/leftTicket/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": false,
                "messages": ["query too frequent"],
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.refresh().await.unwrap_err();
        match err {
            PageError::Api { message, .. } => assert_eq!(message, "query too frequent"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wait_for_results_succeeds_on_empty_board() {
        // An empty result table is still a present table.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/otn/leftTicket/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "messages": [],
                "data": { "result": [] }
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        client
            .wait_for_results(Duration::from_secs(2))
            .await
            .unwrap();
        assert!(client.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wait_for_results_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/otn/leftTicket/query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client
            .wait_for_results(Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::Timeout(_)));
    }

    #[tokio::test]
    async fn submit_posts_booking_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/otn/leftTicket/submitOrderRequest"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": true, "messages": [] })),
            )
            .mount(&server)
            .await;

        let client = client(&server);
        let row = TrainRow {
            code: None,
            departs: None,
            bookable: true,
            booking_token: Some("tok".into()),
        };
        client.submit(&row).await.unwrap();
    }

    #[tokio::test]
    async fn submit_without_token_is_not_actionable() {
        let server = MockServer::start().await;
        let client = client(&server);
        let row = TrainRow {
            code: None,
            departs: None,
            bookable: false,
            booking_token: None,
        };
        let err = client.submit(&row).await.unwrap_err();
        assert!(matches!(err, BookError::NotActionable));
    }

    #[tokio::test]
    async fn submit_refusal_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/otn/leftTicket/submitOrderRequest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": false,
                "messages": ["sold out"],
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let row = TrainRow {
            code: None,
            departs: None,
            bookable: true,
            booking_token: Some("tok".into()),
        };
        let err = client.submit(&row).await.unwrap_err();
        match err {
            BookError::Rejected { message } => assert_eq!(message, "sold out"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reload_reinitializes_and_requeries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/otn/leftTicket/init"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/otn/leftTicket/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "messages": [],
                "data": { "result": [record("tok", "D5", "07:00", "Y")] }
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        client.reload().await.unwrap();
        let rows = client.snapshot().await.unwrap();
        assert_eq!(rows[0].code.as_ref().unwrap().as_str(), "D5");
    }
}

//! DingTalk robot webhook transport.
//!
//! Messages go to the robot's `/robot/send` endpoint as markdown. When
//! a signing secret is configured, each request carries a millisecond
//! timestamp and an HMAC-SHA256 signature over `"{timestamp}\n{secret}"`,
//! base64-encoded, per the robot security scheme.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use super::{Notify, NotifyError, Report};

type HmacSha256 = Hmac<Sha256>;

/// Default base URL for the robot API.
const DEFAULT_BASE_URL: &str = "https://oapi.dingtalk.com";

/// Configuration for the DingTalk robot transport.
///
/// Explicitly passed in at run start; there is no process-wide
/// credential state.
#[derive(Debug, Clone)]
pub struct DingTalkConfig {
    /// Robot access token.
    pub token: String,
    /// Optional signing secret for the robot security scheme.
    pub secret: Option<String>,
    /// Base URL for the robot API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl DingTalkConfig {
    /// Create a config with the given access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }

    /// Enable request signing with the given secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Read `DINGTALK_TOKEN` and `DINGTALK_SECRET` from the
    /// environment. Returns `None` when no token is set.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("DINGTALK_TOKEN").ok()?;
        if token.is_empty() {
            return None;
        }
        let mut config = Self::new(token);
        if let Ok(secret) = std::env::var("DINGTALK_SECRET") {
            if !secret.is_empty() {
                config = config.with_secret(secret);
            }
        }
        Some(config)
    }
}

/// DingTalk robot implementation of [`Notify`].
pub struct DingTalkNotifier {
    http: reqwest::Client,
    config: DingTalkConfig,
}

impl DingTalkNotifier {
    /// Create a notifier with the given configuration.
    pub fn new(config: DingTalkConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }
}

/// Reply envelope from the robot endpoint.
#[derive(Debug, Deserialize)]
struct RobotReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

#[async_trait]
impl Notify for DingTalkNotifier {
    async fn send(&self, report: &Report) -> Result<(), NotifyError> {
        let url = format!("{}/robot/send", self.config.base_url);

        let mut request = self
            .http
            .post(&url)
            .query(&[("access_token", self.config.token.as_str())]);

        if let Some(secret) = &self.config.secret {
            let timestamp = Utc::now().timestamp_millis();
            let signature = sign(secret, timestamp)?;
            request = request.query(&[
                ("timestamp", timestamp.to_string().as_str()),
                ("sign", signature.as_str()),
            ]);
        }

        let payload = serde_json::json!({
            "msgtype": "markdown",
            "markdown": {
                "title": report.title,
                "text": report.body,
            }
        });

        let reply: RobotReply = request.json(&payload).send().await?.json().await?;

        if reply.errcode != 0 {
            return Err(NotifyError::Rejected {
                code: reply.errcode,
                message: reply.errmsg,
            });
        }

        debug!(title = %report.title, "robot notification delivered");
        Ok(())
    }
}

/// Base64-encoded HMAC-SHA256 of `"{timestamp}\n{secret}"`.
fn sign(secret: &str, timestamp_ms: i64) -> Result<String, NotifyError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| NotifyError::InvalidSecret)?;
    mac.update(format!("{timestamp_ms}\n{secret}").as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

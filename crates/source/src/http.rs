//! HTTP client for the remote log service.
//!
//! Speaks the JSON 1.1 protocol of the CloudWatch Logs API:
//! every call is a `POST /` with the operation in `X-Amz-Target`.
//! Requests are sent unsigned, so the endpoint is expected to be a
//! signing proxy or a local emulator.

use async_trait::async_trait;
use harvester_core::{Error, RawLogEvent, Result};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::client::{EventPage, FilterLogEventsRequest, LogGroupPage, LogSource};
use crate::config::SourceConfig;

const TARGET_PREFIX: &str = "Logs_20140328";
const CONTENT_TYPE_JSON_1_1: &str = "application/x-amz-json-1.1";
const DESCRIBE_LOG_GROUPS: &str = "DescribeLogGroups";
const FILTER_LOG_EVENTS: &str = "FilterLogEvents";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogGroupsBody<'a> {
    log_group_name_prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogGroupsResponse {
    #[serde(default)]
    log_groups: Vec<LogGroupEntry>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogGroupEntry {
    log_group_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterLogEventsBody<'a> {
    log_group_name: &'a str,
    start_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
    interleaved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterLogEventsResponse {
    #[serde(default)]
    events: Vec<RawLogEvent>,
    next_token: Option<String>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Remote log service reached over HTTP.
pub struct HttpLogSource {
    client: reqwest::Client,
    endpoint: Url,
    page_limit: Option<u32>,
}

impl HttpLogSource {
    /// Creates a new client from configuration.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            page_limit: config.page_limit,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<B, R>(&self, operation: &'static str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .header(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON_1_1))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::transport(format!("{} request failed: {}", operation, e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<R>()
                .await
                .map_err(|e| Error::transport(format!("{} response unreadable: {}", operation, e)));
        }

        let text = response.text().await.unwrap_or_default();
        Err(classify_failure(operation, status, &text))
    }
}

/// Maps a failed response to a typed error.
fn classify_failure(operation: &'static str, status: StatusCode, body: &str) -> Error {
    let parsed: ServiceErrorBody = serde_json::from_str(body).unwrap_or_default();
    // `__type` may be namespaced, e.g. "com.amazonaws.logs#ThrottlingException"
    let kind = parsed
        .kind
        .as_deref()
        .map(|k| k.rsplit('#').next().unwrap_or(k).to_string())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    let message = parsed.message.unwrap_or_else(|| body.trim().to_string());

    if kind == "ThrottlingException" || status == StatusCode::TOO_MANY_REQUESTS {
        warn!(operation = operation, status = status.as_u16(), "Remote service throttled request");
        return Error::rate_limited(operation, message);
    }

    Error::remote(operation, kind, message)
}

/// The service sometimes returns an empty string instead of omitting the token.
fn non_empty(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn describe_log_groups(
        &self,
        prefix: &str,
        next_token: Option<String>,
    ) -> Result<LogGroupPage> {
        let body = DescribeLogGroupsBody {
            log_group_name_prefix: prefix,
            next_token: next_token.as_deref(),
        };
        let response: DescribeLogGroupsResponse = self.call(DESCRIBE_LOG_GROUPS, &body).await?;

        debug!(
            prefix = prefix,
            groups = response.log_groups.len(),
            has_next = response.next_token.is_some(),
            "Described log groups"
        );

        Ok(LogGroupPage {
            log_group_names: response
                .log_groups
                .into_iter()
                .map(|g| g.log_group_name)
                .collect(),
            next_token: non_empty(response.next_token),
        })
    }

    async fn filter_log_events(&self, request: FilterLogEventsRequest) -> Result<EventPage> {
        let body = FilterLogEventsBody {
            log_group_name: &request.log_group_name,
            start_time: request.start_time,
            next_token: request.next_token.as_deref(),
            interleaved: request.interleaved,
            limit: self.page_limit,
        };
        let response: FilterLogEventsResponse = self.call(FILTER_LOG_EVENTS, &body).await?;

        Ok(EventPage {
            events: response.events,
            next_token: non_empty(response.next_token),
        })
    }
}

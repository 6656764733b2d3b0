use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use weft_common::{ActivityItem, Session, WeftError};

/// One event-stream query shape: optionally scoped by object or target
/// reference, bounded below by `since`, capped at `limit` items.
#[derive(Debug, Clone)]
pub struct ActivityQuery {
    pub object: Option<String>,
    pub target: Option<String>,
    pub since: DateTime<Utc>,
    pub limit: usize,
}

impl ActivityQuery {
    pub fn global(since: DateTime<Utc>, limit: usize) -> Self {
        Self {
            object: None,
            target: None,
            since,
            limit,
        }
    }

    pub fn for_object(object: &str, since: DateTime<Utc>, limit: usize) -> Self {
        Self {
            object: Some(object.to_string()),
            target: None,
            since,
            limit,
        }
    }

    pub fn for_target(target: &str, since: DateTime<Utc>, limit: usize) -> Self {
        Self {
            object: None,
            target: Some(target.to_string()),
            since,
            limit,
        }
    }
}

/// Upstream event source. Implemented by `ActivityStreamClient` and by
/// in-memory mocks in tests.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn fetch(
        &self,
        session: &Session,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivityItem>, WeftError>;
}

/// HTTP client for the event stream provider.
pub struct ActivityStreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl ActivityStreamClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ActivitySource for ActivityStreamClient {
    async fn fetch(
        &self,
        session: &Session,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivityItem>, WeftError> {
        let since = query.since.to_rfc3339();
        let limit = query.limit.to_string();
        let mut params: Vec<(&str, &str)> =
            vec![("since", since.as_str()), ("limit", limit.as_str())];
        if let Some(object) = query.object.as_deref() {
            params.push(("object", object));
        }
        if let Some(target) = query.target.as_deref() {
            params.push(("target", target));
        }

        let mut req = self
            .client
            .get(format!("{}/activities", self.base_url))
            .query(&params);
        if let Some(bearer) = session.bearer() {
            req = req.header("Authorization", bearer);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| WeftError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WeftError::Transient(format!(
                "Event stream returned status {status}"
            )));
        }

        resp.json::<Vec<ActivityItem>>()
            .await
            .map_err(|e| WeftError::Transient(e.to_string()))
    }
}

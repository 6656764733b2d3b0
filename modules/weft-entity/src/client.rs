use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use weft_common::{PropertyStatement, Session, StatementValue, WeftError};

/// A candidate entity from free-text search, used when linking a node to
/// the external knowledge base.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityHit {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A candidate property from free-text search, used for edge-label search.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyHit {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// External knowledge-base lookups. Implemented by `KnowledgeBaseClient`
/// and by in-memory mocks in tests.
#[async_trait]
pub trait EntityProvider: Send + Sync {
    /// The full candidate statement list for an entity.
    async fn entity_statements(
        &self,
        session: &Session,
        entity_id: &str,
    ) -> Result<Vec<PropertyStatement>, WeftError>;

    async fn search_entities(
        &self,
        session: &Session,
        query: &str,
        limit: usize,
    ) -> Result<Vec<EntityHit>, WeftError>;

    async fn search_properties(
        &self,
        session: &Session,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PropertyHit>, WeftError>;
}

/// Statement as the provider serves it. `value` deserializes as either a
/// bare string or an `{id, text}` entity reference.
#[derive(Debug, Deserialize)]
struct WireStatement {
    id: String,
    #[serde(default)]
    property: Option<String>,
    #[serde(default)]
    label: String,
    value: StatementValue,
}

/// HTTP client for the entity/property provider.
pub struct KnowledgeBaseClient {
    client: reqwest::Client,
    base_url: String,
}

impl KnowledgeBaseClient {
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

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WeftError> {
        let mut req = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query);
        if let Some(bearer) = session.bearer() {
            req = req.header("Authorization", bearer);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| WeftError::Transient(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(WeftError::NotFound(format!("{path} not found")));
        }
        if !status.is_success() {
            return Err(WeftError::Transient(format!(
                "Entity provider returned status {status}"
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| WeftError::Transient(e.to_string()))
    }
}

#[async_trait]
impl EntityProvider for KnowledgeBaseClient {
    async fn entity_statements(
        &self,
        session: &Session,
        entity_id: &str,
    ) -> Result<Vec<PropertyStatement>, WeftError> {
        let wire: Vec<WireStatement> = self
            .get_json(session, &format!("/entities/{entity_id}/statements"), &[])
            .await?;

        Ok(wire
            .into_iter()
            .filter(|w| !w.id.is_empty())
            .map(|w| PropertyStatement {
                statement_id: w.id,
                property_id: w.property,
                label: w.label,
                value: w.value,
            })
            .collect())
    }

    async fn search_entities(
        &self,
        session: &Session,
        query: &str,
        limit: usize,
    ) -> Result<Vec<EntityHit>, WeftError> {
        let limit = limit.to_string();
        self.get_json(
            session,
            "/search/entities",
            &[("q", query), ("limit", limit.as_str())],
        )
        .await
    }

    async fn search_properties(
        &self,
        session: &Session,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PropertyHit>, WeftError> {
        let limit = limit.to_string();
        self.get_json(
            session,
            "/search/properties",
            &[("q", query), ("limit", limit.as_str())],
        )
        .await
    }
}

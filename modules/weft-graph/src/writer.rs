use chrono::Utc;
use neo4rs::query;
use tracing::info;
use uuid::Uuid;
use weft_common::{Edge, GraphNode, LocationRecord, PropertyStatement, Session, WeftError};

use crate::reader::db_err;
use crate::GraphClient;

/// Write-side wrapper for the graph store. The authoritative end of the
/// Edge Integrity Guard: every edge write re-checks ordered-pair uniqueness
/// inside the query, so a stale client snapshot cannot slip a duplicate in.
pub struct GraphWriter {
    client: GraphClient,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub async fn create_node(&self, node: &GraphNode, session: &Session) -> Result<(), WeftError> {
        let q = query(
            "CREATE (n:Node {
                id: $id,
                space_id: $space_id,
                label: $label,
                entity_id: CASE WHEN $entity_id = '' THEN null ELSE $entity_id END,
                created_by: $created_by,
                created_at: datetime($created_at)
            })",
        )
        .param("id", node.id.to_string())
        .param("space_id", node.space_id.to_string())
        .param("label", node.label.as_str())
        .param("entity_id", node.entity_id.clone().unwrap_or_default())
        .param("created_by", session.actor.as_str())
        .param("created_at", Utc::now().to_rfc3339());

        self.client.graph.run(q).await.map_err(db_err)?;

        if !node.location.is_empty() {
            self.update_node_location(node.id, &node.location).await?;
        }
        Ok(())
    }

    /// Overwrite a node's location record in full. Callers only invoke this
    /// with user edits or successful resolver output, never with the partial
    /// leftovers of a failed resolution.
    pub async fn update_node_location(
        &self,
        node_id: Uuid,
        location: &LocationRecord,
    ) -> Result<(), WeftError> {
        let (lat, lng) = match location.coords {
            Some(c) => (c.lat, c.lon),
            None => (0.0, 0.0),
        };
        let q = query(
            "MATCH (n:Node {id: $id})
             SET n.country = CASE WHEN $country = '' THEN null ELSE $country END,
                 n.city = CASE WHEN $city = '' THEN null ELSE $city END,
                 n.district = CASE WHEN $district = '' THEN null ELSE $district END,
                 n.street = CASE WHEN $street = '' THEN null ELSE $street END,
                 n.location_name = CASE WHEN $location_name = '' THEN null ELSE $location_name END,
                 n.lat = CASE WHEN $has_coords THEN $lat ELSE null END,
                 n.lng = CASE WHEN $has_coords THEN $lng ELSE null END",
        )
        .param("id", node_id.to_string())
        .param("country", location.country.clone().unwrap_or_default())
        .param("city", location.city.clone().unwrap_or_default())
        .param("district", location.district.clone().unwrap_or_default())
        .param("street", location.street.clone().unwrap_or_default())
        .param(
            "location_name",
            location.location_name.clone().unwrap_or_default(),
        )
        .param("has_coords", location.coords.is_some())
        .param("lat", lat)
        .param("lng", lng);

        self.client.graph.run(q).await.map_err(db_err)
    }

    /// Create a directed edge. Fails with `Conflict` if an edge with the
    /// same ordered (source, target) pair already exists in the space.
    pub async fn create_edge(&self, edge: &Edge, session: &Session) -> Result<Uuid, WeftError> {
        let q = query(
            "MATCH (s:Node {id: $source}), (t:Node {id: $target})
             WHERE NOT (s)-[:LINKS {space_id: $space_id}]->(t)
             CREATE (s)-[r:LINKS {
                 id: $id,
                 space_id: $space_id,
                 label: $label,
                 property_ref: CASE WHEN $property_ref = '' THEN null ELSE $property_ref END,
                 created_by: $created_by,
                 created_at: datetime($created_at)
             }]->(t)
             RETURN r.id AS id",
        )
        .param("id", edge.id.to_string())
        .param("space_id", edge.space_id.to_string())
        .param("source", edge.source.to_string())
        .param("target", edge.target.to_string())
        .param("label", edge.label.as_str())
        .param("property_ref", edge.property_ref.clone().unwrap_or_default())
        .param("created_by", session.actor.as_str())
        .param("created_at", Utc::now().to_rfc3339());

        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        if stream.next().await.map_err(db_err)?.is_some() {
            info!(edge = %edge.id, source = %edge.source, target = %edge.target, "Edge created");
            return Ok(edge.id);
        }

        // No row: either the pair already exists or an endpoint is missing.
        if self.ordered_pair_exists(edge, None).await? {
            Err(WeftError::Conflict(format!(
                "Edge {} -> {} already exists in space",
                edge.source, edge.target
            )))
        } else {
            Err(WeftError::NotFound(
                "Source or target node does not exist".to_string(),
            ))
        }
    }

    /// Update an edge's label, property reference, or direction. Direction
    /// changes re-run the uniqueness check, excluding the edge itself.
    pub async fn update_edge(&self, edge: &Edge) -> Result<(), WeftError> {
        if self.ordered_pair_exists(edge, Some(edge.id)).await? {
            return Err(WeftError::Conflict(format!(
                "Edge {} -> {} already exists in space",
                edge.source, edge.target
            )));
        }

        // Recreate under the same id so a direction swap and a property edit
        // go through one code path.
        let q = query(
            "MATCH (s:Node {id: $source}), (t:Node {id: $target})
             MATCH ()-[old:LINKS {id: $id}]->()
             DELETE old
             CREATE (s)-[r:LINKS {
                 id: $id,
                 space_id: $space_id,
                 label: $label,
                 property_ref: CASE WHEN $property_ref = '' THEN null ELSE $property_ref END,
                 updated_at: datetime($updated_at)
             }]->(t)
             RETURN r.id AS id",
        )
        .param("id", edge.id.to_string())
        .param("space_id", edge.space_id.to_string())
        .param("source", edge.source.to_string())
        .param("target", edge.target.to_string())
        .param("label", edge.label.as_str())
        .param("property_ref", edge.property_ref.clone().unwrap_or_default())
        .param("updated_at", Utc::now().to_rfc3339());

        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        if stream.next().await.map_err(db_err)?.is_none() {
            return Err(WeftError::NotFound(format!("Edge {} not found", edge.id)));
        }
        Ok(())
    }

    pub async fn delete_edge(&self, edge_id: Uuid) -> Result<(), WeftError> {
        let q = query("MATCH ()-[r:LINKS {id: $id}]->() DELETE r")
            .param("id", edge_id.to_string());
        self.client.graph.run(q).await.map_err(db_err)
    }

    /// Replace the statements attached to a node with a new list. This is
    /// the commit target of the Property Reconciliation Engine: the clear
    /// and every create run in one transaction, so a failure partway leaves
    /// the previous attachment set intact rather than half-applied.
    pub async fn replace_node_statements(
        &self,
        node_id: Uuid,
        statements: &[PropertyStatement],
    ) -> Result<(), WeftError> {
        let mut txn = self.client.graph.start_txn().await.map_err(db_err)?;

        let clear = query(
            "MATCH (n:Node {id: $id})-[:HAS_STATEMENT]->(st:Statement)
             DETACH DELETE st",
        )
        .param("id", node_id.to_string());
        txn.run(clear).await.map_err(db_err)?;

        for (position, statement) in statements.iter().enumerate() {
            let (value_text, value_entity_id) = match &statement.value {
                weft_common::StatementValue::Scalar(s) => (s.clone(), String::new()),
                weft_common::StatementValue::Entity { id, text } => (text.clone(), id.clone()),
            };
            let q = query(
                "MATCH (n:Node {id: $id})
                 CREATE (n)-[:HAS_STATEMENT]->(:Statement {
                     statement_id: $statement_id,
                     property_id: CASE WHEN $property_id = '' THEN null ELSE $property_id END,
                     label: $label,
                     value_text: $value_text,
                     value_entity_id: CASE WHEN $value_entity_id = '' THEN null ELSE $value_entity_id END,
                     position: $position
                 })",
            )
            .param("id", node_id.to_string())
            .param("statement_id", statement.statement_id.as_str())
            .param("property_id", statement.property_id.clone().unwrap_or_default())
            .param("label", statement.label.as_str())
            .param("value_text", value_text)
            .param("value_entity_id", value_entity_id)
            .param("position", position as i64);
            txn.run(q).await.map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;

        info!(node = %node_id, count = statements.len(), "Node statements replaced");
        Ok(())
    }

    async fn ordered_pair_exists(
        &self,
        edge: &Edge,
        excluding: Option<Uuid>,
    ) -> Result<bool, WeftError> {
        let q = query(
            "MATCH (s:Node {id: $source})-[r:LINKS {space_id: $space_id}]->(t:Node {id: $target})
             WHERE $excluding = '' OR r.id <> $excluding
             RETURN count(r) AS c",
        )
        .param("source", edge.source.to_string())
        .param("target", edge.target.to_string())
        .param("space_id", edge.space_id.to_string())
        .param(
            "excluding",
            excluding.map(|id| id.to_string()).unwrap_or_default(),
        );

        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        if let Some(row) = stream.next().await.map_err(db_err)? {
            let count: i64 = row.get("c").unwrap_or(0);
            return Ok(count > 0);
        }
        Ok(false)
    }
}

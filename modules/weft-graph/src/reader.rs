use neo4rs::{query, Row};
use uuid::Uuid;
use weft_common::{
    CoordinatePair, Edge, GraphNode, LocationRecord, PropertyStatement, StatementValue, WeftError,
};

use crate::edges::EdgeIndex;
use crate::GraphClient;

/// Read-side wrapper for the graph store.
pub struct GraphReader {
    client: GraphClient,
}

impl GraphReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub async fn get_node(&self, node_id: Uuid) -> Result<Option<GraphNode>, WeftError> {
        let q = query(
            "MATCH (n:Node {id: $id})
             RETURN n.id AS id, n.space_id AS space_id, n.label AS label,
                    n.entity_id AS entity_id, n.country AS country, n.city AS city,
                    n.district AS district, n.street AS street,
                    n.location_name AS location_name, n.lat AS lat, n.lng AS lng",
        )
        .param("id", node_id.to_string());

        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        match stream.next().await.map_err(db_err)? {
            Some(row) => Ok(row_to_node(&row)),
            None => Ok(None),
        }
    }

    pub async fn list_nodes(&self, space_id: Uuid) -> Result<Vec<GraphNode>, WeftError> {
        let q = query(
            "MATCH (n:Node {space_id: $space_id})
             RETURN n.id AS id, n.space_id AS space_id, n.label AS label,
                    n.entity_id AS entity_id, n.country AS country, n.city AS city,
                    n.district AS district, n.street AS street,
                    n.location_name AS location_name, n.lat AS lat, n.lng AS lng",
        )
        .param("space_id", space_id.to_string());

        let mut nodes = Vec::new();
        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        while let Some(row) = stream.next().await.map_err(db_err)? {
            if let Some(node) = row_to_node(&row) {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// All edges in a space. This is the snapshot the Edge Integrity Guard
    /// evaluates against.
    pub async fn list_edges(&self, space_id: Uuid) -> Result<Vec<Edge>, WeftError> {
        let q = query(
            "MATCH (s:Node)-[r:LINKS {space_id: $space_id}]->(t:Node)
             RETURN r.id AS id, r.space_id AS space_id, s.id AS source, t.id AS target,
                    r.label AS label, r.property_ref AS property_ref",
        )
        .param("space_id", space_id.to_string());

        let mut edges = Vec::new();
        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        while let Some(row) = stream.next().await.map_err(db_err)? {
            if let Some(edge) = row_to_edge(&row) {
                edges.push(edge);
            }
        }
        Ok(edges)
    }

    /// Edge snapshot indexed by node id.
    pub async fn edge_index(&self, space_id: Uuid) -> Result<EdgeIndex, WeftError> {
        Ok(EdgeIndex::from_edges(self.list_edges(space_id).await?))
    }

    /// The property statements currently attached to a node, in stored order.
    pub async fn node_statements(
        &self,
        node_id: Uuid,
    ) -> Result<Vec<PropertyStatement>, WeftError> {
        let q = query(
            "MATCH (n:Node {id: $id})-[:HAS_STATEMENT]->(st:Statement)
             RETURN st.statement_id AS statement_id, st.property_id AS property_id,
                    st.label AS label, st.value_text AS value_text,
                    st.value_entity_id AS value_entity_id
             ORDER BY st.position",
        )
        .param("id", node_id.to_string());

        let mut statements = Vec::new();
        let mut stream = self.client.graph.execute(q).await.map_err(db_err)?;
        while let Some(row) = stream.next().await.map_err(db_err)? {
            let statement_id: String = row.get("statement_id").unwrap_or_default();
            if statement_id.is_empty() {
                continue;
            }
            let value_text: String = row.get("value_text").unwrap_or_default();
            let value_entity: String = row.get("value_entity_id").unwrap_or_default();
            let value = if value_entity.is_empty() {
                StatementValue::Scalar(value_text)
            } else {
                StatementValue::Entity {
                    id: value_entity,
                    text: value_text,
                }
            };
            statements.push(PropertyStatement {
                statement_id,
                property_id: opt_string(&row, "property_id"),
                label: row.get("label").unwrap_or_default(),
                value,
            });
        }
        Ok(statements)
    }
}

pub(crate) fn db_err(e: neo4rs::Error) -> WeftError {
    WeftError::Database(e.to_string())
}

fn opt_string(row: &Row, key: &str) -> Option<String> {
    row.get::<String>(key).ok().filter(|s| !s.is_empty())
}

fn row_to_node(row: &Row) -> Option<GraphNode> {
    let id_str: String = row.get("id").unwrap_or_default();
    let space_str: String = row.get("space_id").unwrap_or_default();
    let id = Uuid::parse_str(&id_str).ok()?;
    let space_id = Uuid::parse_str(&space_str).ok()?;

    let coords = match (row.get::<f64>("lat").ok(), row.get::<f64>("lng").ok()) {
        (Some(lat), Some(lng)) => CoordinatePair::new(lat, lng),
        _ => None,
    };

    Some(GraphNode {
        id,
        space_id,
        label: row.get("label").unwrap_or_default(),
        entity_id: opt_string(row, "entity_id"),
        location: LocationRecord {
            country: opt_string(row, "country"),
            city: opt_string(row, "city"),
            district: opt_string(row, "district"),
            street: opt_string(row, "street"),
            location_name: opt_string(row, "location_name"),
            coords,
        },
    })
}

fn row_to_edge(row: &Row) -> Option<Edge> {
    let id: String = row.get("id").unwrap_or_default();
    let space_id: String = row.get("space_id").unwrap_or_default();
    let source: String = row.get("source").unwrap_or_default();
    let target: String = row.get("target").unwrap_or_default();

    Some(Edge {
        id: Uuid::parse_str(&id).ok()?,
        space_id: Uuid::parse_str(&space_id).ok()?,
        source: Uuid::parse_str(&source).ok()?,
        target: Uuid::parse_str(&target).ok()?,
        label: row.get("label").unwrap_or_default(),
        property_ref: opt_string(row, "property_ref"),
    })
}

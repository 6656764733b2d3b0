//! Integration tests against a real Neo4j instance. Run with
//! `cargo test -p weft-graph --features test-utils`.

#![cfg(feature = "test-utils")]

use uuid::Uuid;
use weft_common::{
    CoordinatePair, Edge, GraphNode, LocationRecord, PropertyStatement, Session, StatementValue,
    WeftError,
};
use weft_graph::testutil::neo4j_container;
use weft_graph::{GraphReader, GraphWriter};

fn node(space_id: Uuid, label: &str) -> GraphNode {
    GraphNode {
        id: Uuid::new_v4(),
        space_id,
        label: label.to_string(),
        entity_id: None,
        location: LocationRecord::default(),
    }
}

fn edge(space_id: Uuid, source: Uuid, target: Uuid) -> Edge {
    Edge {
        id: Uuid::new_v4(),
        space_id,
        source,
        target,
        label: "related to".to_string(),
        property_ref: None,
    }
}

fn stmt(id: &str, property: Option<&str>, label: &str, value: StatementValue) -> PropertyStatement {
    PropertyStatement {
        statement_id: id.to_string(),
        property_id: property.map(str::to_string),
        label: label.to_string(),
        value,
    }
}

#[tokio::test]
async fn duplicate_ordered_pair_is_rejected_at_write_time() {
    let (_container, client) = neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let reader = GraphReader::new(client);
    let session = Session::new("tester");

    let space_id = Uuid::new_v4();
    let a = node(space_id, "A");
    let b = node(space_id, "B");
    writer.create_node(&a, &session).await.unwrap();
    writer.create_node(&b, &session).await.unwrap();

    writer
        .create_edge(&edge(space_id, a.id, b.id), &session)
        .await
        .unwrap();

    // Same ordered pair again: the store itself rejects it, even though the
    // client-side guard never ran.
    let err = writer
        .create_edge(&edge(space_id, a.id, b.id), &session)
        .await
        .unwrap_err();
    assert!(matches!(err, WeftError::Conflict(_)));

    // The opposite direction is a distinct edge and goes through.
    writer
        .create_edge(&edge(space_id, b.id, a.id), &session)
        .await
        .unwrap();

    let edges = reader.list_edges(space_id).await.unwrap();
    assert_eq!(edges.len(), 2);
}

#[tokio::test]
async fn direction_swap_into_an_occupied_pair_conflicts() {
    let (_container, client) = neo4j_container().await;
    let writer = GraphWriter::new(client);
    let session = Session::new("tester");

    let space_id = Uuid::new_v4();
    let a = node(space_id, "A");
    let b = node(space_id, "B");
    writer.create_node(&a, &session).await.unwrap();
    writer.create_node(&b, &session).await.unwrap();

    let forward = edge(space_id, a.id, b.id);
    writer.create_edge(&forward, &session).await.unwrap();
    let backward = edge(space_id, b.id, a.id);
    writer.create_edge(&backward, &session).await.unwrap();

    // Swapping the backward edge to A -> B would collide with the forward
    // edge; its own id is excluded but the other edge still blocks it.
    let mut swapped = backward.clone();
    swapped.source = a.id;
    swapped.target = b.id;
    let err = writer.update_edge(&swapped).await.unwrap_err();
    assert!(matches!(err, WeftError::Conflict(_)));

    // Relabeling in place (same direction) is not a conflict with itself.
    let mut relabeled = backward;
    relabeled.label = "supports".to_string();
    writer.update_edge(&relabeled).await.unwrap();
}

#[tokio::test]
async fn statement_replace_is_a_full_swap_read_back_from_the_store() {
    let (_container, client) = neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let reader = GraphReader::new(client);
    let session = Session::new("tester");

    let n = node(Uuid::new_v4(), "entity-linked");
    writer.create_node(&n, &session).await.unwrap();

    let first = vec![
        stmt(
            "s1",
            Some("P17"),
            "country",
            StatementValue::Scalar("France".to_string()),
        ),
        stmt(
            "s2",
            Some("P131"),
            "located in",
            StatementValue::Entity {
                id: "Q90".to_string(),
                text: "Paris".to_string(),
            },
        ),
    ];
    writer.replace_node_statements(n.id, &first).await.unwrap();

    let attached = reader.node_statements(n.id).await.unwrap();
    assert_eq!(attached, first);

    // A second commit replaces the whole set: nothing from the first
    // selection survives except what was resubmitted.
    let second = vec![first[1].clone()];
    writer.replace_node_statements(n.id, &second).await.unwrap();

    let attached = reader.node_statements(n.id).await.unwrap();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].statement_id, "s2");
    assert!(matches!(
        attached[0].value,
        StatementValue::Entity { .. }
    ));

    // Clearing down to an empty selection leaves no statements behind.
    writer.replace_node_statements(n.id, &[]).await.unwrap();
    assert!(reader.node_statements(n.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn location_record_round_trips_through_the_node() {
    let (_container, client) = neo4j_container().await;
    let writer = GraphWriter::new(client.clone());
    let reader = GraphReader::new(client);
    let session = Session::new("tester");

    let mut n = node(Uuid::new_v4(), "placed");
    n.location = LocationRecord {
        country: Some("France".to_string()),
        city: Some("Paris".to_string()),
        district: None,
        street: None,
        location_name: Some("Paris, France".to_string()),
        coords: CoordinatePair::new(48.8566, 2.3522),
    };
    writer.create_node(&n, &session).await.unwrap();

    let loaded = reader.get_node(n.id).await.unwrap().unwrap();
    assert_eq!(loaded.location, n.location);

    // A failed resolution never writes; only full records do. Overwriting
    // with an explicit edit clears what the edit leaves out.
    let edited = LocationRecord {
        city: Some("Lyon".to_string()),
        ..Default::default()
    };
    writer.update_node_location(n.id, &edited).await.unwrap();
    let loaded = reader.get_node(n.id).await.unwrap().unwrap();
    assert_eq!(loaded.location, edited);
}

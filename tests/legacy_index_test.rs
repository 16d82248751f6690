//! Integration tests for named legacy indexes

use embergraph::{GraphDatabase, GraphError, IndexDefinition};

#[test]
fn test_entries_are_not_synchronised_with_properties() {
    let db = GraphDatabase::in_memory();
    let mut tx = db.begin_tx().unwrap();
    let neo = tx.create_node(["Character"]).unwrap();
    tx.set_node_property(neo, "name", "Thomas Anderson").unwrap();
    tx.node_index("characters").add(neo, "name", "Thomas Anderson").unwrap();
    tx.commit().unwrap();

    let mut tx = db.begin_tx().unwrap();
    tx.set_node_property(neo, "name", "Neo").unwrap();
    tx.commit().unwrap();

    let mut tx = db.begin_tx().unwrap();
    let index = tx.node_index("characters");
    assert_eq!(index.get("name", "Thomas Anderson").unwrap().single().unwrap(), Some(neo));
    assert!(index.get("name", "Neo").unwrap().is_empty());
    drop(tx);

    let mut tx = db.begin_tx().unwrap();
    tx.node_index("characters").remove(neo, "name", "Thomas Anderson").unwrap();
    tx.node_index("characters").add(neo, "name", "Neo").unwrap();
    tx.commit().unwrap();

    let mut tx = db.begin_tx().unwrap();
    let index = tx.node_index("characters");
    assert!(index.get("name", "Thomas Anderson").unwrap().is_empty());
    assert_eq!(index.get("name", "Neo").unwrap().into_vec(), vec![neo]);
}

#[test]
fn test_entries_outlive_deleted_entities() {
    let db = GraphDatabase::in_memory();
    let mut tx = db.begin_tx().unwrap();
    let ghost = tx.create_node(["Character"]).unwrap();
    tx.node_index("characters").add(ghost, "name", "Agent Smith").unwrap();
    tx.commit().unwrap();

    let mut tx = db.begin_tx().unwrap();
    tx.delete_node(ghost).unwrap();
    tx.commit().unwrap();

    let mut tx = db.begin_tx().unwrap();
    assert!(!tx.node_exists(ghost));
    let hits = tx.node_index("characters").get("name", "Agent Smith").unwrap();
    assert_eq!(hits.into_vec(), vec![ghost]);
}

#[test]
fn test_query_patterns() {
    let db = GraphDatabase::in_memory();
    let mut tx = db.begin_tx().unwrap();
    let names = ["Thomas", "Trinity", "Morpheus", "Tank"];
    let ids: Vec<_> = names
        .iter()
        .map(|name| {
            let id = tx.create_node(["Character"]).unwrap();
            tx.node_index("characters").add(id, "name", *name).unwrap();
            id
        })
        .collect();
    let oracle = tx.create_node(["Character"]).unwrap();
    tx.node_index("characters").add(oracle, "age", 72i64).unwrap();
    tx.commit().unwrap();

    let mut tx = db.begin_tx().unwrap();
    let index = tx.node_index("characters");
    assert_eq!(index.query("name", "*").unwrap().len(), 4);
    // Ordered by value: Tank, Thomas, Trinity.
    assert_eq!(index.query("name", "T*").unwrap().into_vec(), vec![ids[3], ids[0], ids[1]]);
    assert_eq!(index.query("name", "T?nk").unwrap().into_vec(), vec![ids[3]]);
    assert_eq!(index.query("name", "Morpheus").unwrap().into_vec(), vec![ids[2]]);
    assert!(index.query("name", "Z*").unwrap().is_empty());
    assert_eq!(index.query("age", "*").unwrap().into_vec(), vec![oracle]);
    assert_eq!(index.query("age", "72").unwrap().into_vec(), vec![oracle]);
}

#[test]
fn test_relationship_index() {
    let db = GraphDatabase::in_memory();
    let mut tx = db.begin_tx().unwrap();
    let a = tx.create_node(["Person"]).unwrap();
    let b = tx.create_node(["Person"]).unwrap();
    let rel = tx.create_relationship(a, b, "KNOWS").unwrap();
    tx.relationship_index("friendships").add(rel, "since", 1999i64).unwrap();
    tx.commit().unwrap();

    let mut tx = db.begin_tx().unwrap();
    let hits = tx.relationship_index("friendships").get("since", 1999i64).unwrap();
    assert_eq!(hits.single().unwrap(), Some(rel));

    let missing = embergraph::RelationshipId::new(99);
    assert!(matches!(
        tx.relationship_index("friendships").add(missing, "since", 2000i64),
        Err(GraphError::RelationshipNotFound(_))
    ));
}

#[test]
fn test_registry_is_not_transactional() {
    let db = GraphDatabase::in_memory();
    {
        let mut tx = db.begin_tx().unwrap();
        tx.node_index("created-in-rolled-back-tx");
        tx.rollback().unwrap();
    }
    let registry = db.legacy_indexes();
    assert!(registry.exists_for_nodes("created-in-rolled-back-tx"));
    assert!(!registry.exists_for_relationships("created-in-rolled-back-tx"));
    assert!(db.stats().legacy_indexes.contains(&IndexDefinition::Legacy {
        name: "created-in-rolled-back-tx".to_string(),
        entity: embergraph::EntityKind::Node,
    }));

    assert!(registry.delete_index::<embergraph::NodeId>("created-in-rolled-back-tx"));
    assert!(registry.node_index_names().is_empty());
}

#[test]
fn test_rolled_back_entries_are_discarded() {
    let db = GraphDatabase::in_memory();
    let mut tx = db.begin_tx().unwrap();
    let a = tx.create_node(["Person"]).unwrap();
    tx.commit().unwrap();

    let mut tx = db.begin_tx().unwrap();
    tx.node_index("people").add(a, "name", "Alice").unwrap();
    tx.rollback().unwrap();

    let mut tx = db.begin_tx().unwrap();
    assert!(tx.node_index("people").get("name", "Alice").unwrap().is_empty());
}

#[test]
fn test_staged_entry_dropped_when_index_deleted_before_commit() {
    let db = GraphDatabase::in_memory();
    let mut tx = db.begin_tx().unwrap();
    let a = tx.create_node(["Person"]).unwrap();
    tx.node_index("people").add(a, "name", "Alice").unwrap();

    db.legacy_indexes().delete_index::<embergraph::NodeId>("people");
    tx.commit().unwrap();

    assert!(!db.legacy_indexes().exists_for_nodes("people"));
    let mut tx = db.begin_tx().unwrap();
    assert!(tx.node_index("people").get("name", "Alice").unwrap().is_empty());
}

//! Integration tests for schema indexes and unique constraints

use embergraph::index::{IndexDefinition, IndexState};
use embergraph::{ConstraintViolation, ErrorKind, GraphDatabase, GraphError, NodeId};

fn create_users(db: &GraphDatabase, count: usize) -> Vec<NodeId> {
    let mut tx = db.begin_tx().unwrap();
    let ids = (0..count)
        .map(|i| {
            let id = tx.create_node(["User"]).unwrap();
            tx.set_node_property(id, "username", format!("user{}", i)).unwrap();
            id
        })
        .collect();
    tx.commit().unwrap();
    ids
}

#[test]
fn test_index_create_lookup_drop() {
    let db = GraphDatabase::in_memory();
    let users = create_users(&db, 100);

    db.schema().create_index("User", "username").unwrap();
    assert!(db.schema().has_index("User", "username"));
    assert_eq!(db.schema().index_state("User", "username").unwrap(), IndexState::Online);

    let tx = db.begin_tx().unwrap();
    for (i, id) in users.iter().enumerate() {
        let hits = tx.find_nodes("User", "username", format!("user{}", i)).unwrap();
        assert_eq!(hits.single().unwrap(), Some(*id));
    }
    assert!(tx.find_nodes("User", "username", "user100").unwrap().is_empty());
    drop(tx);

    db.schema().drop_index("User", "username").unwrap();
    let tx = db.begin_tx().unwrap();
    let err = tx.find_nodes("User", "username", "user45").unwrap_err();
    assert!(matches!(err, GraphError::IndexMissing { .. }));
    assert_eq!(err.kind(), ErrorKind::IndexMissing);

    assert!(matches!(
        db.schema().drop_index("User", "username"),
        Err(GraphError::IndexNotFound { .. })
    ));
}

#[test]
fn test_duplicate_index_is_rejected() {
    let db = GraphDatabase::in_memory();
    db.schema().create_index("User", "username").unwrap();
    assert!(matches!(
        db.schema().create_index("User", "username"),
        Err(GraphError::Constraint(ConstraintViolation::IndexAlreadyExists { .. }))
    ));
}

#[test]
fn test_index_follows_mutations() {
    let db = GraphDatabase::in_memory();
    db.schema().create_index("User", "username").unwrap();
    let users = create_users(&db, 3);
    let (a, b, c) = (users[0], users[1], users[2]);

    // set
    let mut tx = db.begin_tx().unwrap();
    tx.set_node_property(a, "username", "alice").unwrap();
    tx.commit().unwrap();
    let tx = db.begin_tx().unwrap();
    assert!(tx.find_nodes("User", "username", "user0").unwrap().is_empty());
    assert_eq!(tx.find_nodes("User", "username", "alice").unwrap().into_vec(), vec![a]);
    drop(tx);

    // remove property
    let mut tx = db.begin_tx().unwrap();
    tx.remove_node_property(a, "username").unwrap();
    tx.commit().unwrap();
    let tx = db.begin_tx().unwrap();
    assert!(tx.find_nodes("User", "username", "alice").unwrap().is_empty());
    drop(tx);

    // remove label
    let mut tx = db.begin_tx().unwrap();
    tx.remove_label(b, "User").unwrap();
    tx.commit().unwrap();
    let tx = db.begin_tx().unwrap();
    assert!(tx.find_nodes("User", "username", "user1").unwrap().is_empty());
    drop(tx);

    // add label back
    let mut tx = db.begin_tx().unwrap();
    tx.add_label(b, "User").unwrap();
    tx.commit().unwrap();
    let tx = db.begin_tx().unwrap();
    assert_eq!(tx.find_nodes("User", "username", "user1").unwrap().into_vec(), vec![b]);
    drop(tx);

    // delete node
    let mut tx = db.begin_tx().unwrap();
    tx.delete_node(c).unwrap();
    tx.commit().unwrap();
    let tx = db.begin_tx().unwrap();
    assert!(tx.find_nodes("User", "username", "user2").unwrap().is_empty());
}

#[test]
fn test_find_nodes_sees_own_writes() {
    let db = GraphDatabase::in_memory();
    db.schema().create_index("User", "username").unwrap();
    let users = create_users(&db, 2);

    let mut tx = db.begin_tx().unwrap();
    let fresh = tx.create_node(["User"]).unwrap();
    tx.set_node_property(fresh, "username", "newbie").unwrap();
    tx.set_node_property(users[0], "username", "renamed").unwrap();
    tx.delete_node(users[1]).unwrap();

    assert_eq!(tx.find_nodes("User", "username", "newbie").unwrap().into_vec(), vec![fresh]);
    assert_eq!(
        tx.find_nodes("User", "username", "renamed").unwrap().into_vec(),
        vec![users[0]]
    );
    assert!(tx.find_nodes("User", "username", "user0").unwrap().is_empty());
    assert!(tx.find_nodes("User", "username", "user1").unwrap().is_empty());

    // Another transaction still sees the committed state.
    let other = db.begin_tx().unwrap();
    assert!(other.find_nodes("User", "username", "newbie").unwrap().is_empty());
    assert_eq!(other.find_nodes("User", "username", "user0").unwrap().len(), 1);
}

#[test]
fn test_duplicate_values_in_insertion_order() {
    let db = GraphDatabase::in_memory();
    db.schema().create_index("Person", "city").unwrap();

    let mut ids = Vec::new();
    for _ in 0..5 {
        let mut tx = db.begin_tx().unwrap();
        let id = tx.create_node(["Person"]).unwrap();
        tx.set_node_property(id, "city", "Berlin").unwrap();
        tx.commit().unwrap();
        ids.push(id);
    }

    let tx = db.begin_tx().unwrap();
    let hits = tx.find_nodes("Person", "city", "Berlin").unwrap();
    assert_eq!(hits.as_slice(), ids.as_slice());
    // Restartable: iterating twice yields the same sequence.
    let first: Vec<_> = hits.iter().collect();
    let second: Vec<_> = hits.iter().collect();
    assert_eq!(first, second);
    assert!(matches!(
        hits.single(),
        Err(GraphError::Constraint(ConstraintViolation::NotSingle { count: 5 }))
    ));
}

#[test]
fn test_index_results_stable_within_snapshot() {
    let db = GraphDatabase::in_memory();
    db.schema().create_index("User", "username").unwrap();
    let users = create_users(&db, 1);

    let reader = db.begin_tx().unwrap();

    let mut writer = db.begin_tx().unwrap();
    writer.set_node_property(users[0], "username", "changed").unwrap();
    writer.commit().unwrap();

    assert_eq!(reader.find_nodes("User", "username", "user0").unwrap().len(), 1);
    assert!(reader.find_nodes("User", "username", "changed").unwrap().is_empty());
}

#[test]
fn test_index_built_after_history_serves_old_snapshots() {
    let db = GraphDatabase::in_memory();
    let users = create_users(&db, 1);
    let reader = db.begin_tx().unwrap();

    let mut writer = db.begin_tx().unwrap();
    writer.set_node_property(users[0], "username", "changed").unwrap();
    writer.commit().unwrap();

    db.schema().create_index("User", "username").unwrap();
    assert_eq!(reader.find_nodes("User", "username", "user0").unwrap().len(), 1);
    assert!(reader.find_nodes("User", "username", "changed").unwrap().is_empty());
}

#[test]
fn test_unique_constraint() {
    let db = GraphDatabase::in_memory();
    db.schema().create_unique_constraint("User", "email").unwrap();

    let mut tx = db.begin_tx().unwrap();
    let a = tx.create_node(["User"]).unwrap();
    tx.set_node_property(a, "email", "a@example.com").unwrap();
    let b = tx.create_node(["User"]).unwrap();
    let err = tx.set_node_property(b, "email", "a@example.com").unwrap_err();
    assert!(matches!(
        err,
        GraphError::Constraint(ConstraintViolation::UniqueValue { existing, .. }) if existing == a
    ));
    tx.set_node_property(b, "email", "b@example.com").unwrap();
    tx.commit().unwrap();

    // Concurrent writers claiming the same value: the second commit fails.
    let mut first = db.begin_tx().unwrap();
    let mut second = db.begin_tx().unwrap();
    let c = first.create_node(["User"]).unwrap();
    first.set_node_property(c, "email", "c@example.com").unwrap();
    let d = second.create_node(["User"]).unwrap();
    second.set_node_property(d, "email", "c@example.com").unwrap();
    first.commit().unwrap();
    let err = second.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constraint);

    let defs = db.schema().get_indexes("User");
    assert!(matches!(defs[0], IndexDefinition::Schema { unique: true, .. }));
}

#[test]
fn test_unique_constraint_over_existing_duplicates() {
    let db = GraphDatabase::in_memory();
    let mut tx = db.begin_tx().unwrap();
    for _ in 0..2 {
        let id = tx.create_node(["User"]).unwrap();
        tx.set_node_property(id, "email", "same@example.com").unwrap();
    }
    tx.commit().unwrap();

    let err = db.schema().create_unique_constraint("User", "email").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constraint);
    assert!(!db.schema().has_index("User", "email"));

    // The rejected index left nothing registered behind it.
    let err = db.schema().create_unique_constraint("User", "email").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constraint);
    assert!(db.schema().indexes().is_empty());

    // A plain index over the same data is fine.
    db.schema().create_index("User", "email").unwrap();
    let tx = db.begin_tx().unwrap();
    assert_eq!(tx.find_nodes("User", "email", "same@example.com").unwrap().len(), 2);
}

#[test]
fn test_swapping_unique_values_in_one_transaction() {
    let db = GraphDatabase::in_memory();
    db.schema().create_unique_constraint("User", "email").unwrap();

    let mut tx = db.begin_tx().unwrap();
    let a = tx.create_node(["User"]).unwrap();
    tx.set_node_property(a, "email", "a@example.com").unwrap();
    let b = tx.create_node(["User"]).unwrap();
    tx.set_node_property(b, "email", "b@example.com").unwrap();
    tx.commit().unwrap();

    let mut tx = db.begin_tx().unwrap();
    tx.set_node_property(a, "email", "tmp@example.com").unwrap();
    tx.set_node_property(b, "email", "a@example.com").unwrap();
    tx.set_node_property(a, "email", "b@example.com").unwrap();
    tx.commit().unwrap();

    let tx = db.begin_tx().unwrap();
    assert_eq!(tx.find_nodes("User", "email", "a@example.com").unwrap().into_vec(), vec![b]);
    assert_eq!(tx.find_nodes("User", "email", "b@example.com").unwrap().into_vec(), vec![a]);
}

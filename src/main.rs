use anyhow::{Context, Result};
use embergraph::{Direction, EngineConfig, GraphDatabase, GraphError, LifecycleEvent};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Embergraph v{}", embergraph::version());
    println!("==========================================");
    println!();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_yaml_file(&path).with_context(|| format!("loading config {}", path))?,
        None => EngineConfig::in_memory(),
    };
    let db = GraphDatabase::open(config)?;
    let mut events = db.subscribe();

    demo_property_graph(&db)?;
    demo_schema_index(&db)?;
    demo_legacy_index(&db)?;
    demo_conflict(&db)?;

    println!("\n=== Statistics ===");
    println!("{}", db.stats());

    db.close()?;

    println!("\n=== Lifecycle events ===");
    while let Some(event) = events.recv().await {
        println!("  {:?}", event);
        if event == LifecycleEvent::Shutdown {
            break;
        }
    }
    Ok(())
}

fn demo_property_graph(db: &GraphDatabase) -> Result<()> {
    println!("=== Demo 1: Property Graph ===");
    let mut tx = db.begin_tx()?;

    let alice = tx.create_node(["Person"])?;
    tx.set_node_property(alice, "name", "Alice")?;
    tx.set_node_property(alice, "age", 30i64)?;
    println!("✓ Created Person: Alice (age 30)");

    let bob = tx.create_node(["Person"])?;
    tx.set_node_property(bob, "name", "Bob")?;
    tx.set_node_property(bob, "age", 25i64)?;
    println!("✓ Created Person: Bob (age 25)");

    let knows = tx.create_relationship(alice, bob, "KNOWS")?;
    tx.set_relationship_property(knows, "since", 2020i64)?;
    println!("✓ Alice -[KNOWS]-> Bob (since 2020)");
    tx.commit()?;

    let tx = db.begin_tx()?;
    for rel in tx.relationships(alice, Direction::Outgoing, None)? {
        let friend = tx.get_node(rel.target())?;
        println!(
            "  Alice knows {}",
            friend.get_property("name").map(|v| v.to_string()).unwrap_or_default()
        );
    }
    println!("  Total nodes: {}", tx.node_count()?);
    Ok(())
}

fn demo_schema_index(db: &GraphDatabase) -> Result<()> {
    println!("\n=== Demo 2: Schema Index ===");
    db.schema().create_index("User", "username")?;

    let mut tx = db.begin_tx()?;
    for i in 0..100 {
        let id = tx.create_node(["User"])?;
        tx.set_node_property(id, "username", format!("user{}", i))?;
    }
    tx.commit()?;
    println!("✓ Created 100 users");

    let tx = db.begin_tx()?;
    let hits = tx.find_nodes("User", "username", "user45")?;
    if let Some(id) = hits.single()? {
        println!("  Found user45 as {}", id);
    }
    drop(tx);

    db.schema().drop_index("User", "username")?;
    let tx = db.begin_tx()?;
    match tx.find_nodes("User", "username", "user45") {
        Err(GraphError::IndexMissing { .. }) => println!("  Index dropped; lookup reports a missing index"),
        other => println!("  Unexpected lookup result: {:?}", other.map(|h| h.len())),
    }
    Ok(())
}

fn demo_legacy_index(db: &GraphDatabase) -> Result<()> {
    println!("\n=== Demo 3: Legacy Index ===");
    let mut tx = db.begin_tx()?;
    let neo = tx.create_node(["Character"])?;
    tx.set_node_property(neo, "name", "Thomas Anderson")?;
    tx.node_index("characters").add(neo, "name", "Thomas Anderson")?;
    tx.commit()?;

    let mut tx = db.begin_tx()?;
    tx.set_node_property(neo, "name", "Neo")?;
    tx.commit()?;

    let mut tx = db.begin_tx()?;
    let stale = tx.node_index("characters").query("name", "Thomas*")?;
    println!("  Entries under the old name after rename: {}", stale.len());
    Ok(())
}

fn demo_conflict(db: &GraphDatabase) -> Result<()> {
    println!("\n=== Demo 4: Optimistic Conflicts ===");
    let mut setup = db.begin_tx()?;
    let counter = setup.create_node(["Counter"])?;
    setup.commit()?;

    let mut first = db.begin_tx()?;
    let mut second = db.begin_tx()?;
    first.set_node_property(counter, "value", 1i64)?;
    second.set_node_property(counter, "value", 2i64)?;

    first.commit()?;
    match second.commit() {
        Err(e) if e.is_retryable() => println!("  Second writer aborted: {}", e),
        other => println!("  Unexpected commit result: {:?}", other),
    }
    Ok(())
}

//! `mnemo forget` - prune a learning by id.
//!
//! Opens the database directly rather than going through the daemon; deletion
//! is a curation operation, not part of the service boundary. SQLite's file
//! locking keeps this safe alongside a running daemon.

use anyhow::{Context, Result};
use mnemo::LearningStore;

pub fn execute(id: i64) -> Result<()> {
    let db_path = mnemo::paths::db_path();
    let store = LearningStore::open(&db_path)
        .with_context(|| format!("opening memory database {}", db_path.display()))?;

    if let Some(record) = store.get_learning(id)? {
        store.delete_learning(id)?;
        println!("Forgot learning #{id}: ({}) {}", record.kind, record.content);
    } else {
        println!("No learning with id {id}");
    }

    Ok(())
}

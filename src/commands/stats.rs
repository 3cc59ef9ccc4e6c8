//! `mnemo stats` - corpus statistics from a running daemon.

use anyhow::Result;
use mnemo::client::Client;

pub fn execute(json: bool, address: Option<String>) -> Result<()> {
    let client = Client::new(super::daemon_address(address)?)?;
    let stats = client.stats()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "total_learnings": stats.total_learnings,
                "by_type": stats.by_type,
                "distinct_types": stats.distinct_types,
                "total_chunks": stats.total_chunks,
                "total_sessions": stats.total_sessions,
            }))?
        );
        return Ok(());
    }

    println!("Learnings: {} ({} types)", stats.total_learnings, stats.distinct_types);
    let mut kinds: Vec<_> = stats.by_type.iter().collect();
    kinds.sort();
    for (kind, count) in kinds {
        println!("  {kind}: {count}");
    }
    println!(
        "Transcript chunks: {} across {} sessions",
        stats.total_chunks, stats.total_sessions
    );

    Ok(())
}

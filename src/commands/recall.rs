//! `mnemo recall` - query the daemon for relevant learnings.

use anyhow::Result;
use mnemo::client::{Client, RecallRequest};

pub struct RecallArgs {
    pub query: String,
    pub min_similarity: Option<f32>,
    pub max_results: Option<usize>,
    pub json: bool,
    pub address: Option<String>,
}

pub fn execute(args: RecallArgs) -> Result<()> {
    let client = Client::new(super::daemon_address(args.address)?)?;

    let response = client.recall(&RecallRequest {
        query: args.query,
        min_similarity: args.min_similarity,
        max_results: args.max_results,
    })?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "memories": response.memories.iter().map(|m| serde_json::json!({
                    "type": m.kind,
                    "content": m.content,
                    "similarity": m.similarity,
                })).collect::<Vec<_>>()
            }))?
        );
        return Ok(());
    }

    if response.memories.is_empty() {
        println!("No relevant memories.");
        return Ok(());
    }

    for memory in &response.memories {
        println!("[{:.4}] ({}) {}", memory.similarity, memory.kind, memory.content);
    }

    Ok(())
}

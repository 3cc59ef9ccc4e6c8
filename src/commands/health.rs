//! `mnemo health` - probe a running daemon.

use anyhow::Result;
use mnemo::client::Client;

pub fn execute(json: bool, address: Option<String>) -> Result<()> {
    let client = Client::new(super::daemon_address(address)?)?;
    let health = client.health()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "ok": health.ok,
                "embeddingProviderReachable": health.embedding_provider_reachable,
                "storagePath": health.storage_path,
                "model": health.model,
            }))?
        );
        return Ok(());
    }

    println!(
        "Daemon: ok\nEmbedding provider ({}): {}\nDatabase: {}",
        health.model,
        if health.embedding_provider_reachable {
            "reachable"
        } else {
            "UNREACHABLE"
        },
        health.storage_path
    );

    Ok(())
}

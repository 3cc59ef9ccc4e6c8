//! `mnemo store` - persist a learning through the daemon.

use anyhow::Result;
use mnemo::client::{Client, StoreRequest};

pub struct StoreArgs {
    pub kind: String,
    pub content: String,
    pub context: Option<String>,
    pub confidence: Option<f64>,
    pub session_source: Option<String>,
    pub address: Option<String>,
}

pub fn execute(args: StoreArgs) -> Result<()> {
    let client = Client::new(super::daemon_address(args.address)?)?;

    let response = client.store(&StoreRequest {
        kind: args.kind,
        content: args.content,
        context: args.context,
        confidence: args.confidence,
        session_source: args.session_source,
    })?;

    match response.status.as_str() {
        "duplicate" => println!(
            "Duplicate: learning #{} already covers this",
            response.id
        ),
        _ => println!("Stored learning #{}", response.id),
    }

    Ok(())
}

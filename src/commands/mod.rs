//! CLI command handlers. `serve` runs the daemon; everything else talks to a
//! running daemon through the client (except `forget`, which edits the
//! database directly).

pub mod forget;
pub mod health;
pub mod recall;
pub mod serve;
pub mod stats;
pub mod store;

use anyhow::Result;
use mnemo::MemoryConfig;

/// Resolve the daemon address: explicit flag wins, otherwise the configured
/// bind address.
pub fn daemon_address(address: Option<String>) -> Result<String> {
    match address {
        Some(addr) => Ok(addr),
        None => {
            let config = MemoryConfig::load(mnemo::paths::config_path())?;
            Ok(config.bind_addr())
        }
    }
}

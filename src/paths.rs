//! Single source of truth for the mnemo filesystem layout.
//!
//! Pure path construction - no I/O, no validation.
//!
//! ```text
//! ~/.mnemo/
//! ├── config.toml   # Daemon configuration
//! ├── memory.db     # SQLite database (learnings + transcript chunks)
//! └── run/
//!     └── mnemo.pid # Daemon PID file
//! ```

use std::path::PathBuf;

/// User's mnemo home directory: `~/.mnemo/`
pub fn mnemo_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mnemo")
}

/// Daemon config file: `~/.mnemo/config.toml`
pub fn config_path() -> PathBuf {
    mnemo_home().join("config.toml")
}

/// Memory database: `~/.mnemo/memory.db`
pub fn db_path() -> PathBuf {
    mnemo_home().join("memory.db")
}

/// Runtime state directory: `~/.mnemo/run/`
pub fn run_dir() -> PathBuf {
    mnemo_home().join("run")
}

/// Daemon PID file: `~/.mnemo/run/mnemo.pid`
pub fn pid_path() -> PathBuf {
    run_dir().join("mnemo.pid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_nest_under_home() {
        assert!(config_path().starts_with(mnemo_home()));
        assert!(db_path().starts_with(mnemo_home()));
        assert!(pid_path().starts_with(run_dir()));
    }
}

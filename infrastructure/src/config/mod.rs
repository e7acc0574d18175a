//! Configuration file loading for swarm-orchestrator
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `SWARM_` environment variables (`__` separates section and key)
//! 2. `--config <path>` specified file
//! 3. Project root: `./swarm.toml` or `./.swarm.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/swarm-orchestrator/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileConfig, FileConsensusConfig, FileIntervalsConfig, FileLoggingConfig,
    FileOrchestrationConfig, FileOutputConfig,
};
pub use loader::ConfigLoader;

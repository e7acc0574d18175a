//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level config file names, first match wins
const PROJECT_FILES: [&str; 2] = ["swarm.toml", ".swarm.toml"];

/// Environment prefix; `SWARM_ORCHESTRATION__RETRY_BUDGET=3` sets
/// `orchestration.retry_budget`
const ENV_PREFIX: &str = "SWARM_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `SWARM_` environment variables
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./swarm.toml` or `./.swarm.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/swarm-orchestrator/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path, Self::project_config_path(), Self::global_config_path())
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Load from explicit files only: no environment, no discovery.
    pub fn load_files(
        config_path: Option<&PathBuf>,
        project: Option<PathBuf>,
        global: Option<PathBuf>,
    ) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path, project, global)
            .extract()
            .map_err(Box::new)
    }

    fn figment(
        config_path: Option<&PathBuf>,
        project: Option<PathBuf>,
        global: Option<PathBuf>,
    ) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(project_path) = project {
            figment = figment.merge(Toml::file(&project_path));
        }

        // Explicit path is the highest-priority file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/swarm-orchestrator/config.toml if set,
    /// otherwise falls back to ~/.config/swarm-orchestrator/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("swarm-orchestrator").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        Self::project_config_in(Path::new("."))
    }

    fn project_config_in(dir: &Path) -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources() {
        println!("Configuration sources (in priority order):");
        println!("  [     ] Env:     {}* variables", ENV_PREFIX);

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./swarm.toml or ./.swarm.toml");
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.orchestration.max_concurrent_tasks, 10);
        assert_eq!(config.consensus.default_threshold, 0.66);
    }

    #[test]
    fn test_global_config_path_names_the_app() {
        // Should return a path (even if file doesn't exist)
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("swarm-orchestrator"));
    }

    #[test]
    fn test_explicit_file_overrides_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("swarm.toml");
        let explicit = dir.path().join("explicit.toml");
        fs::write(
            &project,
            "[orchestration]\nretry_budget = 2\nmax_concurrent_tasks = 3\n",
        )
        .unwrap();
        fs::write(&explicit, "[orchestration]\nretry_budget = 5\n").unwrap();

        let config = ConfigLoader::load_files(Some(&explicit), Some(project), None).unwrap();
        assert_eq!(config.orchestration.retry_budget, 5);
        assert_eq!(config.orchestration.max_concurrent_tasks, 3);
        assert_eq!(config.orchestration.assignment_timeout_ms, 300_000);
    }

    #[test]
    fn test_project_file_discovery_prefers_plain_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".swarm.toml"), "").unwrap();
        assert_eq!(
            ConfigLoader::project_config_in(dir.path()),
            Some(dir.path().join(".swarm.toml"))
        );
        fs::write(dir.path().join("swarm.toml"), "").unwrap();
        assert_eq!(
            ConfigLoader::project_config_in(dir.path()),
            Some(dir.path().join("swarm.toml"))
        );
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[orchestration\nretry_budget = ").unwrap();
        assert!(ConfigLoader::load_files(Some(&path), None, None).is_err());
    }
}

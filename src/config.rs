//! Configuration loader and validator for the API server and CSV loaders.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub server: Server,
    pub api: Api,
    pub loader: Loader,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

/// Pagination defaults for the list endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub default_limit: u32,
    pub max_limit: u32,
}

/// CSV loader settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Loader {
    pub batch_size: usize,
    /// Base directory for relative media paths; empty means the working directory.
    #[serde(default)]
    pub media_root: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: App {
                data_dir: "./data".into(),
            },
            server: Server {
                host: "127.0.0.1".into(),
                port: 8000,
            },
            api: Api {
                default_limit: 10,
                max_limit: 1000,
            },
            loader: Loader {
                batch_size: 500,
                media_root: String::new(),
            },
        }
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// `DATABASE_URL` from the environment (or `.env`), else a file under `app.data_dir`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "sqlite://{}/cleandata.db",
                self.app.data_dir.trim_end_matches('/')
            )
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn media_root(&self) -> Option<PathBuf> {
        let root = self.loader.media_root.trim();
        if root.is_empty() {
            None
        } else {
            Some(PathBuf::from(root))
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Like [`load`], but a missing file yields the built-in defaults.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        warn!(path = %path.display(), "config file not found; using defaults");
        return Ok(Config::default());
    }
    load(Some(path))
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.server.host.trim().is_empty() {
        return Err(ConfigError::Invalid("server.host must be non-empty"));
    }
    if cfg.api.default_limit == 0 {
        return Err(ConfigError::Invalid("api.default_limit must be > 0"));
    }
    if cfg.api.max_limit < cfg.api.default_limit {
        return Err(ConfigError::Invalid("api.max_limit must be >= api.default_limit"));
    }
    if cfg.loader.batch_size == 0 {
        return Err(ConfigError::Invalid("loader.batch_size must be > 0"));
    }
    Ok(())
}

/// Returns the example YAML shipped with the project.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

server:
  host: "0.0.0.0"
  port: 8000

api:
  default_limit: 10
  max_limit: 1000

loader:
  batch_size: 500
  media_root: "./photos"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8000");
        assert_eq!(cfg.media_root(), Some(PathBuf::from("./photos")));
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        validate(&cfg).unwrap();
        assert_eq!(cfg.api.default_limit, 10);
        assert_eq!(cfg.loader.batch_size, 500);
        assert!(cfg.media_root().is_none());
    }

    #[test]
    fn invalid_limits() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.default_limit = 0;
        let err = validate(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("default_limit")));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.max_limit = 5;
        let err = validate(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("max_limit")));
    }

    #[test]
    fn invalid_batch_size_and_dirs() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.loader.batch_size = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = "  ".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.server.host = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn media_root_is_optional_in_yaml() {
        let yaml = example().replace("  media_root: \"./photos\"\n", "");
        let cfg: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(cfg.media_root().is_none());
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let td = tempdir().unwrap();
        let cfg = load_or_default(&td.path().join("absent.yaml")).unwrap();
        assert_eq!(cfg, Config::default());
    }
}

//! Configuration file management for adplan.
//!
//! Provides a TOML-based config file at `~/.config/adplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use adplan_core::config::EngineConfig;
use adplan_core::generation::{
    ClaudeCliClient, GenerationClient, HttpGenerationClient, HttpGenerationConfig,
};
use adplan_db::config::{DATABASE_URL_ENV, DbConfig};

/// Environment variable that overrides `generator.kind`.
pub const GENERATOR_ENV: &str = "ADPLAN_GENERATOR";

/// Default name of the environment variable holding the generator API key.
pub const DEFAULT_API_KEY_ENV: &str = "ADPLAN_API_KEY";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

/// Which collaborator produces plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeneratorKind {
    /// OpenAI-compatible chat-completion endpoint.
    #[default]
    Http,
    /// Local `claude` CLI.
    ClaudeCli,
}

impl std::str::FromStr for GeneratorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(Self::Http),
            "claude-cli" => Ok(Self::ClaudeCli),
            other => bail!("unknown generator kind {other:?} (expected http or claude-cli)"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    pub kind: GeneratorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Path to the `claude` binary for `claude-cli`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::default(),
            endpoint: None,
            model: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            binary: None,
            timeout_secs: HttpGenerationConfig::default().timeout_secs,
        }
    }
}

impl GeneratorSection {
    /// Build the configured client. The HTTP client needs its API key in
    /// the environment.
    pub fn build_client(&self) -> Result<Arc<dyn GenerationClient>> {
        match self.kind {
            GeneratorKind::Http => {
                let api_key = std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty());
                let Some(api_key) = api_key else {
                    bail!(
                        "generator API key not found; set {} or change generator.api_key_env",
                        self.api_key_env
                    );
                };
                let defaults = HttpGenerationConfig::default();
                let config = HttpGenerationConfig {
                    endpoint: self.endpoint.clone().unwrap_or(defaults.endpoint),
                    api_key: Some(api_key),
                    model: self.model.clone().unwrap_or(defaults.model),
                    timeout_secs: self.timeout_secs,
                };
                let client = HttpGenerationClient::new(config)
                    .context("failed to build HTTP generation client")?;
                Ok(Arc::new(client))
            }
            GeneratorKind::ClaudeCli => {
                let mut client = match &self.binary {
                    Some(path) => ClaudeCliClient::with_binary(path.clone()),
                    None => ClaudeCliClient::new(),
                };
                if let Some(model) = &self.model {
                    client = client.model(model.clone());
                }
                Ok(Arc::new(client))
            }
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the adplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/adplan` or `~/.config/adplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("adplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("adplan")
}

/// Return the path to the adplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Load the config file, `None` when there is none.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    load_config_from(&path).map(Some)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct AdplanConfig {
    pub db_config: DbConfig,
    pub generator: GeneratorSection,
    pub engine: EngineConfig,
}

impl AdplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `ADPLAN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Generator kind: `ADPLAN_GENERATOR` > `generator.kind` > `http`
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config()?;
        Self::resolve_with(cli_db_url, file_config)
    }

    fn resolve_with(cli_db_url: Option<&str>, file_config: Option<ConfigFile>) -> Result<Self> {
        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let (mut generator, engine) = match file_config {
            Some(cfg) => (cfg.generator, cfg.engine),
            None => (GeneratorSection::default(), EngineConfig::default()),
        };
        if let Ok(kind) = std::env::var(GENERATOR_ENV) {
            generator.kind = kind
                .parse()
                .with_context(|| format!("invalid {GENERATOR_ENV}"))?;
        }

        Ok(Self {
            db_config: DbConfig::new(db_url),
            generator,
            engine,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    fn sample_file() -> ConfigFile {
        ConfigFile {
            database: DatabaseSection {
                url: "postgresql://filehost:5432/filedb".to_string(),
            },
            generator: GeneratorSection {
                kind: GeneratorKind::ClaudeCli,
                binary: Some("/opt/bin/claude".to_string()),
                ..GeneratorSection::default()
            },
            engine: EngineConfig {
                correction_temperature: 0.1,
                ..EngineConfig::default()
            },
        }
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("adplan").join("config.toml");

        save_config_to(&path, &sample_file()).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.database.url, "postgresql://filehost:5432/filedb");
        assert_eq!(loaded.generator.kind, GeneratorKind::ClaudeCli);
        assert_eq!(loaded.generator.binary.as_deref(), Some("/opt/bin/claude"));
        assert_eq!(loaded.engine.correction_temperature, 0.1);
    }

    #[test]
    fn minimal_file_fills_defaults() {
        let cfg: ConfigFile = toml::from_str("[database]\nurl = \"postgresql://x/y\"\n").unwrap();
        assert_eq!(cfg.generator.kind, GeneratorKind::Http);
        assert_eq!(cfg.generator.api_key_env, DEFAULT_API_KEY_ENV);
        assert_eq!(cfg.engine, EngineConfig::default());
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        save_config_to(&path, &sample_file()).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();
        unsafe { std::env::set_var(DATABASE_URL_ENV, "postgresql://env:5432/envdb") };

        let config =
            AdplanConfig::resolve_with(Some("postgresql://cli:5432/clidb"), Some(sample_file()))
                .unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");

        unsafe { std::env::remove_var(DATABASE_URL_ENV) };
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let _lock = lock_env();
        unsafe { std::env::set_var(DATABASE_URL_ENV, "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var(GENERATOR_ENV, "http") };

        let config = AdplanConfig::resolve_with(None, Some(sample_file())).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(config.generator.kind, GeneratorKind::Http);
        assert_eq!(config.engine.correction_temperature, 0.1);

        unsafe { std::env::remove_var(DATABASE_URL_ENV) };
        unsafe { std::env::remove_var(GENERATOR_ENV) };
    }

    #[test]
    fn resolve_uses_file_then_default() {
        let _lock = lock_env();
        unsafe { std::env::remove_var(DATABASE_URL_ENV) };
        unsafe { std::env::remove_var(GENERATOR_ENV) };

        let from_file = AdplanConfig::resolve_with(None, Some(sample_file())).unwrap();
        assert_eq!(from_file.db_config.database_url, "postgresql://filehost:5432/filedb");
        assert_eq!(from_file.generator.kind, GeneratorKind::ClaudeCli);

        let defaults = AdplanConfig::resolve_with(None, None).unwrap();
        assert_eq!(defaults.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(defaults.generator.kind, GeneratorKind::Http);
    }

    #[test]
    fn invalid_generator_env_is_an_error() {
        let _lock = lock_env();
        unsafe { std::env::set_var(GENERATOR_ENV, "carrier-pigeon") };

        let result = AdplanConfig::resolve_with(None, None);

        unsafe { std::env::remove_var(GENERATOR_ENV) };
        assert!(result.is_err());
    }

    #[test]
    fn http_client_requires_api_key() {
        let _lock = lock_env();
        let section = GeneratorSection {
            api_key_env: "ADPLAN_TEST_MISSING_KEY".to_string(),
            ..GeneratorSection::default()
        };
        unsafe { std::env::remove_var("ADPLAN_TEST_MISSING_KEY") };

        let err = section.build_client().err().expect("missing key should fail");
        let msg = err.to_string();
        assert!(msg.contains("ADPLAN_TEST_MISSING_KEY"), "unexpected error: {msg}");
    }

    #[test]
    fn http_client_builds_with_key() {
        let _lock = lock_env();
        let section = GeneratorSection {
            api_key_env: "ADPLAN_TEST_PRESENT_KEY".to_string(),
            ..GeneratorSection::default()
        };
        unsafe { std::env::set_var("ADPLAN_TEST_PRESENT_KEY", "sk-test") };

        let client = section.build_client();

        unsafe { std::env::remove_var("ADPLAN_TEST_PRESENT_KEY") };
        assert_eq!(client.unwrap().name(), "http");
    }

    #[test]
    fn claude_cli_client_needs_no_key() {
        let section = GeneratorSection {
            kind: GeneratorKind::ClaudeCli,
            ..GeneratorSection::default()
        };
        assert_eq!(section.build_client().unwrap().name(), "claude-cli");
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("adplan/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    /// Load from the working directory.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Merge defaults, `config.toml`, `config.<env>.toml` and `APP_*` env vars.
    /// Nested keys use `__`, e.g. `APP_SEARCH__DEFAULT_LIMIT=5`.
    pub fn load_from(base: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, env_name })
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the typed settings.
    pub fn settings(&self) -> crate::error::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate_for_env(&self.env_name)?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub index: IndexSettings,
    pub search: SearchSettings,
    pub backend: BackendSettings,
    pub provision: ProvisionSettings,
    pub gateway: GatewaySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 9567 }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub name: String,
    /// Root directory holding one sub-directory per index. In-memory when unset.
    pub dir: Option<String>,
    pub writer_memory_bytes: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { name: "units".to_string(), dir: None, writer_memory_bytes: 50_000_000 }
    }
}

impl IndexSettings {
    pub fn dir_path(&self) -> Option<PathBuf> {
        self.dir.as_deref().map(expand_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_limit: 10, max_limit: 100 }
    }
}

/// Timeout and retry budget applied to every index call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_on_timeout: bool,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Upper bound on in-flight index calls per request fan-out.
    pub concurrency: usize,
    /// Units per batch write. A submission of `n` lines costs `ceil(n / batch_size)` commits.
    pub batch_size: usize,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            retry_on_timeout: true,
            backoff_ms: 150,
            max_backoff_ms: 1_200,
            concurrency: 8,
            batch_size: 256,
        }
    }
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionSettings {
    /// Documents ingested once, right after the index is first created.
    pub seed_documents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    pub upstream_url: String,
    pub timeout_ms: u64,
    pub attempts: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upstream_url: "http://localhost:9567".to_string(),
            timeout_ms: 30_000,
            attempts: 3,
        }
    }
}

impl GatewaySettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Settings {
    pub fn validate_for_env(&self, env: &str) -> crate::error::Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));
        if self.index.name.trim().is_empty() { return invalid("index.name must not be empty"); }
        if self.search.default_limit == 0 { return invalid("search.default_limit must be at least 1"); }
        if self.search.max_limit < self.search.default_limit { return invalid("search.max_limit must be >= search.default_limit"); }
        if self.backend.timeout_ms == 0 { return invalid("backend.timeout_ms must be at least 1"); }
        if self.backend.concurrency == 0 { return invalid("backend.concurrency must be at least 1"); }
        if self.backend.batch_size == 0 { return invalid("backend.batch_size must be at least 1"); }
        if self.gateway.attempts == 0 { return invalid("gateway.attempts must be at least 1"); }
        if self.index.writer_memory_bytes < 15_000_000 { return invalid("index.writer_memory_bytes must be at least 15000000"); }
        match env {
            "prod" | "production" if self.index.dir.is_none() => {
                invalid("index.dir is required in production")
            }
            _ => Ok(()),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

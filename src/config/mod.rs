//! Configuration management.
//!
//! Values come from built-in defaults, then an optional TOML file, then environment
//! variables. A `.env` file is loaded by the binary before any of this runs.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Marker printed in place of a configured API key.
const REDACTED: &str = "[redacted]";

/// Main configuration for folio.
#[derive(Debug, Clone)]
pub struct FolioConfig {
    /// Path to the content JSON file.
    pub content_path: PathBuf,
    /// Directory served for static assets.
    pub static_dir: PathBuf,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// AI question rate limit.
    pub rate_limit: RateLimitSettings,
    /// Generative model settings.
    pub llm: LlmConfig,
    /// Featured item ids for the index view.
    pub featured: FeaturedConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics exporter settings.
    pub metrics: MetricsSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Whether the session cookie carries the `Secure` attribute.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            secure_cookies: false,
        }
    }
}

/// Rate limit settings for `POST /ask_ai`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Maximum questions per session per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window_secs: 300,
        }
    }
}

impl RateLimitSettings {
    /// Converts to the limiter's configuration.
    #[must_use]
    pub const fn to_limiter_config(self) -> crate::services::RateLimitConfig {
        crate::services::RateLimitConfig {
            max_requests: self.max_requests,
            window: std::time::Duration::from_secs(self.window_secs),
        }
    }
}

/// Generative model settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name.
    pub model: String,
    /// API key, usually from `GEMINI_API_KEY`.
    pub api_key: Option<SecretString>,
    /// API base URL.
    pub base_url: String,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: crate::llm::GeminiClient::DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: crate::llm::GeminiClient::DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Featured item ids, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturedConfig {
    /// Featured project ids.
    pub projects: Vec<String>,
    /// Featured research paper ids.
    pub research: Vec<String>,
}

impl Default for FeaturedConfig {
    fn default() -> Self {
        Self {
            projects: vec!["blockchain_ai".to_string(), "creditworthiness".to_string()],
            research: vec![
                "paper_fair_explainable_credit".to_string(),
                "paper_adversarial_cybersecurity".to_string(),
            ],
        }
    }
}

/// Logging settings; parsed by [`crate::observability::LoggingConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directive.
    pub filter: Option<String>,
    /// Log file path; stdout when unset.
    pub file: Option<PathBuf>,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSettings {
    /// Whether the exporter is installed.
    pub enabled: bool,
    /// Exporter listen port.
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Content file path.
    pub content_path: Option<String>,
    /// Static asset directory.
    pub static_dir: Option<String>,
    /// Server section.
    pub server: Option<ConfigFileServer>,
    /// Rate limit section.
    pub rate_limit: Option<ConfigFileRateLimit>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
    /// Featured section.
    pub featured: Option<ConfigFileFeatured>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Metrics section.
    pub metrics: Option<ConfigFileMetrics>,
}

/// Server section in config file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFileServer {
    /// Bind host.
    pub host: Option<String>,
    /// Bind port.
    pub port: Option<u16>,
    /// Secure cookie flag.
    pub secure_cookies: Option<bool>,
}

/// Rate limit section in config file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFileRateLimit {
    /// Maximum questions per window.
    pub max_requests: Option<u32>,
    /// Window length in seconds.
    pub window_secs: Option<u64>,
}

/// LLM section in config file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFileLlm {
    /// Model name.
    pub model: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Featured section in config file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFileFeatured {
    /// Featured project ids.
    pub projects: Option<Vec<String>>,
    /// Featured research ids.
    pub research: Option<Vec<String>>,
}

/// Logging section in config file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// Metrics section in config file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFileMetrics {
    /// Exporter enabled.
    pub enabled: Option<bool>,
    /// Exporter port.
    pub port: Option<u16>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            content_path: PathBuf::from("data/content.json"),
            static_dir: PathBuf::from("static"),
            server: ServerConfig::default(),
            rate_limit: RateLimitSettings::default(),
            llm: LlmConfig::default(),
            featured: FeaturedConfig::default(),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl FolioConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir (`folio/config.toml`), then
    /// `~/.config/folio/config.toml`. Returns defaults if neither loads.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("folio").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("folio")
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|path| path.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring config file");
                },
            }
        }

        Self::default()
    }

    /// Applies environment variable overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_env_overrides(|key| std::env::var(key).ok());
        self
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = get("FOLIO_CONTENT_PATH") {
            self.content_path = PathBuf::from(path);
        }
        if let Some(dir) = get("FOLIO_STATIC_DIR") {
            self.static_dir = PathBuf::from(dir);
        }
        if let Some(host) = get("FOLIO_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env(&get, "FOLIO_PORT") {
            self.server.port = port;
        }
        if let Some(max) = parse_env(&get, "FOLIO_AI_RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = max;
        }
        if let Some(secs) = parse_env(&get, "FOLIO_AI_RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = secs;
        }
        if let Some(model) = get("FOLIO_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = get(crate::llm::GeminiClient::API_KEY_ENV) {
            self.llm.api_key = Some(SecretString::from(key));
        }
        if let Some(ms) = parse_env(&get, "FOLIO_LLM_TIMEOUT_MS") {
            self.llm.timeout_ms = ms;
        }
        if let Some(ms) = parse_env(&get, "FOLIO_LLM_CONNECT_TIMEOUT_MS") {
            self.llm.connect_timeout_ms = ms;
        }
        if let Some(format) = get("FOLIO_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(filter) = get("FOLIO_LOG").or_else(|| get("RUST_LOG")) {
            self.logging.filter = Some(filter);
        }
        if let Some(enabled) = get("FOLIO_METRICS_ENABLED").and_then(|v| parse_bool(&v)) {
            self.metrics.enabled = enabled;
        }
        if let Some(port) = parse_env(&get, "FOLIO_METRICS_PORT") {
            self.metrics.port = port;
        }
    }

    /// Validates values that cannot be expressed in the types.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for a zero rate limit or window.
    pub fn validate(&self) -> crate::Result<()> {
        if self.rate_limit.max_requests == 0 {
            return Err(crate::Error::InvalidInput(
                "rate_limit.max_requests must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(crate::Error::InvalidInput(
                "rate_limit.window_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Renders the effective configuration as TOML with the API key redacted.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_redacted_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(&self.to_config_file()).map_err(|e| crate::Error::OperationFailed {
            operation: "serialize_config".to_string(),
            cause: e.to_string(),
        })
    }

    /// Sets the content path.
    #[must_use]
    pub fn with_content_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_path = path.into();
        self
    }

    /// Sets the static directory.
    #[must_use]
    pub fn with_static_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.static_dir = path.into();
        self
    }

    /// Converts a `ConfigFile` to `FolioConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(path) = file.content_path {
            config.content_path = PathBuf::from(path);
        }
        if let Some(dir) = file.static_dir {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(server) = file.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
            if let Some(secure) = server.secure_cookies {
                config.server.secure_cookies = secure;
            }
        }
        if let Some(rate_limit) = file.rate_limit {
            if let Some(max) = rate_limit.max_requests {
                config.rate_limit.max_requests = max;
            }
            if let Some(secs) = rate_limit.window_secs {
                config.rate_limit.window_secs = secs;
            }
        }
        if let Some(llm) = file.llm {
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            config.llm.api_key = llm
                .api_key
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from);
            if let Some(base_url) = llm.base_url {
                config.llm.base_url = base_url;
            }
            if let Some(ms) = llm.timeout_ms {
                config.llm.timeout_ms = ms;
            }
            if let Some(ms) = llm.connect_timeout_ms {
                config.llm.connect_timeout_ms = ms;
            }
        }
        if let Some(featured) = file.featured {
            if let Some(projects) = featured.projects {
                config.featured.projects = projects;
            }
            if let Some(research) = featured.research {
                config.featured.research = research;
            }
        }
        if let Some(logging) = file.logging {
            config.logging.format = logging.format;
            config.logging.filter = logging.filter;
            config.logging.file = logging.file.map(PathBuf::from);
        }
        if let Some(metrics) = file.metrics {
            if let Some(enabled) = metrics.enabled {
                config.metrics.enabled = enabled;
            }
            if let Some(port) = metrics.port {
                config.metrics.port = port;
            }
        }

        config
    }

    fn to_config_file(&self) -> ConfigFile {
        ConfigFile {
            content_path: Some(self.content_path.display().to_string()),
            static_dir: Some(self.static_dir.display().to_string()),
            server: Some(ConfigFileServer {
                host: Some(self.server.host.clone()),
                port: Some(self.server.port),
                secure_cookies: Some(self.server.secure_cookies),
            }),
            rate_limit: Some(ConfigFileRateLimit {
                max_requests: Some(self.rate_limit.max_requests),
                window_secs: Some(self.rate_limit.window_secs),
            }),
            llm: Some(ConfigFileLlm {
                model: Some(self.llm.model.clone()),
                api_key: self.llm.api_key.as_ref().map(|_| REDACTED.to_string()),
                base_url: Some(self.llm.base_url.clone()),
                timeout_ms: Some(self.llm.timeout_ms),
                connect_timeout_ms: Some(self.llm.connect_timeout_ms),
            }),
            featured: Some(ConfigFileFeatured {
                projects: Some(self.featured.projects.clone()),
                research: Some(self.featured.research.clone()),
            }),
            logging: Some(ConfigFileLogging {
                format: self.logging.format.clone(),
                filter: self.logging.filter.clone(),
                file: self.logging.file.as_ref().map(|p| p.display().to_string()),
            }),
            metrics: Some(ConfigFileMetrics {
                enabled: Some(self.metrics.enabled),
                port: Some(self.metrics.port),
            }),
        }
    }
}

fn parse_env<T, F>(get: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let value = get(key)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "Ignoring unparsable environment override");
            None
        },
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = FolioConfig::default();
        assert_eq!(config.content_path, PathBuf::from("data/content.json"));
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.rate_limit, RateLimitSettings::default());
        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.window_secs, 300);
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.featured.projects, ["blockchain_ai", "creditworthiness"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
content_path = "/srv/content.json"

[server]
port = 8080
secure_cookies = true

[rate_limit]
max_requests = 5

[llm]
model = "gemini-2.0-flash"
api_key = "from-file"

[featured]
research = ["paper_x"]

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = FolioConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.content_path, PathBuf::from("/srv/content.json"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.secure_cookies);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 300);
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(
            config.llm.api_key.as_ref().map(|key| key.expose_secret()),
            Some("from-file")
        );
        assert_eq!(config.featured.research, ["paper_x"]);
        assert_eq!(config.featured.projects.len(), 2);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = FolioConfig::load_from_file(Path::new("/nonexistent/folio.toml")).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::OperationFailed { ref operation, .. } if operation == "read_config_file"
        ));
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server\nport = ").unwrap();
        let err = FolioConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::OperationFailed { ref operation, .. } if operation == "parse_config_file"
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("FOLIO_PORT", "9000"),
            ("FOLIO_AI_RATE_LIMIT_MAX_REQUESTS", "3"),
            ("FOLIO_AI_RATE_LIMIT_WINDOW_SECS", "60"),
            ("GEMINI_API_KEY", "env-key"),
            ("FOLIO_LLM_TIMEOUT_MS", "1500"),
            ("RUST_LOG", "debug"),
            ("FOLIO_METRICS_ENABLED", "yes"),
        ]);
        let mut config = FolioConfig::default();
        config.apply_env_overrides(|key| vars.get(key).cloned());

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(
            config.llm.api_key.as_ref().map(|key| key.expose_secret()),
            Some("env-key")
        );
        assert_eq!(config.llm.timeout_ms, 1_500);
        assert_eq!(config.logging.filter.as_deref(), Some("debug"));
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_folio_log_wins_over_rust_log() {
        let vars = env(&[("RUST_LOG", "debug"), ("FOLIO_LOG", "folio=trace")]);
        let mut config = FolioConfig::default();
        config.apply_env_overrides(|key| vars.get(key).cloned());
        assert_eq!(config.logging.filter.as_deref(), Some("folio=trace"));
    }

    #[test]
    fn test_invalid_env_values_ignored() {
        let vars = env(&[
            ("FOLIO_PORT", "not-a-port"),
            ("FOLIO_METRICS_ENABLED", "maybe"),
            ("GEMINI_API_KEY", "   "),
        ]);
        let mut config = FolioConfig::default();
        config.apply_env_overrides(|key| vars.get(key).cloned());
        assert_eq!(config.server.port, 5000);
        assert!(!config.metrics.enabled);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = FolioConfig::default();
        config.rate_limit.max_requests = 0;
        assert!(matches!(config.validate(), Err(crate::Error::InvalidInput(_))));

        let mut config = FolioConfig::default();
        config.rate_limit.window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redacted_toml_hides_key() {
        let mut config = FolioConfig::default();
        config.llm.api_key = Some(SecretString::from("super-secret".to_string()));
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains(REDACTED));
        assert!(rendered.contains("max_requests = 20"));
    }

    #[test]
    fn test_limiter_config_conversion() {
        let limiter = RateLimitSettings {
            max_requests: 7,
            window_secs: 42,
        }
        .to_limiter_config();
        assert_eq!(limiter.max_requests, 7);
        assert_eq!(limiter.window, std::time::Duration::from_secs(42));
    }
}

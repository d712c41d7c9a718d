use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL. Defaults to `todos.db` inside the data directory.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign and verify access tokens
    #[serde(default = "default_access_token_secret")]
    pub access_token_secret: String,
    /// Lifetime of an issued access token in seconds (default: 1 day)
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Max-Age of the access token cookie in seconds (default: 1 day)
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_secs: i64,
    /// Mark the access token cookie as `Secure`. Turn off only for plain-HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
    #[serde(skip)]
    generated_secret: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: default_access_token_secret(),
            access_token_ttl_secs: default_access_token_ttl(),
            cookie_name: default_cookie_name(),
            cookie_max_age_secs: default_cookie_max_age(),
            secure_cookies: default_secure_cookies(),
            generated_secret: false,
        }
    }
}

impl AuthConfig {
    /// Whether the signing secret was generated at startup rather than configured
    pub fn has_generated_secret(&self) -> bool {
        self.generated_secret
    }
}

fn default_access_token_secret() -> String {
    // Generate a random secret if not provided
    uuid::Uuid::new_v4().to_string()
}

fn default_access_token_ttl() -> i64 {
    86_400
}

fn default_cookie_name() -> String {
    "accessToken".to_string()
}

fn default_cookie_max_age() -> i64 {
    86_400
}

fn default_secure_cookies() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line or through the environment.
/// Each one, when present, replaces the value from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub access_token_secret: Option<String>,
    pub database_url: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
        } else {
            info!("No config file found, using defaults");
            let mut config = Config::default();
            config.auth.generated_secret = true;
            Ok(config)
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.auth.generated_secret = !content_sets_secret(content);
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(secret) = overrides.access_token_secret {
            self.auth.access_token_secret = secret;
            self.auth.generated_secret = false;
        }
        if let Some(url) = overrides.database_url {
            self.database.url = Some(url);
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Database URL, falling back to a file in the data directory
    pub fn database_url(&self) -> String {
        match &self.database.url {
            Some(url) => url.clone(),
            None => format!(
                "sqlite:{}?mode=rwc",
                self.server.data_dir.join("todos.db").display()
            ),
        }
    }

    pub fn warn_on_generated_secret(&self) {
        if self.auth.has_generated_secret() {
            warn!("No access token secret configured; issued tokens will not survive a restart");
        }
    }
}

fn content_sets_secret(content: &str) -> bool {
    toml::from_str::<toml::Table>(content)
        .ok()
        .and_then(|table| {
            table
                .get("auth")
                .and_then(|auth| auth.get("access_token_secret"))
                .map(|_| ())
        })
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("missing.toml")).unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.cookie_name, "accessToken");
        assert_eq!(config.auth.access_token_ttl_secs, 86_400);
        assert!(config.auth.secure_cookies);
        assert!(config.auth.has_generated_secret());
        assert!(config.database_url().ends_with("todos.db?mode=rwc"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[database]
url = "sqlite::memory:"

[auth]
access_token_secret = "file-secret"
secure_cookies = false
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.auth.access_token_secret, "file-secret");
        assert!(!config.auth.secure_cookies);
        assert!(!config.auth.has_generated_secret());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        assert!(Config::parse("[server\nport = ").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::parse("[server]\nport = 9100\n").unwrap();
        assert!(config.auth.has_generated_secret());

        config.apply(Overrides {
            access_token_secret: Some("env-secret".to_string()),
            database_url: Some("sqlite::memory:".to_string()),
            port: Some(3000),
            log_level: Some("debug".to_string()),
        });

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.access_token_secret, "env-secret");
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.logging.level, "debug");
        assert!(!config.auth.has_generated_secret());
    }
}

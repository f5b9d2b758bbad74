use config::{Config, ConfigError, Environment, File};
use judge::JudgeConfig;
use serde::Deserialize;

/// Environment variable pointing at an alternative config file (without extension).
pub const CONFIG_PATH_ENV: &str = "GAVEL_CONFIG";

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Connection pool size. Default: 100.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the service issuing tokens.
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    /// Maximum source size in bytes. Default: 65536 (64 KiB).
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Submissions per user per minute, 0 disables the limit. Default: 10.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
    /// Accepted values of the `language` field.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

fn default_max_size() -> usize {
    64 * 1024
}
fn default_rate_limit() -> u32 {
    10
}
fn default_languages() -> Vec<String> {
    ["c", "cpp", "java", "javascript", "python", "rust"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            rate_limit_per_minute: default_rate_limit(),
            languages: default_languages(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/config".into());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://gavel.db?mode=rwc")?
            .add_source(File::with_name(&path).required(false))
            // Override from environment (e.g., GAVEL__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("GAVEL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

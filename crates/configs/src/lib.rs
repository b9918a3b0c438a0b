use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Primary database; mappers send writes here and fall back to it for reads.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Optional read replica handed to mappers as their read adapter.
    #[serde(default)]
    pub replica: Option<DatabaseConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

/// Like [`load_from_file`], but a missing file yields the default config.
/// Unreadable or malformed files are still errors.
pub fn load_or_default(path: &str) -> Result<AppConfig> {
    match load_from_file(path) {
        Ok(cfg) => Ok(cfg),
        Err(e) => match e.downcast_ref::<std::io::Error>() {
            Some(io) if io.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
            _ => Err(e.context(format!("cannot load {path}"))),
        },
    }
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `CONFIG_PATH` (or `config.toml`), falling back to an all-default
    /// config when the file is missing so env vars alone can drive startup.
    pub fn load_and_validate() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut cfg = load_or_default(&config_path())?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.database.normalize_from_env("DATABASE_URL");
        self.database.validate("database")?;

        if self.replica.is_none() {
            if let Ok(url) = std::env::var("DATABASE_REPLICA_URL") {
                if !url.trim().is_empty() {
                    self.replica = Some(DatabaseConfig { url, ..self.database.pool_defaults() });
                }
            }
        }
        if let Some(replica) = self.replica.as_mut() {
            replica.normalize_from_env("DATABASE_REPLICA_URL");
            replica.validate("replica")?;
        }
        Ok(())
    }
}

impl DatabaseConfig {
    /// Fill an empty URL from the named environment variable.
    pub fn normalize_from_env(&mut self, var: &str) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var(var) {
                self.url = url;
            }
        }
    }

    /// Copy of the pool settings with the URL cleared.
    fn pool_defaults(&self) -> Self {
        Self { url: String::new(), ..self.clone() }
    }

    pub fn validate(&self, section: &str) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("{section}.url is empty; set it in config.toml or the environment"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("{section}.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("{section}.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("{section}.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("{section} timeouts must be positive seconds"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primary_and_replica() {
        let cfg = parse(
            r#"
            [database]
            url = "postgres://app@primary/app"
            max_connections = 20

            [replica]
            url = "postgres://app@replica/app"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.database.max_connections, 20);
        assert_eq!(cfg.database.min_connections, 2);
        assert_eq!(cfg.replica.as_ref().unwrap().url, "postgres://app@replica/app");
        assert_eq!(cfg.logging.format, LogFormat::Json);
        cfg.database.validate("database").unwrap();
    }

    #[test]
    fn replica_is_optional() {
        let cfg = parse("[database]\nurl = \"postgres://localhost/app\"\n").unwrap();
        assert!(cfg.replica.is_none());
        assert_eq!(cfg.logging.format, LogFormat::Compact);
    }

    #[test]
    fn default_pool_matches_serde_defaults() {
        let parsed = parse("[database]").unwrap().database;
        let built = DatabaseConfig::default();
        assert_eq!(parsed.max_connections, built.max_connections);
        assert_eq!(parsed.min_connections, built.min_connections);
        assert_eq!(parsed.acquire_timeout_secs, built.acquire_timeout_secs);
    }

    fn temp_config(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("configs_{}_{name}.toml", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("configs_{}_absent.toml", std::process::id()));
        let cfg = load_or_default(path.to_str().unwrap()).unwrap();
        assert!(cfg.database.url.is_empty());
        assert_eq!(cfg.database.min_connections, 2);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = temp_config("malformed", "[database\nurl = \"postgres://localhost/app\"\n");
        let res = load_or_default(path.to_str().unwrap());
        let _ = std::fs::remove_file(&path);
        assert!(res.is_err());
    }

    #[test]
    fn wrong_field_type_is_an_error() {
        let path = temp_config("bad_type", "[database]\nurl = \"postgres://localhost/app\"\nmax_connections = \"oops\"\n");
        let res = load_or_default(path.to_str().unwrap());
        let _ = std::fs::remove_file(&path);
        let err = res.unwrap_err();
        assert!(err.to_string().starts_with("cannot load"), "{err}");
    }

    #[test]
    fn valid_file_loads() {
        let path = temp_config("valid", "[database]\nurl = \"postgres://localhost/app\"\n");
        let res = load_or_default(path.to_str().unwrap());
        let _ = std::fs::remove_file(&path);
        assert_eq!(res.unwrap().database.url, "postgres://localhost/app");
    }

    #[test]
    fn rejects_bad_database_settings() {
        let mut db = DatabaseConfig { url: "mysql://localhost/app".into(), ..DatabaseConfig::default() };
        assert!(db.validate("database").is_err());

        db.url = "postgres://localhost/app".into();
        db.min_connections = 5;
        db.max_connections = 1;
        assert!(db.validate("database").is_err());

        db.max_connections = 5;
        db.validate("database").unwrap();
    }
}

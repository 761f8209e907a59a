#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_parse_or};

const DEFAULT_MAX_POOL_SIZE: u32 = 100;
const DEFAULT_MIN_POOL_SIZE: u32 = 5;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SERVER_SELECTION_TIMEOUT_SECS: u64 = 30;

/// MongoDB database configuration
///
/// Holds the connection string, the database to use and the pool settings
/// applied to the driver's `ClientOptions`.
///
/// # Example
///
/// ```ignore
/// use database::mongodb::MongoConfig;
///
/// let config = MongoConfig::with_database("mongodb://localhost:27017", "we-vibe")
///     .with_app_name("we-vibe-api");
///
/// // From environment variables (requires `config` feature)
/// let config = MongoConfig::from_env_or_database("we-vibe")?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// MongoDB connection URL
    /// Format: mongodb[+srv]://[username:password@]host[:port][/database][?options]
    pub url: String,

    /// Database name to use
    pub database: String,

    /// Optional application name for server logs
    pub app_name: Option<String>,

    /// Maximum number of connections in the pool
    pub max_pool_size: u32,

    /// Minimum number of connections in the pool
    pub min_pool_size: u32,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Server selection timeout in seconds
    pub server_selection_timeout_secs: u64,
}

impl MongoConfig {
    /// Create a config for `url` using the `default` database
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_database(url, "default")
    }

    /// Create a config with a specific database name
    pub fn with_database(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            app_name: None,
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            min_pool_size: DEFAULT_MIN_POOL_SIZE,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            server_selection_timeout_secs: DEFAULT_SERVER_SELECTION_TIMEOUT_SECS,
        }
    }

    /// Set the application name for server logs
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Get a reference to the MongoDB URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The URL with any password replaced by `***`, safe to log.
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        let Some((userinfo, host)) = rest.rsplit_once('@') else {
            return self.url.clone();
        };
        match userinfo.split_once(':') {
            Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
            None => self.url.clone(),
        }
    }

    /// Get the database name
    pub fn database(&self) -> &str {
        &self.database
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self::new("mongodb://localhost:27017")
    }
}

#[cfg(feature = "config")]
impl MongoConfig {
    /// Load from the environment, using `default_database` when no database
    /// variable is set.
    ///
    /// Environment variables:
    /// - `MONGODB_URL` or `MONGO_URL` - connection string. When neither is set,
    ///   `DB_USER`, `DB_PASS` and `MONGODB_HOST` are combined into an SRV URL.
    /// - `MONGODB_DATABASE` or `MONGO_DATABASE` (optional)
    /// - `MONGODB_APP_NAME` (optional)
    /// - `MONGODB_MAX_POOL_SIZE` (optional, default: 100)
    /// - `MONGODB_MIN_POOL_SIZE` (optional, default: 5)
    /// - `MONGODB_CONNECT_TIMEOUT_SECS` (optional, default: 10)
    /// - `MONGODB_SERVER_SELECTION_TIMEOUT_SECS` (optional, default: 30)
    pub fn from_env_or_database(default_database: &str) -> Result<Self, ConfigError> {
        let url = match std::env::var("MONGODB_URL").or_else(|_| std::env::var("MONGO_URL")) {
            Ok(url) => url,
            Err(_) => srv_url_from_credentials()?,
        };

        let database = std::env::var("MONGODB_DATABASE")
            .or_else(|_| std::env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| default_database.to_string());

        Ok(Self {
            url,
            database,
            app_name: std::env::var("MONGODB_APP_NAME").ok(),
            max_pool_size: env_parse_or("MONGODB_MAX_POOL_SIZE", DEFAULT_MAX_POOL_SIZE)?,
            min_pool_size: env_parse_or("MONGODB_MIN_POOL_SIZE", DEFAULT_MIN_POOL_SIZE)?,
            connect_timeout_secs: env_parse_or(
                "MONGODB_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
            server_selection_timeout_secs: env_parse_or(
                "MONGODB_SERVER_SELECTION_TIMEOUT_SECS",
                DEFAULT_SERVER_SELECTION_TIMEOUT_SECS,
            )?,
        })
    }
}

#[cfg(feature = "config")]
fn srv_url_from_credentials() -> Result<String, ConfigError> {
    let missing = || ConfigError::MissingEnvVar("MONGODB_URL or MONGO_URL".to_string());

    let user = std::env::var("DB_USER").map_err(|_| missing())?;
    let pass = std::env::var("DB_PASS").map_err(|_| missing())?;
    let host = std::env::var("MONGODB_HOST").map_err(|_| missing())?;

    Ok(format!(
        "mongodb+srv://{}:{}@{}/?retryWrites=true&w=majority",
        urlencoding::encode(&user),
        urlencoding::encode(&pass),
        host
    ))
}

#[cfg(feature = "config")]
impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_or_database("default")
    }
}

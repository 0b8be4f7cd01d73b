use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Comma separated list of origins allowed by CORS
    pub cors_allowed_origins: String,
    pub rate_limit_requests: u32,
    pub rate_limit_period_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::default())
    }

    fn load(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("database_url", "postgresql://localhost/storefront")?
            .set_default("bind_address", "0.0.0.0:8080")?
            .set_default("db_max_connections", 20)?
            .set_default("db_min_connections", 2)?
            .set_default("db_acquire_timeout_secs", 30)?
            .set_default("cors_allowed_origins", "http://localhost:3000")?
            .set_default("rate_limit_requests", 100)?
            .set_default("rate_limit_period_secs", 60)?
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    /// Attempts a student may start per exam; 0 disables the limit.
    pub max_attempts_per_exam: u32,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "exams".to_string());

        let max_attempts_per_exam = settings
            .get_int("attempts.max_per_exam")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| {
                env::var("MAX_ATTEMPTS_PER_EXAM")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(0);

        Ok(Config {
            mongo_uri,
            mongo_database,
            max_attempts_per_exam,
        })
    }
}

// utils/config.rs
use crate::infrastructure::error::{AppError, AppResult};
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Backend de stockage des comptes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        match value.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::Configuration(format!(
                "STORE_BACKEND must be 'postgres' or 'memory', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Environnement et serveur
    pub run_mode: String,
    pub server_host: String,
    pub server_port: u16,
    pub workers: usize,
    pub log_level: String,
    pub log_format: String,

    // Stockage
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Sécurité
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub google_oauth_client_id: Option<String>,
    pub google_tokeninfo_url: String,

    // Service de légende
    pub caption_api_url: Option<String>,
    pub caption_api_token: Option<String>,
    pub caption_max_attempts: u32,
    pub caption_retry_delay_secs: u64,
    pub caption_timeout_secs: u64,

    // Modèles
    pub model_dir: PathBuf,
    pub sketch_threshold: f32,

    // Limites
    pub max_upload_size_mb: u64,
}

impl Config {
    /// Charger la configuration depuis les variables d'environnement
    pub fn from_env() -> AppResult<Self> {
        // Charger le fichier .env si présent
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construit la configuration depuis une source de variables quelconque
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| {
                AppError::Configuration(format!("Missing required environment variable: {}", key))
            })
        };

        let store_backend: StoreBackend = parse_or(&lookup, "STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(AppError::Configuration(
                "DATABASE_URL is required when STORE_BACKEND=postgres".to_string(),
            ));
        }

        let config = Config {
            run_mode: lookup("RUN_MODE").unwrap_or_else(|| "development".to_string()),
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", 4000)?,
            workers: parse_or(&lookup, "WORKERS", 4)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "json".to_string()),

            store_backend,
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,

            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_hours: parse_or(&lookup, "JWT_EXPIRY_HOURS", 24)?,
            google_oauth_client_id: lookup("GOOGLE_OAUTH_CLIENT_ID").filter(|v| !v.is_empty()),
            google_tokeninfo_url: lookup("GOOGLE_TOKENINFO_URL")
                .unwrap_or_else(|| "https://oauth2.googleapis.com/tokeninfo".to_string()),

            caption_api_url: lookup("CAPTION_API_URL").filter(|v| !v.is_empty()),
            caption_api_token: lookup("CAPTION_API_TOKEN").filter(|v| !v.is_empty()),
            caption_max_attempts: parse_or(&lookup, "CAPTION_MAX_ATTEMPTS", 3)?,
            caption_retry_delay_secs: parse_or(&lookup, "CAPTION_RETRY_DELAY_SECS", 5)?,
            caption_timeout_secs: parse_or(&lookup, "CAPTION_TIMEOUT_SECS", 30)?,

            model_dir: lookup("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./models")),
            sketch_threshold: parse_or(&lookup, "SKETCH_THRESHOLD", 0.5)?,

            max_upload_size_mb: parse_or(&lookup, "MAX_UPLOAD_SIZE_MB", 5)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Valide les paramètres critiques
    fn validate(&self) -> AppResult<()> {
        if self.server_port == 0 {
            return Err(AppError::Configuration("SERVER_PORT must not be 0".to_string()));
        }
        if self.caption_max_attempts == 0 {
            return Err(AppError::Configuration(
                "CAPTION_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.sketch_threshold) {
            return Err(AppError::Configuration(
                "SKETCH_THRESHOLD must be in [0, 1)".to_string(),
            ));
        }
        if self.jwt_expiry_hours <= 0 {
            return Err(AppError::Configuration(
                "JWT_EXPIRY_HOURS must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn caption_retry_delay(&self) -> Duration {
        Duration::from_secs(self.caption_retry_delay_secs)
    }

    pub fn caption_timeout(&self) -> Duration {
        Duration::from_secs(self.caption_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_size_mb as usize).saturating_mul(1024 * 1024)
    }
}

/// Lit une variable et la parse, avec valeur par défaut si absente
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.is_empty() => raw.trim().parse().map_err(|_| {
            AppError::Configuration(format!("{} has an invalid value: '{}'", key, raw))
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppResult<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("JWT_SECRET", "s3cret"), ("STORE_BACKEND", "memory")]).unwrap();
        assert_eq!(config.server_port, 4000);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.caption_max_attempts, 3);
        assert_eq!(config.caption_retry_delay(), Duration::from_secs(5));
        assert_eq!(config.sketch_threshold, 0.5);
        assert_eq!(config.max_upload_bytes(), 5 * 1024 * 1024);
        assert!(config.caption_api_url.is_none());
        assert_eq!(config.run_mode, "development");
    }

    #[test]
    fn test_missing_jwt_secret() {
        let err = config_from(&[("STORE_BACKEND", "memory")]).unwrap_err();
        assert!(matches!(err, AppError::Configuration(msg) if msg.contains("JWT_SECRET")));
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = config_from(&[("JWT_SECRET", "s")]).unwrap_err();
        assert!(matches!(err, AppError::Configuration(msg) if msg.contains("DATABASE_URL")));

        let config = config_from(&[("JWT_SECRET", "s"), ("DATABASE_URL", "postgres://x")]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Postgres);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = config_from(&[
            ("JWT_SECRET", "s"),
            ("STORE_BACKEND", "memory"),
            ("SERVER_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(msg) if msg.contains("SERVER_PORT")));

        let err = config_from(&[
            ("JWT_SECRET", "s"),
            ("STORE_BACKEND", "memory"),
            ("CAPTION_MAX_ATTEMPTS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_unknown_backend() {
        let err = config_from(&[("JWT_SECRET", "s"), ("STORE_BACKEND", "mongo")]).unwrap_err();
        assert!(matches!(err, AppError::Configuration(msg) if msg.contains("mongo")));
    }
}

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

const DEFAULT_DB_PATH: &str = "fithub.db";
const DEFAULT_PORT: u16 = 8000;
// Vite and React dev servers
const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub port: u16,
    pub cors_origins: CorsOrigins,
    pub seed_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = var("FITHUB_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.into());

        let port = match var("FITHUB_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid FITHUB_PORT {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        let cors_origins = match var("FITHUB_CORS_ORIGINS") {
            Some(raw) if raw.trim() == "*" => CorsOrigins::Any,
            Some(raw) => {
                let origins: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                for origin in &origins {
                    HeaderValue::from_str(origin)
                        .with_context(|| format!("invalid CORS origin {origin:?}"))?;
                }
                CorsOrigins::List(origins)
            }
            None => CorsOrigins::List(DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect()),
        };

        Ok(Self {
            db_path,
            port,
            cors_origins,
            seed_path: var("FITHUB_SEED_PATH"),
        })
    }

    pub fn cors_layer(&self) -> CorsLayer {
        match &self.cors_origins {
            CorsOrigins::Any => CorsLayer::permissive(),
            CorsOrigins::List(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|o| HeaderValue::from_str(o).ok())
                    .collect();
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
    }
}

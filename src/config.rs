use std::env;

use crate::error::AppError;

const DEFAULT_DISTANCE_API_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub distance_api_url: String,
    pub distance_api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 8080)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            distance_api_url: env::var("DISTANCE_API_URL")
                .unwrap_or_else(|_| DEFAULT_DISTANCE_API_URL.to_string()),
            distance_api_key: env::var("DISTANCE_API_KEY").unwrap_or_default(),
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

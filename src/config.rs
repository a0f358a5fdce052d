use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub moderation: ModerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Public ICS URL of the external calendar.
    pub calendar_url: String,
    /// Ordered list of CORS-bypass forwarding proxies; the encoded feed URL is
    /// appended to each. Empty list means fetch the feed directly.
    pub cors_proxies: Vec<String>,
    /// Per-request timeout for feed fetches.
    pub request_timeout_seconds: u64,
    /// How long a cached merged-event list stays valid.
    pub cache_ttl_seconds: u64,
    /// Interval between background feed refreshes.
    pub refresh_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// EmailJS credentials; all three must be set for outbound email.
    pub service_id: Option<String>,
    pub template_id: Option<String>,
    pub public_key: Option<String>,
    pub admin_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    /// Maximum event requests a user may submit per local calendar day.
    pub max_requests_per_day: u32,
}

const DEFAULT_CORS_PROXIES: &str = "https://api.allorigins.win/raw?url=,https://corsproxy.io/?,https://api.codetabs.com/v1/proxy?quest=";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/app.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            feed: FeedConfig {
                calendar_url: env::var("CALENDAR_FEED_URL")
                    .map_err(|_| ConfigError::MissingEnv("CALENDAR_FEED_URL".to_string()))?,
                cors_proxies: env::var("CORS_PROXIES")
                    .unwrap_or_else(|_| DEFAULT_CORS_PROXIES.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                request_timeout_seconds: env::var("FEED_REQUEST_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .unwrap_or(15),
                cache_ttl_seconds: env::var("EVENT_CACHE_TTL_SECONDS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
                refresh_interval_seconds: env::var("FEED_REFRESH_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .map_err(|_| ConfigError::MissingEnv("JWT_SECRET".to_string()))?,
            },
            email: EmailConfig {
                service_id: env::var("EMAILJS_SERVICE_ID").ok(),
                template_id: env::var("EMAILJS_TEMPLATE_ID").ok(),
                public_key: env::var("EMAILJS_PUBLIC_KEY").ok(),
                admin_email: env::var("ADMIN_EMAIL")
                    .map_err(|_| ConfigError::MissingEnv("ADMIN_EMAIL".to_string()))?,
            },
            moderation: ModerationConfig {
                max_requests_per_day: env::var("MAX_REQUESTS_PER_DAY")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/app.db".to_string(),
                max_connections: 5,
            },
            feed: FeedConfig {
                calendar_url: String::new(),
                cors_proxies: DEFAULT_CORS_PROXIES
                    .split(',')
                    .map(|s| s.to_string())
                    .collect(),
                request_timeout_seconds: 15,
                cache_ttl_seconds: 300,
                refresh_interval_seconds: 300,
            },
            jwt: JwtConfig {
                secret: String::new(),
            },
            email: EmailConfig {
                service_id: None,
                template_id: None,
                public_key: None,
                admin_email: String::new(),
            },
            moderation: ModerationConfig {
                max_requests_per_day: 3,
            },
        }
    }
}

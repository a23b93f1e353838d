use std::env;

/// Which record store backs the server. The embedded SQLite file is the
/// default so a bare checkout starts with zero configuration; hosted
/// deployments point DATABASE_URL at their Postgres-speaking service.
#[derive(Clone, Debug)]
pub enum StoreConfig {
    Sqlite { path: String },
    Postgres { url: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub store: StoreConfig,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());
        let store = match backend.as_str() {
            "sqlite" => StoreConfig::Sqlite {
                path: env::var("SQLITE_PATH").unwrap_or_else(|_| "appointments.db".to_string()),
            },
            "postgres" => StoreConfig::Postgres {
                url: env::var("DATABASE_URL")?,
            },
            other => anyhow::bail!("unknown STORE_BACKEND: {other} (expected sqlite or postgres)"),
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development fallback secret");
                "fallback_secret".to_string()
            }
        };

        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(24);

        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN").ok().filter(|s| !s.is_empty());
        let telegram_chat_id = env::var("TELEGRAM_CHAT_ID").ok().filter(|s| !s.is_empty());

        Ok(Self {
            store,
            bind_addr,
            jwt_secret,
            token_ttl_hours,
            telegram_bot_token,
            telegram_chat_id,
        })
    }
}

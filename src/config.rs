use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub provider_base_url: String,
    /// Remote lookups are abandoned past this deadline; local results still win.
    pub remote_timeout_ms: u64,
    /// Queries shorter than this never hit the remote provider.
    pub min_remote_chars: usize,
    pub local_limit: i64,
    pub result_cap: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolloverConfig {
    /// Offset of the deployment's local calendar day from UTC, in hours.
    pub utc_offset_hours: i32,
    pub tick_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub search: SearchConfig,
    pub rollover: RolloverConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://fitplan.db".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "fitplan".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "fitplan-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let search = SearchConfig {
            provider_base_url: std::env::var("FOOD_API_BASE_URL")
                .unwrap_or_else(|_| "https://world.openfoodfacts.org".into()),
            remote_timeout_ms: env_or("SEARCH_REMOTE_TIMEOUT_MS", 2000),
            min_remote_chars: env_or("SEARCH_MIN_REMOTE_CHARS", 3),
            local_limit: env_or("SEARCH_LOCAL_LIMIT", 15),
            result_cap: env_or("SEARCH_RESULT_CAP", 20),
        };
        let rollover = RolloverConfig {
            utc_offset_hours: env_or("UTC_OFFSET_HOURS", 0),
            tick_seconds: env_or("ROLLOVER_TICK_SECONDS", 60),
        };
        Ok(Self {
            database_url,
            jwt,
            search,
            rollover,
        })
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            search: SearchConfig {
                provider_base_url: "http://localhost:0".into(),
                remote_timeout_ms: 2000,
                min_remote_chars: 3,
                local_limit: 15,
                result_cap: 20,
            },
            rollover: RolloverConfig {
                utc_offset_hours: 0,
                tick_seconds: 60,
            },
        }
    }
}

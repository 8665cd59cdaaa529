use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: String,
}

/// Open Food Facts client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub page_size: u32,
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoalDefaults {
    pub hydration_ml: f64,
    pub calories: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub catalog: CatalogConfig,
    pub goals: GoalDefaults,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").ok().filter(|v| !v.is_empty()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authenticated".into()),
        };
        let catalog = CatalogConfig {
            base_url: std::env::var("OFF_BASE_URL")
                .unwrap_or_else(|_| "https://world.openfoodfacts.org".into()),
            user_agent: std::env::var("OFF_USER_AGENT").unwrap_or_else(|_| {
                format!("pulselog/{} (health tracking backend)", env!("CARGO_PKG_VERSION"))
            }),
            timeout_secs: env_or("OFF_TIMEOUT_SECS", 10),
            page_size: env_or("SEARCH_PAGE_SIZE", 25),
            debounce_ms: env_or("SEARCH_DEBOUNCE_MS", 300),
        };
        let goals = GoalDefaults {
            hydration_ml: env_or("DEFAULT_HYDRATION_GOAL_ML", 2500.0),
            calories: env_or("DEFAULT_CALORIE_GOAL", 2000.0),
        };
        Ok(Self {
            database_url,
            jwt,
            catalog,
            goals,
        })
    }
}

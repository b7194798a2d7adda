use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/stem-forum";

const DEFAULT_ORIGINS: &str = "http://localhost:3000,https://stemoctobermagazine.org,https://www.stemoctobermagazine.org";

pub struct Config {
    pub port: u16,
    pub mongodb_uri: String,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "5000"),
            mongodb_uri: try_load("MONGODB_URI", DEFAULT_MONGODB_URI),
            allowed_origins: parse_origins(&try_load::<String>("ALLOWED_ORIGINS", DEFAULT_ORIGINS)),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

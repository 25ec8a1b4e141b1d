use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub session_ttl_days: i64,
    pub quiz_data_dir: String,
    pub chart_output_dir: String,
    pub chart_script_path: String,
    pub python_bin: String,
    pub chart_timeout_secs: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            session_ttl_days: get_env_or_parse("SESSION_TTL_DAYS", 7)?,
            quiz_data_dir: env::var("QUIZ_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            chart_output_dir: env::var("CHART_OUTPUT_DIR")
                .unwrap_or_else(|_| "quiz_results".to_string()),
            chart_script_path: env::var("CHART_SCRIPT_PATH")
                .unwrap_or_else(|_| "scripts/render_chart.py".to_string()),
            python_bin: env::var("PYTHON_BIN").unwrap_or_else(|_| "python3".to_string()),
            chart_timeout_secs: get_env_or_parse("CHART_TIMEOUT_SECS", 15)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or_parse<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

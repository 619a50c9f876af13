use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-pro", "gemini-2.0-flash"];
pub const DEFAULT_ROLE: &str = "Software Engineer";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub models: Vec<String>,
    pub llm_max_retries: usize,
    pub llm_max_output_tokens: u32,
    pub llm_timeout_secs: u64,
    pub max_regenerate_attempts: usize,
    pub similarity_threshold: f64,
    pub default_role: String,
    pub public_rps: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let models = parse_models(&get_env_or("GEMINI_MODELS", &DEFAULT_MODELS.join(",")));
        if models.is_empty() {
            return Err(Error::Config(
                "GEMINI_MODELS must name at least one model".to_string(),
            ));
        }

        let similarity_threshold: f64 = get_env_parse_or("SIMILARITY_THRESHOLD", 0.45)?;
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(Error::Config(format!(
                "SIMILARITY_THRESHOLD must be within [0, 1], got {}",
                similarity_threshold
            )));
        }

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8080"),
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            gemini_base_url: get_env_or("GEMINI_BASE_URL", DEFAULT_BASE_URL),
            models,
            llm_max_retries: get_env_parse_or("LLM_MAX_RETRIES", 3)?,
            llm_max_output_tokens: get_env_parse_or("LLM_MAX_OUTPUT_TOKENS", 700)?,
            llm_timeout_secs: get_env_parse_or("LLM_TIMEOUT_SECS", 60)?,
            max_regenerate_attempts: get_env_parse_or("MAX_REGENERATE_ATTEMPTS", 4)?,
            similarity_threshold,
            default_role: get_env_or("DEFAULT_ROLE", DEFAULT_ROLE),
            public_rps: get_env_parse_or("PUBLIC_RPS", 5)?,
        })
    }
}

/// Splits a comma separated model list, dropping blanks and a leading `models/`.
pub fn parse_models(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim())
        .map(|m| m.strip_prefix("models/").unwrap_or(m))
        .map(|m| m.strip_suffix(":generateContent").unwrap_or(m))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}

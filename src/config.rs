use std::{env, fs};
use log::{info, warn};
use crate::errors::AppError;

pub fn init_logging() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
}

/// Loads a `.env` file from the working directory when one exists.
pub fn load_env() {
    if dotenv::dotenv().is_ok() {
        info!("Loaded environment from .env");
    }
}

pub const DEFAULT_MODEL_NAME: &str = "gemini-2.5-flash";
pub const DEFAULT_MAX_EXCHANGES: usize = 5;
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_SECRETS_PATH: &str = ".secrets/secrets.toml";
const API_KEY_ENV: &str = "GOOGLE_API_KEY";
const API_KEY_SECRET: &str = "google_api_key";

pub const REFLECTION_PROMPT: &str = "You are a warm, thoughtful reflective-writing tutor. \
A learner has shared the journal entry below and wants to reflect on it with you.

Guide the conversation the way a good tutor would:
- Ask one open, specific question at a time about what the learner wrote.
- Help them move from describing what happened to what they felt, what they learned, and what they might do differently.
- Refer to concrete details from the journal entry rather than speaking in generalities.
- Keep each reply short (a few sentences) and end with a single question.
- Do not judge, diagnose, or lecture. If the learner seems distressed, respond with care and suggest talking to someone they trust.

The conversation is limited to a handful of exchanges, so make every question count.";

pub const APOLOGY_MESSAGE: &str = "Sorry, something went wrong while generating a response. Please try again.";
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please check the server log for details.";

pub fn model_name() -> String {
    env::var("GEMINI_MODEL")
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string())
}

pub fn max_exchanges() -> usize {
    parse_max_exchanges(env::var("MAX_EXCHANGES").ok().as_deref())
}

fn parse_max_exchanges(raw: Option<&str>) -> usize {
    match raw.map(|value| value.trim().parse::<usize>()) {
        Some(Ok(limit)) if limit > 0 => limit,
        Some(_) => {
            warn!("Ignoring invalid MAX_EXCHANGES, using {}", DEFAULT_MAX_EXCHANGES);
            DEFAULT_MAX_EXCHANGES
        }
        None => DEFAULT_MAX_EXCHANGES,
    }
}

pub fn bind_address() -> String {
    env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string())
}

pub fn secrets_path() -> String {
    env::var("SECRETS_PATH").unwrap_or_else(|_| DEFAULT_SECRETS_PATH.to_string())
}

/// Resolves the API key from the environment, then from the secrets file.
pub fn api_key() -> Result<String, AppError> {
    if let Ok(key) = env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            return Ok(key.trim().to_string());
        }
    }

    let path = secrets_path();
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(_) => return Err(AppError::MissingApiKey),
    };
    read_key_from_secrets(&contents, API_KEY_SECRET)
}

/// Reads a string key from TOML secrets contents
fn read_key_from_secrets(contents: &str, key: &str) -> Result<String, AppError> {
    let table: toml::Table = contents
        .parse()
        .map_err(|e: toml::de::Error| AppError::Config(e.to_string()))?;
    match table.get(key).and_then(|value| value.as_str()) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(AppError::MissingApiKey),
    }
}

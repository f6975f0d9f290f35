use secrecy::Secret;
use service_core::config::{self as core_config, get_env, get_env_parsed, is_production};
use service_core::error::AppError;
use std::time::Duration;

/// Default request body ceiling for uploads (10 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub common: core_config::Config,
    pub model: ModelConfig,
    pub groq: GroqConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Path to the ONNX export of the classifier.
    pub path: String,
    /// Edge length of the square model input.
    pub input_size: u32,
    pub intra_threads: usize,
}

#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: Secret<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl ServiceConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = is_production();

        Ok(ServiceConfig {
            common,
            model: ModelConfig {
                path: get_env("MODEL_PATH", Some("trained_model.onnx"), is_prod)?,
                input_size: get_env_parsed("MODEL_INPUT_SIZE", Some("128"), is_prod)?,
                intra_threads: get_env_parsed("MODEL_INTRA_THREADS", Some("4"), is_prod)?,
            },
            groq: GroqConfig::load(is_prod)?,
            upload: UploadConfig {
                max_bytes: get_env_parsed(
                    "MAX_UPLOAD_BYTES",
                    Some(&DEFAULT_MAX_UPLOAD_BYTES.to_string()),
                    is_prod,
                )?,
            },
        })
    }
}

impl GroqConfig {
    /// The API key has no default in any environment.
    pub fn load(is_prod: bool) -> Result<Self, AppError> {
        let api_key = get_env("GROQ_API_KEY", None, is_prod)?;
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GROQ_API_KEY is set but empty"
            )));
        }

        let timeout_secs: u64 = get_env_parsed("GROQ_TIMEOUT_SECS", Some("30"), is_prod)?;

        Ok(GroqConfig {
            api_key: Secret::new(api_key),
            base_url: get_env(
                "GROQ_BASE_URL",
                Some("https://api.groq.com/openai/v1"),
                is_prod,
            )?
            .trim_end_matches('/')
            .to_string(),
            model: get_env("GROQ_MODEL", Some("llama3-8b-8192"), is_prod)?,
            temperature: get_env_parsed("GROQ_TEMPERATURE", Some("0.7"), is_prod)?,
            max_tokens: get_env_parsed("GROQ_MAX_TOKENS", Some("200"), is_prod)?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

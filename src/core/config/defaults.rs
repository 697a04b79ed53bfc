use std::fmt;

use crate::core::config::data::{
    ApiModelConfig, Config, Defaults, LocalModelConfig, ParameterRanges, Range, ServerConfig,
    StatusMessages,
};
use crate::core::model::GenerationParams;

pub const DEFAULT_HISTORY_LIMIT: i64 = 10;
pub const DEFAULT_BIND: &str = "127.0.0.1:7860";

impl Default for Config {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            personas_path: None,
            defaults: Defaults::default(),
            parameters: ParameterRanges::default(),
            messages: StatusMessages::default(),
            local_model: LocalModelConfig::default(),
            api_model: ApiModelConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            system_message: "You are a friendly chatbot.".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.95,
            use_local_model: false,
        }
    }
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            max_tokens: Range {
                min: 1,
                max: 2048,
                step: 1,
            },
            temperature: Range {
                min: 0.1,
                max: 4.0,
                step: 0.1,
            },
            top_p: Range {
                min: 0.1,
                max: 1.0,
                step: 0.05,
            },
        }
    }
}

impl Default for StatusMessages {
    fn default() -> Self {
        Self {
            loading_message: "⏳ The local model is still loading. Your message is queued and will be answered as soon as it is ready...".to_string(),
            model_load_failed: "❌ The local model failed to load. Switch to the hosted API or try again later.".to_string(),
            model_ready: "✅ Model ready, generating a reply...".to_string(),
            login_required: "🔒 Please log in to use the hosted API.".to_string(),
            load_timed_out: "⌛ The local model is taking too long to load. Please try again later.".to_string(),
            error_prefix: "Error generating response: ".to_string(),
        }
    }
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://127.0.0.1:8080/v1".to_string(),
            model: "local".to_string(),
            probe_interval_ms: 1000,
            max_load_attempts: 300,
            load_timeout_secs: None,
        }
    }
}

impl Default for ApiModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.huggingface.co/v1".to_string(),
            model: "HuggingFaceH4/zephyr-7b-beta".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// A generation parameter outside its configured range.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterError {
    pub name: &'static str,
    pub value: String,
    pub min: String,
    pub max: String,
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} must be between {} and {} (got {})",
            self.name, self.min, self.max, self.value
        )
    }
}

impl std::error::Error for ParameterError {}

fn check<T>(name: &'static str, value: T, range: &Range<T>) -> Result<(), ParameterError>
where
    T: PartialOrd + fmt::Display + Copy,
{
    // NaN compares false on both sides and is rejected here too
    if value >= range.min && value <= range.max {
        Ok(())
    } else {
        Err(ParameterError {
            name,
            value: value.to_string(),
            min: range.min.to_string(),
            max: range.max.to_string(),
        })
    }
}

impl ParameterRanges {
    pub fn validate(&self, params: &GenerationParams) -> Result<(), ParameterError> {
        check("max_tokens", params.max_tokens, &self.max_tokens)?;
        check("temperature", params.temperature, &self.temperature)?;
        check("top_p", params.top_p, &self.top_p)
    }
}

impl Config {
    pub fn default_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.defaults.max_tokens,
            temperature: self.defaults.temperature,
            top_p: self.defaults.top_p,
        }
    }
}

// Provider/model registry and per-request API key selection

use std::collections::HashMap;
use std::fmt;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Model provider reachable through an OpenAI-compatible endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    OpenAI,
    OpenRouter,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Google, Provider::OpenAI, Provider::OpenRouter];

    /// Request header carrying this provider's key
    pub fn header_key(&self) -> &'static str {
        match self {
            Provider::Google => "X-Google-API-Key",
            Provider::OpenAI => "X-OpenAI-API-Key",
            Provider::OpenRouter => "X-OpenRouter-API-Key",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::OpenAI => crate::openai::OPENAI_API_BASE,
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    /// Only the Google key is mandatory; it also powers summaries.
    pub fn is_required(&self) -> bool {
        matches!(self, Provider::Google)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::OpenAI => "openai",
            Provider::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelConfig {
    /// Display name shown to users
    pub name: &'static str,
    /// Identifier sent to the provider
    pub model_id: &'static str,
    pub provider: Provider,
}

impl ModelConfig {
    pub fn header_key(&self) -> &'static str {
        self.provider.header_key()
    }
}

pub const AI_MODELS: &[ModelConfig] = &[
    ModelConfig {
        name: "Deepseek R1 0528",
        model_id: "deepseek/deepseek-r1-0528:free",
        provider: Provider::OpenRouter,
    },
    ModelConfig {
        name: "Deepseek V3",
        model_id: "deepseek/deepseek-chat-v3-0324:free",
        provider: Provider::OpenRouter,
    },
    ModelConfig {
        name: "Gemini 2.5 Pro",
        model_id: "gemini-2.5-pro-preview-05-06",
        provider: Provider::Google,
    },
    ModelConfig {
        name: "Gemini 2.5 Flash",
        model_id: "gemini-2.5-flash-preview-04-17",
        provider: Provider::Google,
    },
    ModelConfig {
        name: "GPT-4o",
        model_id: "gpt-4o",
        provider: Provider::OpenAI,
    },
    ModelConfig {
        name: "GPT-4.1-mini",
        model_id: "gpt-4.1-mini",
        provider: Provider::OpenAI,
    },
];

pub const DEFAULT_MODEL: &str = "Gemini 2.5 Flash";

/// Look a model up by display name or provider model id
pub fn get_model_config(model: &str) -> Option<ModelConfig> {
    AI_MODELS
        .iter()
        .find(|m| m.name == model || m.model_id == model)
        .copied()
}

/// Provider keys supplied with a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    keys: HashMap<Provider, String>,
}

impl ApiKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect keys from their provider headers; blank values count as absent
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let keys = Provider::ALL
            .iter()
            .filter_map(|provider| {
                headers
                    .get(provider.header_key())
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (*provider, v.to_string()))
            })
            .collect();
        Self { keys }
    }

    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        let key = key.into();
        if key.trim().is_empty() {
            self.keys.remove(&provider);
        } else {
            self.keys.insert(provider, key);
        }
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    pub fn has_required_keys(&self) -> bool {
        Provider::ALL
            .iter()
            .filter(|p| p.is_required())
            .all(|p| self.keys.contains_key(p))
    }
}

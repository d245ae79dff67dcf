use serde::{Deserialize, Serialize};
use crate::settings::{ApiAuth, ApiType};

/// Compiled-in fallbacks, consulted after per-chat overrides and settings.
/// Hosts may override any subset of fields when opening the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientDefaults {
    pub model: String,
    pub api_type: ApiType,
    pub api_auth: ApiAuth,
    pub api_base: String,
    pub api_version: String,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            api_type: ApiType::OpenAi,
            api_auth: ApiAuth::BearerToken,
            api_base: "https://api.openai.com/v1".to_string(),
            api_version: "2023-03-15-preview".to_string(),
        }
    }
}

/// Fully resolved connection parameters for one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub api_key: String,
    pub api_type: ApiType,
    pub api_auth: ApiAuth,
    pub api_base: String,
    pub api_version: String,
}

impl Connection {
    /// `{api_base}/chat/completions`, tolerating a trailing slash on the base.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    pub fn models_url(&self) -> String {
        format!("{}/models", self.api_base.trim_end_matches('/'))
    }

    /// Bearer token to send, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        let bearer = match self.api_type {
            ApiType::OpenAi => true,
            ApiType::Custom => self.api_auth == ApiAuth::BearerToken,
        };
        bearer.then_some(self.api_key.as_str())
    }

    /// Value for the `api-key` header used by custom deployments.
    pub fn api_key_header(&self) -> Option<&str> {
        (self.api_type == ApiType::Custom && self.api_auth == ApiAuth::ApiKey)
            .then_some(self.api_key.as_str())
    }

    /// `api-version` query parameter, sent to custom endpoints only.
    pub fn version_query(&self) -> Option<&str> {
        (self.api_type == ApiType::Custom).then_some(self.api_version.as_str())
    }
}

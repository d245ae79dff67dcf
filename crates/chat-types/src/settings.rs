use serde::{Deserialize, Serialize};

/// Id of the singleton settings record
pub const GENERAL_SETTINGS_ID: &str = "general";

/// Flavour of completion endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    OpenAi,
    Custom,
}

/// How the API key is presented to a custom endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiAuth {
    None,
    BearerToken,
    ApiKey,
}

/// User settings. Every field is optional; unset fields fall back to
/// [`crate::config::ClientDefaults`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_type: Option<ApiType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_auth: Option<ApiAuth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: GENERAL_SETTINGS_ID.to_string(),
            api_key: None,
            model: None,
            api_type: None,
            api_auth: None,
            api_base: None,
            api_version: None,
        }
    }
}

//! Resolves model and connection parameters for a request.
//!
//! Priority for every field: chat override, then stored settings, then the
//! compiled-in default.

use chat_types::{
    chat::Chat,
    config::{ClientDefaults, Connection},
    settings::{ApiAuth, ApiType, Settings},
};

/// API key to send, if one can be resolved. A custom endpoint with
/// authentication disabled resolves to an empty key.
pub fn resolve_api_key(settings: Option<&Settings>, defaults: &ClientDefaults) -> Option<String> {
    let key = settings
        .and_then(|s| s.api_key.as_deref())
        .map(str::trim)
        .filter(|k| !k.is_empty());
    if let Some(key) = key {
        return Some(key.to_string());
    }

    let api_type = settings.and_then(|s| s.api_type).unwrap_or(defaults.api_type);
    let api_auth = settings.and_then(|s| s.api_auth).unwrap_or(defaults.api_auth);
    (api_type == ApiType::Custom && api_auth == ApiAuth::None).then(String::new)
}

pub fn resolve_model(chat: Option<&Chat>, settings: Option<&Settings>, defaults: &ClientDefaults) -> String {
    chat.and_then(|c| c.model.clone())
        .or_else(|| settings.and_then(|s| s.model.clone()))
        .unwrap_or_else(|| defaults.model.clone())
}

pub fn resolve_connection(
    chat: Option<&Chat>,
    settings: Option<&Settings>,
    defaults: &ClientDefaults,
    api_key: String,
) -> Connection {
    let api_base = chat
        .and_then(|c| c.api_base.clone())
        .or_else(|| settings.and_then(|s| s.api_base.clone()))
        .unwrap_or_else(|| defaults.api_base.clone());
    let api_version = chat
        .and_then(|c| c.api_version.clone())
        .or_else(|| settings.and_then(|s| s.api_version.clone()))
        .unwrap_or_else(|| defaults.api_version.clone());

    Connection {
        api_key,
        api_type: settings.and_then(|s| s.api_type).unwrap_or(defaults.api_type),
        api_auth: settings.and_then(|s| s.api_auth).unwrap_or(defaults.api_auth),
        api_base,
        api_version,
    }
}

#[cfg(test)]
mod tests {
    use crate::chat::*;
    use crate::config::*;
    use crate::error::*;
    use crate::event::*;
    use crate::message::*;
    use crate::persona::*;
    use crate::settings::*;

    // ─── Message Tests ───────────────────────────────────────

    #[test]
    fn test_message_record_new() {
        let msg = MessageRecord::new("chat-1", Role::User, "Hello");
        assert_eq!(msg.chat_id, "chat-1");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.is_generating);
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = MessageRecord::new("c", Role::User, "x");
        let b = MessageRecord::new("c", Role::User, "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_placeholder_is_generating_cursor() {
        let msg = MessageRecord::placeholder("chat-1");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, CURSOR_GLYPH);
        assert!(msg.is_generating);
    }

    #[test]
    fn test_to_chat_message_strips_trailing_cursor() {
        let mut msg = MessageRecord::placeholder("c");
        msg.content = format!("partial answer{}", CURSOR_GLYPH);
        let wire = msg.to_chat_message();
        assert_eq!(wire.role, Role::Assistant);
        assert_eq!(wire.content, "partial answer");
    }

    #[test]
    fn test_to_chat_message_keeps_user_trailing_glyph() {
        let msg = MessageRecord::new("c", Role::User, "draw a block: █");
        assert_eq!(msg.to_chat_message().content, "draw a block: █");
    }

    #[test]
    fn test_to_chat_message_keeps_inner_glyph() {
        let msg = MessageRecord::new("c", Role::User, "a █ b");
        assert_eq!(msg.to_chat_message().content, "a █ b");
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), r#""assistant""#);
        let role: Role = serde_json::from_str(r#""assistant""#).unwrap();
        assert_eq!(role, Role::Assistant);
    }

    #[test]
    fn test_chat_message_wire_shape() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_message_record_without_seq_deserializes() {
        let json = r#"{
            "id": "m1", "chat_id": "c1", "role": "user", "content": "hi",
            "created_at": "2026-01-01T00:00:00Z", "is_generating": false
        }"#;
        let msg: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(msg.seq, 0);
    }

    // ─── Chat Tests ──────────────────────────────────────────

    #[test]
    fn test_chat_new() {
        let chat = Chat::new("c1");
        assert_eq!(chat.id, "c1");
        assert_eq!(chat.description, "New Chat");
        assert!(chat.is_new_chat);
        assert_eq!(chat.total_tokens, 0);
        assert!(chat.model.is_none());
    }

    #[test]
    fn test_chat_missing_flag_defaults_to_new() {
        let json = r#"{"id": "c1", "description": "d", "created_at": "2026-01-01T00:00:00Z"}"#;
        let chat: Chat = serde_json::from_str(json).unwrap();
        assert!(chat.is_new_chat);
        assert_eq!(chat.total_tokens, 0);
    }

    // ─── Settings / Config Tests ─────────────────────────────

    #[test]
    fn test_settings_default_is_general() {
        let settings = Settings::default();
        assert_eq!(settings.id, GENERAL_SETTINGS_ID);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_api_enum_serialization() {
        assert_eq!(serde_json::to_string(&ApiType::OpenAi).unwrap(), r#""openai""#);
        assert_eq!(serde_json::to_string(&ApiType::Custom).unwrap(), r#""custom""#);
        assert_eq!(serde_json::to_string(&ApiAuth::BearerToken).unwrap(), r#""bearer-token""#);
        assert_eq!(serde_json::to_string(&ApiAuth::ApiKey).unwrap(), r#""api-key""#);
        assert_eq!(serde_json::to_string(&ApiAuth::None).unwrap(), r#""none""#);
    }

    #[test]
    fn test_default_client_config() {
        let defaults = ClientDefaults::default();
        assert_eq!(defaults.model, "gpt-3.5-turbo");
        assert_eq!(defaults.api_type, ApiType::OpenAi);
        assert!(defaults.api_base.starts_with("https://"));
    }

    #[test]
    fn test_partial_client_config_override() {
        let defaults: ClientDefaults =
            serde_json::from_str(r#"{"model":"gpt-4","api_type":"custom"}"#).unwrap();
        assert_eq!(defaults.model, "gpt-4");
        assert_eq!(defaults.api_type, ApiType::Custom);
        assert_eq!(defaults.api_auth, ApiAuth::BearerToken);
        assert_eq!(defaults.api_version, ClientDefaults::default().api_version);
    }

    fn connection(api_type: ApiType, api_auth: ApiAuth) -> Connection {
        Connection {
            api_key: "sk-test".to_string(),
            api_type,
            api_auth,
            api_base: "https://example.com/v1/".to_string(),
            api_version: "2024-01-01".to_string(),
        }
    }

    #[test]
    fn test_connection_urls() {
        let conn = connection(ApiType::OpenAi, ApiAuth::None);
        assert_eq!(conn.completions_url(), "https://example.com/v1/chat/completions");
        assert_eq!(conn.models_url(), "https://example.com/v1/models");
    }

    #[test]
    fn test_openai_always_uses_bearer() {
        let conn = connection(ApiType::OpenAi, ApiAuth::None);
        assert_eq!(conn.bearer_token(), Some("sk-test"));
        assert!(conn.api_key_header().is_none());
        assert!(conn.version_query().is_none());
    }

    #[test]
    fn test_custom_auth_modes() {
        let bearer = connection(ApiType::Custom, ApiAuth::BearerToken);
        assert_eq!(bearer.bearer_token(), Some("sk-test"));
        assert!(bearer.api_key_header().is_none());

        let header = connection(ApiType::Custom, ApiAuth::ApiKey);
        assert!(header.bearer_token().is_none());
        assert_eq!(header.api_key_header(), Some("sk-test"));

        let none = connection(ApiType::Custom, ApiAuth::None);
        assert!(none.bearer_token().is_none());
        assert!(none.api_key_header().is_none());
        assert_eq!(none.version_query(), Some("2024-01-01"));
    }

    // ─── Persona Tests ───────────────────────────────────────

    #[test]
    fn test_persona_default_prompt() {
        let persona = PersonaDirectives::default();
        assert!(persona.is_empty());
        assert_eq!(
            persona.system_prompt(),
            format!("{} Always answer in markdown.", DEFAULT_PERSONA)
        );
    }

    #[test]
    fn test_persona_all_directives() {
        let persona = PersonaDirectives {
            character: Some("a pirate".to_string()),
            tone: Some("cheerful".to_string()),
            style: Some("concise".to_string()),
            format: Some("Use bullet points.".to_string()),
        };
        assert_eq!(
            persona.system_prompt(),
            "You are a pirate. Respond in cheerful tone. Respond in concise style. \
             Use bullet points. Always answer in markdown."
        );
    }

    #[test]
    fn test_persona_blank_directives_are_ignored() {
        let persona = PersonaDirectives {
            tone: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(persona.is_empty());
        assert!(persona.system_prompt().starts_with(DEFAULT_PERSONA));
    }

    // ─── Event Tests ─────────────────────────────────────────

    #[test]
    fn test_event_chat_id() {
        let event = ChatEvent::MessageUpdated {
            chat_id: "c1".to_string(),
            message_id: "m1".to_string(),
            content: "x".to_string(),
            is_generating: true,
        };
        assert_eq!(event.chat_id(), Some("c1"));
        assert_eq!(ChatEvent::Notice(Notice::error("x")).chat_id(), None);
    }

    // ─── Error Tests ─────────────────────────────────────────

    #[test]
    fn test_error_display() {
        let err = ChatError::Upstream { status: 429, message: "rate limit".to_string() };
        assert_eq!(err.to_string(), "Upstream error (HTTP 429): rate limit");
        assert_eq!(ChatError::Cancelled.to_string(), "Cancelled");
        assert_eq!(
            ChatError::Network("reset".to_string()).to_string(),
            "Network error: reset"
        );
    }

    #[test]
    fn test_cancel_notice_is_warning() {
        let notice = ChatError::Cancelled.notice();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.title, "Stopped");
        assert_eq!(notice.message, "Stopped generating message.");
    }

    #[test]
    fn test_upstream_notice_carries_message() {
        let err = ChatError::Upstream { status: 401, message: "Incorrect API key".to_string() };
        let notice = err.notice();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Incorrect API key");
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{{invalid}}").unwrap_err();
        let err: ChatError = serde_err.into();
        assert!(matches!(err, ChatError::Serialization(_)));
    }
}

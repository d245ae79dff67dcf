//! JS-facing handle over the conversation controller.
//!
//! Records and events cross the boundary as plain JS objects (serde via
//! `JSON`); async operations return Promises that reject with an `Error`
//! whose message is the user-facing text.

use std::rc::Rc;
use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Function, Promise};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use chat_core::controller::ConversationController;
use chat_core::event_bus::EventBus;
use chat_core::store::ChatDb;
use chat_platform::llm::OpenAiCompatClient;
use chat_platform::storage::auto_detect_storage;
use chat_types::{
    ChatError,
    config::ClientDefaults,
    event::ChatEvent,
    persona::PersonaDirectives,
    settings::{Settings, GENERAL_SETTINGS_ID},
};

#[wasm_bindgen]
pub struct ChatClient {
    controller: Rc<ConversationController>,
}

#[wasm_bindgen]
impl ChatClient {
    /// Open storage and wire up a client. `defaults` may override any
    /// subset of the built-in connection defaults.
    pub async fn open(defaults: JsValue) -> Result<ChatClient, JsValue> {
        let defaults: ClientDefaults = if defaults.is_undefined() || defaults.is_null() {
            ClientDefaults::default()
        } else {
            defaults
                .into_serde()
                .map_err(|e| js_error(ChatError::Config(e.to_string())))?
        };

        let db = ChatDb::new(auto_detect_storage().await);
        log::info!(
            "Chat client ready (storage: {}, model: {})",
            db.backend_name(),
            defaults.model
        );

        let controller = ConversationController::new(
            db,
            Rc::new(OpenAiCompatClient::new()),
            EventBus::new(),
            defaults,
        );
        Ok(ChatClient {
            controller: Rc::new(controller),
        })
    }

    #[wasm_bindgen(getter, js_name = storageBackend)]
    pub fn storage_backend(&self) -> String {
        self.controller.db().backend_name().to_string()
    }

    #[wasm_bindgen(getter, js_name = isBusy)]
    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Submit `input` to the chat; resolves with the finished turn.
    pub fn submit(&self, chat_id: Option<String>, input: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let outcome = controller
                .submit(chat_id.as_deref(), &input)
                .await
                .map_err(js_error)?;
            to_js(&outcome)
        })
    }

    /// Stop the in-flight turn. Returns false when nothing was running.
    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    /// Call `callback(event)` for events of `chat_id`, or for every event
    /// when no chat is given. Returns the id to pass to `unsubscribe`.
    pub fn subscribe(&self, chat_id: Option<String>, callback: Function) -> f64 {
        let deliver = move |event: &ChatEvent| match JsValue::from_serde(event) {
            Ok(value) => {
                if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                    log::warn!("Event subscriber threw: {:?}", e);
                }
            }
            Err(e) => log::error!("Failed to serialize event: {}", e),
        };

        let bus = self.controller.event_bus();
        let id = match chat_id {
            Some(chat_id) => bus.subscribe(&chat_id, deliver),
            None => bus.subscribe_all(deliver),
        };
        id as f64
    }

    pub fn unsubscribe(&self, id: f64) -> bool {
        self.controller.event_bus().unsubscribe(id as u64)
    }

    /// Events queued since the last drain, for hosts that poll. Events are
    /// only buffered while no subscriber is registered.
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&self) -> Result<JsValue, JsValue> {
        to_js(&self.controller.event_bus().drain())
    }

    /// Messages of a chat, oldest first.
    pub fn messages(&self, chat_id: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let messages = controller.db().messages(&chat_id).await.map_err(js_error)?;
            to_js(&messages)
        })
    }

    /// All chats, newest first.
    pub fn chats(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let chats = controller.db().list_chats().await.map_err(js_error)?;
            to_js(&chats)
        })
    }

    /// Create the chat record if it does not exist yet.
    #[wasm_bindgen(js_name = ensureChat)]
    pub fn ensure_chat(&self, chat_id: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let chat = controller.db().ensure_chat(&chat_id).await.map_err(js_error)?;
            to_js(&chat)
        })
    }

    /// The saved settings record, or `null`.
    pub fn settings(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let settings = controller.db().settings().await.map_err(js_error)?;
            to_js(&settings)
        })
    }

    #[wasm_bindgen(js_name = saveSettings)]
    pub fn save_settings(&self, settings: JsValue) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let mut settings: Settings = settings
                .into_serde()
                .map_err(|e| js_error(ChatError::Config(e.to_string())))?;
            settings.id = GENERAL_SETTINGS_ID.to_string();
            controller.db().put_settings(&settings).await.map_err(js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Try `api_key` against the endpoint; resolves with the reply text.
    #[wasm_bindgen(js_name = checkApiKey)]
    pub fn check_api_key(&self, api_key: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let response = controller.check_api_key(&api_key).await.map_err(js_error)?;
            Ok(JsValue::from_str(&response.message.content))
        })
    }

    #[wasm_bindgen(js_name = listModels)]
    pub fn list_models(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let models = controller.list_models().await.map_err(js_error)?;
            to_js(&models)
        })
    }

    /// Pin `model` to one chat; an empty string reverts to the settings model.
    #[wasm_bindgen(js_name = selectModel)]
    pub fn select_model(&self, chat_id: String, model: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller
                .select_model(&chat_id, &model)
                .await
                .map_err(js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Character, tone, style and format directives for new chats.
    #[wasm_bindgen(js_name = setPersona)]
    pub fn set_persona(&self, persona: JsValue) -> Result<(), JsValue> {
        let persona: PersonaDirectives = if persona.is_undefined() || persona.is_null() {
            PersonaDirectives::default()
        } else {
            persona
                .into_serde()
                .map_err(|e| js_error(ChatError::Validation(e.to_string())))?
        };
        self.controller.set_persona(persona);
        Ok(())
    }

    /// System prompt the next new chat will start with.
    #[wasm_bindgen(js_name = systemPrompt)]
    pub fn system_prompt(&self) -> String {
        self.controller.persona().system_prompt()
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    JsValue::from_serde(value).map_err(|e| js_error(ChatError::from(e)))
}

fn js_error(error: ChatError) -> JsValue {
    js_sys::Error::new(&error.notice().message).into()
}

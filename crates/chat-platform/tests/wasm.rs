//! WASM-target tests for chat-platform (Node.js runtime).
//!
//! Covers MemoryStorage and the record store layered on it under
//! wasm32-unknown-unknown via `wasm-pack test --node`. IndexedDB needs a
//! browser and is not exercised here.

#![cfg(target_arch = "wasm32")]

use std::rc::Rc;
use wasm_bindgen_test::*;

use chat_core::ports::StoragePort;
use chat_core::store::ChatDb;
use chat_platform::llm::SseDecoder;
use chat_platform::storage::MemoryStorage;
use chat_core::ports::CompletionEvent;
use chat_types::message::{MessageRecord, Role};
use chat_types::settings::{ApiType, Settings};

// ─── MemoryStorage ───────────────────────────────────────

#[wasm_bindgen_test]
fn memory_storage_backend_name() {
    assert_eq!(MemoryStorage::new().backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn memory_storage_set_get_delete() {
    let storage = MemoryStorage::new();
    assert!(storage.get("chats:a").await.unwrap().is_none());

    storage.set("chats:a", b"v1").await.unwrap();
    storage.set("chats:a", b"v2").await.unwrap();
    assert_eq!(storage.get("chats:a").await.unwrap(), Some(b"v2".to_vec()));
    assert_eq!(storage.len(), 1);

    storage.delete("chats:a").await.unwrap();
    assert!(!storage.exists("chats:a").await.unwrap());
    storage.delete("chats:a").await.unwrap();
    assert!(storage.is_empty());
}

#[wasm_bindgen_test]
async fn memory_storage_prefix_scan_is_ordered() {
    let storage = MemoryStorage::new();
    storage.set("messages:c1:b", b"2").await.unwrap();
    storage.set("messages:c1:a", b"1").await.unwrap();
    storage.set("messages:c10:z", b"3").await.unwrap();
    storage.set("chats:c1", b"4").await.unwrap();

    let keys = storage.list_keys("messages:c1:").await.unwrap();
    assert_eq!(keys, vec!["messages:c1:a", "messages:c1:b"]);
    assert_eq!(storage.list_keys("").await.unwrap().len(), 4);
    assert!(storage.list_keys("settings:").await.unwrap().is_empty());
}

#[wasm_bindgen_test]
async fn memory_storage_unicode_values() {
    let storage = MemoryStorage::new();
    let text = "你好世界 🌍 █";
    storage.set("k", text.as_bytes()).await.unwrap();
    let back = storage.get("k").await.unwrap().unwrap();
    assert_eq!(String::from_utf8(back).unwrap(), text);
}

// ─── ChatDb over MemoryStorage ───────────────────────────

fn make_db() -> ChatDb {
    ChatDb::new(Rc::new(MemoryStorage::new()))
}

#[wasm_bindgen_test]
async fn chat_db_messages_round_trip() {
    let db = make_db();
    db.ensure_chat("c1").await.unwrap();
    db.add_message(&MessageRecord::new("c1", Role::User, "Hello")).await.unwrap();
    let placeholder = db.add_message(&MessageRecord::placeholder("c1")).await.unwrap();

    db.update_message("c1", &placeholder.id, "Hi there!", false).await.unwrap();

    let messages = db.messages("c1").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].content, "Hi there!");
    assert!(!messages[1].is_generating);
    assert_eq!(db.backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn chat_db_tokens_and_settings() {
    let db = make_db();
    db.ensure_chat("c1").await.unwrap();
    assert_eq!(db.add_tokens("c1", 5).await.unwrap(), 5);
    assert_eq!(db.add_tokens("c1", 7).await.unwrap(), 12);

    let settings = Settings {
        api_key: Some("sk-test".to_string()),
        api_type: Some(ApiType::Custom),
        ..Settings::default()
    };
    db.put_settings(&settings).await.unwrap();
    assert_eq!(db.settings().await.unwrap(), Some(settings));
}

// ─── SSE decoding on wasm32 ──────────────────────────────

#[wasm_bindgen_test]
fn sse_decoder_on_wasm() {
    let mut decoder = SseDecoder::new(200);
    let events = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n");
    assert_eq!(events, vec![CompletionEvent::Delta("Hi".to_string()), CompletionEvent::Done]);
}

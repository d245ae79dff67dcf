//! IndexedDB storage backend.
//!
//! One object store of out-of-line keyed byte arrays. Record keys carry
//! their own namespace (`chats:`, `messages:`, `settings:`), so listing a
//! chat's messages is a key-prefix scan.

use async_trait::async_trait;
use js_sys::{Array, Promise, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{IdbDatabase, IdbObjectStore, IdbRequest, IdbTransactionMode};

use chat_core::ports::StoragePort;
use chat_types::{ChatError, Result};

const DB_NAME: &str = "chat_client";
const STORE_NAME: &str = "records";
const DB_VERSION: u32 = 1;

pub struct IndexedDbStorage {
    db: IdbDatabase,
}

impl IndexedDbStorage {
    /// Open (or create) the database.
    pub async fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ChatError::Storage("No window object".to_string()))?;

        let factory = window
            .indexed_db()
            .map_err(storage_error)?
            .ok_or_else(|| ChatError::Storage("IndexedDB not available".to_string()))?;

        let open_req = factory
            .open_with_u32(DB_NAME, DB_VERSION)
            .map_err(storage_error)?;

        let upgrade_req = open_req.clone();
        let onupgrade = Closure::once(move |_event: web_sys::Event| {
            let db = upgrade_req
                .result()
                .ok()
                .and_then(|value| value.dyn_into::<IdbDatabase>().ok());
            match db {
                Some(db) if !db.object_store_names().contains(STORE_NAME) => {
                    if let Err(e) = db.create_object_store(STORE_NAME) {
                        log::error!("Failed to create object store: {:?}", e);
                    }
                }
                Some(_) => {}
                None => log::error!("IndexedDB upgrade fired without a database"),
            }
        });
        open_req.set_onupgradeneeded(Some(onupgrade.as_ref().unchecked_ref()));
        onupgrade.forget();

        let db: IdbDatabase = JsFuture::from(request_promise(&open_req))
            .await
            .map_err(storage_error)?
            .dyn_into()
            .map_err(storage_error)?;

        Ok(Self { db })
    }

    fn store(&self, mode: IdbTransactionMode) -> Result<IdbObjectStore> {
        let tx = self
            .db
            .transaction_with_str_and_mode(STORE_NAME, mode)
            .map_err(storage_error)?;
        tx.object_store(STORE_NAME).map_err(storage_error)
    }
}

#[async_trait(?Send)]
impl StoragePort for IndexedDbStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store(IdbTransactionMode::Readonly)?;
        let req = store.get(&JsValue::from_str(key)).map_err(storage_error)?;
        let result = await_request(&req).await?;

        if result.is_undefined() || result.is_null() {
            return Ok(None);
        }
        Ok(Some(Uint8Array::new(&result).to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let store = self.store(IdbTransactionMode::Readwrite)?;
        let req = store
            .put_with_key(&Uint8Array::from(value), &JsValue::from_str(key))
            .map_err(storage_error)?;
        await_request(&req).await.map(|_| ())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let store = self.store(IdbTransactionMode::Readwrite)?;
        let req = store.delete(&JsValue::from_str(key)).map_err(storage_error)?;
        await_request(&req).await.map(|_| ())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let store = self.store(IdbTransactionMode::Readonly)?;
        let req = store.get_all_keys().map_err(storage_error)?;
        let keys: Array = await_request(&req)
            .await?
            .dyn_into()
            .map_err(storage_error)?;

        Ok(keys
            .iter()
            .filter_map(|key| key.as_string())
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    fn backend_name(&self) -> &str {
        "indexeddb"
    }
}

async fn await_request(req: &IdbRequest) -> Result<JsValue> {
    JsFuture::from(request_promise(req))
        .await
        .map_err(storage_error)
}

/// Bridge the callback-style `IDBRequest` into a Promise for `JsFuture`.
fn request_promise(req: &IdbRequest) -> Promise {
    let req = req.clone();
    Promise::new(&mut move |resolve, reject| {
        let on_success_req = req.clone();
        let onsuccess = Closure::once(move |_: web_sys::Event| {
            let _ = resolve.call1(
                &JsValue::NULL,
                &on_success_req.result().unwrap_or(JsValue::UNDEFINED),
            );
        });
        let on_error_req = req.clone();
        let onerror = Closure::once(move |_: web_sys::Event| {
            let reason = on_error_req
                .error()
                .ok()
                .flatten()
                .map(|e| JsValue::from_str(&e.message()))
                .unwrap_or_else(|| JsValue::from_str("IndexedDB request failed"));
            let _ = reject.call1(&JsValue::NULL, &reason);
        });
        req.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
        req.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onsuccess.forget();
        onerror.forget();
    })
}

fn storage_error(value: JsValue) -> ChatError {
    ChatError::Storage(format!("{:?}", value))
}

//! Pick the storage backend for this browser.
//!
//! IndexedDB when the page can open it, otherwise in-memory records that
//! last for the session.

use std::rc::Rc;
use chat_core::ports::StoragePort;
use super::{IndexedDbStorage, MemoryStorage};

/// Open the best available backend. Never fails: the memory fallback is
/// always there.
pub async fn auto_detect_storage() -> Rc<dyn StoragePort> {
    match IndexedDbStorage::open().await {
        Ok(idb) => {
            log::info!("Storage backend: IndexedDB");
            Rc::new(idb)
        }
        Err(e) => {
            log::warn!("IndexedDB unavailable ({}), chats will not persist", e);
            Rc::new(MemoryStorage::new())
        }
    }
}

//! Browser adapters for the chat core: completion over `fetch`, storage over
//! IndexedDB (with an in-memory fallback).

pub mod llm;
pub mod storage;

//! Chat App: WASM entry point.
//!
//! This crate is the composition root. It opens storage, builds the
//! completion client and hands both to the conversation controller, then
//! exposes the result to the page as [`ChatClient`].

mod client;

pub use client::ChatClient;

use wasm_bindgen::prelude::*;

/// Runs once when the module is instantiated.
#[wasm_bindgen(start)]
pub fn start() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Chat client WASM loaded");
}

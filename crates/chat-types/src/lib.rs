pub mod chat;
pub mod message;
pub mod settings;
pub mod config;
pub mod persona;
pub mod event;
pub mod error;

#[cfg(test)]
mod tests;

pub use error::ChatError;
pub type Result<T> = std::result::Result<T, ChatError>;

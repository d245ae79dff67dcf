//! Token-length estimate for completed assistant content.

use tiktoken_rs::{cl100k_base, CoreBPE};

thread_local! {
    // Building the encoder parses the whole rank table; do it once per thread.
    static ENCODER: Option<CoreBPE> = match cl100k_base() {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            log::warn!("cl100k_base unavailable ({}), counting words instead", e);
            None
        }
    };
}

/// Number of cl100k_base tokens in `text`, or its word count if the
/// encoder could not be built.
pub fn count_tokens(text: &str) -> u64 {
    ENCODER.with(|encoder| match encoder {
        Some(bpe) => bpe.encode_ordinary(text).len() as u64,
        None => text.split_whitespace().count() as u64,
    })
}

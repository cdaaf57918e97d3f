//! Tokenizer loading for model sources.

use crate::api::error::TokenizerResult;
use crate::core::hf::HFTokenizer;
use crate::spi::contract::{Tokenizer, TokenizerProvider};
use lowbit_hub::HubApi;

/// Loads `tokenizer.json` from a checkpoint directory, a direct file path,
/// or a Hub repo id.
#[derive(Debug, Clone, Default)]
pub struct HubTokenizerProvider {
    hub: HubApi,
}

impl HubTokenizerProvider {
    pub fn new(hub: HubApi) -> Self {
        Self { hub }
    }
}

impl TokenizerProvider for HubTokenizerProvider {
    type Handle = HFTokenizer;

    fn load(&self, source: &str) -> TokenizerResult<HFTokenizer> {
        let path = self.hub.resolve_tokenizer(source)?;
        let tokenizer = HFTokenizer::from_file(&path)?;
        log::info!(
            "Tokenizer: {} tokens ({})",
            tokenizer.vocab_size(),
            path.display()
        );
        Ok(tokenizer)
    }
}

pub use crate::api::error::{TokenizerError, TokenizerResult};
pub use crate::core::hf::HFTokenizer;
pub use crate::core::provider::HubTokenizerProvider;
pub use crate::spi::contract::{Tokenizer, TokenizerProvider};

mod tokenizer;

pub use tokenizer::{Tokenizer, TokenizerProvider};

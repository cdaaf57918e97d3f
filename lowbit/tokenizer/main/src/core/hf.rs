//! HuggingFace Tokenizer wrapper

use crate::api::error::{TokenizerError, TokenizerResult};
use crate::spi::contract::Tokenizer;
use std::fmt;
use std::str::FromStr;

/// HuggingFace Tokenizer wrapper (uses the `tokenizers` crate).
///
/// Supports all tokenizer formats loadable by HuggingFace: BPE, Unigram,
/// WordPiece, WordLevel. Load from a `tokenizer.json` file.
pub struct HFTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HFTokenizer {
    /// Load from a `tokenizer.json` file.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> TokenizerResult<Self> {
        let p = path.as_ref();
        let tokenizer = tokenizers::Tokenizer::from_file(p).map_err(|e| {
            TokenizerError::TokenizerError(format!(
                "Failed to load tokenizer file: {}: {}",
                p.display(),
                e
            ))
        })?;
        Ok(Self { inner: tokenizer })
    }

    /// Parse an in-memory `tokenizer.json` document.
    pub fn from_json(json: &str) -> TokenizerResult<Self> {
        let tokenizer = tokenizers::Tokenizer::from_str(json).map_err(|e| {
            TokenizerError::TokenizerError(format!("Failed to parse tokenizer json: {}", e))
        })?;
        Ok(Self { inner: tokenizer })
    }
}

impl fmt::Debug for HFTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HFTokenizer")
            .field("vocab_size", &self.vocab_size())
            .finish()
    }
}

impl Tokenizer for HFTokenizer {
    fn encode(&self, text: &str) -> TokenizerResult<Vec<u32>> {
        let encoding = self.inner.encode(text, true).map_err(|e| {
            TokenizerError::TokenizerError(format!("Tokenizer encode failed: {}", e))
        })?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> TokenizerResult<String> {
        self.inner.decode(tokens, skip_special_tokens).map_err(|e| {
            TokenizerError::TokenizerError(format!("Tokenizer decode failed: {}", e))
        })
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_LEVEL: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": "<s>", "single_word": false, "lstrip": false,
             "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"<s>": 0, "hello": 1, "world": 2, "[UNK]": 3},
            "unk_token": "[UNK]"
        }
    }"#;

    #[test]
    fn test_encode_with_special_token() {
        let tok = HFTokenizer::from_json(WORD_LEVEL).unwrap();
        assert_eq!(tok.encode("<s>hello world").unwrap(), vec![0, 1, 2]);
        assert_eq!(tok.encode("hello there").unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_decode_keeps_or_skips_special() {
        let tok = HFTokenizer::from_json(WORD_LEVEL).unwrap();
        let kept = tok.decode(&[0, 1, 2], false).unwrap();
        assert!(kept.contains("<s>"));
        let skipped = tok.decode(&[0, 1, 2], true).unwrap();
        assert!(!skipped.contains("<s>"));
        assert!(skipped.contains("hello"));
    }

    #[test]
    fn test_vocab_and_lookup() {
        let tok = HFTokenizer::from_json(WORD_LEVEL).unwrap();
        assert_eq!(tok.vocab_size(), 4);
        assert_eq!(tok.token_to_id("<s>"), Some(0));
        assert_eq!(tok.token_to_id("missing"), None);
    }

    #[test]
    fn test_debug_shows_vocab_size() {
        let tok = HFTokenizer::from_json(WORD_LEVEL).unwrap();
        assert_eq!(format!("{:?}", tok), "HFTokenizer { vocab_size: 4 }");
    }

    #[test]
    fn test_invalid_json() {
        assert!(HFTokenizer::from_json("not json").is_err());
    }
}

use lowbit_hub::{HubApi, HubError};
use lowbit_tokenizer::{HubTokenizerProvider, Tokenizer, TokenizerError, TokenizerProvider};

const TOKENIZER_JSON: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [
        {"id": 0, "content": "<s>", "single_word": false, "lstrip": false,
         "rstrip": false, "normalized": false, "special": true},
        {"id": 1, "content": "</s>", "single_word": false, "lstrip": false,
         "rstrip": false, "normalized": false, "special": true}
    ],
    "normalizer": null,
    "pre_tokenizer": {"type": "Whitespace"},
    "post_processor": null,
    "decoder": null,
    "model": {
        "type": "WordLevel",
        "vocab": {"<s>": 0, "</s>": 1, "What": 2, "is": 3, "AI": 4, "?": 5, "[UNK]": 6},
        "unk_token": "[UNK]"
    }
}"#;

#[test]
fn loads_from_checkpoint_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tokenizer.json"), TOKENIZER_JSON).unwrap();

    let provider = HubTokenizerProvider::default();
    let tok = provider.load(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(tok.encode("<s>What is AI?").unwrap(), vec![0, 2, 3, 4, 5]);
}

#[test]
fn loads_from_direct_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.json");
    std::fs::write(&path, TOKENIZER_JSON).unwrap();

    let provider = HubTokenizerProvider::default();
    let tok = provider.load(path.to_str().unwrap()).unwrap();
    assert_eq!(tok.token_to_id("</s>"), Some(1));
}

#[test]
fn missing_tokenizer_json_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let provider = HubTokenizerProvider::default();
    let err = provider.load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, TokenizerError::HubError(HubError::ModelNotFound(_))));
}

#[test]
fn sentencepiece_only_checkpoint_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tokenizer.model"), b"\x0a\x05hello").unwrap();

    let provider = HubTokenizerProvider::new(HubApi::new());
    let err = provider.load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, TokenizerError::HubError(HubError::UnsupportedFormat(_))));
    assert!(err.to_string().contains("tokenizer.json"));
}

#[test]
fn nonexistent_path_is_an_error() {
    let provider = HubTokenizerProvider::default();
    assert!(provider.load("/tmp/lowbit-no-such-tokenizer-dir").is_err());
}

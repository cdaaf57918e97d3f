//! Data types for checkpoint bundles

use crate::api::error::{HubError, HubResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Single-file SafeTensors weights.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Index of sharded SafeTensors weights.
pub const WEIGHTS_INDEX_FILE: &str = "model.safetensors.index.json";

/// Single-file PyTorch pickle weights.
pub const PYTORCH_WEIGHTS_FILE: &str = "pytorch_model.bin";

/// Index of sharded PyTorch pickle weights.
pub const PYTORCH_WEIGHTS_INDEX_FILE: &str = "pytorch_model.bin.index.json";

/// HuggingFace universal tokenizer.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// SentencePiece model file.
pub const SENTENCEPIECE_FILE: &str = "tokenizer.model";

/// The files of one checkpoint, all under `model_dir`.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    /// Repo id or local path the bundle was resolved from
    pub model_id: String,
    /// Directory holding the checkpoint files
    pub model_dir: PathBuf,
}

impl ModelBundle {
    /// Get path to config.json
    pub fn config_path(&self) -> PathBuf {
        self.model_dir.join("config.json")
    }

    /// Load model configuration synchronously
    pub fn load_config_sync(&self) -> HubResult<serde_json::Value> {
        let content = std::fs::read_to_string(self.config_path())?;
        serde_json::from_str(&content).map_err(|e| HubError::ParseError(e.to_string()))
    }

    /// SafeTensors files holding the weights.
    ///
    /// Prefers `model.safetensors`; otherwise returns the shards named by
    /// `model.safetensors.index.json`, sorted and without duplicates.
    pub fn weight_files(&self) -> HubResult<Vec<PathBuf>> {
        let names = dir_file_names(&self.model_dir)?;
        let location = self.model_dir.display().to_string();
        let entry = select_weights(&names, &location)?;
        let entry_path = self.model_dir.join(entry);
        if entry == WEIGHTS_FILE {
            return Ok(vec![entry_path]);
        }

        let content = std::fs::read_to_string(&entry_path)?;
        let shards = shard_names(&content)?;
        Ok(shards.into_iter().map(|s| self.model_dir.join(s)).collect())
    }

    /// Path to `tokenizer.json`.
    pub fn tokenizer_path(&self) -> HubResult<PathBuf> {
        let names = dir_file_names(&self.model_dir)?;
        let location = self.model_dir.display().to_string();
        let entry = select_tokenizer(&names, &location)?;
        Ok(self.model_dir.join(entry))
    }
}

/// Names of the files directly inside `dir`.
///
/// Symlinks are followed; hf-hub snapshot directories link into its blob
/// store.
pub(crate) fn dir_file_names(dir: &Path) -> HubResult<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Pick the weights entry of a checkpoint from the names of its files.
///
/// Returns `model.safetensors` or `model.safetensors.index.json`. A
/// checkpoint that only ships PyTorch pickles is rejected with
/// [`HubError::UnsupportedFormat`].
pub(crate) fn select_weights(names: &BTreeSet<String>, location: &str) -> HubResult<&'static str> {
    for entry in [WEIGHTS_FILE, WEIGHTS_INDEX_FILE] {
        if names.contains(entry) {
            return Ok(entry);
        }
    }
    for pickle in [PYTORCH_WEIGHTS_FILE, PYTORCH_WEIGHTS_INDEX_FILE] {
        if names.contains(pickle) {
            return Err(HubError::UnsupportedFormat(format!(
                "{} in {} is a PyTorch pickle checkpoint; convert it to SafeTensors \
                 ({}) first",
                pickle, location, WEIGHTS_FILE
            )));
        }
    }
    Err(HubError::ModelNotFound(format!(
        "no {} or {} in {}",
        WEIGHTS_FILE, WEIGHTS_INDEX_FILE, location
    )))
}

/// Pick the tokenizer entry of a checkpoint from the names of its files.
///
/// Only `tokenizer.json` is loadable; a checkpoint with just a
/// SentencePiece `tokenizer.model` is rejected with
/// [`HubError::UnsupportedFormat`].
pub(crate) fn select_tokenizer(
    names: &BTreeSet<String>,
    location: &str,
) -> HubResult<&'static str> {
    if names.contains(TOKENIZER_FILE) {
        return Ok(TOKENIZER_FILE);
    }
    if names.contains(SENTENCEPIECE_FILE) {
        return Err(HubError::UnsupportedFormat(format!(
            "{} in {} is a SentencePiece model; export it as {} first",
            SENTENCEPIECE_FILE, location, TOKENIZER_FILE
        )));
    }
    Err(HubError::ModelNotFound(format!("{} not found in {}", TOKENIZER_FILE, location)))
}

/// Shard file names referenced by a SafeTensors index document.
pub fn shard_names(index_json: &str) -> HubResult<Vec<String>> {
    let index: serde_json::Value =
        serde_json::from_str(index_json).map_err(|e| HubError::ParseError(e.to_string()))?;
    let weight_map = index["weight_map"]
        .as_object()
        .ok_or_else(|| HubError::ParseError("index has no weight_map object".into()))?;

    let mut shards = BTreeSet::new();
    for file in weight_map.values() {
        let name = file
            .as_str()
            .ok_or_else(|| HubError::ParseError("weight_map value is not a string".into()))?;
        shards.insert(name.to_string());
    }
    if shards.is_empty() {
        return Err(HubError::ParseError("index weight_map is empty".into()));
    }
    Ok(shards.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(dir: &Path) -> ModelBundle {
        ModelBundle {
            model_id: "local".into(),
            model_dir: dir.to_path_buf(),
        }
    }

    fn names(files: &[&str]) -> BTreeSet<String> {
        files.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_shard_names_sorted_unique() {
        let json = r#"{
            "metadata": {"total_size": 10},
            "weight_map": {
                "a": "model-00002-of-00002.safetensors",
                "b": "model-00001-of-00002.safetensors",
                "c": "model-00001-of-00002.safetensors"
            }
        }"#;
        let shards = shard_names(json).unwrap();
        assert_eq!(
            shards,
            vec![
                "model-00001-of-00002.safetensors".to_string(),
                "model-00002-of-00002.safetensors".to_string(),
            ]
        );
    }

    #[test]
    fn test_shard_names_missing_map() {
        assert!(shard_names(r#"{"metadata": {}}"#).is_err());
    }

    #[test]
    fn test_weight_files_prefers_single_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(WEIGHTS_FILE), b"x").unwrap();
        std::fs::write(
            dir.path().join(WEIGHTS_INDEX_FILE),
            r#"{"weight_map": {"a": "shard.safetensors"}}"#,
        )
        .unwrap();
        assert_eq!(
            bundle(dir.path()).weight_files().unwrap(),
            vec![dir.path().join(WEIGHTS_FILE)]
        );
    }

    #[test]
    fn test_weight_files_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(bundle(dir.path()).weight_files(), Err(HubError::ModelNotFound(_))));
    }

    #[test]
    fn test_weight_files_follow_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(WEIGHTS_INDEX_FILE),
            r#"{"weight_map": {"a": "b.safetensors", "c": "a.safetensors"}}"#,
        )
        .unwrap();
        assert_eq!(
            bundle(dir.path()).weight_files().unwrap(),
            vec![dir.path().join("a.safetensors"), dir.path().join("b.safetensors")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_weight_files_through_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("blob");
        std::fs::write(&blob, b"x").unwrap();
        let snapshot = dir.path().join("snapshot");
        std::fs::create_dir(&snapshot).unwrap();
        std::os::unix::fs::symlink(&blob, snapshot.join(WEIGHTS_FILE)).unwrap();
        assert_eq!(
            bundle(&snapshot).weight_files().unwrap(),
            vec![snapshot.join(WEIGHTS_FILE)]
        );
    }

    #[test]
    fn test_pytorch_checkpoint_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PYTORCH_WEIGHTS_FILE), b"PK\x03\x04").unwrap();
        let err = bundle(dir.path()).weight_files().unwrap_err();
        assert!(matches!(err, HubError::UnsupportedFormat(_)));
        let msg = err.to_string();
        assert!(msg.contains(PYTORCH_WEIGHTS_FILE), "{}", msg);
        assert!(msg.contains("SafeTensors"), "{}", msg);
    }

    #[test]
    fn test_select_weights_prefers_safetensors_over_pickle() {
        let files = names(&[PYTORCH_WEIGHTS_INDEX_FILE, WEIGHTS_INDEX_FILE, "config.json"]);
        assert_eq!(select_weights(&files, "repo").unwrap(), WEIGHTS_INDEX_FILE);
        let files = names(&[PYTORCH_WEIGHTS_INDEX_FILE, "pytorch_model-00001-of-00002.bin"]);
        assert!(matches!(
            select_weights(&files, "repo"),
            Err(HubError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_tokenizer_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SENTENCEPIECE_FILE), b"\x0a").unwrap();
        let err = bundle(dir.path()).tokenizer_path().unwrap_err();
        assert!(matches!(err, HubError::UnsupportedFormat(_)));
        assert!(err.to_string().contains(TOKENIZER_FILE));

        std::fs::write(dir.path().join(TOKENIZER_FILE), "{}").unwrap();
        assert_eq!(
            bundle(dir.path()).tokenizer_path().unwrap(),
            dir.path().join(TOKENIZER_FILE)
        );
    }

    #[test]
    fn test_select_tokenizer_missing() {
        assert!(matches!(
            select_tokenizer(&names(&["config.json"]), "repo"),
            Err(HubError::ModelNotFound(_))
        ));
    }
}

//! Model source resolution: local checkpoint directories and Hub downloads.

use crate::api::error::{HubError, HubResult};
use crate::api::types::{select_tokenizer, select_weights, shard_names, ModelBundle, WEIGHTS_FILE};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Returns true for strings shaped like a Hub repo id (`owner/name`).
///
/// Anything that starts like a filesystem path or has more than one
/// separator is treated as a local path.
pub fn looks_like_repo_id(source: &str) -> bool {
    if source.is_empty()
        || source.starts_with('/')
        || source.starts_with('.')
        || source.starts_with('~')
    {
        return false;
    }
    if source.contains('\\') {
        return false;
    }
    let mut parts = source.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) => !owner.is_empty() && !name.is_empty(),
        (Some(name), None, None) => !name.is_empty(),
        _ => false,
    }
}

/// HuggingFace Hub client for checkpoint resolution
#[derive(Debug, Clone)]
pub struct HubApi {
    /// API token (optional, for gated or private models)
    token: Option<String>,
}

impl Default for HubApi {
    fn default() -> Self {
        Self::new()
    }
}

impl HubApi {
    /// Create a new Hub client, picking up `HF_TOKEN` from the environment.
    pub fn new() -> Self {
        Self { token: std::env::var("HF_TOKEN").ok() }
    }

    /// Resolve a model source into a checkpoint bundle.
    ///
    /// Existing directories are used in place. Repo ids are downloaded.
    pub fn resolve(&self, source: &str) -> HubResult<ModelBundle> {
        let path = Path::new(source);
        if path.is_dir() {
            log::info!("Using local checkpoint: {}", path.display());
            return Ok(ModelBundle {
                model_id: source.to_string(),
                model_dir: path.to_path_buf(),
            });
        }
        if !looks_like_repo_id(source) {
            return Err(HubError::ModelNotFound(format!(
                "model path does not exist: {}",
                source
            )));
        }
        self.download_model_sync(source)
    }

    /// Resolve the `tokenizer.json` of a model source.
    ///
    /// A source that is itself a file is returned unchanged.
    pub fn resolve_tokenizer(&self, source: &str) -> HubResult<PathBuf> {
        let path = Path::new(source);
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        if path.is_dir() {
            let bundle = ModelBundle {
                model_id: source.to_string(),
                model_dir: path.to_path_buf(),
            };
            return bundle.tokenizer_path();
        }
        if !looks_like_repo_id(source) {
            return Err(HubError::ModelNotFound(format!(
                "model path does not exist: {}",
                source
            )));
        }
        let api = self.hf_sync_api()?;
        let repo = api.model(source.to_string());
        let entry = select_tokenizer(&repo_file_names(&repo, source)?, source)?;
        repo.get(entry).map_err(|e| {
            HubError::NetworkError(format!("Failed to download {} from {}: {}", entry, source, e))
        })
    }

    /// Build the hf-hub sync API, passing through any token from self.token.
    /// The hf-hub crate (0.4.x) does NOT read HF_TOKEN from the environment;
    /// it only reads a token file in the cache dir.
    fn hf_sync_api(&self) -> HubResult<hf_hub::api::sync::Api> {
        match self.token {
            Some(ref t) => hf_hub::api::sync::ApiBuilder::new()
                .with_token(Some(t.clone()))
                .build(),
            None => hf_hub::api::sync::Api::new(),
        }
        .map_err(|e| HubError::NetworkError(format!("Failed to create hf-hub API: {}", e)))
    }

    /// Download a checkpoint from the Hub (synchronous, via hf-hub).
    ///
    /// Lists the repo first and picks model.safetensors or the index and
    /// every shard it names, so a pickle-only repo fails before any weights
    /// are fetched. tokenizer.json is fetched when present.
    pub fn download_model_sync(&self, model_id: &str) -> HubResult<ModelBundle> {
        let api = self.hf_sync_api()?;
        let repo = api.model(model_id.to_string());
        let files = repo_file_names(&repo, model_id)?;
        let entry = select_weights(&files, model_id)?;

        log::info!("Downloading model {} ...", model_id);
        let config_path = repo.get("config.json").map_err(|e| {
            HubError::NetworkError(format!("Failed to download config.json: {}", e))
        })?;
        let model_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| HubError::ParseError("config.json has no parent directory".into()))?;

        let entry_path = repo.get(entry).map_err(|e| {
            HubError::NetworkError(format!("Failed to download {}: {}", entry, e))
        })?;
        if entry != WEIGHTS_FILE {
            let index = std::fs::read_to_string(&entry_path)?;
            for shard in shard_names(&index)? {
                log::info!("  fetching {}", shard);
                repo.get(&shard).map_err(|e| {
                    HubError::NetworkError(format!("Failed to download {}: {}", shard, e))
                })?;
            }
        }

        match select_tokenizer(&files, model_id) {
            Ok(name) => {
                if let Err(e) = repo.get(name) {
                    log::warn!("Failed to download {}: {}", name, e);
                }
            }
            Err(e) => log::warn!("{}", e),
        }

        Ok(ModelBundle {
            model_id: model_id.to_string(),
            model_dir,
        })
    }
}

/// File names of a Hub repo, from its sibling listing.
fn repo_file_names(
    repo: &hf_hub::api::sync::ApiRepo,
    model_id: &str,
) -> HubResult<BTreeSet<String>> {
    let info = repo.info().map_err(|e| {
        HubError::NetworkError(format!("Failed to list files of {}: {}", model_id, e))
    })?;
    Ok(info.siblings.into_iter().map(|s| s.rfilename).collect())
}

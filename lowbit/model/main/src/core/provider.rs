//! [`ModelProvider`] for Baichuan2 checkpoints.

use crate::api::error::ModelResult;
use crate::api::traits::{ModelHandle, ModelProvider};
use crate::api::types::{GenerationConfig, QuantizationParams, RuntimeParams};
use crate::core::checkpoint::Checkpoint;
use crate::core::lowbit;
use crate::core::model::LowBitModel;
use lowbit_hub::HubApi;
use std::path::Path;

/// Builds [`LowBitModel`]s from HuggingFace checkpoints or lowbit directories.
#[derive(Debug, Clone, Default)]
pub struct BaichuanProvider {
    hub: HubApi,
}

impl BaichuanProvider {
    pub fn new(hub: HubApi) -> Self {
        Self { hub }
    }
}

impl ModelProvider for BaichuanProvider {
    type Handle = LowBitModel;

    fn construct_fresh(
        &self,
        source: &str,
        quantization: &QuantizationParams,
        runtime: &RuntimeParams,
    ) -> ModelResult<LowBitModel> {
        let bundle = self.hub.resolve(source)?;
        log::info!("Loading checkpoint {} from {}", bundle.model_id, bundle.model_dir.display());

        let raw_config = bundle.load_config_sync()?;
        let files = bundle.weight_files()?;
        let checkpoint = Checkpoint::open(&files)?;
        log::info!("Mapped {} tensors from {} file(s)", checkpoint.len(), files.len());

        LowBitModel::from_checkpoint(raw_config, &checkpoint, quantization, runtime, source)
    }

    fn load_cached(&self, path: &Path, runtime: &RuntimeParams) -> ModelResult<LowBitModel> {
        lowbit::load(path, runtime)
    }
}

impl ModelHandle for LowBitModel {
    fn generate(&self, input_ids: &[u32], config: &GenerationConfig) -> ModelResult<Vec<u32>> {
        LowBitModel::generate(self, input_ids, config)
    }

    fn persist(&self, path: &Path) -> ModelResult<()> {
        lowbit::save(self, path)
    }
}

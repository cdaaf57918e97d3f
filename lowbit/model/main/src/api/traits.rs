//! Capability contracts between the generation driver and a model backend.

use crate::api::error::ModelResult;
use crate::api::types::{GenerationConfig, QuantizationParams, RuntimeParams};
use std::path::Path;

/// A loaded, possibly quantized, causal language model.
pub trait ModelHandle {
    /// Decode from `input_ids`; returns the prompt followed by new tokens.
    fn generate(&self, input_ids: &[u32], config: &GenerationConfig) -> ModelResult<Vec<u32>>;

    /// Write the model to a lowbit directory that `load_cached` can read.
    fn persist(&self, path: &Path) -> ModelResult<()>;
}

/// Produces model handles, either from a full-precision checkpoint or from
/// a previously persisted lowbit directory.
pub trait ModelProvider {
    type Handle: ModelHandle;

    /// Load a checkpoint and quantize it.
    fn construct_fresh(
        &self,
        source: &str,
        quantization: &QuantizationParams,
        runtime: &RuntimeParams,
    ) -> ModelResult<Self::Handle>;

    /// Load an already-quantized lowbit directory.
    fn load_cached(&self, path: &Path, runtime: &RuntimeParams) -> ModelResult<Self::Handle>;
}

//! Public parameter types for model construction and generation

use lowbit_quant::QType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage precision for tensors that are not quantized (embedding, norms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    #[default]
    Bf16,
    F32,
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dtype::Bf16 => f.write_str("bf16"),
            Dtype::F32 => f.write_str("f32"),
        }
    }
}

/// How a full-precision checkpoint is turned into a lowbit model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationParams {
    /// Weight format of every linear projection and the LM head
    pub qtype: QType,
    /// Precision of the token embedding and norm weights
    pub dtype: Dtype,
    /// Fuse each layer's gate and up projections into one matrix
    pub optimize_model: bool,
}

impl Default for QuantizationParams {
    fn default() -> Self {
        Self {
            qtype: QType::SymInt4,
            dtype: Dtype::Bf16,
            optimize_model: true,
        }
    }
}

/// Execution parameters, supplied on every load (never persisted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeParams {
    /// KV cache capacity: prompt plus generated tokens never exceed it
    pub max_output_len: usize,
    /// Longest accepted prompt, in tokens
    pub max_prompt_len: usize,
    /// Row shards per projection, run in parallel inside a stage
    pub intra_pp: usize,
    /// Pipeline stages the decoder layers are partitioned into
    pub inter_pp: usize,
    /// Store cached values as [heads, head_dim, len] instead of [heads, len, head_dim]
    pub transpose_value_cache: bool,
}

impl Default for RuntimeParams {
    fn default() -> Self {
        Self {
            max_output_len: 1024,
            max_prompt_len: 512,
            intra_pp: 2,
            inter_pp: 2,
            transpose_value_cache: true,
        }
    }
}

/// Configuration for text generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Maximum number of new tokens to generate
    pub max_new_tokens: usize,
    /// Beam count; only 1 is supported
    pub num_beams: usize,
    /// Sample from the distribution instead of taking the argmax; unsupported
    pub do_sample: bool,
}

impl GenerationConfig {
    /// Create a greedy decoding config
    pub fn greedy(max_new_tokens: usize) -> Self {
        Self {
            max_new_tokens,
            num_beams: 1,
            do_sample: false,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::greedy(32)
    }
}

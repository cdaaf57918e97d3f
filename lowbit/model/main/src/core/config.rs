//! Baichuan2 model configuration parsed from a HuggingFace config.json.

use crate::api::error::{ModelError, ModelResult};
use crate::api::types::RuntimeParams;
use lowbit_quant::QType;
use serde::{Deserialize, Serialize};

fn default_rms_norm_eps() -> f32 {
    1e-6
}
fn default_max_position_embeddings() -> usize {
    4096
}
fn default_rope_theta() -> f32 {
    10000.0
}
fn default_bos_token_id() -> u32 {
    1
}
fn default_eos_token_id() -> u32 {
    2
}
fn default_hidden_act() -> String {
    "silu".to_string()
}

/// Architecture hyper-parameters of a Baichuan2 (RoPE variant) checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaichuanConfig {
    pub hidden_size: usize,
    pub intermediate_size: usize,
    pub num_attention_heads: usize,
    pub num_hidden_layers: usize,
    pub vocab_size: usize,
    #[serde(default = "default_rms_norm_eps")]
    pub rms_norm_eps: f32,
    #[serde(default = "default_max_position_embeddings")]
    pub max_position_embeddings: usize,
    #[serde(default = "default_rope_theta")]
    pub rope_theta: f32,
    #[serde(default = "default_bos_token_id")]
    pub bos_token_id: u32,
    #[serde(default = "default_eos_token_id")]
    pub eos_token_id: u32,
    #[serde(default)]
    pub pad_token_id: u32,
    #[serde(default = "default_hidden_act")]
    pub hidden_act: String,
}

impl BaichuanConfig {
    /// Parse from a config.json value; unknown keys are ignored.
    pub fn from_json_value(value: &serde_json::Value) -> ModelResult<Self> {
        let config: BaichuanConfig = serde_json::from_value(value.clone())?;
        Ok(config)
    }

    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }

    /// Check that the shapes are usable with the given weight format.
    pub fn validate(&self, qtype: QType) -> ModelResult<()> {
        if self.num_hidden_layers == 0 || self.vocab_size == 0 {
            return Err(ModelError::InvalidConfig(
                "num_hidden_layers and vocab_size must be > 0".into(),
            ));
        }
        if self.num_attention_heads == 0 || self.hidden_size % self.num_attention_heads != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "hidden_size {} is not divisible by num_attention_heads {}",
                self.hidden_size, self.num_attention_heads
            )));
        }
        if self.head_dim() % 2 != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "head_dim {} must be even for rotary embeddings",
                self.head_dim()
            )));
        }
        let block = qtype.block_size();
        if self.hidden_size % block != 0 || self.intermediate_size % block != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "hidden_size {} and intermediate_size {} must be multiples of the {} block size {}",
                self.hidden_size, self.intermediate_size, qtype, block
            )));
        }
        if self.hidden_act != "silu" {
            return Err(ModelError::Unsupported(format!(
                "hidden_act '{}' (only silu)",
                self.hidden_act
            )));
        }
        Ok(())
    }

    /// Check runtime parameters against this architecture.
    pub fn validate_runtime(&self, runtime: &RuntimeParams) -> ModelResult<()> {
        if runtime.max_prompt_len == 0 {
            return Err(ModelError::InvalidConfig("max_prompt_len must be > 0".into()));
        }
        if runtime.max_prompt_len > runtime.max_output_len {
            return Err(ModelError::InvalidConfig(format!(
                "max_prompt_len {} exceeds max_output_len {}",
                runtime.max_prompt_len, runtime.max_output_len
            )));
        }
        if runtime.max_output_len > self.max_position_embeddings {
            return Err(ModelError::InvalidConfig(format!(
                "max_output_len {} exceeds max_position_embeddings {}",
                runtime.max_output_len, self.max_position_embeddings
            )));
        }
        if runtime.intra_pp == 0 {
            return Err(ModelError::InvalidConfig("intra_pp must be >= 1".into()));
        }
        Ok(())
    }
}

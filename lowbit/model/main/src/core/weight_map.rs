//! Tensor names used by Baichuan2 checkpoints and lowbit files.

pub const EMBED_TOKENS: &str = "model.embed_tokens.weight";
pub const FINAL_NORM: &str = "model.norm.weight";
pub const LM_HEAD: &str = "lm_head.weight";

pub fn input_layernorm(layer: usize) -> String {
    format!("model.layers.{}.input_layernorm.weight", layer)
}

pub fn w_pack(layer: usize) -> String {
    format!("model.layers.{}.self_attn.W_pack.weight", layer)
}

pub fn o_proj(layer: usize) -> String {
    format!("model.layers.{}.self_attn.o_proj.weight", layer)
}

pub fn post_attention_layernorm(layer: usize) -> String {
    format!("model.layers.{}.post_attention_layernorm.weight", layer)
}

pub fn gate_proj(layer: usize) -> String {
    format!("model.layers.{}.mlp.gate_proj.weight", layer)
}

pub fn up_proj(layer: usize) -> String {
    format!("model.layers.{}.mlp.up_proj.weight", layer)
}

/// Fused gate + up projection, written when the model is optimized.
pub fn gate_up_proj(layer: usize) -> String {
    format!("model.layers.{}.mlp.gate_up_proj.weight", layer)
}

pub fn down_proj(layer: usize) -> String {
    format!("model.layers.{}.mlp.down_proj.weight", layer)
}

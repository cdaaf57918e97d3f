//! # lowbit-testkit
//!
//! Writes a tiny random Baichuan2-shaped checkpoint (`config.json` plus an
//! F32 `model.safetensors`) for integration tests. The same seed always
//! produces the same weights.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use safetensors::tensor::TensorView;
use safetensors::Dtype;
use std::path::Path;

pub const HIDDEN: usize = 64;
pub const INTERMEDIATE: usize = 128;
pub const HEADS: usize = 4;
pub const LAYERS: usize = 3;
pub const VOCAB: usize = 32;
pub const MAX_POSITIONS: usize = 128;

/// HuggingFace `config.json` of the tiny model.
pub fn config_json(eos_token_id: u32) -> serde_json::Value {
    serde_json::json!({
        "architectures": ["BaichuanForCausalLM"],
        "model_type": "baichuan",
        "hidden_size": HIDDEN,
        "intermediate_size": INTERMEDIATE,
        "num_attention_heads": HEADS,
        "num_hidden_layers": LAYERS,
        "vocab_size": VOCAB,
        "max_position_embeddings": MAX_POSITIONS,
        "rms_norm_eps": 1e-6,
        "hidden_act": "silu",
        "bos_token_id": 1,
        "eos_token_id": eos_token_id,
        "pad_token_id": 0,
        "torch_dtype": "float32"
    })
}

fn uniform(rng: &mut StdRng, n: usize, lo: f32, hi: f32) -> Vec<u8> {
    (0..n).flat_map(|_| rng.gen_range(lo..hi).to_le_bytes()).collect()
}

/// Name, shape and little-endian F32 bytes of every tensor, in file order.
fn tensors(seed: u64) -> Vec<(String, Vec<usize>, Vec<u8>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (h, i, v) = (HIDDEN, INTERMEDIATE, VOCAB);
    let mut out = vec![(
        "model.embed_tokens.weight".to_string(),
        vec![v, h],
        uniform(&mut rng, v * h, -1.0, 1.0),
    )];
    for l in 0..LAYERS {
        let p = format!("model.layers.{}", l);
        let layer = [
            ("input_layernorm", vec![h], 0.8, 1.2),
            ("self_attn.W_pack", vec![3 * h, h], -0.2, 0.2),
            ("self_attn.o_proj", vec![h, h], -0.2, 0.2),
            ("post_attention_layernorm", vec![h], 0.8, 1.2),
            ("mlp.gate_proj", vec![i, h], -0.2, 0.2),
            ("mlp.up_proj", vec![i, h], -0.2, 0.2),
            ("mlp.down_proj", vec![h, i], -0.2, 0.2),
        ];
        for (name, shape, lo, hi) in layer {
            let n = shape.iter().product();
            let bytes = uniform(&mut rng, n, lo, hi);
            out.push((format!("{}.{}.weight", p, name), shape, bytes));
        }
    }
    out.push(("model.norm.weight".to_string(), vec![h], uniform(&mut rng, h, 0.8, 1.2)));
    out.push(("lm_head.weight".to_string(), vec![v, h], uniform(&mut rng, v * h, -1.0, 1.0)));
    out
}

/// Write `config.json` and `model.safetensors` into `dir`, creating it.
pub fn write_checkpoint(dir: &Path, seed: u64, eos_token_id: u32) -> anyhow::Result<()> {
    write_checkpoint_without(dir, seed, eos_token_id, None)
}

/// Same as [`write_checkpoint`], optionally leaving one tensor out.
pub fn write_checkpoint_without(
    dir: &Path,
    seed: u64,
    eos_token_id: u32,
    skip: Option<&str>,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(
        dir.join("config.json"),
        serde_json::to_string_pretty(&config_json(eos_token_id))?,
    )?;

    let tensors = tensors(seed);
    let mut views = Vec::with_capacity(tensors.len());
    for (name, shape, bytes) in &tensors {
        if Some(name.as_str()) == skip {
            continue;
        }
        views.push((name.as_str(), TensorView::new(Dtype::F32, shape.clone(), bytes)?));
    }
    safetensors::serialize_to_file(views, &None, &dir.join("model.safetensors"))?;
    Ok(())
}

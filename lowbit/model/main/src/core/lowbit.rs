//! The lowbit directory: a quantized model persisted for fast reloading.
//!
//! Layout:
//! - `lowbit_config.json`: [`LowBitManifest`]
//! - `config.json`: the source checkpoint's config, unchanged
//! - `model.lowbit.safetensors`: packed int4 matrices as `U8 [rows, row_bytes]`,
//!   embedding and norm weights as `BF16` or `F32`

use crate::api::error::{ModelError, ModelResult};
use crate::api::types::{Dtype, QuantizationParams, RuntimeParams};
use crate::core::checkpoint::Checkpoint;
use crate::core::config::BaichuanConfig;
use crate::core::decoder::{DecoderLayer, Mlp};
use crate::core::dense::DenseTensor;
use crate::core::model::LowBitModel;
use crate::core::weight_map as names;
use lowbit_quant::{QType, QuantizedMatrix};
use safetensors::tensor::TensorView;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

pub const MANIFEST_FILE: &str = "lowbit_config.json";
pub const CONFIG_FILE: &str = "config.json";
pub const WEIGHTS_FILE: &str = "model.lowbit.safetensors";
pub const FORMAT_VERSION: u32 = 1;

/// Quantization settings a lowbit directory was written with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowBitManifest {
    pub format_version: u32,
    pub qtype: String,
    pub dtype: Dtype,
    pub optimize_model: bool,
    pub block_size: usize,
    /// Model id or path the weights were quantized from
    pub source: String,
}

impl LowBitManifest {
    fn quantization(&self) -> ModelResult<QuantizationParams> {
        if self.format_version != FORMAT_VERSION {
            return Err(ModelError::Unsupported(format!(
                "lowbit format_version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }
        let qtype = QType::from_str(&self.qtype)?;
        if self.block_size != qtype.block_size() {
            return Err(ModelError::InvalidConfig(format!(
                "block_size {} does not match {} ({})",
                self.block_size,
                qtype,
                qtype.block_size()
            )));
        }
        Ok(QuantizationParams {
            qtype,
            dtype: self.dtype,
            optimize_model: self.optimize_model,
        })
    }
}

fn st_dtype(dtype: Dtype) -> safetensors::Dtype {
    match dtype {
        Dtype::Bf16 => safetensors::Dtype::BF16,
        Dtype::F32 => safetensors::Dtype::F32,
    }
}

/// Owned tensor waiting to be serialized.
struct Entry {
    name: String,
    dtype: safetensors::Dtype,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

impl Entry {
    fn quantized(name: String, m: &QuantizedMatrix) -> Self {
        Self {
            name,
            dtype: safetensors::Dtype::U8,
            shape: vec![m.rows(), m.row_bytes()],
            bytes: m.as_bytes().to_vec(),
        }
    }

    fn dense(name: String, t: &DenseTensor, shape: Vec<usize>) -> Self {
        Self { name, dtype: st_dtype(t.dtype()), shape, bytes: t.to_le_bytes() }
    }
}

/// Write `model` to the lowbit directory `dir`, creating it if needed.
pub fn save(model: &LowBitModel, dir: &Path) -> ModelResult<()> {
    let start = Instant::now();
    fs::create_dir_all(dir)?;

    let quant = &model.quantization;
    let dtype = quant.dtype;
    let h = model.config.hidden_size;

    let manifest = LowBitManifest {
        format_version: FORMAT_VERSION,
        qtype: quant.qtype.as_str().to_string(),
        dtype,
        optimize_model: quant.optimize_model,
        block_size: quant.qtype.block_size(),
        source: model.source.clone(),
    };
    fs::write(dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&manifest)?)?;
    fs::write(dir.join(CONFIG_FILE), serde_json::to_string_pretty(&model.raw_config)?)?;

    let norm = |w: &[f32]| DenseTensor::from_f32(w.to_vec(), dtype);

    let mut entries = vec![Entry::dense(
        names::EMBED_TOKENS.to_string(),
        &model.embed,
        vec![model.config.vocab_size, h],
    )];
    for (i, layer) in model.layers.iter().enumerate() {
        entries.push(Entry::dense(names::input_layernorm(i), &norm(&layer.input_norm), vec![h]));
        entries.push(Entry::quantized(names::w_pack(i), &layer.w_pack));
        entries.push(Entry::quantized(names::o_proj(i), &layer.o_proj));
        entries.push(Entry::dense(
            names::post_attention_layernorm(i),
            &norm(&layer.post_norm),
            vec![h],
        ));
        match &layer.mlp {
            Mlp::Fused { gate_up } => {
                entries.push(Entry::quantized(names::gate_up_proj(i), gate_up));
            }
            Mlp::Split { gate, up } => {
                entries.push(Entry::quantized(names::gate_proj(i), gate));
                entries.push(Entry::quantized(names::up_proj(i), up));
            }
        }
        entries.push(Entry::quantized(names::down_proj(i), &layer.down_proj));
    }
    entries.push(Entry::dense(names::FINAL_NORM.to_string(), &norm(&model.norm), vec![h]));
    entries.push(Entry::quantized(names::LM_HEAD.to_string(), &model.lm_head));

    let mut views: Vec<(&str, TensorView<'_>)> = Vec::with_capacity(entries.len());
    for e in &entries {
        views.push((e.name.as_str(), TensorView::new(e.dtype, e.shape.clone(), &e.bytes)?));
    }
    let refs: Vec<(&str, &TensorView<'_>)> = views.iter().map(|(n, v)| (*n, v)).collect();

    let mut metadata = HashMap::new();
    metadata.insert("format".to_string(), "lowbit".to_string());
    metadata.insert("qtype".to_string(), quant.qtype.as_str().to_string());
    safetensors::serialize_to_file(refs, &Some(metadata), &dir.join(WEIGHTS_FILE))?;

    log::info!(
        "Saved lowbit model ({} tensors) to {} in {:.2}s",
        entries.len(),
        dir.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn load_quantized(
    ckpt: &Checkpoint,
    name: &str,
    qtype: QType,
    rows: usize,
    cols: usize,
) -> ModelResult<QuantizedMatrix> {
    let raw = ckpt.raw(name)?;
    let row_bytes = cols / qtype.block_size() * qtype.block_bytes();
    if raw.dtype != safetensors::Dtype::U8 || raw.shape != [rows, row_bytes] {
        return Err(ModelError::ShapeMismatch {
            name: name.to_string(),
            expected: vec![rows, row_bytes],
            actual: raw.shape,
        });
    }
    Ok(QuantizedMatrix::from_raw(qtype, rows, cols, raw.data.to_vec())?)
}

fn load_dense(
    ckpt: &Checkpoint,
    name: &str,
    dtype: Dtype,
    shape: &[usize],
) -> ModelResult<DenseTensor> {
    let raw = ckpt.raw(name)?;
    if raw.shape != shape {
        return Err(ModelError::ShapeMismatch {
            name: name.to_string(),
            expected: shape.to_vec(),
            actual: raw.shape,
        });
    }
    if raw.dtype != st_dtype(dtype) {
        return Err(ModelError::Unsupported(format!(
            "tensor {} stored as {:?}, manifest says {}",
            name, raw.dtype, dtype
        )));
    }
    Ok(DenseTensor::from_le_bytes(dtype, raw.data))
}

/// Load a lowbit directory written by [`save`].
pub fn load(dir: &Path, runtime: &RuntimeParams) -> ModelResult<LowBitModel> {
    let start = Instant::now();
    let manifest: LowBitManifest =
        serde_json::from_str(&fs::read_to_string(dir.join(MANIFEST_FILE))?)?;
    let quantization = manifest.quantization()?;
    let raw_config: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join(CONFIG_FILE))?)?;
    let config = BaichuanConfig::from_json_value(&raw_config)?;
    config.validate(quantization.qtype)?;

    let ckpt = Checkpoint::open_file(&dir.join(WEIGHTS_FILE))?;
    let qtype = quantization.qtype;
    let dtype = quantization.dtype;
    let h = config.hidden_size;
    let inter = config.intermediate_size;

    let embed = load_dense(&ckpt, names::EMBED_TOKENS, dtype, &[config.vocab_size, h])?;

    let mut layers = Vec::with_capacity(config.num_hidden_layers);
    for i in 0..config.num_hidden_layers {
        let mlp = if quantization.optimize_model {
            let gate_up = load_quantized(&ckpt, &names::gate_up_proj(i), qtype, 2 * inter, h)?;
            Mlp::Fused { gate_up }
        } else {
            Mlp::Split {
                gate: load_quantized(&ckpt, &names::gate_proj(i), qtype, inter, h)?,
                up: load_quantized(&ckpt, &names::up_proj(i), qtype, inter, h)?,
            }
        };
        let input_norm = load_dense(&ckpt, &names::input_layernorm(i), dtype, &[h])?;
        let post_norm = load_dense(&ckpt, &names::post_attention_layernorm(i), dtype, &[h])?;
        layers.push(DecoderLayer {
            input_norm: input_norm.to_f32_vec(),
            w_pack: load_quantized(&ckpt, &names::w_pack(i), qtype, 3 * h, h)?,
            o_proj: load_quantized(&ckpt, &names::o_proj(i), qtype, h, h)?,
            post_norm: post_norm.to_f32_vec(),
            mlp,
            down_proj: load_quantized(&ckpt, &names::down_proj(i), qtype, h, inter)?,
        });
    }

    let norm = load_dense(&ckpt, names::FINAL_NORM, dtype, &[h])?.to_f32_vec();
    let lm_head = load_quantized(&ckpt, names::LM_HEAD, qtype, config.vocab_size, h)?;

    log::info!(
        "Loaded lowbit model from {} ({} from {}) in {:.2}s",
        dir.display(),
        qtype,
        manifest.source,
        start.elapsed().as_secs_f64()
    );

    LowBitModel::assemble(
        config,
        raw_config,
        quantization,
        runtime,
        embed,
        layers,
        norm,
        lm_head,
        manifest.source,
    )
}

//! Baichuan2 causal LM with int4 projections and greedy decoding.

use crate::api::error::{ModelError, ModelResult};
use crate::api::types::{GenerationConfig, QuantizationParams, RuntimeParams};
use crate::core::checkpoint::Checkpoint;
use crate::core::config::BaichuanConfig;
use crate::core::decoder::{DecoderLayer, LayerDims, Mlp};
use crate::core::dense::{round_to, DenseTensor};
use crate::core::kv_cache::{KvCache, ValueLayout};
use crate::core::layers::{argmax, l2_normalize_rows, rms_norm, RopeTable};
use crate::core::pipeline::PipelinePlan;
use crate::core::weight_map as names;
use lowbit_quant::QuantizedMatrix;
use std::time::Instant;

/// A quantized Baichuan2 model ready for generation.
///
/// The model is immutable once built; every [`LowBitModel::generate`] call
/// allocates its own KV cache.
pub struct LowBitModel {
    pub(crate) config: BaichuanConfig,
    pub(crate) raw_config: serde_json::Value,
    pub(crate) quantization: QuantizationParams,
    pub(crate) runtime: RuntimeParams,
    pub(crate) embed: DenseTensor,
    pub(crate) layers: Vec<DecoderLayer>,
    pub(crate) norm: Vec<f32>,
    pub(crate) lm_head: QuantizedMatrix,
    pub(crate) source: String,
    rope: RopeTable,
    plan: PipelinePlan,
}

impl LowBitModel {
    /// Quantize a full-precision checkpoint.
    pub fn from_checkpoint(
        raw_config: serde_json::Value,
        checkpoint: &Checkpoint,
        quantization: &QuantizationParams,
        runtime: &RuntimeParams,
        source: &str,
    ) -> ModelResult<Self> {
        let config = BaichuanConfig::from_json_value(&raw_config)?;
        config.validate(quantization.qtype)?;
        config.validate_runtime(runtime)?;

        let h = config.hidden_size;
        let inter = config.intermediate_size;
        let vocab = config.vocab_size;
        let dtype = quantization.dtype;
        let start = Instant::now();

        log::info!(
            "Quantizing {} layers to {} (dtype={}, optimize_model={})",
            config.num_hidden_layers,
            quantization.qtype,
            dtype,
            quantization.optimize_model
        );

        let embed = checkpoint.tensor_f32(names::EMBED_TOKENS, &[vocab, h])?;
        let embed = DenseTensor::from_f32(embed, dtype);

        let mut layers = Vec::with_capacity(config.num_hidden_layers);
        let quantize = |name: String, rows, cols| quantize_tensor(checkpoint, &name, rows, cols);
        for i in 0..config.num_hidden_layers {

            let gate = quantize(names::gate_proj(i), inter, h)?;
            let up = quantize(names::up_proj(i), inter, h)?;
            let mlp = if quantization.optimize_model {
                Mlp::Fused { gate_up: QuantizedMatrix::concat_rows(&[&gate, &up])? }
            } else {
                Mlp::Split { gate, up }
            };

            let input_norm = checkpoint.tensor_f32(&names::input_layernorm(i), &[h])?;
            let post_norm = checkpoint.tensor_f32(&names::post_attention_layernorm(i), &[h])?;
            layers.push(DecoderLayer {
                input_norm: round_to(input_norm, dtype),
                w_pack: quantize(names::w_pack(i), 3 * h, h)?,
                o_proj: quantize(names::o_proj(i), h, h)?,
                post_norm: round_to(post_norm, dtype),
                mlp,
                down_proj: quantize(names::down_proj(i), h, inter)?,
            });
            log::debug!("quantized layer {}/{}", i + 1, config.num_hidden_layers);
        }

        let norm = round_to(checkpoint.tensor_f32(names::FINAL_NORM, &[h])?, dtype);

        let mut head = checkpoint.tensor_f32(names::LM_HEAD, &[vocab, h])?;
        l2_normalize_rows(&mut head, h);
        let lm_head = QuantizedMatrix::from_f32(vocab, h, &head)?;

        log::info!("Quantization finished in {:.2}s", start.elapsed().as_secs_f64());

        Self::assemble(
            config,
            raw_config,
            quantization.clone(),
            runtime,
            embed,
            layers,
            norm,
            lm_head,
            source.to_string(),
        )
    }

    /// Put together already-prepared weights and bind them to `runtime`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        config: BaichuanConfig,
        raw_config: serde_json::Value,
        quantization: QuantizationParams,
        runtime: &RuntimeParams,
        embed: DenseTensor,
        layers: Vec<DecoderLayer>,
        norm: Vec<f32>,
        lm_head: QuantizedMatrix,
        source: String,
    ) -> ModelResult<Self> {
        config.validate(quantization.qtype)?;
        config.validate_runtime(runtime)?;
        if layers.len() != config.num_hidden_layers {
            return Err(ModelError::InvalidConfig(format!(
                "expected {} layers, found {}",
                config.num_hidden_layers,
                layers.len()
            )));
        }

        let plan = PipelinePlan::new(config.num_hidden_layers, runtime.inter_pp, runtime.intra_pp)?;
        let rope = RopeTable::new(config.head_dim(), runtime.max_output_len, config.rope_theta);
        log::info!(
            "Pipeline: {} stage(s) {:?}, {} shard(s) per projection, value cache {:?}",
            plan.stages().len(),
            plan.stages(),
            plan.shards(),
            ValueLayout::from_transpose_flag(runtime.transpose_value_cache)
        );

        Ok(Self {
            config,
            raw_config,
            quantization,
            runtime: runtime.clone(),
            embed,
            layers,
            norm,
            lm_head,
            source,
            rope,
            plan,
        })
    }

    pub fn config(&self) -> &BaichuanConfig {
        &self.config
    }

    pub fn quantization(&self) -> &QuantizationParams {
        &self.quantization
    }

    pub fn runtime(&self) -> &RuntimeParams {
        &self.runtime
    }

    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }

    fn dims(&self) -> LayerDims {
        LayerDims {
            hidden: self.config.hidden_size,
            heads: self.config.num_attention_heads,
            head_dim: self.config.head_dim(),
            eps: self.config.rms_norm_eps,
        }
    }

    fn new_cache(&self) -> KvCache {
        KvCache::new(
            self.config.num_hidden_layers,
            self.config.num_attention_heads,
            self.config.head_dim(),
            self.runtime.max_output_len,
            ValueLayout::from_transpose_flag(self.runtime.transpose_value_cache),
        )
    }

    /// Feed `tokens` at the cache's current position; returns the logits of
    /// the last token.
    fn forward(&self, tokens: &[u32], cache: &mut KvCache) -> ModelResult<Vec<f32>> {
        let h = self.config.hidden_size;
        let m = tokens.len();
        let start_pos = cache.len();
        if start_pos + m > cache.capacity() {
            return Err(ModelError::GenerationError(format!(
                "sequence of {} tokens exceeds max_output_len {}",
                start_pos + m,
                cache.capacity()
            )));
        }

        let mut hidden = vec![0.0f32; m * h];
        for (&tok, row) in tokens.iter().zip(hidden.chunks_exact_mut(h)) {
            self.embed.row_into(tok as usize, h, row)?;
        }

        let dims = self.dims();
        let shards = self.plan.shards();
        for stage in self.plan.stages() {
            for l in stage.clone() {
                let layer = &self.layers[l];
                layer.forward(l, &mut hidden, m, start_pos, cache, &self.rope, dims, shards)?;
            }
        }
        cache.advance(m);

        let mut last = vec![0.0f32; h];
        rms_norm(&hidden[(m - 1) * h..], &self.norm, self.config.rms_norm_eps, &mut last);
        let mut logits = vec![0.0f32; self.config.vocab_size];
        self.lm_head.matvec(&last, &mut logits, shards);
        Ok(logits)
    }

    /// Greedy decoding; returns `input_ids` followed by the generated ids.
    pub fn generate(&self, input_ids: &[u32], gen: &GenerationConfig) -> ModelResult<Vec<u32>> {
        if gen.num_beams != 1 {
            return Err(ModelError::Unsupported(format!(
                "num_beams = {} (only greedy decoding)",
                gen.num_beams
            )));
        }
        if gen.do_sample {
            return Err(ModelError::Unsupported("do_sample (only greedy decoding)".into()));
        }
        if input_ids.is_empty() {
            return Err(ModelError::GenerationError("input_ids is empty".into()));
        }
        if input_ids.len() > self.runtime.max_prompt_len {
            return Err(ModelError::GenerationError(format!(
                "prompt of {} tokens exceeds max_prompt_len {}",
                input_ids.len(),
                self.runtime.max_prompt_len
            )));
        }
        if let Some(&bad) = input_ids.iter().find(|&&id| id as usize >= self.config.vocab_size) {
            return Err(ModelError::GenerationError(format!(
                "token id {} out of vocabulary range {}",
                bad, self.config.vocab_size
            )));
        }

        let mut output = input_ids.to_vec();
        if gen.max_new_tokens == 0 {
            return Ok(output);
        }

        let capacity = self.runtime.max_output_len;
        let mut cache = self.new_cache();

        let start = Instant::now();
        let mut logits = self.forward(input_ids, &mut cache)?;
        log::debug!(
            "prefill: {} tokens in {:.1}ms",
            input_ids.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        let decode_start = Instant::now();
        let mut generated = 0usize;
        while output.len() < capacity {
            let next = argmax(&logits);
            output.push(next);
            generated += 1;

            if next == self.config.eos_token_id
                || generated >= gen.max_new_tokens
                || output.len() >= capacity
            {
                break;
            }
            logits = self.forward(&[next], &mut cache)?;
        }

        let elapsed = decode_start.elapsed().as_secs_f64();
        log::debug!(
            "decode: {} tokens in {:.1}ms ({:.1} tok/s)",
            generated,
            elapsed * 1000.0,
            if elapsed > 0.0 { generated as f64 / elapsed } else { 0.0 }
        );

        Ok(output)
    }
}

fn quantize_tensor(
    checkpoint: &Checkpoint,
    name: &str,
    rows: usize,
    cols: usize,
) -> ModelResult<QuantizedMatrix> {
    let w = checkpoint.tensor_f32(name, &[rows, cols])?;
    Ok(QuantizedMatrix::from_f32(rows, cols, &w)?)
}

//! One Baichuan2 decoder layer over int4 projections.

use crate::api::error::ModelResult;
use crate::core::kv_cache::KvCache;
use crate::core::layers::{rms_norm, silu, softmax_in_place, RopeTable};
use lowbit_quant::QuantizedMatrix;

/// SwiGLU input projections, either fused into one matrix or kept apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Mlp {
    /// `[2 * intermediate, hidden]`: gate rows followed by up rows
    Fused { gate_up: QuantizedMatrix },
    Split { gate: QuantizedMatrix, up: QuantizedMatrix },
}

impl Mlp {
    pub fn intermediate_size(&self) -> usize {
        match self {
            Mlp::Fused { gate_up } => gate_up.rows() / 2,
            Mlp::Split { gate, .. } => gate.rows(),
        }
    }

    /// `silu(gate(x)) * up(x)` for `m` rows of `x`.
    fn activate(&self, x: &[f32], m: usize, shards: usize) -> ModelResult<Vec<f32>> {
        let inter = self.intermediate_size();
        let mut act = vec![0.0f32; m * inter];
        match self {
            Mlp::Fused { gate_up } => {
                let gu = gate_up.matmul(x, m, shards)?;
                for (t, row) in gu.chunks_exact(2 * inter).enumerate() {
                    let (g, u) = row.split_at(inter);
                    for (i, a) in act[t * inter..(t + 1) * inter].iter_mut().enumerate() {
                        *a = silu(g[i]) * u[i];
                    }
                }
            }
            Mlp::Split { gate, up } => {
                let g = gate.matmul(x, m, shards)?;
                let u = up.matmul(x, m, shards)?;
                for ((a, &gv), &uv) in act.iter_mut().zip(&g).zip(&u) {
                    *a = silu(gv) * uv;
                }
            }
        }
        Ok(act)
    }
}

/// Shapes shared by every layer of a model.
#[derive(Debug, Clone, Copy)]
pub struct LayerDims {
    pub hidden: usize,
    pub heads: usize,
    pub head_dim: usize,
    pub eps: f32,
}

/// Pre-norm decoder layer: fused QKV attention followed by a SwiGLU MLP.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderLayer {
    pub input_norm: Vec<f32>,
    /// `[3 * hidden, hidden]`: q, k and v rows
    pub w_pack: QuantizedMatrix,
    pub o_proj: QuantizedMatrix,
    pub post_norm: Vec<f32>,
    pub mlp: Mlp,
    pub down_proj: QuantizedMatrix,
}

impl DecoderLayer {
    /// Run `m` consecutive tokens starting at `start_pos` through the layer,
    /// updating `hidden` (`[m, hidden]`) in place and appending their keys
    /// and values to `cache`.
    #[allow(clippy::too_many_arguments)]
    pub fn forward(
        &self,
        layer: usize,
        hidden: &mut [f32],
        m: usize,
        start_pos: usize,
        cache: &mut KvCache,
        rope: &RopeTable,
        dims: LayerDims,
        shards: usize,
    ) -> ModelResult<()> {
        let h = dims.hidden;
        let hd = dims.head_dim;

        // Attention block
        let mut normed = vec![0.0f32; m * h];
        for (x, out) in hidden.chunks_exact(h).zip(normed.chunks_exact_mut(h)) {
            rms_norm(x, &self.input_norm, dims.eps, out);
        }
        let mut qkv = self.w_pack.matmul(&normed, m, shards)?;

        for (t, row) in qkv.chunks_exact_mut(3 * h).enumerate() {
            let pos = start_pos + t;
            let (q, kv) = row.split_at_mut(h);
            let (k, v) = kv.split_at_mut(h);
            for head in 0..dims.heads {
                rope.apply(&mut q[head * hd..(head + 1) * hd], pos);
                rope.apply(&mut k[head * hd..(head + 1) * hd], pos);
            }
            cache.write(layer, pos, k, v)?;
        }

        let scale = 1.0 / (hd as f32).sqrt();
        let mut attn = vec![0.0f32; m * h];
        for t in 0..m {
            let q = &qkv[t * 3 * h..t * 3 * h + h];
            let visible = start_pos + t + 1;
            let mut scores = vec![0.0f32; visible];
            for head in 0..dims.heads {
                let qh = &q[head * hd..(head + 1) * hd];
                for (p, s) in scores.iter_mut().enumerate() {
                    let kh = cache.key(layer, head, p);
                    *s = qh.iter().zip(kh).map(|(a, b)| a * b).sum::<f32>() * scale;
                }
                softmax_in_place(&mut scores);
                let out = &mut attn[t * h + head * hd..t * h + (head + 1) * hd];
                cache.weighted_values(layer, head, &scores, out);
            }
        }

        let projected = self.o_proj.matmul(&attn, m, shards)?;
        for (x, o) in hidden.iter_mut().zip(&projected) {
            *x += o;
        }

        // MLP block
        for (x, out) in hidden.chunks_exact(h).zip(normed.chunks_exact_mut(h)) {
            rms_norm(x, &self.post_norm, dims.eps, out);
        }
        let act = self.mlp.activate(&normed, m, shards)?;
        let down = self.down_proj.matmul(&act, m, shards)?;
        for (x, d) in hidden.iter_mut().zip(&down) {
            *x += d;
        }

        Ok(())
    }
}

//! Element-wise building blocks of the decoder: RMSNorm, RoPE, SiLU, softmax.

use rayon::prelude::*;

/// RMSNorm: x * weight / rms(x). No mean subtraction, no bias.
pub fn rms_norm(x: &[f32], weight: &[f32], eps: f32, out: &mut [f32]) {
    debug_assert_eq!(x.len(), weight.len());
    let mean_sq = x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32;
    let inv_rms = 1.0 / (mean_sq + eps).sqrt();
    for ((o, &v), &w) in out.iter_mut().zip(x).zip(weight) {
        *o = v * inv_rms * w;
    }
}

#[inline]
pub fn silu(x: f32) -> f32 {
    x / (1.0 + (-x).exp())
}

/// Numerically stable softmax in place.
pub fn softmax_in_place(xs: &mut [f32]) {
    let max = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for v in xs.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    let inv = 1.0 / sum;
    for v in xs.iter_mut() {
        *v *= inv;
    }
}

/// Index of the largest logit; the first one wins ties.
pub fn argmax(logits: &[f32]) -> u32 {
    let mut best = 0u32;
    let mut max_val = f32::NEG_INFINITY;
    for (i, &v) in logits.iter().enumerate() {
        if v > max_val {
            max_val = v;
            best = i as u32;
        }
    }
    best
}

/// L2-normalize every row of a row-major `[_, cols]` matrix in place.
///
/// Baichuan2's NormHead normalizes the LM head rows before the projection;
/// doing it once at load time makes the head a plain linear layer.
pub fn l2_normalize_rows(data: &mut [f32], cols: usize) {
    data.par_chunks_mut(cols).for_each(|row| {
        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt().max(1e-12);
        let inv = 1.0 / norm;
        for v in row.iter_mut() {
            *v *= inv;
        }
    });
}

/// Precomputed cos/sin tables for Rotary Position Encoding.
#[derive(Debug, Clone)]
pub struct RopeTable {
    cos_table: Vec<f32>, // [max_seq_len, head_dim/2]
    sin_table: Vec<f32>, // [max_seq_len, head_dim/2]
    half_dim: usize,
    max_seq_len: usize,
}

impl RopeTable {
    pub fn new(head_dim: usize, max_seq_len: usize, theta: f32) -> Self {
        let half_dim = head_dim / 2;
        let mut cos_table = Vec::with_capacity(max_seq_len * half_dim);
        let mut sin_table = Vec::with_capacity(max_seq_len * half_dim);

        for pos in 0..max_seq_len {
            for i in 0..half_dim {
                let freq = 1.0 / theta.powf(2.0 * i as f32 / head_dim as f32);
                let angle = pos as f32 * freq;
                cos_table.push(angle.cos());
                sin_table.push(angle.sin());
            }
        }

        Self { cos_table, sin_table, half_dim, max_seq_len }
    }

    /// Rotate one head vector in place (rotate-half convention).
    pub fn apply(&self, x: &mut [f32], pos: usize) {
        debug_assert_eq!(x.len(), 2 * self.half_dim);
        debug_assert!(pos < self.max_seq_len);
        let cos = &self.cos_table[pos * self.half_dim..(pos + 1) * self.half_dim];
        let sin = &self.sin_table[pos * self.half_dim..(pos + 1) * self.half_dim];
        let (x1, x2) = x.split_at_mut(self.half_dim);
        for i in 0..self.half_dim {
            let a = x1[i];
            let b = x2[i];
            x1[i] = a * cos[i] - b * sin[i];
            x2[i] = a * sin[i] + b * cos[i];
        }
    }
}

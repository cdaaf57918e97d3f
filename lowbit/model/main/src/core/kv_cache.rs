//! KV cache for incremental decoding.
//!
//! Pre-allocates key/value buffers for every layer up to the output length
//! limit. Values are stored either position-major (`[heads, len, head_dim]`)
//! or transposed (`[heads, head_dim, len]`).

use crate::api::error::{ModelError, ModelResult};

/// Memory layout of the value cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueLayout {
    /// `[heads, len, head_dim]`
    Standard,
    /// `[heads, head_dim, len]`
    Transposed,
}

impl ValueLayout {
    pub fn from_transpose_flag(transpose: bool) -> Self {
        if transpose {
            ValueLayout::Transposed
        } else {
            ValueLayout::Standard
        }
    }
}

/// Past keys and values of every layer.
pub struct KvCache {
    keys: Vec<Vec<f32>>,
    values: Vec<Vec<f32>>,
    layout: ValueLayout,
    n_heads: usize,
    head_dim: usize,
    capacity: usize,
    len: usize,
}

impl KvCache {
    pub fn new(
        n_layers: usize,
        n_heads: usize,
        head_dim: usize,
        capacity: usize,
        layout: ValueLayout,
    ) -> Self {
        let per_layer = n_heads * head_dim * capacity;
        Self {
            keys: (0..n_layers).map(|_| vec![0.0; per_layer]).collect(),
            values: (0..n_layers).map(|_| vec![0.0; per_layer]).collect(),
            layout,
            n_heads,
            head_dim,
            capacity,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Advance the committed length by `step` tokens.
    pub fn advance(&mut self, step: usize) {
        self.len += step;
    }

    /// Store the keys and values of all heads for position `pos`.
    ///
    /// `k` and `v` are `[heads * head_dim]`.
    pub fn write(&mut self, layer: usize, pos: usize, k: &[f32], v: &[f32]) -> ModelResult<()> {
        if pos >= self.capacity {
            return Err(ModelError::GenerationError(format!(
                "KV cache full: position {} >= capacity {}",
                pos, self.capacity
            )));
        }
        let hd = self.head_dim;
        let cap = self.capacity;
        let keys = &mut self.keys[layer];
        let values = &mut self.values[layer];
        for h in 0..self.n_heads {
            let src_k = &k[h * hd..(h + 1) * hd];
            let src_v = &v[h * hd..(h + 1) * hd];
            let base = (h * cap + pos) * hd;
            keys[base..base + hd].copy_from_slice(src_k);
            match self.layout {
                ValueLayout::Standard => values[base..base + hd].copy_from_slice(src_v),
                ValueLayout::Transposed => {
                    for (d, &x) in src_v.iter().enumerate() {
                        values[(h * hd + d) * cap + pos] = x;
                    }
                }
            }
        }
        Ok(())
    }

    /// Cached key of `head` at `pos`.
    #[inline]
    pub fn key(&self, layer: usize, head: usize, pos: usize) -> &[f32] {
        let base = (head * self.capacity + pos) * self.head_dim;
        &self.keys[layer][base..base + self.head_dim]
    }

    /// `out = sum_p probs[p] * value[p]` over positions `0..probs.len()`.
    pub fn weighted_values(&self, layer: usize, head: usize, probs: &[f32], out: &mut [f32]) {
        let hd = self.head_dim;
        let cap = self.capacity;
        let values = &self.values[layer];
        match self.layout {
            ValueLayout::Standard => {
                out.fill(0.0);
                for (pos, &p) in probs.iter().enumerate() {
                    let base = (head * cap + pos) * hd;
                    for (o, &v) in out.iter_mut().zip(&values[base..base + hd]) {
                        *o += p * v;
                    }
                }
            }
            ValueLayout::Transposed => {
                for (d, o) in out.iter_mut().enumerate() {
                    let base = (head * hd + d) * cap;
                    let row = &values[base..base + probs.len()];
                    *o = row.iter().zip(probs).fold(0.0f32, |acc, (&v, &p)| acc + p * v);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(layout: ValueLayout) -> KvCache {
        let mut cache = KvCache::new(2, 2, 4, 8, layout);
        for pos in 0..5 {
            let k: Vec<f32> = (0..8).map(|i| (pos * 8 + i) as f32 * 0.1).collect();
            let v: Vec<f32> = (0..8).map(|i| ((pos * 8 + i) as f32 * 0.37).sin()).collect();
            cache.write(1, pos, &k, &v).unwrap();
        }
        cache.advance(5);
        cache
    }

    #[test]
    fn test_key_lookup() {
        let cache = filled(ValueLayout::Standard);
        assert_eq!(cache.len(), 5);
        let k = cache.key(1, 1, 2);
        assert_eq!(k.len(), 4);
        assert!((k[0] - (2 * 8 + 4) as f32 * 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_layouts_agree_exactly() {
        let standard = filled(ValueLayout::Standard);
        let transposed = filled(ValueLayout::Transposed);
        let probs = [0.1f32, 0.2, 0.3, 0.15, 0.25];
        for head in 0..2 {
            let mut a = vec![0.0; 4];
            let mut b = vec![0.0; 4];
            standard.weighted_values(1, head, &probs, &mut a);
            transposed.weighted_values(1, head, &probs, &mut b);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_overflow_rejected() {
        let mut cache = KvCache::new(1, 1, 2, 2, ValueLayout::Standard);
        assert!(cache.write(0, 2, &[0.0, 0.0], &[0.0, 0.0]).is_err());
    }
}

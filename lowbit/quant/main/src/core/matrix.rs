//! Row-major packed int4 weight matrix with sharded mat-vec.

use crate::api::error::{QuantError, QuantResult};
use crate::api::types::QType;
use crate::core::sym_int4::{dequantize_sym_int4, dot_sym_int4, quantize_sym_int4};
use rayon::prelude::*;

/// A `[rows, cols]` weight matrix quantized row by row.
///
/// Each row is an independent run of blocks, so a row's bytes can be
/// sliced out without touching its neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedMatrix {
    qtype: QType,
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl QuantizedMatrix {
    /// Quantize a row-major f32 `[rows, cols]` matrix.
    pub fn from_f32(rows: usize, cols: usize, weights: &[f32]) -> QuantResult<Self> {
        if weights.len() != rows * cols {
            return Err(QuantError::ShapeMismatch {
                expected: vec![rows, cols],
                actual: vec![weights.len()],
            });
        }
        let qtype = QType::SymInt4;
        if cols % qtype.block_size() != 0 {
            return Err(QuantError::BlockAlignment(format!(
                "row length {} is not a multiple of block size {}",
                cols,
                qtype.block_size()
            )));
        }
        let data = quantize_sym_int4(weights)?;
        Ok(Self { qtype, rows, cols, data })
    }

    /// Wrap already-packed bytes, e.g. read back from a lowbit file.
    pub fn from_raw(qtype: QType, rows: usize, cols: usize, data: Vec<u8>) -> QuantResult<Self> {
        if cols % qtype.block_size() != 0 {
            return Err(QuantError::BlockAlignment(format!(
                "row length {} is not a multiple of block size {}",
                cols,
                qtype.block_size()
            )));
        }
        let expected = rows * cols / qtype.block_size() * qtype.block_bytes();
        if data.len() != expected {
            return Err(QuantError::ShapeMismatch {
                expected: vec![expected],
                actual: vec![data.len()],
            });
        }
        Ok(Self { qtype, rows, cols, data })
    }

    /// Stack matrices with equal column counts vertically.
    pub fn concat_rows(parts: &[&QuantizedMatrix]) -> QuantResult<Self> {
        let first = parts.first().ok_or_else(|| {
            QuantError::ShapeMismatch { expected: vec![1], actual: vec![0] }
        })?;
        let mut rows = 0;
        let mut data = Vec::with_capacity(parts.iter().map(|p| p.data.len()).sum());
        for part in parts {
            if part.cols != first.cols || part.qtype != first.qtype {
                return Err(QuantError::ShapeMismatch {
                    expected: vec![first.cols],
                    actual: vec![part.cols],
                });
            }
            rows += part.rows;
            data.extend_from_slice(&part.data);
        }
        Ok(Self { qtype: first.qtype, rows, cols: first.cols, data })
    }

    pub fn qtype(&self) -> QType {
        self.qtype
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Packed bytes per row.
    pub fn row_bytes(&self) -> usize {
        self.cols / self.qtype.block_size() * self.qtype.block_bytes()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Packed bytes of one row.
    pub fn row(&self, r: usize) -> &[u8] {
        let rb = self.row_bytes();
        &self.data[r * rb..(r + 1) * rb]
    }

    pub fn dequantize(&self) -> QuantResult<Vec<f32>> {
        dequantize_sym_int4(&self.data, self.rows * self.cols)
    }

    /// `y = W x` for a single input vector.
    ///
    /// Output rows are split into `shards` contiguous ranges computed in
    /// parallel; `shards <= 1` runs on the calling thread. The result does
    /// not depend on the shard count.
    pub fn matvec(&self, x: &[f32], y: &mut [f32], shards: usize) {
        debug_assert_eq!(x.len(), self.cols);
        debug_assert_eq!(y.len(), self.rows);

        if shards <= 1 || self.rows < 2 {
            for (r, out) in y.iter_mut().enumerate() {
                *out = dot_sym_int4(self.row(r), x);
            }
            return;
        }

        let chunk = self.rows.div_ceil(shards);
        y.par_chunks_mut(chunk).enumerate().for_each(|(ci, out_chunk)| {
            let base = ci * chunk;
            for (j, out) in out_chunk.iter_mut().enumerate() {
                *out = dot_sym_int4(self.row(base + j), x);
            }
        });
    }

    /// `Y = X W^T` for `m` row-major input vectors; returns `[m, rows]`.
    pub fn matmul(&self, x: &[f32], m: usize, shards: usize) -> QuantResult<Vec<f32>> {
        if x.len() != m * self.cols {
            return Err(QuantError::ShapeMismatch {
                expected: vec![m, self.cols],
                actual: vec![x.len()],
            });
        }
        let mut out = vec![0.0f32; m * self.rows];
        for (xi, yi) in x.chunks_exact(self.cols).zip(out.chunks_exact_mut(self.rows)) {
            self.matvec(xi, yi, shards);
        }
        Ok(out)
    }
}

//! Non-quantized tensors stored in the configured precision.

use crate::api::error::{ModelError, ModelResult};
use crate::api::types::Dtype;
use half::bf16;

/// Flat dense tensor data in bf16 or f32.
#[derive(Debug, Clone, PartialEq)]
pub enum DenseTensor {
    F32(Vec<f32>),
    Bf16(Vec<bf16>),
}

impl DenseTensor {
    pub fn from_f32(data: Vec<f32>, dtype: Dtype) -> Self {
        match dtype {
            Dtype::F32 => DenseTensor::F32(data),
            Dtype::Bf16 => DenseTensor::Bf16(data.into_iter().map(bf16::from_f32).collect()),
        }
    }

    /// Rebuild from little-endian bytes written by [`DenseTensor::to_le_bytes`].
    pub fn from_le_bytes(dtype: Dtype, bytes: &[u8]) -> Self {
        match dtype {
            Dtype::F32 => DenseTensor::F32(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            Dtype::Bf16 => DenseTensor::Bf16(
                bytes
                    .chunks_exact(2)
                    .map(|c| bf16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
        }
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            DenseTensor::F32(_) => Dtype::F32,
            DenseTensor::Bf16(_) => Dtype::Bf16,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DenseTensor::F32(v) => v.len(),
            DenseTensor::Bf16(v) => v.len(),
        }
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            DenseTensor::F32(v) => v.clone(),
            DenseTensor::Bf16(v) => v.iter().map(|x| x.to_f32()).collect(),
        }
    }

    /// Copy row `row` of a `[_, width]` matrix into `out` as f32.
    pub fn row_into(&self, row: usize, width: usize, out: &mut [f32]) -> ModelResult<()> {
        let start = row * width;
        if start + width > self.len() || out.len() != width {
            return Err(ModelError::GenerationError(format!(
                "row {} out of range for dense tensor of {} elements",
                row,
                self.len()
            )));
        }
        match self {
            DenseTensor::F32(v) => out.copy_from_slice(&v[start..start + width]),
            DenseTensor::Bf16(v) => {
                for (o, x) in out.iter_mut().zip(&v[start..start + width]) {
                    *o = x.to_f32();
                }
            }
        }
        Ok(())
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            DenseTensor::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            DenseTensor::Bf16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

/// Round f32 values through `dtype` so in-memory values match what is persisted.
pub fn round_to(data: Vec<f32>, dtype: Dtype) -> Vec<f32> {
    match dtype {
        Dtype::F32 => data,
        Dtype::Bf16 => data.into_iter().map(|x| bf16::from_f32(x).to_f32()).collect(),
    }
}

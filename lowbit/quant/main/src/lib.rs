//! # lowbit-quant
//!
//! Weight quantization for lowbit models.
//!
//! This crate provides:
//! - `sym_int4` block quantization (32 values per block, one f16 scale)
//! - `QuantizedMatrix`, a row-major packed int4 weight matrix
//! - F32 x int4 mat-vec kernels, optionally split into parallel row shards
//!
//! ## Example
//!
//! ```rust
//! use lowbit_quant::QuantizedMatrix;
//!
//! let weights: Vec<f32> = (0..64 * 32).map(|i| (i % 7) as f32 * 0.1).collect();
//! let w = QuantizedMatrix::from_f32(32, 64, &weights).unwrap();
//! let x = vec![1.0f32; 64];
//! let mut y = vec![0.0f32; 32];
//! w.matvec(&x, &mut y, 2);
//! assert_eq!(y.len(), 32);
//! ```

pub mod api;
pub(crate) mod core;
mod saf;

pub use saf::*;

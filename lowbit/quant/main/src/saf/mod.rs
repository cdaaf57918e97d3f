//! Facade re-exports for lowbit-quant

pub use crate::api::error::{QuantError, QuantResult};
pub use crate::api::types::*;
pub use crate::core::matrix::QuantizedMatrix;
pub use crate::core::sym_int4::{dequantize_sym_int4, dot_sym_int4, quantize_sym_int4};

//! # lowbit-model
//!
//! Low-bit causal language models for CPU inference.
//!
//! This crate provides:
//! - The [`ModelProvider`] / [`ModelHandle`] contracts used by the generation driver
//! - [`BaichuanProvider`], which builds a Baichuan2 decoder from a HuggingFace
//!   SafeTensors checkpoint and quantizes every projection to `sym_int4`
//! - The lowbit directory format: persist a quantized model once, load it
//!   later without touching the original checkpoint
//! - Greedy autoregressive generation with a per-call KV cache
//!
//! ## Example
//!
//! ```rust,ignore
//! use lowbit_model::{
//!     BaichuanProvider, GenerationConfig, ModelHandle, ModelProvider,
//!     QuantizationParams, RuntimeParams,
//! };
//!
//! let provider = BaichuanProvider::default();
//! let runtime = RuntimeParams::default();
//! let model = provider.construct_fresh(
//!     "baichuan-inc/Baichuan2-7B-Chat",
//!     &QuantizationParams::default(),
//!     &runtime,
//! )?;
//! model.persist("./baichuan2-7b-lowbit".as_ref())?;
//!
//! let output = model.generate(&[1, 195, 1010], &GenerationConfig::greedy(32))?;
//! ```

pub mod api;
pub(crate) mod core;
mod saf;

pub use saf::*;

//! # lowbit-tokenizer
//!
//! Text <-> token id conversion for lowbit models.
//!
//! The [`Tokenizer`] and [`TokenizerProvider`] traits are the contract the
//! generation driver codes against; [`HFTokenizer`] and
//! [`HubTokenizerProvider`] implement it on top of the `tokenizers` crate.

pub mod api;
pub(crate) mod core;
mod saf;
pub mod spi;

pub use saf::*;

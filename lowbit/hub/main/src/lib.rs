//! # lowbit-hub
//!
//! Locates the files of a HuggingFace-style checkpoint.
//!
//! A model source is either a local checkpoint directory or a Hub repo id
//! (`owner/name`). Repo ids are fetched with the `hf-hub` crate into its
//! standard cache.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lowbit_hub::HubApi;
//!
//! let api = HubApi::new();
//! let bundle = api.resolve("baichuan-inc/Baichuan2-7B-Chat")?;
//! let config = bundle.load_config_sync()?;
//! let shards = bundle.weight_files()?;
//! ```

pub mod api;
pub(crate) mod core;
mod saf;

pub use saf::*;

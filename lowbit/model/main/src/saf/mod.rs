//! Facade re-exports for lowbit-model

pub use crate::api::error::*;
pub use crate::api::traits::*;
pub use crate::api::types::*;
pub use crate::core::config::BaichuanConfig;
pub use crate::core::lowbit::{LowBitManifest, CONFIG_FILE, MANIFEST_FILE, WEIGHTS_FILE};
pub use crate::core::model::LowBitModel;
pub use crate::core::pipeline::PipelinePlan;
pub use crate::core::provider::BaichuanProvider;

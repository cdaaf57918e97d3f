//! Facade re-exports for lowbit-hub

pub use crate::api::error::*;
pub use crate::api::types::*;
pub use crate::core::hub_api::{looks_like_repo_id, HubApi};

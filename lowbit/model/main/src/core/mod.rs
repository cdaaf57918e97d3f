pub mod checkpoint;
pub mod config;
pub mod decoder;
pub mod dense;
pub mod kv_cache;
pub mod layers;
pub mod lowbit;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod weight_map;

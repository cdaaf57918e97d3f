pub mod hf;
pub mod provider;

//! Fixtures shared by the generation tests.

use std::path::Path;

pub use lowbit_testkit::VOCAB;

pub fn write_checkpoint(dir: &Path, seed: u64, eos_token_id: u32) {
    lowbit_testkit::write_checkpoint(dir, seed, eos_token_id).unwrap();
}

pub fn write_checkpoint_without(dir: &Path, seed: u64, eos_token_id: u32, skip: Option<&str>) {
    lowbit_testkit::write_checkpoint_without(dir, seed, eos_token_id, skip).unwrap();
}

/// Runtime parameters sized for the tiny model.
pub fn runtime(intra_pp: usize, inter_pp: usize, transpose: bool) -> lowbit_model::RuntimeParams {
    lowbit_model::RuntimeParams {
        max_output_len: 48,
        max_prompt_len: 16,
        intra_pp,
        inter_pp,
        transpose_value_cache: transpose,
    }
}

pub const PROMPT: &[u32] = &[1, 7, 12, 3, 25, 9];

use std::path::PathBuf;

use clap::Parser;

use crate::driver::RunConfig;

/// Predict tokens with a Baichuan2 model quantized to sym_int4.
#[derive(Parser, Debug)]
#[command(name = "lowbit-generate", version, about)]
pub struct Cli {
    /// HuggingFace repo id of the Baichuan2 model to download, or path to a
    /// local checkpoint folder.
    #[arg(long, default_value = "baichuan-inc/Baichuan2-7B-Chat")]
    repo_id_or_model_path: String,

    /// Directory for the quantized model: written on the first run, loaded
    /// on later runs. Empty disables it.
    #[arg(long, default_value = "")]
    lowbit_path: String,

    /// Prompt to infer.
    #[arg(long, default_value = "What is AI?")]
    prompt: String,

    /// Max tokens to predict.
    #[arg(long, default_value_t = 32)]
    n_predict: usize,

    /// KV cache capacity: prompt plus generated tokens.
    #[arg(long, default_value_t = 1024)]
    max_output_len: usize,

    /// Longest accepted prompt, in tokens.
    #[arg(long, default_value_t = 512)]
    max_prompt_len: usize,

    /// Keep the value cache in [heads, len, head_dim] layout.
    #[arg(long)]
    disable_transpose_value_cache: bool,

    /// Row shards per projection inside a pipeline stage.
    #[arg(long, default_value_t = 2)]
    intra_pp: usize,

    /// Number of pipeline stages the decoder layers are split into.
    #[arg(long, default_value_t = 2)]
    inter_pp: usize,
}

impl Cli {
    pub fn into_config(self) -> RunConfig {
        let lowbit_path = if self.lowbit_path.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(self.lowbit_path))
        };
        RunConfig {
            model_source: self.repo_id_or_model_path,
            lowbit_path,
            prompt: self.prompt,
            n_predict: self.n_predict,
            max_output_len: self.max_output_len,
            max_prompt_len: self.max_prompt_len,
            transpose_value_cache: !self.disable_transpose_value_cache,
            intra_pp: self.intra_pp,
            inter_pp: self.inter_pp,
        }
    }
}

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};

use lowbit_model::{GenerationConfig, ModelHandle, ModelProvider, QuantizationParams, RuntimeParams};
use lowbit_tokenizer::{Tokenizer, TokenizerProvider};

use crate::prompt::{build_prompt, ChatTurn};

/// Generation rounds per run.
const ROUNDS: usize = 5;

/// Everything a run needs, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub model_source: String,
    pub lowbit_path: Option<PathBuf>,
    pub prompt: String,
    pub n_predict: usize,
    pub max_output_len: usize,
    pub max_prompt_len: usize,
    pub transpose_value_cache: bool,
    pub intra_pp: usize,
    pub inter_pp: usize,
}

impl RunConfig {
    pub fn runtime(&self) -> RuntimeParams {
        RuntimeParams {
            max_output_len: self.max_output_len,
            max_prompt_len: self.max_prompt_len,
            intra_pp: self.intra_pp,
            inter_pp: self.inter_pp,
            transpose_value_cache: self.transpose_value_cache,
        }
    }
}

/// How the model handle is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// Quantize the source checkpoint, then persist to `persist_to` if set.
    Fresh { persist_to: Option<PathBuf> },
    /// Load a lowbit directory written by an earlier run.
    Cached { path: PathBuf },
}

impl Acquisition {
    pub fn resolve(lowbit_path: Option<&Path>) -> Self {
        match lowbit_path {
            None => Acquisition::Fresh { persist_to: None },
            Some(path) if !path.exists() => Acquisition::Fresh {
                persist_to: Some(path.to_path_buf()),
            },
            Some(path) => Acquisition::Cached { path: path.to_path_buf() },
        }
    }
}

pub fn run<M, T, W>(config: &RunConfig, models: &M, tokenizers: &T, out: &mut W) -> Result<()>
where
    M: ModelProvider,
    T: TokenizerProvider,
    W: Write,
{
    let runtime = config.runtime();
    let acquisition = Acquisition::resolve(config.lowbit_path.as_deref());
    log::info!("Model acquisition: {:?}", acquisition);

    let model = match &acquisition {
        Acquisition::Fresh { persist_to } => {
            let model = models
                .construct_fresh(&config.model_source, &QuantizationParams::default(), &runtime)
                .with_context(|| format!("Failed to load model from {}", config.model_source))?;
            if let Some(path) = persist_to {
                model
                    .persist(path)
                    .with_context(|| format!("Failed to save lowbit model to {}", path.display()))?;
            }
            model
        }
        Acquisition::Cached { path } => models
            .load_cached(path, &runtime)
            .with_context(|| format!("Failed to load lowbit model from {}", path.display()))?,
    };

    let tokenizer = tokenizers
        .load(&config.model_source)
        .with_context(|| format!("Failed to load tokenizer for {}", config.model_source))?;

    let system_prompt = "";
    let history: Vec<ChatTurn> = Vec::new();
    let generation = GenerationConfig::greedy(config.n_predict);

    writeln!(out, "{}", "-".repeat(80))?;
    writeln!(out, "done")?;
    writeln!(out, "finish to load")?;

    for round in 0..ROUNDS {
        let prompt = build_prompt(&config.prompt, &history, system_prompt);
        let input_ids = tokenizer.encode(&prompt).context("Encoding failed")?;
        writeln!(out, "input length: {}", input_ids.len())?;

        let start = Instant::now();
        let output_ids = model
            .generate(&input_ids, &generation)
            .with_context(|| format!("Generation failed in round {}", round + 1))?;
        let elapsed = start.elapsed().as_secs_f64();

        let input_str = tokenizer.decode(&input_ids, false).context("Decoding input failed")?;
        let output_str = tokenizer.decode(&output_ids, false).context("Decoding output failed")?;
        writeln!(out, "Inference time: {} s", elapsed)?;
        writeln!(out, "{} Input {}", "-".repeat(20), "-".repeat(20))?;
        writeln!(out, "{}", input_str)?;
        writeln!(out, "{} Output {}", "-".repeat(20), "-".repeat(20))?;
        writeln!(out, "{}", output_str)?;
    }

    writeln!(out, "{}", "-".repeat(80))?;
    writeln!(out, "done")?;
    writeln!(out, "success shut down")?;
    Ok(())
}

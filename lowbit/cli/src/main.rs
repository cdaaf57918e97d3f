mod args;
mod driver;
mod prompt;

use anyhow::Result;
use clap::Parser;

use lowbit_model::BaichuanProvider;
use lowbit_tokenizer::HubTokenizerProvider;

fn main() -> Result<()> {
    env_logger::init();
    let config = args::Cli::parse().into_config();
    let stdout = std::io::stdout();
    driver::run(
        &config,
        &BaichuanProvider::default(),
        &HubTokenizerProvider::default(),
        &mut stdout.lock(),
    )
}

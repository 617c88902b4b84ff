use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use dongol_core::config::OutputFormat;
use dongol_core::executor::types::PoolKind;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolArg {
    Shared,
    Isolated,
}

impl From<PoolArg> for PoolKind {
    fn from(arg: PoolArg) -> Self {
        match arg {
            PoolArg::Shared => PoolKind::Shared,
            PoolArg::Isolated => PoolKind::Isolated,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Text,
    Jsonl,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Jsonl => OutputFormat::Jsonl,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dongol", version, about = "Chunked, dependency-ordered parallel task engine")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split input into chunks and print them with their dispatch levels.
    Chunk(ChunkArgs),
    /// Split input and execute every chunk through a handler.
    Run(RunArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct InputArgs {
    /// Input file. `.json` files are split by structure, anything else as text.
    #[arg(group = "input")]
    pub file: Option<PathBuf>,

    /// Inline text input.
    #[arg(long, group = "input")]
    pub text: Option<String>,

    /// Read text from stdin.
    #[arg(long, group = "input")]
    pub stdin: bool,

    /// Token limit per text chunk (default: chunking.default_token_limit).
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Share of each text window carried into the next, in [0, 1)
    /// (default: chunking.overlap_ratio).
    #[arg(long)]
    pub overlap: Option<f64>,

    /// Write results to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChunkArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print chunks as a JSON array instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Handler to run: default, echo or word-count.
    /// Unknown names fall back to the default handler.
    #[arg(long, default_value = "default")]
    pub handler: String,

    /// Task priority, 0 (critical) to 4 (background).
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=4))]
    pub priority: u8,

    /// Run chunks strictly in emission order.
    #[arg(long)]
    pub sequential: bool,

    /// Worker pool width (default: executor.max_workers).
    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(long, value_enum)]
    pub pool: Option<PoolArg>,

    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Print the engine stats snapshot as JSON after the run.
    #[arg(long)]
    pub stats: bool,
}

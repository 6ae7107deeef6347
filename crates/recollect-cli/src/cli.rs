//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "recollect")]
#[command(about = "Forgetting-aware memory retrieval for personalized tutoring", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (TOML, JSON or YAML). Falls back to RECOLLECT_* variables.
    #[arg(short, long, global = true, env = "RECOLLECT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect the corpus time unit and calibrate tau
    Calibrate {
        /// Interaction log, one JSON object per line
        #[arg(short, long)]
        interactions: PathBuf,
    },
    /// Compute forgetting scores and levels for every learner-concept pair
    Forgetting(ForgettingArgs),
    /// Retrieve persona and memory fragments for one query
    Retrieve(RetrieveArgs),
    /// Retrieve for every request in a JSON Lines file
    BatchRetrieve {
        /// Requests, one JSON object per line
        #[arg(short, long)]
        requests: PathBuf,
        /// Write results here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Requests in flight at once
        #[arg(long)]
        max_concurrency: Option<usize>,
    },
    /// Version information
    Version,
}

#[derive(Args, Debug)]
pub struct ForgettingArgs {
    /// Interaction log, one JSON object per line
    #[arg(short, long)]
    pub interactions: PathBuf,
    /// Use this tau (minutes) instead of calibrating one
    #[arg(long)]
    pub tau: Option<f64>,
    /// Knowledge-tracing predictions as NAME=PATH; repeatable
    #[arg(long = "kt", value_parser = parse_named_path)]
    pub kt: Vec<(String, PathBuf)>,
    /// Also judge mastery with the configured LLM
    #[arg(long)]
    pub llm: bool,
    /// Skip the correctness-history source
    #[arg(long)]
    pub no_history: bool,
    /// Write records here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RetrieveArgs {
    #[arg(long)]
    pub learner: String,
    #[arg(long)]
    pub dataset: String,
    /// Concept display text
    #[arg(long)]
    pub concept: String,
    #[arg(short, long)]
    pub query: String,
    /// Fusion weight of description similarity
    #[arg(long)]
    pub lambda: Option<f32>,
    #[arg(long)]
    pub top_k: Option<usize>,
    #[arg(long)]
    pub top_n: Option<usize>,
}

fn parse_named_path(value: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{}'", value))?;
    if name.trim().is_empty() || path.trim().is_empty() {
        return Err(format!("expected NAME=PATH, got '{}'", value));
    }
    Ok((name.trim().to_string(), PathBuf::from(path.trim())))
}

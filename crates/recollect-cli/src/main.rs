//! recollect CLI - forgetting estimation and fragment retrieval.

mod cli;
mod output;
mod providers;

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use recollect_core::forgetting::{TauCalibration, TimeUnit};
use recollect_core::traits::MasteryEstimator;
use recollect_core::{
    BatchRetriever, ForgettingEngine, HistoryMastery, InteractionCorpus, LlmMastery,
    PredictionTable, RecollectConfig, RetrievalRequest,
};

use cli::{Cli, Commands, ForgettingArgs, RetrieveArgs};

#[derive(Serialize)]
struct CalibrationReport {
    unit: TimeUnit,
    pairs: usize,
    #[serde(flatten)]
    calibration: TauCalibration,
}

#[derive(Serialize)]
struct BatchFailure<'a> {
    learner_id: &'a str,
    concept: &'a str,
    error: String,
    code: &'static str,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("recollect {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => RecollectConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RecollectConfig::from_env().context("invalid RECOLLECT_* environment")?,
    };

    match cli.command {
        Commands::Calibrate { interactions } => calibrate(&config, &interactions),
        Commands::Forgetting(args) => forgetting(config, args).await,
        Commands::Retrieve(args) => retrieve(&config, args).await,
        Commands::BatchRetrieve {
            requests,
            out,
            max_concurrency,
        } => batch_retrieve(&config, &requests, out.as_deref(), max_concurrency).await,
        Commands::Version => Ok(()),
    }
}

fn load_corpus(path: &Path) -> Result<InteractionCorpus> {
    let corpus = InteractionCorpus::from_jsonl_path(path)
        .with_context(|| format!("failed to read interactions from {}", path.display()))?;
    tracing::info!(pairs = corpus.len(), path = %path.display(), "Loaded interaction corpus");
    Ok(corpus)
}

fn calibrate(config: &RecollectConfig, interactions: &Path) -> Result<()> {
    let engine = ForgettingEngine::new(load_corpus(interactions)?, config.forgetting.clone())?;
    output::print_pretty(&CalibrationReport {
        unit: engine.scale().unit,
        pairs: engine.corpus().len(),
        calibration: *engine.calibration(),
    })
}

async fn forgetting(mut config: RecollectConfig, args: ForgettingArgs) -> Result<()> {
    if args.tau.is_some() {
        config.forgetting.tau_override = args.tau;
    }

    let mut engine = ForgettingEngine::new(load_corpus(&args.interactions)?, config.forgetting.clone())?;
    if !args.no_history {
        engine = engine.with_source(Arc::new(HistoryMastery::new()));
    }
    for (name, path) in &args.kt {
        let table = PredictionTable::from_json_path(name.as_str(), path)
            .with_context(|| format!("failed to load {} predictions from {}", name, path.display()))?;
        tracing::info!(source = %table.source(), learners = table.learners(), "Loaded predictions");
        engine = engine.with_source(Arc::new(table));
    }
    if args.llm {
        let Some(llm) = providers::llm(&config)? else {
            bail!("--llm needs an [llm] section in the config or RECOLLECT_LLM_PROVIDER");
        };
        engine = engine.with_source(Arc::new(LlmMastery::new(llm)));
    }

    let sources = engine.sources();
    if sources.is_empty() {
        bail!("no mastery source selected");
    }

    let mut out = output::sink(args.out.as_deref())?;
    for source in sources {
        let population = engine.population(&source).await?;
        tracing::info!(
            source = %source,
            records = population.len(),
            skipped = population.skipped,
            low = population.counts.low,
            medium = population.counts.medium,
            high = population.counts.high,
            "Forgetting levels computed"
        );
        for record in population.iter() {
            output::write_line(out.as_mut(), record)?;
        }
    }
    out.flush()?;
    Ok(())
}

async fn retrieve(config: &RecollectConfig, args: RetrieveArgs) -> Result<()> {
    let engine = providers::retrieval_engine(config)?;

    let mut request = RetrievalRequest::new(args.learner, args.dataset, args.concept, args.query);
    request.lambda = args.lambda;
    request.top_k = args.top_k;
    request.top_n = args.top_n;

    let result = engine.retrieve(&request).await?;
    output::print_pretty(&result)
}

fn read_requests(path: &Path) -> Result<Vec<RetrievalRequest>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut requests = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request: RetrievalRequest = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid request", path.display(), line_no + 1))?;
        requests.push(request);
    }
    Ok(requests)
}

async fn batch_retrieve(
    config: &RecollectConfig,
    requests_path: &Path,
    out: Option<&Path>,
    max_concurrency: Option<usize>,
) -> Result<()> {
    let requests = read_requests(requests_path)?;
    let engine = Arc::new(providers::retrieval_engine(config)?);
    let retriever = BatchRetriever::new(engine)
        .with_max_concurrency(max_concurrency.unwrap_or(config.retrieval.max_concurrency));

    let results = retriever.retrieve_all(requests.clone()).await;

    let mut sink = output::sink(out)?;
    let mut failed = 0usize;
    for (request, result) in requests.iter().zip(results) {
        match result {
            Ok(result) => output::write_line(sink.as_mut(), &result)?,
            Err(e) => {
                failed += 1;
                tracing::warn!(learner_id = %request.learner_id, error = %e, "Retrieval failed");
                output::write_line(
                    sink.as_mut(),
                    &BatchFailure {
                        learner_id: &request.learner_id,
                        concept: &request.concept,
                        error: e.to_string(),
                        code: e.code().as_str(),
                    },
                )?;
            }
        }
    }
    sink.flush()?;

    tracing::info!(total = requests.len(), failed, "Batch retrieval finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_requests_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.jsonl");
        std::fs::write(
            &path,
            "{\"learner_id\":\"s1\",\"dataset_id\":\"d\",\"concept\":\"Fractions\",\"query\":\"q\"}\n\n\
             {\"learner_id\":\"s2\",\"dataset_id\":\"d\",\"concept\":\"Ratios\",\"query\":\"q\",\"top_n\":1}\n",
        )
        .unwrap();

        let requests = read_requests(&path).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].top_n, Some(1));
    }

    #[test]
    fn test_read_requests_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.jsonl");
        std::fs::write(&path, "{\"learner_id\":\"s1\"}\n").unwrap();

        let err = read_requests(&path).unwrap_err();
        assert!(format!("{:#}", err).contains(":1: invalid request"));
    }
}

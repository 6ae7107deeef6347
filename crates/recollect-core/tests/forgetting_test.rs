//! Integration tests for corpus-level forgetting estimation.

use std::io::Cursor;
use std::sync::Arc;

use recollect_core::forgetting::{LevelCounts, TimeUnit};
use recollect_core::{
    ForgettingConfig, ForgettingEngine, HistoryMastery, InteractionCorpus, MasteryEstimator,
    MasterySource, PredictionTable, RecollectError,
};

/// Epoch-second logs: learner s1 on two concepts, s2 on one, s3 with a
/// single attempt.
const LOG: &str = r#"
{"learner_id": "s1", "concept_id": "fractions", "timestamp": 1700000000, "correct": 1}
{"learner_id": "s1", "concept_id": "fractions", "timestamp": 1700000600, "correct": 1}
{"learner_id": "s1", "concept_id": "fractions", "timestamp": 1700002400, "correct": 0}
{"learner_id": "s1", "concept_id": "decimals", "timestamp": 1700000100, "correct": 0}
{"learner_id": "s1", "concept_id": "decimals", "timestamp": 1700000400, "correct": 0}
{"learner_id": "s1", "concept_id": "decimals", "timestamp": 1700004000, "correct": 1}
{"learner_id": "s2", "concept_id": "fractions", "timestamp": 1700000000, "correct": 0}
{"learner_id": "s2", "concept_id": "fractions", "timestamp": 1700001200, "correct": 1}
{"learner_id": 3, "concept_id": "fractions", "timestamp": 1700000000, "correct": true}
"#;

const PREDICTIONS: &str = r#"{
    "s1": { "fractions": [0.5, 0.7, 0.8], "decimals": [0.5, 0.3, 0.2] },
    "s2": { "fractions": [0.5, 0.4] }
}"#;

fn corpus() -> InteractionCorpus {
    InteractionCorpus::from_jsonl(Cursor::new(LOG)).unwrap()
}

#[tokio::test]
async fn test_epoch_seconds_corpus_calibrates_in_minutes() {
    let engine = ForgettingEngine::new(corpus(), ForgettingConfig::default()).unwrap();

    assert_eq!(engine.scale().unit, TimeUnit::EpochSeconds);
    // Last gaps: 30, 60 and 20 minutes.
    assert_eq!(engine.tau(), 30.0);
    assert_eq!(engine.calibration().pairs, 3);
}

#[tokio::test]
async fn test_history_source_records() {
    let engine = ForgettingEngine::new(corpus(), ForgettingConfig::default())
        .unwrap()
        .with_source(Arc::new(HistoryMastery::new()));

    let fractions = engine
        .estimate_forgetting("s1", "fractions", &MasterySource::History)
        .await
        .unwrap();
    assert_eq!(fractions.s_tc, 1.0);
    assert_eq!(fractions.delta_t, 30.0);
    assert_eq!(fractions.fs, 0.0);
    assert!(!fractions.last_correct);
    assert_eq!(fractions.attempts, 3);

    let decimals = engine
        .estimate_forgetting("s1", "decimals", &MasterySource::History)
        .await
        .unwrap();
    assert_eq!(decimals.s_tc, 0.0);
    assert!((decimals.fs - 60.0 / 90.0).abs() < 1e-9);

    let err = engine
        .estimate_forgetting("3", "fractions", &MasterySource::History)
        .await
        .unwrap_err();
    assert!(matches!(err, RecollectError::InsufficientHistory { attempts: 1, .. }));
}

#[tokio::test]
async fn test_sources_are_levelled_independently() {
    let table = PredictionTable::from_json_str("dkt", PREDICTIONS).unwrap();
    let kt = table.source().clone();
    let engine = ForgettingEngine::new(corpus(), ForgettingConfig::default())
        .unwrap()
        .with_source(Arc::new(HistoryMastery::new()))
        .with_source(Arc::new(table));

    let history = engine.population(&MasterySource::History).await.unwrap();
    let dkt = engine.population(&kt).await.unwrap();

    assert_eq!(history.len(), 3);
    assert_eq!(dkt.len(), 3);
    assert_eq!(history.skipped, 1);
    assert!(dkt.iter().all(|r| r.source == kt));
    assert!(history.iter().all(|r| r.source == MasterySource::History));

    let record = dkt.get("s1", "decimals").unwrap();
    assert_eq!(record.s_tc, 0.2);
    assert!((record.fs - 0.8 * 60.0 / 90.0).abs() < 1e-9);

    for population in [&history, &dkt] {
        let counts = LevelCounts::from_records(population.iter());
        assert_eq!(counts, population.counts);
        assert_eq!(counts.total(), 3);
    }
}

#[tokio::test]
async fn test_override_and_recalibrate() {
    let mut engine = ForgettingEngine::new(corpus(), ForgettingConfig::default().with_tau_override(10.0))
        .unwrap()
        .with_source(Arc::new(HistoryMastery::new()));
    assert_eq!(engine.tau(), 10.0);
    assert!(engine.calibration().overridden);

    let before = engine.population(&MasterySource::History).await.unwrap();
    assert!(before.iter().all(|r| r.tau == 10.0));

    engine.set_tau_override(None).unwrap();
    assert_eq!(engine.tau(), 30.0);
    let after = engine.population(&MasterySource::History).await.unwrap();
    assert!(after.iter().all(|r| r.tau == 30.0));
}

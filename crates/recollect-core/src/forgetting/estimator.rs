//! Per-pair and per-population forgetting estimation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::levels::{LevelCounts, LevelThresholds};
use super::score::forgetting_score;
use super::time::TimeScale;
use crate::error::{RecollectError, RecollectResult};
use crate::traits::MasteryEstimator;
use crate::types::{ConceptHistory, ForgettingLevel, ForgettingRecord, InteractionCorpus, MasterySource};

/// Forgetting inputs and score for one pair, before level assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEstimate {
    pub s_tc: f64,
    pub delta_t: f64,
    pub fs: f64,
    pub last_correct: bool,
    pub attempts: usize,
}

mod record_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::ForgettingRecord;

    type Records = BTreeMap<(String, String), ForgettingRecord>;

    pub fn serialize<S: Serializer>(records: &Records, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(records.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Records, D::Error> {
        let list = Vec::<ForgettingRecord>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|r| ((r.learner_id.clone(), r.concept_id.clone()), r))
            .collect())
    }
}

/// Forgetting records for every eligible pair under one mastery source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecords {
    pub source: MasterySource,
    pub tau: f64,
    /// `None` when no pair produced a record.
    pub thresholds: Option<LevelThresholds>,
    /// Serialized as a list of records.
    #[serde(with = "record_list")]
    pub records: BTreeMap<(String, String), ForgettingRecord>,
    pub counts: LevelCounts,
    /// Pairs without a record (too few attempts or no mastery estimate).
    pub skipped: usize,
    pub computed_at: DateTime<Utc>,
}

impl SourceRecords {
    pub fn get(&self, learner_id: &str, concept_id: &str) -> Option<&ForgettingRecord> {
        self.records
            .get(&(learner_id.to_string(), concept_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForgettingRecord> {
        self.records.values()
    }
}

/// Computes forgetting scores with a fixed time scale and `tau`.
#[derive(Debug, Clone, Copy)]
pub struct ForgettingEstimator {
    scale: TimeScale,
    tau: f64,
}

impl ForgettingEstimator {
    pub fn new(scale: TimeScale, tau: f64) -> RecollectResult<Self> {
        if !(tau.is_finite() && tau > 0.0) {
            return Err(RecollectError::out_of_range("tau", tau, "a positive number of minutes"));
        }
        Ok(Self { scale, tau })
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    /// Estimate one pair. Needs at least two attempts.
    pub async fn estimate_pair(
        &self,
        history: &ConceptHistory,
        mastery: &dyn MasteryEstimator,
    ) -> RecollectResult<PairEstimate> {
        let (Some(gap), Some(last)) = (history.last_gap(), history.last()) else {
            return Err(RecollectError::insufficient_history(
                &history.learner_id,
                &history.concept_id,
                history.len(),
            ));
        };

        let s_tc = mastery
            .estimate_mastery(history, history.len() - 1)
            .await?;
        if !s_tc.is_finite() {
            return Err(RecollectError::mastery_unavailable(
                mastery.source().to_string(),
                format!(
                    "non-finite estimate for {}/{}",
                    history.learner_id, history.concept_id
                ),
            ));
        }
        let s_tc = s_tc.clamp(0.0, 1.0);
        let delta_t = self.scale.to_minutes(gap);

        Ok(PairEstimate {
            s_tc,
            delta_t,
            fs: forgetting_score(s_tc, delta_t, self.tau),
            last_correct: last.correct,
            attempts: history.len(),
        })
    }

    /// Estimate every pair of the corpus under one source and assign levels
    /// from that source's own percentiles.
    ///
    /// Pairs with too few attempts, without a mastery estimate, or whose
    /// source backend failed for that pair are skipped; any other error
    /// aborts the run.
    pub async fn estimate_population(
        &self,
        corpus: &InteractionCorpus,
        mastery: &dyn MasteryEstimator,
    ) -> RecollectResult<SourceRecords> {
        let source = mastery.source().clone();
        let mut estimates = Vec::with_capacity(corpus.len());
        let mut skipped = 0;

        for history in corpus.histories() {
            match self.estimate_pair(history, mastery).await {
                Ok(estimate) => estimates.push((history, estimate)),
                Err(RecollectError::InsufficientHistory { attempts, .. }) => {
                    tracing::debug!(
                        learner_id = %history.learner_id,
                        concept_id = %history.concept_id,
                        attempts,
                        "Skipping pair with insufficient history"
                    );
                    skipped += 1;
                }
                Err(
                    e @ (RecollectError::MasteryUnavailable { .. }
                    | RecollectError::Llm { .. }
                    | RecollectError::Network { .. }),
                ) => {
                    tracing::warn!(
                        learner_id = %history.learner_id,
                        concept_id = %history.concept_id,
                        source = %source,
                        error = %e,
                        "No mastery estimate, skipping pair"
                    );
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let scores: Vec<f64> = estimates.iter().map(|(_, e)| e.fs).collect();
        let thresholds = LevelThresholds::from_scores(&scores);

        let records: BTreeMap<(String, String), ForgettingRecord> = estimates
            .into_iter()
            .map(|(history, estimate)| {
                let level = thresholds
                    .map(|t| t.level(estimate.fs))
                    .unwrap_or(ForgettingLevel::Low);
                let record = ForgettingRecord {
                    learner_id: history.learner_id.clone(),
                    concept_id: history.concept_id.clone(),
                    source: source.clone(),
                    s_tc: estimate.s_tc,
                    delta_t: estimate.delta_t,
                    tau: self.tau,
                    fs: estimate.fs,
                    level,
                    last_correct: estimate.last_correct,
                    attempts: estimate.attempts,
                };
                ((history.learner_id.clone(), history.concept_id.clone()), record)
            })
            .collect();

        let counts = LevelCounts::from_records(records.values());
        tracing::info!(
            source = %source,
            tau = self.tau,
            records = records.len(),
            skipped,
            low = counts.low,
            medium = counts.medium,
            high = counts.high,
            "Computed forgetting records"
        );

        Ok(SourceRecords {
            source,
            tau: self.tau,
            thresholds,
            records,
            counts,
            skipped,
            computed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forgetting::time::TimeUnit;
    use crate::mastery::HistoryMastery;
    use crate::types::Interaction;
    use async_trait::async_trait;

    /// Reports a fixed probability for every pair.
    struct ConstantMastery {
        source: MasterySource,
        value: f64,
    }

    #[async_trait]
    impl MasteryEstimator for ConstantMastery {
        fn source(&self) -> &MasterySource {
            &self.source
        }

        async fn estimate_mastery(&self, _history: &ConceptHistory, _as_of: usize) -> RecollectResult<f64> {
            Ok(self.value)
        }
    }

    fn estimator(tau: f64) -> ForgettingEstimator {
        ForgettingEstimator::new(TimeScale::new(TimeUnit::Index), tau).unwrap()
    }

    #[tokio::test]
    async fn test_scenario_mastered_history() {
        let history = ConceptHistory::from_pairs("s", "c", &[(0.0, true), (10.0, true), (40.0, false)]);
        let estimate = estimator(10.0)
            .estimate_pair(&history, &HistoryMastery::new())
            .await
            .unwrap();
        assert_eq!(estimate.s_tc, 1.0);
        assert_eq!(estimate.delta_t, 30.0);
        assert_eq!(estimate.fs, 0.0);
        assert!(!estimate.last_correct);
        assert_eq!(estimate.attempts, 3);
    }

    #[tokio::test]
    async fn test_scenario_unmastered_history() {
        let history = ConceptHistory::from_pairs("s", "c", &[(0.0, false), (5.0, false), (65.0, true)]);
        let estimate = estimator(10.0)
            .estimate_pair(&history, &HistoryMastery::new())
            .await
            .unwrap();
        assert_eq!(estimate.s_tc, 0.0);
        assert_eq!(estimate.delta_t, 60.0);
        assert!((estimate.fs - 0.857).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_single_attempt_is_insufficient() {
        let history = ConceptHistory::from_pairs("s", "c", &[(0.0, true)]);
        let err = estimator(10.0)
            .estimate_pair(&history, &HistoryMastery::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RecollectError::InsufficientHistory { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_estimate_is_clamped() {
        let history = ConceptHistory::from_pairs("s", "c", &[(0.0, true), (10.0, true)]);
        let mastery = ConstantMastery {
            source: MasterySource::knowledge_tracing("dkt"),
            value: 1.7,
        };
        let estimate = estimator(10.0).estimate_pair(&history, &mastery).await.unwrap();
        assert_eq!(estimate.s_tc, 1.0);
    }

    #[tokio::test]
    async fn test_population_skips_short_histories() {
        let corpus = InteractionCorpus::from_interactions(vec![
            Interaction::new("a", "c", 0.0, false),
            Interaction::new("a", "c", 10.0, true),
            Interaction::new("b", "c", 0.0, true),
            Interaction::new("b", "c", 100.0, true),
            Interaction::new("d", "c", 4.0, true),
        ]);
        let records = estimator(10.0)
            .estimate_population(&corpus, &HistoryMastery::new())
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.skipped, 1);
        assert!(records.get("d", "c").is_none());
        assert_eq!(records.counts.total(), 2);
        for record in records.iter() {
            assert_eq!(record.source, MasterySource::History);
            assert_eq!(record.tau, 10.0);
        }
    }

    /// Fails with a backend error for one learner only.
    struct FlakyBackend {
        source: MasterySource,
        failing_learner: &'static str,
    }

    #[async_trait]
    impl MasteryEstimator for FlakyBackend {
        fn source(&self) -> &MasterySource {
            &self.source
        }

        async fn estimate_mastery(&self, history: &ConceptHistory, _as_of: usize) -> RecollectResult<f64> {
            if history.learner_id == self.failing_learner {
                return Err(RecollectError::llm("rate limited"));
            }
            Ok(0.5)
        }
    }

    #[tokio::test]
    async fn test_backend_failure_on_one_pair_skips_only_that_pair() {
        let corpus = InteractionCorpus::from_interactions(vec![
            Interaction::new("good", "c", 0.0, true),
            Interaction::new("good", "c", 10.0, true),
            Interaction::new("bad", "c", 0.0, true),
            Interaction::new("bad", "c", 10.0, true),
        ]);
        let backend = FlakyBackend {
            source: MasterySource::llm("m"),
            failing_learner: "bad",
        };
        let records = estimator(10.0)
            .estimate_population(&corpus, &backend)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records.skipped, 1);
        assert!(records.get("good", "c").is_some());
        assert!(records.get("bad", "c").is_none());
    }

    #[tokio::test]
    async fn test_levels_are_per_source() {
        // Same corpus, two sources with very different score ranges: each
        // source still spreads its own population over every level.
        let interactions: Vec<Interaction> = (0..30)
            .flat_map(|i| {
                let learner = format!("s{}", i);
                vec![
                    Interaction::new(learner.clone(), "c", 0.0, true),
                    Interaction::new(learner, "c", (i + 1) as f64 * 5.0, true),
                ]
            })
            .collect();
        let corpus = InteractionCorpus::from_interactions(interactions);
        let est = estimator(30.0);

        let low_mastery = ConstantMastery {
            source: MasterySource::knowledge_tracing("a"),
            value: 0.1,
        };
        let high_mastery = ConstantMastery {
            source: MasterySource::knowledge_tracing("b"),
            value: 0.9,
        };
        let a = est.estimate_population(&corpus, &low_mastery).await.unwrap();
        let b = est.estimate_population(&corpus, &high_mastery).await.unwrap();

        assert_ne!(a.thresholds, b.thresholds);
        for records in [&a, &b] {
            assert!(records.counts.low >= 8);
            assert!(records.counts.medium >= 8);
            assert!(records.counts.high >= 8);
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_tau() {
        assert!(ForgettingEstimator::new(TimeScale::new(TimeUnit::Index), 0.0).is_err());
    }

    #[tokio::test]
    async fn test_source_records_serialize_as_list() {
        let corpus = InteractionCorpus::from_interactions(vec![
            Interaction::new("a", "c", 0.0, true),
            Interaction::new("a", "c", 10.0, false),
        ]);
        let records = estimator(10.0)
            .estimate_population(&corpus, &HistoryMastery::new())
            .await
            .unwrap();

        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(json["records"].as_array().map(|r| r.len()), Some(1));
        assert_eq!(json["source"], "history");

        let back: SourceRecords = serde_json::from_value(json).unwrap();
        assert_eq!(back.get("a", "c"), records.get("a", "c"));
    }
}

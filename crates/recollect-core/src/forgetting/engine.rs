//! Forgetting engine: calibrated estimator, registered sources and a
//! record cache.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::calibration::{calibrate_tau, TauCalibration};
use super::config::ForgettingConfig;
use super::estimator::{ForgettingEstimator, SourceRecords};
use super::time::TimeScale;
use crate::error::{RecollectError, RecollectResult};
use crate::traits::MasteryEstimator;
use crate::types::{ForgettingRecord, InteractionCorpus, MasterySource};

/// Cache key: one population run per (source, tau). Records inside a run are
/// keyed by (learner, concept).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PopulationKey {
    source: MasterySource,
    tau_bits: u64,
}

impl PopulationKey {
    fn new(source: &MasterySource, tau: f64) -> Self {
        Self {
            source: source.clone(),
            tau_bits: tau.to_bits(),
        }
    }
}

/// Owns an interaction corpus and serves forgetting records per source.
///
/// Population runs are cached. `recompute` and `recalibrate` are explicit
/// batch operations; nothing is invalidated implicitly.
pub struct ForgettingEngine {
    corpus: Arc<InteractionCorpus>,
    scale: TimeScale,
    calibration: TauCalibration,
    config: ForgettingConfig,
    sources: HashMap<MasterySource, Arc<dyn MasteryEstimator>>,
    cache: RwLock<HashMap<PopulationKey, Arc<SourceRecords>>>,
}

impl ForgettingEngine {
    /// Detect the corpus time scale and calibrate `tau`.
    pub fn new(corpus: InteractionCorpus, config: ForgettingConfig) -> RecollectResult<Self> {
        config.validate()?;
        let scale = TimeScale::for_corpus(&corpus);
        let calibration = resolve_tau(&corpus, scale, &config);

        tracing::info!(
            pairs = corpus.len(),
            unit = %scale.unit,
            tau = calibration.tau,
            fell_back = calibration.fell_back,
            overridden = calibration.overridden,
            "Forgetting engine calibrated"
        );

        Ok(Self {
            corpus: Arc::new(corpus),
            scale,
            calibration,
            config,
            sources: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Register a mastery source.
    pub fn with_source(mut self, estimator: Arc<dyn MasteryEstimator>) -> Self {
        self.sources.insert(estimator.source().clone(), estimator);
        self
    }

    pub fn tau(&self) -> f64 {
        self.calibration.tau
    }

    pub fn calibration(&self) -> &TauCalibration {
        &self.calibration
    }

    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    pub fn corpus(&self) -> &InteractionCorpus {
        &self.corpus
    }

    /// Registered sources, sorted by identity.
    pub fn sources(&self) -> Vec<MasterySource> {
        let mut sources: Vec<MasterySource> = self.sources.keys().cloned().collect();
        sources.sort();
        sources
    }

    fn estimator_for(&self, source: &MasterySource) -> RecollectResult<&Arc<dyn MasteryEstimator>> {
        self.sources.get(source).ok_or_else(|| {
            RecollectError::validation(format!("mastery source '{}' is not registered", source))
        })
    }

    /// Records for a source at the current `tau`, computed on first use.
    pub async fn population(&self, source: &MasterySource) -> RecollectResult<Arc<SourceRecords>> {
        let key = PopulationKey::new(source, self.calibration.tau);
        if let Some(records) = self.cache.read().await.get(&key) {
            return Ok(Arc::clone(records));
        }
        self.recompute(source).await
    }

    /// Recompute every record of a source and its level thresholds.
    pub async fn recompute(&self, source: &MasterySource) -> RecollectResult<Arc<SourceRecords>> {
        let mastery = self.estimator_for(source)?;
        let estimator = ForgettingEstimator::new(self.scale, self.calibration.tau)?;
        let records = Arc::new(
            estimator
                .estimate_population(&self.corpus, mastery.as_ref())
                .await?,
        );

        let key = PopulationKey::new(source, self.calibration.tau);
        self.cache.write().await.insert(key, Arc::clone(&records));
        Ok(records)
    }

    /// Forgetting record for one learner-concept pair under one source.
    pub async fn estimate_forgetting(
        &self,
        learner_id: &str,
        concept_id: &str,
        source: &MasterySource,
    ) -> RecollectResult<ForgettingRecord> {
        let attempts = self
            .corpus
            .get(learner_id, concept_id)
            .map(|h| h.len())
            .unwrap_or(0);
        if attempts < 2 {
            return Err(RecollectError::insufficient_history(learner_id, concept_id, attempts));
        }

        let population = self.population(source).await?;
        population.get(learner_id, concept_id).cloned().ok_or_else(|| {
            RecollectError::mastery_unavailable(
                source.to_string(),
                format!("no estimate for {}/{}", learner_id, concept_id),
            )
        })
    }

    /// Recalibrate `tau` from the corpus and drop every cached run.
    pub fn recalibrate(&mut self) -> TauCalibration {
        self.calibration = resolve_tau(&self.corpus, self.scale, &self.config);
        self.cache.get_mut().clear();
        tracing::info!(tau = self.calibration.tau, "Recalibrated tau");
        self.calibration
    }

    /// Set or clear the `tau` override, then recalibrate.
    pub fn set_tau_override(&mut self, tau: Option<f64>) -> RecollectResult<TauCalibration> {
        let mut config = self.config.clone();
        config.tau_override = tau;
        config.validate()?;
        self.config = config;
        Ok(self.recalibrate())
    }
}

fn resolve_tau(corpus: &InteractionCorpus, scale: TimeScale, config: &ForgettingConfig) -> TauCalibration {
    let calibration = calibrate_tau(corpus, scale, config.fallback_tau_minutes);
    match config.tau_override {
        Some(tau) => TauCalibration {
            tau,
            fell_back: false,
            overridden: true,
            ..calibration
        },
        None => calibration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mastery::HistoryMastery;
    use crate::types::{ConceptHistory, Interaction};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMastery {
        source: MasterySource,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MasteryEstimator for CountingMastery {
        fn source(&self) -> &MasterySource {
            &self.source
        }

        async fn estimate_mastery(&self, _history: &ConceptHistory, _as_of: usize) -> RecollectResult<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(0.5)
        }
    }

    struct FailsForLearner {
        source: MasterySource,
        learner: &'static str,
    }

    #[async_trait]
    impl MasteryEstimator for FailsForLearner {
        fn source(&self) -> &MasterySource {
            &self.source
        }

        async fn estimate_mastery(&self, history: &ConceptHistory, _as_of: usize) -> RecollectResult<f64> {
            if history.learner_id == self.learner {
                return Err(RecollectError::llm("rate limited"));
            }
            Ok(0.5)
        }
    }

    fn corpus() -> InteractionCorpus {
        InteractionCorpus::from_interactions(vec![
            Interaction::new("a", "c", 0.0, true),
            Interaction::new("a", "c", 10.0, true),
            Interaction::new("a", "c", 40.0, false),
            Interaction::new("b", "c", 0.0, false),
            Interaction::new("b", "c", 5.0, false),
            Interaction::new("b", "c", 65.0, true),
            Interaction::new("e", "c", 3.0, true),
        ])
    }

    #[tokio::test]
    async fn test_tau_is_calibrated_from_corpus() {
        let engine = ForgettingEngine::new(corpus(), ForgettingConfig::default()).unwrap();
        // Last gaps are 30 and 60.
        assert_eq!(engine.tau(), 45.0);
        assert!(!engine.calibration().overridden);
    }

    #[tokio::test]
    async fn test_estimate_forgetting_with_override() {
        let engine = ForgettingEngine::new(corpus(), ForgettingConfig::default().with_tau_override(10.0))
            .unwrap()
            .with_source(Arc::new(HistoryMastery::new()));

        let a = engine
            .estimate_forgetting("a", "c", &MasterySource::History)
            .await
            .unwrap();
        assert_eq!(a.fs, 0.0);
        assert_eq!(a.tau, 10.0);

        let b = engine
            .estimate_forgetting("b", "c", &MasterySource::History)
            .await
            .unwrap();
        assert!((b.fs - 60.0 / 70.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_short_or_unknown_pairs_are_insufficient() {
        let engine = ForgettingEngine::new(corpus(), ForgettingConfig::default())
            .unwrap()
            .with_source(Arc::new(HistoryMastery::new()));

        for learner in ["e", "zz"] {
            let err = engine
                .estimate_forgetting(learner, "c", &MasterySource::History)
                .await
                .unwrap_err();
            assert!(matches!(err, RecollectError::InsufficientHistory { .. }));
        }
    }

    #[tokio::test]
    async fn test_unregistered_source_is_rejected() {
        let engine = ForgettingEngine::new(corpus(), ForgettingConfig::default()).unwrap();
        let err = engine
            .estimate_forgetting("a", "c", &MasterySource::knowledge_tracing("dkt"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecollectError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_population_is_cached_until_recalibrated() {
        let mastery = Arc::new(CountingMastery {
            source: MasterySource::knowledge_tracing("dkt"),
            calls: AtomicUsize::new(0),
        });
        let source = mastery.source.clone();
        let mut engine = ForgettingEngine::new(corpus(), ForgettingConfig::default())
            .unwrap()
            .with_source(mastery.clone());

        engine.estimate_forgetting("a", "c", &source).await.unwrap();
        engine.estimate_forgetting("b", "c", &source).await.unwrap();
        assert_eq!(mastery.calls.load(Ordering::SeqCst), 2);

        engine.recompute(&source).await.unwrap();
        assert_eq!(mastery.calls.load(Ordering::SeqCst), 4);

        let calibration = engine.set_tau_override(Some(5.0)).unwrap();
        assert_eq!(calibration.tau, 5.0);
        let record = engine.estimate_forgetting("a", "c", &source).await.unwrap();
        assert_eq!(record.tau, 5.0);
        assert_eq!(mastery.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_invalid_override_keeps_calibration() {
        let mut engine = ForgettingEngine::new(corpus(), ForgettingConfig::default()).unwrap();
        assert!(engine.set_tau_override(Some(-3.0)).is_err());
        assert_eq!(engine.tau(), 45.0);
    }

    #[tokio::test]
    async fn test_one_failing_pair_leaves_others_available() {
        let source = MasterySource::llm("m");
        let engine = ForgettingEngine::new(corpus(), ForgettingConfig::default())
            .unwrap()
            .with_source(Arc::new(FailsForLearner {
                source: source.clone(),
                learner: "b",
            }));

        let record = engine.estimate_forgetting("a", "c", &source).await.unwrap();
        assert_eq!(record.learner_id, "a");

        let err = engine.estimate_forgetting("b", "c", &source).await.unwrap_err();
        assert!(matches!(err, RecollectError::MasteryUnavailable { .. }));
    }
}

use crate::config::EvalType;
use crate::data::{FitnessCache, FitnessStore, ModelCache, ModelStore, MultiLabelDataset};
use crate::engines::evaluation::Ensemble;
use crate::error::{CoevoError, Result};
use crate::ml::{Scorer, Trainer};
use crate::types::{Individual, FAILED_FITNESS};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Trains and scores base classifiers on a bounded worker pool.
///
/// Each subpopulation has its own training view. Fitness and models are
/// memoized by `subpop:genotype`, so a genotype is trained at most once per
/// view unless two workers race on the same key.
pub struct ConcurrentEvaluator<T: Trainer, S: Scorer> {
    trainer: T,
    scorer: S,
    full_train: MultiLabelDataset,
    views: Vec<MultiLabelDataset>,
    eval_type: EvalType,
    fitness_store: Arc<dyn FitnessStore>,
    model_store: Arc<dyn ModelStore<T::Model>>,
    pool: ThreadPool,
    trainings: AtomicUsize,
    evaluations: AtomicUsize,
}

impl<T: Trainer, S: Scorer> ConcurrentEvaluator<T, S> {
    /// `views[p]` is the training data of subpopulation `p`.
    /// `threads = None` sizes the pool to the available parallelism.
    pub fn new(
        trainer: T,
        scorer: S,
        full_train: MultiLabelDataset,
        views: Vec<MultiLabelDataset>,
        threads: Option<usize>,
    ) -> Result<Self> {
        if views.is_empty() {
            return Err(CoevoError::Configuration(
                "At least one subpopulation view is required".to_string(),
            ));
        }
        let num_threads = threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("coensemble-eval-{}", i))
            .build()?;

        Ok(Self {
            trainer,
            scorer,
            full_train,
            views,
            eval_type: EvalType::Train,
            fitness_store: Arc::new(FitnessCache::new()),
            model_store: Arc::new(ModelCache::new()),
            pool,
            trainings: AtomicUsize::new(0),
            evaluations: AtomicUsize::new(0),
        })
    }

    pub fn with_eval_type(mut self, eval_type: EvalType) -> Self {
        self.eval_type = eval_type;
        self
    }

    pub fn with_stores(
        mut self,
        fitness_store: Arc<dyn FitnessStore>,
        model_store: Arc<dyn ModelStore<T::Model>>,
    ) -> Self {
        self.fitness_store = fitness_store;
        self.model_store = model_store;
        self
    }

    pub fn num_labels(&self) -> usize {
        self.full_train.num_labels()
    }

    pub fn num_subpopulations(&self) -> usize {
        self.views.len()
    }

    pub fn full_train(&self) -> &MultiLabelDataset {
        &self.full_train
    }

    pub fn model_store(&self) -> &dyn ModelStore<T::Model> {
        self.model_store.as_ref()
    }

    pub fn fitness_store(&self) -> &dyn FitnessStore {
        self.fitness_store.as_ref()
    }

    /// Number of times the external trainer has been invoked.
    pub fn trainings(&self) -> usize {
        self.trainings.load(Ordering::Relaxed)
    }

    /// Number of fitness assignments, cache hits included.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Assigns a fitness to `ind` from the cache, or by training and scoring it.
    pub fn evaluate(&self, ind: &mut Individual) -> Result<()> {
        let key = ind.key();
        let fitness = match self.fitness_store.get(&key) {
            Some(fitness) => fitness,
            None => self.train_and_score(&key, ind)?,
        };
        ind.set_fitness(fitness);
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn train_and_score(&self, key: &str, ind: &Individual) -> Result<f64> {
        let view = self.views.get(ind.subpop()).ok_or_else(|| {
            CoevoError::Evaluation(format!(
                "Individual {} refers to subpopulation {} of {}",
                key,
                ind.subpop(),
                self.views.len()
            ))
        })?;
        let restricted = view.restrict_to_labels(ind.genotype());

        self.trainings.fetch_add(1, Ordering::Relaxed);
        let model = match self.trainer.train(&restricted) {
            Ok(model) => model,
            Err(e) => {
                log::warn!("Training failed for {}: {:#}", key, e);
                self.fitness_store.insert(key.to_string(), FAILED_FITNESS);
                return Ok(FAILED_FITNESS);
            }
        };

        let fitness = match self.eval_type {
            EvalType::Train => self.scorer.score(&model, &restricted),
            EvalType::Full => {
                let validation = self.full_train.restrict_to_labels(ind.genotype());
                self.scorer.score(&model, &validation)
            }
        };

        self.model_store.insert(key.to_string(), Arc::new(model));
        self.fitness_store.insert(key.to_string(), fitness);
        Ok(fitness)
    }

    /// Evaluates every individual without a fitness, across all subpopulations,
    /// and blocks until the batch is done. Returns the number evaluated.
    pub fn evaluate_all(&self, subpops: &mut [Vec<Individual>]) -> Result<usize> {
        let pending: Vec<&mut Individual> = subpops
            .iter_mut()
            .flat_map(|subpop| subpop.iter_mut())
            .filter(|ind| !ind.is_evaluated())
            .collect();
        self.run_batch(pending)
    }

    pub fn evaluate_batch(&self, individuals: &mut [Individual]) -> Result<usize> {
        let pending: Vec<&mut Individual> = individuals
            .iter_mut()
            .filter(|ind| !ind.is_evaluated())
            .collect();
        self.run_batch(pending)
    }

    fn run_batch(&self, pending: Vec<&mut Individual>) -> Result<usize> {
        let count = pending.len();
        if count == 0 {
            return Ok(0);
        }
        log::debug!("Evaluating {} individuals", count);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool
                .install(|| pending.into_par_iter().try_for_each(|ind| self.evaluate(ind)))
        }));

        match outcome {
            Ok(result) => result.map(|_| count),
            Err(payload) => Err(CoevoError::WorkerPanic(panic_message(payload.as_ref()))),
        }
    }

    /// Builds an ensemble over the cached models of `members`.
    pub fn build_ensemble(&self, members: Vec<Individual>, threshold: f64) -> Ensemble<T::Model> {
        Ensemble::new(members, self.num_labels(), threshold, self.model_store.as_ref())
    }

    /// Ensemble fitness, always measured on the full training data.
    pub fn score_ensemble(&self, ensemble: &Ensemble<T::Model>) -> f64 {
        self.pool
            .install(|| self.scorer.score(ensemble, &self.full_train))
    }

    pub fn score_members(&self, members: &[Individual], threshold: f64) -> f64 {
        let ensemble = self.build_ensemble(members.to_vec(), threshold);
        self.score_ensemble(&ensemble)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::metrics::Measure;
    use crate::ml::{MeasureScorer, Model, Prediction};
    use crate::types::Genotype;

    struct Echo {
        width: usize,
    }

    impl Model for Echo {
        fn predict(&self, _features: &[f64]) -> Prediction {
            Prediction {
                bipartition: vec![true; self.width],
                confidences: vec![1.0; self.width],
            }
        }
    }

    struct AlwaysPositive;

    impl Trainer for AlwaysPositive {
        type Model = Echo;

        fn train(&self, data: &MultiLabelDataset) -> anyhow::Result<Echo> {
            if data.num_labels() == 3 {
                anyhow::bail!("three labels are not supported");
            }
            Ok(Echo {
                width: data.num_labels(),
            })
        }
    }

    struct Exploding;

    impl Trainer for Exploding {
        type Model = Echo;

        fn train(&self, _data: &MultiLabelDataset) -> anyhow::Result<Echo> {
            panic!("trainer exploded");
        }
    }

    fn data() -> MultiLabelDataset {
        MultiLabelDataset::new(
            vec!["x".into()],
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![0.0], vec![1.0]],
            vec![vec![true, true, false], vec![true, false, false]],
        )
        .unwrap()
    }

    fn evaluator<T: Trainer>(trainer: T) -> ConcurrentEvaluator<T, MeasureScorer> {
        let full = data();
        ConcurrentEvaluator::new(
            trainer,
            MeasureScorer::new(Measure::SubsetAccuracy),
            full.clone(),
            vec![full.clone(), full],
            Some(2),
        )
        .unwrap()
    }

    #[test]
    fn test_cached_fitness_skips_training() {
        let evaluator = evaluator(AlwaysPositive);
        let mut subpops = vec![
            vec![Individual::new(Genotype::from_active(3, &[0]), 0)],
            vec![Individual::new(Genotype::from_active(3, &[0]), 1)],
        ];
        assert_eq!(evaluator.evaluate_all(&mut subpops).unwrap(), 2);
        assert_eq!(evaluator.trainings(), 2);
        assert_eq!(subpops[0][0].fitness(), Some(1.0));

        let mut again = Individual::new(Genotype::from_active(3, &[0]), 0);
        evaluator.evaluate(&mut again).unwrap();
        assert_eq!(again.fitness(), Some(1.0));
        assert_eq!(evaluator.trainings(), 2);
        assert_eq!(evaluator.evaluations(), 3);
    }

    #[test]
    fn test_training_failure_is_cached_as_sentinel() {
        let evaluator = evaluator(AlwaysPositive);
        let mut batch = vec![Individual::new(Genotype::from_active(3, &[0, 1, 2]), 0)];
        evaluator.evaluate_batch(&mut batch).unwrap();
        assert!(batch[0].is_failed());
        assert_eq!(evaluator.model_store().len(), 0);

        let mut retry = vec![Individual::new(Genotype::from_active(3, &[0, 1, 2]), 0)];
        evaluator.evaluate_batch(&mut retry).unwrap();
        assert!(retry[0].is_failed());
        assert_eq!(evaluator.trainings(), 1);
    }

    #[test]
    fn test_worker_panic_is_surfaced() {
        let evaluator = evaluator(Exploding);
        let mut batch = vec![Individual::new(Genotype::from_active(3, &[0]), 0)];
        let result = evaluator.evaluate_batch(&mut batch);
        assert!(matches!(result, Err(CoevoError::WorkerPanic(msg)) if msg.contains("exploded")));
    }

    #[test]
    fn test_unknown_subpop_is_an_error() {
        let evaluator = evaluator(AlwaysPositive);
        let mut ind = Individual::new(Genotype::from_active(3, &[0]), 5);
        assert!(matches!(evaluator.evaluate(&mut ind), Err(CoevoError::Evaluation(_))));
    }

    #[test]
    fn test_score_members_on_full_train() {
        let evaluator = evaluator(AlwaysPositive);
        let mut members = vec![
            Individual::new(Genotype::from_active(3, &[0, 1]), 0),
            Individual::new(Genotype::from_active(3, &[2]), 0),
        ];
        evaluator.evaluate_batch(&mut members).unwrap();
        // every label predicted positive, never an exact match
        assert_eq!(evaluator.score_members(&members, 0.5), 0.0);
    }
}

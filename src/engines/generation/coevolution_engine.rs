use super::communication::{merge_best_members, CommunicationStats, Communicator};
use super::ensemble_selection::{expected_votes_total, spread_votes_evenly, EnsembleSelector};
use super::individual_creator::IndividualCreator;
use super::operators::{crossover, mutate, tournament_selection};
use super::progress::ProgressCallback;
use super::pruning::Pruner;
use super::subpop_updater::SubpopUpdater;
use crate::config::AppConfig;
use crate::data::{FitnessStore, ModelStore, MultiLabelDataset};
use crate::engines::evaluation::{ConcurrentEvaluator, Ensemble};
use crate::error::{CoevoError, Result};
use crate::ml::{Scorer, Trainer};
use crate::types::{remove_duplicates, Individual};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Init,
    Evolving,
    Finished,
}

/// Summary of one generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    /// Fitness of the whole-population ensemble built this generation, if any.
    pub ensemble_fitness: Option<f64>,
    pub best_fitness: Option<f64>,
    pub evaluations: usize,
    pub communication: Option<CommunicationStats>,
}

pub struct CoevolutionResult<M> {
    pub ensemble: Ensemble<M>,
    pub fitness: f64,
    pub generations: usize,
    pub evaluations: usize,
    pub trainings: usize,
    pub history: Vec<GenerationRecord>,
}

/// Evolves one population of base classifiers per training sample and fuses
/// them into a single ensemble.
///
/// The engine runs `Init`, then one `Evolving` step per generation until
/// `max_generations` is reached. Each generation selects parents by
/// tournament, recombines, evaluates offspring and truncates every
/// subpopulation back to its target size with the ensemble selector. Every
/// `iters_communication` generations a whole-population ensemble is built,
/// the best one is kept, and the subpopulations communicate.
pub struct CoevolutionEngine<T: Trainer, S: Scorer> {
    config: AppConfig,
    evaluator: ConcurrentEvaluator<T, S>,
    creators: Vec<IndividualCreator>,
    refill_creator: IndividualCreator,
    selector: EnsembleSelector,
    communicator: Communicator,
    expected_votes: Vec<usize>,
    subpops: Vec<Vec<Individual>>,
    best: Option<(Vec<Individual>, f64)>,
    outcome: Option<(Vec<Individual>, f64)>,
    generation: usize,
    state: EngineState,
    history: Vec<GenerationRecord>,
    rng: StdRng,
}

impl<T: Trainer, S: Scorer> CoevolutionEngine<T, S> {
    pub fn new(config: AppConfig, trainer: T, scorer: S, train: MultiLabelDataset) -> Result<Self> {
        config.validate()?;
        let num_labels = train.num_labels();
        if num_labels == 0 || train.num_instances() == 0 {
            return Err(CoevoError::DataLoading(
                "Training data needs at least one instance and one label".to_string(),
            ));
        }
        config.validate_for_labels(num_labels)?;

        let mut rng = match config.evolution.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let views: Vec<MultiLabelDataset> = (0..config.evolution.num_subpopulations)
            .map(|_| train.sample(config.data.sampling_ratio, &mut rng))
            .collect();
        let creators = views
            .iter()
            .map(|view| IndividualCreator::from_config(&config.creation, view.appearances()))
            .collect();
        let (k_min, k_max) = config.creation.k_bounds();
        let refill_creator = IndividualCreator::random(num_labels, k_min, k_max);

        let total = expected_votes_total(
            config.ensemble.avg_votes_per_label,
            config.creation.labels_per_classifier,
            num_labels,
        );
        let expected_votes = spread_votes_evenly(num_labels, total, &mut rng);
        log::debug!("Expected votes per label: {:?}", expected_votes);

        let evaluator = ConcurrentEvaluator::new(
            trainer,
            scorer,
            train,
            views,
            config.evolution.evaluator_threads,
        )?
        .with_eval_type(config.data.eval_type);

        Ok(Self {
            communicator: Communicator::new(config.communication.clone()),
            selector: EnsembleSelector::new(num_labels),
            evaluator,
            creators,
            refill_creator,
            expected_votes,
            subpops: Vec::new(),
            best: None,
            outcome: None,
            generation: 0,
            state: EngineState::Init,
            history: Vec::new(),
            config,
            rng,
        })
    }

    /// Replaces the fitness and model stores. Only meaningful before the run starts.
    pub fn with_stores(
        mut self,
        fitness_store: Arc<dyn FitnessStore>,
        model_store: Arc<dyn ModelStore<T::Model>>,
    ) -> Self {
        self.evaluator = self.evaluator.with_stores(fitness_store, model_store);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn subpopulations(&self) -> &[Vec<Individual>] {
        &self.subpops
    }

    pub fn expected_votes(&self) -> &[usize] {
        &self.expected_votes
    }

    pub fn evaluator(&self) -> &ConcurrentEvaluator<T, S> {
        &self.evaluator
    }

    pub fn best_ensemble(&self) -> Option<(&[Individual], f64)> {
        self.best.as_ref().map(|(members, fitness)| (members.as_slice(), *fitness))
    }

    pub fn history(&self) -> &[GenerationRecord] {
        &self.history
    }

    /// Runs to completion and returns the final ensemble.
    pub fn run<C: ProgressCallback>(&mut self, mut callback: C) -> Result<CoevolutionResult<T::Model>> {
        if self.state == EngineState::Init {
            self.initialize(&mut callback)?;
        }
        while self.state != EngineState::Finished {
            self.next_generation(&mut callback)?;
        }
        self.result()
    }

    /// Creates and evaluates every subpopulation, then runs the control step for generation 0.
    pub fn initialize(&mut self, callback: &mut dyn ProgressCallback) -> Result<()> {
        let subpop_size = self.config.evolution.subpop_size();
        log::info!(
            "Initializing {} subpopulations of {} individuals",
            self.creators.len(),
            subpop_size
        );

        self.subpops = self
            .creators
            .iter()
            .enumerate()
            .map(|(p, creator)| creator.provide(p, subpop_size, &mut self.rng))
            .collect::<Result<Vec<_>>>()?;

        self.updater_guard_and_normalize()?;
        self.state = EngineState::Evolving;
        self.control(callback)
    }

    /// One generation: breed, update, control. Returns `false` once finished.
    pub fn next_generation(&mut self, callback: &mut dyn ProgressCallback) -> Result<bool> {
        match self.state {
            EngineState::Init => {
                return Err(CoevoError::Configuration(
                    "Engine must be initialized before evolving".to_string(),
                ))
            }
            EngineState::Finished => return Ok(false),
            EngineState::Evolving => {}
        }

        callback.on_generation_start(self.generation + 1);

        let mut offspring = self.breed();
        self.evaluator.evaluate_all(&mut offspring)?;

        for (subpop, children) in self.subpops.iter_mut().zip(offspring) {
            let mut merged = children;
            merged.append(subpop);
            *subpop = remove_duplicates(merged);
        }
        self.updater_guard_and_normalize()?;

        self.generation += 1;
        self.control(callback)?;
        Ok(self.state != EngineState::Finished)
    }

    fn breed(&mut self) -> Vec<Vec<Individual>> {
        let evolution = &self.config.evolution;
        let subpop_size = evolution.subpop_size();

        self.subpops
            .iter()
            .map(|subpop| {
                let mut children = Vec::with_capacity(subpop_size);
                if subpop.is_empty() {
                    return children;
                }
                while children.len() < subpop_size {
                    let a = tournament_selection(subpop, evolution.tournament_size, &mut self.rng);
                    let b = tournament_selection(subpop, evolution.tournament_size, &mut self.rng);
                    let (mut c1, mut c2) = if self.rng.gen_bool(evolution.crossover_probability) {
                        crossover(a, b, &mut self.rng)
                    } else {
                        (a.clone(), b.clone())
                    };
                    if self.rng.gen_bool(evolution.mutation_probability) {
                        mutate(&mut c1, &mut self.rng);
                    }
                    if self.rng.gen_bool(evolution.mutation_probability) {
                        mutate(&mut c2, &mut self.rng);
                    }
                    children.push(c1);
                    if children.len() < subpop_size {
                        children.push(c2);
                    }
                }
                children
            })
            .collect()
    }

    fn updater_guard_and_normalize(&mut self) -> Result<()> {
        let updater = SubpopUpdater {
            evaluator: &self.evaluator,
            creator: &self.refill_creator,
            selector: &self.selector,
            expected_votes: &self.expected_votes,
            subpop_size: self.config.evolution.subpop_size(),
            beta: self.config.ensemble.beta_update_population,
        };
        updater.guard_coverage(&mut self.subpops, &mut self.rng);
        updater.normalize(&mut self.subpops, &mut self.rng)
    }

    /// Share of the run already done, in `[0, 1]`.
    fn progress(&self) -> f64 {
        let max = self.config.evolution.max_generations;
        if max == 0 {
            1.0
        } else {
            (self.generation as f64 / max as f64).min(1.0)
        }
    }

    fn control(&mut self, callback: &mut dyn ProgressCallback) -> Result<()> {
        let mut record = GenerationRecord {
            generation: self.generation,
            ensemble_fitness: None,
            best_fitness: None,
            evaluations: 0,
            communication: None,
        };

        if self.communicator.is_due(self.generation) {
            let (fitness, stats) = self.build_and_communicate()?;
            callback.on_communication(self.generation, fitness, &stats);
            record.ensemble_fitness = Some(fitness);
            record.communication = Some(stats);
        }

        if self.generation >= self.config.evolution.max_generations {
            self.finish()?;
        }

        record.best_fitness = self.best.as_ref().map(|(_, f)| *f);
        record.evaluations = self.evaluator.evaluations();
        if self.generation > 0 {
            callback.on_generation_complete(self.generation, record.best_fitness, record.evaluations);
        }
        self.history.push(record);
        Ok(())
    }

    fn whole_population(&self) -> Vec<Individual> {
        self.subpops.iter().flatten().cloned().collect()
    }

    fn select_ensemble(&mut self, pool: &[Individual]) -> Result<Vec<Individual>> {
        let n = self.config.ensemble.num_classifiers.min(pool.len());
        self.selector.select(
            pool,
            n,
            &self.expected_votes,
            self.config.ensemble.beta_ensemble_selection,
            &mut self.rng,
        )
    }

    fn build_and_communicate(&mut self) -> Result<(f64, CommunicationStats)> {
        let progress = self.progress();
        let matching = self.communicator.matching();
        let mut pool = self.whole_population();
        if let Some((best_members, _)) = &self.best {
            let merged = merge_best_members(&mut pool, best_members, matching, progress, &mut self.rng);
            log::debug!("{} members of the best ensemble rejoin the pool", merged);
        }

        let members = self.select_ensemble(&pool)?;
        let threshold = self.config.ensemble.prediction_threshold;
        let fitness = self.evaluator.score_members(&members, threshold);
        log::info!("Generation {}: whole-population ensemble fitness {:.4}", self.generation, fitness);

        let improved = self.best.as_ref().map_or(true, |(_, best)| fitness > *best);
        if improved {
            log::info!("  New best ensemble fitness: {:.4}", fitness);
            self.best = Some((members.clone(), fitness));
        }

        let updater = SubpopUpdater {
            evaluator: &self.evaluator,
            creator: &self.refill_creator,
            selector: &self.selector,
            expected_votes: &self.expected_votes,
            subpop_size: self.config.evolution.subpop_size(),
            beta: self.config.ensemble.beta_update_population,
        };
        let stats = self
            .communicator
            .communicate(&mut self.subpops, &members, progress, &updater, &mut self.rng)?;
        Ok((fitness, stats))
    }

    fn finish(&mut self) -> Result<()> {
        log::info!("Maximum generations reached ({})", self.config.evolution.max_generations);
        let threshold = self.config.ensemble.prediction_threshold;

        let (members, fitness) = match self.best.clone() {
            Some(best) => best,
            None => {
                let pool = self.whole_population();
                let members = self.select_ensemble(&pool)?;
                let fitness = self.evaluator.score_members(&members, threshold);
                (members, fitness)
            }
        };

        let (members, fitness) = if self.config.ensemble.prune {
            let pruner = Pruner::new(self.config.ensemble.prune_strategy, self.evaluator.num_labels());
            let evaluator = &self.evaluator;
            let outcome = pruner.prune(members, |list| evaluator.score_members(list, threshold));
            (outcome.members, outcome.fitness)
        } else {
            (members, fitness)
        };

        log::info!("Final ensemble: {} members, fitness {:.4}", members.len(), fitness);
        self.outcome = Some((members, fitness));
        self.state = EngineState::Finished;
        Ok(())
    }

    /// Final ensemble of a finished run.
    pub fn result(&self) -> Result<CoevolutionResult<T::Model>> {
        let (members, fitness) = self.outcome.clone().ok_or_else(|| {
            CoevoError::EnsembleSelection("The run has not finished yet".to_string())
        })?;
        Ok(CoevolutionResult {
            ensemble: self
                .evaluator
                .build_ensemble(members, self.config.ensemble.prediction_threshold),
            fitness,
            generations: self.generation,
            evaluations: self.evaluator.evaluations(),
            trainings: self.evaluator.trainings(),
            history: self.history.clone(),
        })
    }
}

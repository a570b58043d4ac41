use crate::data::DatasetMetadata;
use crate::engines::generation::{CoevolutionResult, GenerationRecord};
use crate::error::Result;
use crate::ml::Model;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSummary {
    pub subpop: usize,
    pub labels: Vec<String>,
    pub fitness: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: String,
    pub train: Option<DatasetMetadata>,
    pub test: Option<DatasetMetadata>,
    pub ensemble_fitness: f64,
    pub generations: usize,
    pub evaluations: usize,
    pub trainings: usize,
    pub threshold: f64,
    pub votes_per_label: Vec<usize>,
    pub members: Vec<MemberSummary>,
    pub history: Vec<GenerationRecord>,
    pub test_metrics: Option<BTreeMap<String, f64>>,
    pub summary: String,
}

impl RunReport {
    /// `label_names` maps genotype bits back to dataset columns.
    pub fn from_result<M: Model>(result: &CoevolutionResult<M>, label_names: &[String]) -> Self {
        let ensemble = &result.ensemble;
        let members = ensemble
            .members()
            .iter()
            .map(|m| MemberSummary {
                subpop: m.subpop(),
                labels: m
                    .genotype()
                    .active_labels()
                    .into_iter()
                    .map(|l| label_names.get(l).cloned().unwrap_or_else(|| l.to_string()))
                    .collect(),
                fitness: m.fitness(),
            })
            .collect();

        let summary = format!(
            "{} classifiers after {} generations, ensemble fitness {:.4} ({} trainings for {} evaluations)",
            ensemble.len(),
            result.generations,
            result.fitness,
            result.trainings,
            result.evaluations
        );

        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            train: None,
            test: None,
            ensemble_fitness: result.fitness,
            generations: result.generations,
            evaluations: result.evaluations,
            trainings: result.trainings,
            threshold: ensemble.threshold(),
            votes_per_label: ensemble.votes_per_label().to_vec(),
            members,
            history: result.history.clone(),
            test_metrics: None,
            summary,
        }
    }

    pub fn with_datasets(mut self, train: DatasetMetadata, test: Option<DatasetMetadata>) -> Self {
        self.train = Some(train);
        self.test = test;
        self
    }

    pub fn with_test_metrics(mut self, metrics: HashMap<String, f64>) -> Self {
        self.test_metrics = Some(metrics.into_iter().collect());
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

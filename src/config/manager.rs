use super::{
    communication::CommunicationConfig,
    creation::CreationConfig,
    data::DataConfig,
    ensemble::EnsembleConfig,
    evolution::EvolutionConfig,
    learner::LearnerConfig,
    traits::ConfigSection,
};
use crate::error::CoevoError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix of environment variables overriding file values,
/// e.g. `COENSEMBLE__EVOLUTION__SEED=7`.
pub const ENV_PREFIX: &str = "COENSEMBLE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub creation: CreationConfig,
    pub ensemble: EnsembleConfig,
    pub communication: CommunicationConfig,
    pub data: DataConfig,
    pub learner: LearnerConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), CoevoError> {
        self.evolution.validate()?;
        self.creation.validate()?;
        self.ensemble.validate()?;
        self.communication.validate()?;
        self.data.validate()?;
        self.learner.validate()?;
        Ok(())
    }

    /// Checks the rules that need the number of labels of the loaded dataset.
    pub fn validate_for_labels(&self, num_labels: usize) -> Result<(), CoevoError> {
        let (_, k_max) = self.creation.k_bounds();
        if k_max > num_labels {
            return Err(CoevoError::Configuration(format!(
                "labels_per_classifier ({}) exceeds the number of labels ({})",
                k_max, num_labels
            )));
        }
        let subpop_size = self.evolution.subpop_size();
        for (what, size) in [
            ("num_classifiers", self.ensemble.num_classifiers),
            ("Subpopulation size", subpop_size),
        ] {
            if size * k_max < num_labels {
                return Err(CoevoError::Configuration(format!(
                    "{} ({}) with {} labels per classifier cannot cover {} labels",
                    what, size, k_max, num_labels
                )));
            }
        }
        let (k_min, k_max) = self.creation.k_bounds();
        let distinct = crate::types::distinct_genotypes(num_labels, k_min, k_max);
        if (subpop_size as u128) > distinct {
            return Err(CoevoError::Configuration(format!(
                "Subpopulation size {} exceeds the {} distinct genotypes available",
                subpop_size, distinct
            )));
        }
        Ok(())
    }

    /// Reads a TOML/JSON file and applies environment overrides on top.
    pub fn from_sources<P: AsRef<Path>>(path: P) -> Result<Self, CoevoError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CoevoError> {
        let config = AppConfig::from_sources(path)?;
        let mut guard = self
            .config
            .write()
            .map_err(|_| CoevoError::Configuration("Config lock poisoned".to_string()))?;
        *guard = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CoevoError> {
        let config = self.get()?;
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| CoevoError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| CoevoError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig, CoevoError> {
        self.config
            .read()
            .map(|c| c.clone())
            .map_err(|_| CoevoError::Configuration("Config lock poisoned".to_string()))
    }

    pub fn update<F>(&self, f: F) -> Result<(), CoevoError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self
            .config
            .write()
            .map_err(|_| CoevoError::Configuration("Config lock poisoned".to_string()))?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommunicationKind, CreationStrategy};
    use std::io::Write;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.data.num_labels = Some(4);
        config
    }

    #[test]
    fn test_default_requires_labels() {
        assert!(AppConfig::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[evolution]
population_size = 30
num_subpopulations = 2

[creation]
strategy = "random"
labels_per_classifier = 2

[communication]
kind = "operators"

[data]
train_dataset = "train.csv"
num_labels = 6
"#
        )
        .unwrap();

        let manager = ConfigManager::new();
        manager.load_from_file(file.path()).unwrap();
        let config = manager.get().unwrap();
        assert_eq!(config.evolution.population_size, 30);
        assert_eq!(config.evolution.subpop_size(), 15);
        assert_eq!(config.creation.strategy, CreationStrategy::Random);
        assert_eq!(config.communication.kind, CommunicationKind::Operators);
        assert_eq!(config.ensemble.num_classifiers, 20);
    }

    #[test]
    fn test_unknown_communication_kind_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[communication]
kind = "broadcast"

[data]
num_labels = 6
"#
        )
        .unwrap();

        assert!(AppConfig::from_sources(file.path()).is_err());
    }

    #[test]
    fn test_update_rejects_invalid_values() {
        let manager = ConfigManager::new();
        manager
            .update(|c| c.data.num_labels = Some(5))
            .unwrap();
        let result = manager.update(|c| c.ensemble.beta_ensemble_selection = 1.5);
        assert!(result.is_err());
        assert_eq!(manager.get().unwrap().ensemble.beta_ensemble_selection, 0.75);
    }

    #[test]
    fn test_save_and_reload() {
        let manager = ConfigManager::new();
        manager.update(|c| c.data.num_labels = Some(3)).unwrap();
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        manager.save_to_file(file.path()).unwrap();

        let reloaded = ConfigManager::new();
        reloaded.load_from_file(file.path()).unwrap();
        assert_eq!(reloaded.get().unwrap().data.num_labels, Some(3));
    }

    #[test]
    fn test_validate_for_labels() {
        let mut config = valid_config();
        config.creation.labels_per_classifier = 5;
        assert!(config.validate_for_labels(4).is_err());

        config.creation.labels_per_classifier = 2;
        config.evolution.population_size = 30;
        config.evolution.num_subpopulations = 1;
        // C(4, 2) = 6 distinct genotypes cannot fill 30 slots
        assert!(config.validate_for_labels(4).is_err());
        assert!(config.validate_for_labels(10).is_ok());

        config.ensemble.num_classifiers = 4;
        // 4 classifiers with 2 labels each cannot cover 10 labels
        assert!(config.validate_for_labels(10).is_err());
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Fitness values keyed by `subpop:genotype`. Shared by concurrent evaluation workers.
pub trait FitnessStore: Send + Sync {
    fn get(&self, key: &str) -> Option<f64>;
    fn insert(&self, key: String, fitness: f64);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trained base classifiers keyed like [`FitnessStore`].
pub trait ModelStore<M>: Send + Sync {
    fn get(&self, key: &str) -> Option<Arc<M>>;
    fn insert(&self, key: String, model: Arc<M>);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct FitnessCache {
    data: RwLock<HashMap<String, f64>>,
}

impl FitnessCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FitnessStore for FitnessCache {
    fn get(&self, key: &str) -> Option<f64> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        data.get(key).copied()
    }

    fn insert(&self, key: String, fitness: f64) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.insert(key, fitness);
    }

    fn len(&self) -> usize {
        self.data.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub struct ModelCache<M> {
    data: RwLock<HashMap<String, Arc<M>>>,
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl<M> ModelCache<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: Send + Sync> ModelStore<M> for ModelCache<M> {
    fn get(&self, key: &str) -> Option<Arc<M>> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        data.get(key).cloned()
    }

    fn insert(&self, key: String, model: Arc<M>) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.insert(key, model);
    }

    fn len(&self) -> usize {
        self.data.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Genotypes already exchanged between subpopulations.
#[derive(Debug, Default, Clone)]
pub struct TabuSet {
    entries: HashSet<String>,
}

impl TabuSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the key was not present before.
    pub fn insert(&mut self, key: String) -> bool {
        self.entries.insert(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fitness_cache_shared_across_threads() {
        let cache = Arc::new(FitnessCache::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.insert(format!("{}:01", i), i as f64 / 10.0))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get("2:01"), Some(0.2));
        assert_eq!(cache.get("9:01"), None);
    }

    #[test]
    fn test_model_cache_returns_shared_model() {
        let cache: ModelCache<String> = ModelCache::new();
        let model = Arc::new("model".to_string());
        cache.insert("0:11".into(), Arc::clone(&model));
        let fetched = cache.get("0:11").unwrap();
        assert!(Arc::ptr_eq(&model, &fetched));
    }

    #[test]
    fn test_tabu_insert_reports_novelty() {
        let mut tabu = TabuSet::new();
        assert!(tabu.insert("0101".into()));
        assert!(!tabu.insert("0101".into()));
        assert!(tabu.contains("0101"));
        assert_eq!(tabu.len(), 1);
    }
}

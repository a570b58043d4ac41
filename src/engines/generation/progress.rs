use super::communication::CommunicationStats;

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, generation: usize, best_fitness: Option<f64>, evaluations: usize);
    fn on_communication(&mut self, generation: usize, ensemble_fitness: f64, stats: &CommunicationStats);
}

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("Generation {} starting...", generation);
    }

    fn on_generation_complete(&mut self, generation: usize, best_fitness: Option<f64>, evaluations: usize) {
        match best_fitness {
            Some(fitness) => log::info!(
                "Generation {} complete. Best ensemble fitness: {:.4}, evaluations: {}",
                generation,
                fitness,
                evaluations
            ),
            None => log::info!("Generation {} complete. Evaluations: {}", generation, evaluations),
        }
    }

    fn on_communication(&mut self, generation: usize, ensemble_fitness: f64, stats: &CommunicationStats) {
        log::info!(
            "  Generation {}: ensemble fitness {:.4}, added {:?}, removed {:?}",
            generation,
            ensemble_fitness,
            stats.added,
            stats.removed
        );
    }
}

/// Does nothing; for library callers that only want the result.
pub struct SilentProgressCallback;

impl ProgressCallback for SilentProgressCallback {
    fn on_generation_start(&mut self, _generation: usize) {}
    fn on_generation_complete(&mut self, _generation: usize, _best_fitness: Option<f64>, _evaluations: usize) {}
    fn on_communication(&mut self, _generation: usize, _ensemble_fitness: f64, _stats: &CommunicationStats) {}
}

// For monitoring a run from another thread
pub struct ChannelProgressCallback {
    sender: std::sync::mpsc::Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    GenerationComplete { generation: usize, best_fitness: Option<f64>, evaluations: usize },
    Communication { generation: usize, ensemble_fitness: f64, stats: CommunicationStats },
}

impl ChannelProgressCallback {
    pub fn new(sender: std::sync::mpsc::Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_generation_complete(&mut self, generation: usize, best_fitness: Option<f64>, evaluations: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            generation,
            best_fitness,
            evaluations,
        });
    }

    fn on_communication(&mut self, generation: usize, ensemble_fitness: f64, stats: &CommunicationStats) {
        let _ = self.sender.send(ProgressMessage::Communication {
            generation,
            ensemble_fitness,
            stats: stats.clone(),
        });
    }
}

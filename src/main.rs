use anyhow::{bail, Context};
use coensemble::config::AppConfig;
use coensemble::data::{CsvConnector, LabelSelection};
use coensemble::engines::generation::{CoevolutionEngine, ConsoleProgressCallback};
use coensemble::engines::metrics::MetricsEngine;
use coensemble::ml::{predict_all, MeasureScorer, NearestNeighbourLearner};
use coensemble::report::RunReport;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "coensemble.toml";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string()));
    let report_path = args.next().map(PathBuf::from);

    let config = AppConfig::from_sources(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let labels = match (&config.data.label_columns, config.data.num_labels) {
        (Some(names), _) => LabelSelection::Named(names.clone()),
        (None, Some(n)) => LabelSelection::Trailing(n),
        (None, None) => bail!("Either data.num_labels or data.label_columns must be set"),
    };

    let train = CsvConnector::load_dataset(&config.data.train_dataset, &labels)
        .context("Failed to load training data")?;
    let train_metadata = CsvConnector::create_metadata(&config.data.train_dataset, &train);

    let test = match &config.data.test_dataset {
        Some(path) => {
            let test = CsvConnector::load_dataset(path, &labels).context("Failed to load test data")?;
            if test.num_labels() != train.num_labels() {
                bail!(
                    "Test data has {} labels, training data has {}",
                    test.num_labels(),
                    train.num_labels()
                );
            }
            Some((CsvConnector::create_metadata(path, &test), test))
        }
        None => None,
    };

    let label_names = train.label_names().to_vec();
    let mut engine = CoevolutionEngine::new(
        config.clone(),
        NearestNeighbourLearner::new(config.learner.neighbours),
        MeasureScorer::new(config.learner.measure),
        train,
    )?;
    let result = engine.run(ConsoleProgressCallback)?;

    let mut report = RunReport::from_result(&result, &label_names);
    match test {
        Some((metadata, test)) => {
            let predicted = predict_all(&result.ensemble, &test);
            let metrics = MetricsEngine::new().calculate_all(test.labels(), &predicted);
            log::info!(
                "Test {}: {:.4}",
                config.learner.measure,
                config.learner.measure.evaluate(test.labels(), &predicted)
            );
            report = report
                .with_datasets(train_metadata, Some(metadata))
                .with_test_metrics(metrics);
        }
        None => report = report.with_datasets(train_metadata, None),
    }

    log::info!("{}", report.summary);
    match report_path {
        Some(path) => {
            report
                .save(&path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => println!("{}", report.to_json()?),
    }

    Ok(())
}

pub mod models;
pub mod scorer;
pub mod traits;

pub use models::{NearestNeighbourLearner, NearestNeighbourModel};
pub use scorer::{predict_all, MeasureScorer};
pub use traits::{Model, Prediction, Scorer, Trainer};

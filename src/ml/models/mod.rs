pub mod knn;

pub use knn::{NearestNeighbourLearner, NearestNeighbourModel};

pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod ml;
pub mod report;
pub mod types;

pub use error::{CoevoError, Result};
pub use types::{DuplicateMatching, Genotype, Individual};

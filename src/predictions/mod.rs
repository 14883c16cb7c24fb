pub mod models;
pub mod repository;

pub use models::{Prediction, PredictionStatus};
pub use repository::{InMemoryPredictionRepository, PostgresPredictionRepository, PredictionRepository};

//! Trainer module

mod fit;
mod result;
mod step;

pub use fit::Trainer;
pub use result::FitResult;
pub use step::TrainObjective;

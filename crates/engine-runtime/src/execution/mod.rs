pub mod executor;
pub mod runner;
pub mod summary;

pub use executor::{Pipeline, execute};
pub use runner::Runner;
pub use summary::RunSummary;

pub mod batch;
pub mod error;
pub mod listener;
pub mod record;
pub mod state;

//! Tick propagation and output evaluation over the node arena.
pub mod engine;
pub mod error;
pub mod rules;

pub use engine::{Engine, TickReport};
pub use error::SimulationError;

//! Human-readable views of a circuit.
pub mod dot;
pub mod trace;

//! The node arena: columnar node storage addressed by stable `NodeId` handles.
pub mod error;
pub mod registry;
pub mod types;

pub use error::RegistrationError;
pub use registry::{Inputs, Registry};
pub use types::*;

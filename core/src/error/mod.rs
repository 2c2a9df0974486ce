#[allow(clippy::module_inception)]
pub mod error;
pub mod code;
pub mod collaborator;
pub mod graph;

pub use code::ErrorCode;
pub use collaborator::CollaboratorError;
pub use error::{CliError, RunError};
pub use graph::GraphError;

//! Run state threaded through every phase of a run.
//!
//! The run controller is the only mutator: phases read a `&RunState`
//! snapshot and hand back a [`StateDelta`] that the controller merges.

pub mod delta;
pub mod phase;
pub mod types;

pub use delta::StateDelta;
pub use phase::{Phase, PhaseTransition};
pub use types::{CallerIdentity, ConversationMessage, RunState, TaskCounts};

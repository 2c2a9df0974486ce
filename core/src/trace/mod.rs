//! Optional structured run trace: one JSON object per line describing every
//! phase transition, checker decision and execution record of a run.

pub mod events;
pub mod writer;

pub use events::{emit, TraceEvent, TraceLine};
pub use writer::{start_trace, TraceTx};

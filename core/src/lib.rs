pub mod api;
pub mod collab;
pub mod config;
pub mod error;
pub mod graph;
pub mod scheduler;
pub mod state;
pub mod trace;

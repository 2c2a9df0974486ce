//! taskpilot-cli library - modules exposed for unit tests

pub mod app;
pub mod commands;
pub mod history;
pub mod output;

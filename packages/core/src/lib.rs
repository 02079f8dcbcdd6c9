// Library root: exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod api;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod metrics;
pub mod services;
pub mod weather;

// Startup plumbing used by the binary.
pub mod cli;
pub mod config;
pub mod logging;

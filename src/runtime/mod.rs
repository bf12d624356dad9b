//! # Runtime
//!
//! Process startup: crypto provider, tracing, metrics and the HTTP server.

pub mod initialization;

pub use initialization::{init_process, initialize, initialize_with_fetcher, InitializationResult};

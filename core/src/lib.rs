//! dongol-core: chunked, dependency-ordered parallel task engine.
//!
//! Content is split into chunks ([`chunking`]), their dependency edges are
//! repaired into a DAG ([`executor::graph`]), and the chunks are executed
//! level by level on a bounded worker pool ([`executor`]). [`engine::Engine`]
//! ties these together behind a task registry.

pub mod api;
pub mod chunking;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod state;
pub mod util;

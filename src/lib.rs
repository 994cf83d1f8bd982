//! Replays a recorded endpoint corpus against a live JSON API.
//!
//! A run loads the corpus, logs in every configured role, then for each
//! endpoint resolves its URL, generates a request body, sends the request
//! and checks the status against a per-method allow-list. Identifiers of
//! created resources feed later URLs and are deleted when the run ends.

pub mod auth;
pub mod classify;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod context;
pub mod corpus;
pub mod environment;
pub mod error;
pub mod fixtures;
pub mod http;
pub mod import_export;
pub mod runner;
pub mod storage;
pub mod testing;

pub use config::RunnerConfig;
pub use corpus::{Corpus, EndpointDescriptor};
pub use error::{ReplayError, Result};
pub use runner::{RunOptions, Runner, replay};
pub use testing::RunReport;

/// Installs a test-writer subscriber once; later calls are no-ops.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

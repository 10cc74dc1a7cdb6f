//! Integration test framework for testgen
//!
//! Provides fixture-driven verification of matrix collection:
//! - JSON fixtures pairing an inventory with a module declaration
//! - Expectation checks on status, eligible providers, ids and scope
//! - Invariant checks on every collected matrix

#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

pub mod fixture;
pub mod fixture_loader;
pub mod runner;
pub mod verification_result;

pub use fixture::{Expectations, ExpectedStatus, MatrixFixture};
pub use fixture_loader::{discover_fixtures, load_fixture};
pub use runner::FixtureRunner;
pub use verification_result::VerificationResult;

use std::env;
use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests (idempotent).
/// Honors `RUST_LOG` if set, otherwise logs testgen crates at debug.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = env::var("RUST_LOG").unwrap_or_else(|_| "testgen_core=debug".to_owned());
        // Another subscriber may already be installed in this process
        if fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_test_writer()
            .try_init()
            .is_err()
        {
            tracing::debug!("tracing subscriber already installed");
        }
    });
}

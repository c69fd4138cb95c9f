//! Shared helpers for scriptd's integration tests.

pub mod builders;
pub mod events;
pub mod fake_launcher;
pub mod scripts;

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static TRACING: Once = Once::new();

/// Route `tracing` output into the test harness's captured output.
///
/// Defaults to `warn`; set `SCRIPTD_TEST_LOG=debug` (any `EnvFilter`
/// directive) and run with `--nocapture` to watch the supervisor work.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env("SCRIPTD_TEST_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

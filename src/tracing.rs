/// Initializes the `tracing` subscriber for binaries and tests that want
/// the engine's diagnostics (and [`ConsoleRecorder`] output) on stderr.
///
/// Filtering is controlled via the `RUST_LOG` environment variable, e.g.
/// `RUST_LOG=micromesh=debug`.
///
/// [`ConsoleRecorder`]: crate::recorder::ConsoleRecorder
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

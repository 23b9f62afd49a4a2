//! Shared library for the rbak remote backup tool
//!
//! Holds the configuration record, command building, pipeline execution,
//! tree rendering and cleanup guard used by the `rbak` binary.

pub mod cleanup;
pub mod cmd;
pub mod config;
pub mod errors;
pub mod escape;
pub mod ops;
pub mod pipeline;
pub mod tree;

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
}

fn init_tracing(output: &OutputConfig) {
    let level = match output.verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Set up tracing and the tokio runtime, then drive `func` to completion.
///
/// Returns `None` on failure after reporting the error as a single-line
/// diagnostic; the caller maps that to a non-zero exit code.
pub fn run<F, Fut, T>(output: &OutputConfig, func: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = errors::Result<T>>,
{
    init_tracing(output);
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("rbak: failed to start runtime: {error}");
            return None;
        }
    };
    match runtime.block_on(func()) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::error!("{error:#}");
            None
        }
    }
}

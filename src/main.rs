use editor_test_runner::cli;
use editor_test_runner::core::errors::{FrameworkError, TestsFailed};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Structured diagnostics go to stderr; console progress stays on stdout.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    match cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<TestsFailed>().is_some() => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
        Err(e) if e.downcast_ref::<FrameworkError>().is_some() => {
            eprintln!("Fatal: {:#}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

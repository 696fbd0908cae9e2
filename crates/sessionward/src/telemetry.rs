//! Tracing setup for applications.

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber and a panic hook that logs
/// through it.
///
/// The filter comes from `RUST_LOG` (default `info`). `LOG_FORMAT=json`
/// switches to JSON lines. Calling it twice is harmless: the second
/// subscriber is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    let installed = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
        return;
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

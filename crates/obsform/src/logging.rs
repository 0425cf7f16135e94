//! Tracing setup for the command line.
//!
//! Logs go to stderr so stdout stays machine-readable. `RUST_LOG` is honoured
//! unless `-v`/`-q` pick a level explicitly. With `--log-dir`, events are also
//! written to a daily rotated `obsform.log` in that directory.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::args::GlobalArgs;

/// Initialize the global subscriber.
///
/// Returns the file writer's `WorkerGuard` when file logging is on; it must
/// be kept alive until the program exits or buffered lines are lost.
pub fn init_tracing(args: &GlobalArgs) -> Option<WorkerGuard> {
    let make_filter = || match explicit_level(args) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(make_filter());

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "obsform.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(make_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default().with(stderr_layer).with(file_layer).init();

    guard
}

fn explicit_level(args: &GlobalArgs) -> Option<&'static str> {
    if args.quiet {
        return Some("off");
    }
    match args.verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

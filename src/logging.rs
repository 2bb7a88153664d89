//! Structured, append-only logging.
//!
//! Three daily-rolling JSON-lines streams under `<log_dir>/logs/`:
//! `<date>.log` (everything), `<date>.errors.log` (WARN and above), and
//! `<date>.sri.log` (SOAP request/response payload events only, emitted
//! under the `sri::wire` target). Call [`init`] once at process startup;
//! drop the returned guard only at shutdown, or log lines emitted just
//! before exit can be lost.

use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;

/// Target used for SOAP wire-level logging events (request/response
/// bodies). Kept as a constant so `submit`/`poll` and the `_sri.log`
/// filter stay in sync.
pub const WIRE_TARGET: &str = "sri_facturacion::wire";

/// Holds the non-blocking writer guards; logging stops flushing once
/// every guard in this struct is dropped.
pub struct LoggerGuard {
    _all: tracing_appender::non_blocking::WorkerGuard,
    _errors: tracing_appender::non_blocking::WorkerGuard,
    _sri: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize the global tracing subscriber with the three-stream layout.
/// Safe to call once per process; a second call returns an error from
/// `tracing`'s global-default guard and is treated as a no-op here.
pub fn init(log_dir: &str) -> Result<LoggerGuard, crate::error::Error> {
    let dir = std::path::Path::new(log_dir).join("logs");
    std::fs::create_dir_all(&dir)
        .map_err(|e| crate::error::Error::Persistence(format!("creating {dir:?}: {e}")))?;

    // `rolling::daily(dir, prefix)` joins as `{prefix}.{date}`, putting the
    // stream name before the date; `Builder::filename_suffix` joins as
    // `{date}.{suffix}` instead, so the date sorts first the way the other
    // two stores (comprobantes/, the log directory listing) expect.
    let all_appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_suffix("log")
        .build(&dir)
        .map_err(|e| crate::error::Error::Persistence(format!("building log appender: {e}")))?;
    let errors_appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_suffix("errors.log")
        .build(&dir)
        .map_err(|e| crate::error::Error::Persistence(format!("building log appender: {e}")))?;
    let sri_appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_suffix("sri.log")
        .build(&dir)
        .map_err(|e| crate::error::Error::Persistence(format!("building log appender: {e}")))?;

    let (all_writer, all_guard) = tracing_appender::non_blocking(all_appender);
    let (errors_writer, errors_guard) = tracing_appender::non_blocking(errors_appender);
    let (sri_writer, sri_guard) = tracing_appender::non_blocking(sri_appender);

    let all_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(all_writer)
        .with_filter(LevelFilter::INFO);

    let errors_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(errors_writer)
        .with_filter(LevelFilter::WARN);

    let sri_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(sri_writer)
        .with_filter(Targets::new().with_target(WIRE_TARGET, LevelFilter::TRACE));

    let subscriber = tracing_subscriber::registry()
        .with(all_layer)
        .with(errors_layer)
        .with(sri_layer);

    // Multiple calls to `init` within a test binary are common; ignore
    // the "already set" error rather than panicking.
    let _ = tracing::subscriber::set_global_default(subscriber);

    Ok(LoggerGuard {
        _all: all_guard,
        _errors: errors_guard,
        _sri: sri_guard,
    })
}

/// Emit a SOAP wire-level event to the `_sri.log` stream. `direction` is
/// `"request"` or `"response"`; `method` is the SOAP operation name.
pub fn log_wire(direction: &str, method: &str, body: &str) {
    tracing::trace!(target: WIRE_TARGET, direction, method, body, "sri wire event");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_log_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let _guard = init(dir);
        assert!(tmp.path().join("logs").is_dir());
    }
}

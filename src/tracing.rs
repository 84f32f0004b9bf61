use std::error::Error;
use std::ffi::CStr;
use std::io;

use syslog_tracing::Syslog;
use tracing_subscriber::EnvFilter;

/// Syslog identity, the same as the binary name.
const SYSLOG_IDENTITY: &[u8] = b"cplanet\0";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// With `syslog` set, events go to the system logger (facility `user`), which
/// is what cron runs want. Otherwise logs go to stderr, so `dump` can print
/// JSON on stdout.
///
/// `RUST_LOG` overrides the default `info` level. The `tracing_json` feature
/// switches stderr output to JSON lines, `tracing_noansi` turns colours off.
pub fn setup_tracing(syslog: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_log::LogTracer::init()?;

    if syslog {
        let identity = CStr::from_bytes_with_nul(SYSLOG_IDENTITY)?;
        let (options, facility) = Default::default();
        let writer = Syslog::new(identity, options, facility)
            .ok_or("the syslog connection is already open")?;
        let syslog_subs = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .with_env_filter(env_filter())
            .finish();
        tracing::subscriber::set_global_default(syslog_subs)?;
    } else if cfg!(feature = "tracing_json") {
        let json_subs = tracing_subscriber::fmt()
            .json()
            .with_writer(io::stderr)
            .with_env_filter(env_filter())
            .finish();
        tracing::subscriber::set_global_default(json_subs)?;
    } else {
        let fmt_subs = tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_ansi(!cfg!(feature = "tracing_noansi"))
            .with_env_filter(env_filter())
            .finish();
        tracing::subscriber::set_global_default(fmt_subs)?;
    }

    Ok(())
}

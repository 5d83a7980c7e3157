//! Diagnostic logging on stderr.
//!
//! Reports go to stdout; everything emitted through `tracing` goes to stderr
//! so both can be redirected separately.

use tracing_subscriber::EnvFilter;

/// Filter directive for the given `-v` count, or `-q`.
pub fn default_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "info,dirsync_core=debug,dirsync_connector_myaegee=debug,dirsync_connector_gsuite=debug,dirsync_cli=debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the flags.
pub fn init_logging(verbose: u8, quiet: bool) {
    let filter = default_filter(verbose, quiet);
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second initialization (tests) is not an error.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_layer)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .try_init();
}

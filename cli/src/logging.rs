//! Diagnostics for kbridge itself, kept apart from the tunnel output.
//!
//! The banner, prompts and retry notices go to stdout through the printer.
//! Everything emitted through `tracing` lands on stderr.

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Filter directives used when `RUST_LOG` is unset.
///
/// `--verbose` opens up debug output for kbridge's own crates only, so
/// kubectl's stdout/stderr lines and session transitions show up without
/// dependency noise.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,kbridge=debug,kbridge_core=debug"
    } else {
        "warn"
    }
}

pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr.with_max_level(Level::DEBUG))
        .with_target(verbose)
        .without_time()
        .compact()
        .init();
}

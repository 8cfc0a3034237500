//! User-facing output and diagnostic logging.
//!
//! Messages meant for the user go through [`Console`]: informational lines
//! on stdout, warnings on stderr, both muted by `--silent`. Errors are printed
//! by `main` regardless of `--silent`.
//!
//! Diagnostics use `tracing`. [`init_logging`] installs a stderr subscriber
//! whose level follows the `--debug`/`--silent` flags unless `RUST_LOG` is set.

use std::fmt::Display;

use tracing_subscriber::EnvFilter;

/// Prints user-facing messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console {
    silent: bool,
}

impl Console {
    #[must_use]
    pub fn new(silent: bool) -> Self {
        Self { silent }
    }

    pub fn info(&self, message: impl Display) {
        if !self.silent {
            println!("{message}");
        }
    }

    pub fn warning(&self, message: impl Display) {
        if !self.silent {
            eprintln!("Warning: {message}");
        }
    }
}

/// Default filter directive for the given flags.
#[must_use]
pub fn default_directive(debug: bool, silent: bool) -> &'static str {
    if debug {
        "debug"
    } else if silent {
        "error"
    } else {
        "warn"
    }
}

/// Installs the global `tracing` subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(debug: bool, silent: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug, silent)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

use std::fmt;

/// Diagnostic sink handed to each component of one invocation.
///
/// Quiet diagnostics go to `debug`, verbose ones to `info`, so a plain
/// `RUST_LOG=info` filter shows them only when the caller asked for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    verbose: bool,
}

impl Diagnostics {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn emit(&self, args: fmt::Arguments<'_>) {
        if self.verbose {
            log::info!(target: "grabghr", "{args}");
        } else {
            log::debug!(target: "grabghr", "{args}");
        }
    }
}

/// Initialize `env_logger` for the command-line front end
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    // RUST_LOG, when present, wins over the level picked here
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

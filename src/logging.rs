use tracing::Level;

/// Map `-v` occurrences to a log level.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the stderr subscriber. Stdout carries command output only.
pub fn init(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level_for(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

use shellwright_config::LogLevel;
use tracing_subscriber::EnvFilter;

/// Pick the filter directive: command line first, then `RUST_LOG`, then
/// the configured level.
pub fn resolve_directive(flag: Option<&str>, env: Option<&str>, config: LogLevel) -> String {
    flag.or(env)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(config.as_directive())
        .to_string()
}

/// Install the global subscriber. Logs go to stderr so stdout carries only
/// answers.
pub fn init(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("invalid log directive {directive:?} ({e}), using info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

use env_logger::Env;

/// Install the process-wide logger. `RUST_LOG` overrides the default `info`.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

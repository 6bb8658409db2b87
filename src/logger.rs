/// Initialize the logger. We use a custom initialization to add some
/// useful debugging information, including the module path and the line
/// number in the file.
pub fn initialize_logger() {
    use chrono::offset::Local;
    use env_logger::{Builder, Env};
    use std::io::Write;

    // Create a default environment from the environment variables, so that
    // the user chooses the log level (trace, debug, etc.) with `RUST_LOG`.
    // If the log level is not set, set it to "info".
    let env = Env::default().default_filter_or("info");

    let mut builder = Builder::from_env(env);

    // Modify the output format - we add the source location.
    builder.format(|buf, record| {
        let path = record.module_path().unwrap_or("");
        let line = match record.line() {
            Some(l) => l.to_string(),
            None => "".to_string(),
        };

        writeln!(
            buf,
            "[{} {} {}:{}] {}",
            Local::now().format("%H:%M:%S"),
            buf.default_styled_level(record.level()),
            path,
            line,
            record.args()
        )
    });

    // Tests call this more than once.
    let _ = builder.try_init();
}

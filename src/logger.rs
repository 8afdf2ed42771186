use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;

/// Initializes the global logger.
///
/// Should be called once, near the start of a host program (or once per
/// test process via `init_for_tests`). Log level is controlled by the
/// `RUST_LOG` environment variable; defaults to `info` when unset or
/// unparsable.
pub fn init() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let log_level_filter = log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    let dispatch = Dispatch::new()
        .level(log_level_filter)
        .format(|out, message, record| {
            let colors = fern::colors::ColoredLevelConfig::new()
                .error(fern::colors::Color::Red)
                .warn(fern::colors::Color::Yellow)
                .info(fern::colors::Color::Green)
                .debug(fern::colors::Color::Blue)
                .trace(fern::colors::Color::BrightBlack);

            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    // A second or third call (e.g. from several #[test] functions in the
    // same binary) is expected to fail; that's fine, the first call wins.
    let _ = dispatch.apply();
}

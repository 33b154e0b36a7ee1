//! Stderr logger for the `log` facade.

use std::io::Write;

use owo_colors::{OwoColorize, Stream};

static LOGGER: StderrLogger = StderrLogger;

/// Installs the stderr logger with `max_level`.
///
/// A logger installed earlier is left in place.
pub fn init(max_level: log::LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(max_level);
    }
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();
        let file = record.file().unwrap_or("<unknown file>");
        let line = record.line().unwrap_or(0);
        let args = record.args();

        let tag = format!("{level:<5}");

        // A closed stderr leaves nowhere to report the failure.
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{} {file}:{line}] {args}",
            styled_level(level, &tag)
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Colours `tag` by severity when stderr supports colour.
fn styled_level(level: log::Level, tag: &str) -> String {
    let stream = Stream::Stderr;
    match level {
        log::Level::Error => tag
            .if_supports_color(stream, |tag| tag.red().bold().to_string())
            .to_string(),
        log::Level::Warn => tag.if_supports_color(stream, |tag| tag.yellow()).to_string(),
        log::Level::Info => tag.if_supports_color(stream, |tag| tag.green()).to_string(),
        log::Level::Debug => tag.if_supports_color(stream, |tag| tag.blue()).to_string(),
        log::Level::Trace => tag.if_supports_color(stream, |tag| tag.cyan()).to_string(),
    }
}

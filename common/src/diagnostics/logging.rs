//! Logging support for the shading subsystem.

pub use log::{debug, error, info, trace, warn, Level, LevelFilter};

/// A simple [`log::Log`] that writes formatted records to the console.
pub struct ConsoleLogger {
  level: LevelFilter,
}

impl ConsoleLogger {
  /// Installs the [`ConsoleLogger`] as the main logger.
  pub fn install(level: LevelFilter) {
    let logger = Box::leak(Box::new(ConsoleLogger { level }));

    // ignore this; it fails setting twice during integration tests
    log::set_max_level(level);
    let _ = log::set_logger(logger);
  }
}

impl log::Log for ConsoleLogger {
  fn enabled(&self, metadata: &log::Metadata) -> bool {
    metadata.level() <= self.level
  }

  fn log(&self, record: &log::Record) {
    if !self.enabled(record.metadata()) {
      return;
    }

    let target = if !record.target().is_empty() {
      record.target()
    } else {
      record.module_path().unwrap_or_default()
    };

    eprintln!("{:<5} [{}] {}", record.level(), target, record.args());
  }

  fn flush(&self) {
    // no-op; stderr is unbuffered
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use log::Log;

  #[test]
  fn console_logger_respects_its_level_filter() {
    let logger = ConsoleLogger { level: LevelFilter::Warn };

    assert!(logger.enabled(&log::MetadataBuilder::new().level(Level::Error).build()));
    assert!(!logger.enabled(&log::MetadataBuilder::new().level(Level::Debug).build()));
  }
}

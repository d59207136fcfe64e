//! Build-scoped logging.
//!
//! The build engine never writes to stdout directly. It is handed a
//! [`Logger`] that mirrors every line to the process-wide `tracing` stream
//! and, when a [`LogHandler`] is attached, forwards the same bytes to it.
//! The build controller attaches a handler that turns writes into store
//! actions (see [`crate::engine::BuildLogActionWriter`]).

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Field attached to the one-line summary printed before every build.
pub const FIELD_NAME_BUILD_EVENT: &str = "build_event";

/// Structured fields attached to a log write.
pub type Fields = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  Debug,
  Info,
  Warn,
  Error,
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Level::Debug => write!(f, "debug"),
      Level::Info => write!(f, "info"),
      Level::Warn => write!(f, "warn"),
      Level::Error => write!(f, "error"),
    }
  }
}

#[derive(Debug, Error)]
pub enum LogError {
  #[error("log sink is closed")]
  Closed,

  #[error("log sink rejected write: {0}")]
  Rejected(String),
}

/// Destination for log writes beyond the `tracing` stream.
pub trait LogHandler: Send + Sync {
  fn write(&self, level: Level, fields: &Fields, bytes: &[u8]) -> Result<(), LogError>;
}

/// Cheaply cloneable logger handed to build code.
#[derive(Clone)]
pub struct Logger {
  handler: Option<Arc<dyn LogHandler>>,
  level: Level,
  fields: Fields,
}

impl fmt::Debug for Logger {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Logger")
      .field("has_handler", &self.handler.is_some())
      .field("level", &self.level)
      .field("fields", &self.fields)
      .finish()
  }
}

impl Default for Logger {
  fn default() -> Self {
    Self::new()
  }
}

impl Logger {
  /// A logger that only writes to `tracing`, at info level and above.
  pub fn new() -> Self {
    Self {
      handler: None,
      level: Level::Info,
      fields: Fields::new(),
    }
  }

  pub fn with_handler(mut self, handler: Arc<dyn LogHandler>) -> Self {
    self.handler = Some(handler);
    self
  }

  pub fn with_level(mut self, level: Level) -> Self {
    self.level = level;
    self
  }

  /// A copy of this logger with `fields` merged over the current ones.
  pub fn with_fields(&self, fields: Fields) -> Self {
    let mut logger = self.clone();
    logger.fields.extend(fields);
    logger
  }

  pub fn level(&self) -> Level {
    self.level
  }

  pub fn fields(&self) -> &Fields {
    &self.fields
  }

  pub fn debug(&self, msg: impl fmt::Display) {
    self.emit(Level::Debug, msg.to_string());
  }

  pub fn info(&self, msg: impl fmt::Display) {
    self.emit(Level::Info, msg.to_string());
  }

  pub fn warn(&self, msg: impl fmt::Display) {
    self.emit(Level::Warn, msg.to_string());
  }

  pub fn error(&self, msg: impl fmt::Display) {
    self.emit(Level::Error, msg.to_string());
  }

  /// Write raw bytes, e.g. streamed process output. No newline is added.
  pub fn write(&self, level: Level, bytes: &[u8]) {
    if level < self.level {
      return;
    }
    let text = String::from_utf8_lossy(bytes);
    self.trace(level, text.trim_end());
    self.forward(level, bytes);
  }

  /// An [`io::Write`] adapter that logs everything written at `level`.
  pub fn writer(&self, level: Level) -> LogWriter {
    LogWriter {
      logger: self.clone(),
      level,
    }
  }

  fn emit(&self, level: Level, mut msg: String) {
    if level < self.level {
      return;
    }
    self.trace(level, &msg);
    if !msg.ends_with('\n') {
      msg.push('\n');
    }
    self.forward(level, msg.as_bytes());
  }

  fn trace(&self, level: Level, msg: &str) {
    let fields = &self.fields;
    match level {
      Level::Debug => debug!(?fields, "{}", msg),
      Level::Info => info!(?fields, "{}", msg),
      Level::Warn => warn!(?fields, "{}", msg),
      Level::Error => error!(?fields, "{}", msg),
    }
  }

  fn forward(&self, level: Level, bytes: &[u8]) {
    if let Some(handler) = &self.handler
      && let Err(e) = handler.write(level, &self.fields, bytes)
    {
      debug!(error = %e, "log handler rejected write");
    }
  }
}

/// See [`Logger::writer`].
pub struct LogWriter {
  logger: Logger,
  level: Level,
}

impl io::Write for LogWriter {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.logger.write(self.level, buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

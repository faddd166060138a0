//! Error taxonomy and diagnostic policy for the shading compiler and VM.

use std::fmt;

/// Stable error codes, mirroring the renderer's exit-code-equivalent taxonomy.
///
/// There is deliberately no `NONE` variant: the absence of an error is
/// represented by the absence of a [`RenderError`], not by a sentinel code.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorCode {
  OpeningFileFailed,
  ReadingFileFailed,
  UndefinedSymbol,
  SyntaxError,
  ParsingFailed,
  SemanticError,
  SemanticAnalysisFailed,
  CodeGenerationError,
  CodeGenerationFailed,
  OutOfMemory,
  UnknownColorSpace,
  InvalidDisplayMode,
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ErrorCode::OpeningFileFailed => "OPENING_FILE_FAILED",
      ErrorCode::ReadingFileFailed => "READING_FILE_FAILED",
      ErrorCode::UndefinedSymbol => "UNDEFINED_SYMBOL",
      ErrorCode::SyntaxError => "SYNTAX_ERROR",
      ErrorCode::ParsingFailed => "PARSING_FAILED",
      ErrorCode::SemanticError => "SEMANTIC_ERROR",
      ErrorCode::SemanticAnalysisFailed => "SEMANTIC_ANALYSIS_FAILED",
      ErrorCode::CodeGenerationError => "CODE_GENERATION_ERROR",
      ErrorCode::CodeGenerationFailed => "CODE_GENERATION_FAILED",
      ErrorCode::OutOfMemory => "OUT_OF_MEMORY",
      ErrorCode::UnknownColorSpace => "UNKNOWN_COLOR_SPACE",
      ErrorCode::InvalidDisplayMode => "INVALID_DISPLAY_MODE",
    };
    f.write_str(name)
  }
}

/// An optional position in SL source, attached to diagnostics that can point at one.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SourcePosition {
  pub line: u32,
  pub column: u32,
}

impl SourcePosition {
  pub fn new(line: u32, column: u32) -> Self {
    Self { line, column }
  }
}

impl fmt::Display for SourcePosition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

/// A single diagnostic, as reported to an [`ErrorPolicy`].
#[derive(Clone, Debug)]
pub struct RenderError {
  pub code: ErrorCode,
  pub message: String,
  pub position: Option<SourcePosition>,
}

impl RenderError {
  pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
    Self { code, message: message.into(), position: None }
  }

  pub fn at(code: ErrorCode, position: SourcePosition, message: impl Into<String>) -> Self {
    Self { code, message: message.into(), position: Some(position) }
  }
}

impl fmt::Display for RenderError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.position {
      Some(position) => write!(f, "{} at {}: {}", self.code, position, self.message),
      None => write!(f, "{}: {}", self.code, self.message),
    }
  }
}

impl std::error::Error for RenderError {}

/// Receives diagnostics raised while compiling or running a shader.
///
/// Implementations decide whether to print, collect, or escalate; the compiler
/// and VM only ever call [`ErrorPolicy::render_error`] and consult the running
/// counters before crossing a phase boundary.
pub trait ErrorPolicy {
  /// Reports a single diagnostic. Implementations must increment their own counters.
  fn render_error(&mut self, error: RenderError);

  /// The number of errors reported since the last [`ErrorPolicy::clear`].
  fn errors(&self) -> usize;

  /// The number of errors reported since construction, irrespective of [`ErrorPolicy::clear`].
  fn total_errors(&self) -> usize;

  /// Resets the since-last-clear counter. Lifetime counters are unaffected.
  fn clear(&mut self);
}

/// The default [`ErrorPolicy`]: accumulates diagnostics in memory and logs each
/// one at `warn` (runtime-class) or `error` (diagnostic-class) level.
#[derive(Default)]
pub struct CollectingErrorPolicy {
  diagnostics: Vec<RenderError>,
  errors_since_clear: usize,
  total_errors: usize,
}

impl CollectingErrorPolicy {
  pub fn new() -> Self {
    Self::default()
  }

  /// All diagnostics reported since the last [`ErrorPolicy::clear`].
  pub fn diagnostics(&self) -> &[RenderError] {
    &self.diagnostics
  }
}

impl ErrorPolicy for CollectingErrorPolicy {
  fn render_error(&mut self, error: RenderError) {
    match error.code {
      ErrorCode::UnknownColorSpace | ErrorCode::InvalidDisplayMode => log::warn!("{error}"),
      _ => log::error!("{error}"),
    }
    self.errors_since_clear += 1;
    self.total_errors += 1;
    self.diagnostics.push(error);
  }

  fn errors(&self) -> usize {
    self.errors_since_clear
  }

  fn total_errors(&self) -> usize {
    self.total_errors
  }

  fn clear(&mut self) {
    self.errors_since_clear = 0;
    self.diagnostics.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn collecting_policy_tracks_both_counters() {
    let mut policy = CollectingErrorPolicy::new();
    policy.render_error(RenderError::new(ErrorCode::SyntaxError, "unexpected token"));
    policy.render_error(RenderError::new(ErrorCode::SyntaxError, "unexpected token"));
    assert_eq!(policy.errors(), 2);
    assert_eq!(policy.total_errors(), 2);

    policy.clear();
    assert_eq!(policy.errors(), 0);
    assert_eq!(policy.total_errors(), 2);
  }

  #[test]
  fn render_error_displays_position_when_present() {
    let error = RenderError::at(ErrorCode::UndefinedSymbol, SourcePosition::new(3, 7), "`foo` is undefined");
    assert_eq!(error.to_string(), "UNDEFINED_SYMBOL at 3:7: `foo` is undefined");
  }
}

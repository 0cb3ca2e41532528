//! Structured errors raised by the bridge and by the engine around it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use crate::{BoxError, FileSpan};

/// The severity of a reported issue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorLevel {
  /// Informational output
  Info,
  /// A warning; does not stop execution
  Warning,
  /// An error; aborts the current call once reported
  Error,
}

/// The error classes this crate raises, plus room for engine-defined codes
/// passed through from primitives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
  /// A metaprogram ran to a failure.
  UserTacticFailure,
  /// Reduction of a metaprogram stopped before reaching a result.
  TacticGotStuck,
  /// A metaprogram succeeded but left a placeholder unresolved or unchecked.
  UninstantiatedUVarInTactic,
  /// The metaprogram does not have the expected type, or its typing guard is not trivial.
  IllTypedTactic,
  /// Aggregate error raised after issues have been reported.
  Stop,
  /// An engine invariant does not hold. Never caused by a well-formed metaprogram.
  InternalError,
  /// An error code owned by the engine.
  Other(u32),
}

/// A native payload carried by an error that this crate does not interpret.
#[derive(Clone)]
pub struct Payload(pub Arc<dyn Any + Send + Sync>);

impl Payload {
  /// Wrap a native value.
  pub fn new<T: Any + Send + Sync>(t: T) -> Self { Payload(Arc::new(t)) }

  /// Get the payload if it has type `T`.
  #[must_use]
  pub fn downcast_ref<T: Any>(&self) -> Option<&T> { self.0.downcast_ref() }
}

impl fmt::Debug for Payload {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "<opaque>") }
}

/// The content of a [`TacError`].
#[derive(Clone, Debug)]
pub enum ErrorKind {
  /// A message, as a list of paragraphs, with context lines describing
  /// what the engine was doing at the time.
  Msg {
    /// The message paragraphs.
    msg: Vec<String>,
    /// Context lines, outermost first.
    ctx: Vec<String>,
  },
  /// A foreign payload, propagated without interpretation.
  Opaque(Payload),
  /// The issues which caused an aggregate [`ErrorCode::Stop`].
  Stop(Vec<TacError>),
}

/// An error, with an optional position, severity and code.
#[derive(Clone, Debug)]
pub struct TacError {
  /// Where the error is reported.
  pub pos: Option<FileSpan>,
  /// How severe it is.
  pub level: ErrorLevel,
  /// What class of error it is.
  pub code: ErrorCode,
  /// The content.
  pub kind: ErrorKind,
}

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, TacError>;

impl TacError {
  /// Construct an error from message paragraphs.
  pub fn new(pos: Option<FileSpan>, code: ErrorCode, msg: Vec<String>) -> TacError {
    TacError { pos, level: ErrorLevel::Error, code, kind: ErrorKind::Msg { msg, ctx: vec![] } }
  }

  /// Construct an error from a single message.
  pub fn new_e(pos: Option<FileSpan>, code: ErrorCode, e: impl Into<BoxError>) -> TacError {
    TacError::new(pos, code, vec![e.into().to_string()])
  }

  /// Construct a warning.
  pub fn warn(pos: Option<FileSpan>, code: ErrorCode, msg: Vec<String>) -> TacError {
    TacError { level: ErrorLevel::Warning, ..TacError::new(pos, code, msg) }
  }

  /// Construct an informational message.
  pub fn info(pos: Option<FileSpan>, code: ErrorCode, msg: Vec<String>) -> TacError {
    TacError { level: ErrorLevel::Info, ..TacError::new(pos, code, msg) }
  }

  /// An engine invariant violation.
  pub fn internal(pos: Option<FileSpan>, e: impl Into<BoxError>) -> TacError {
    TacError::new_e(pos, ErrorCode::InternalError, e)
  }

  /// Wrap a foreign payload.
  #[must_use]
  pub fn opaque(p: Payload) -> TacError {
    TacError { pos: None, level: ErrorLevel::Error, code: ErrorCode::InternalError, kind: ErrorKind::Opaque(p) }
  }

  /// The aggregate error raised once `issues` have been reported.
  #[must_use]
  pub fn stop(issues: Vec<TacError>) -> TacError {
    let pos = issues.iter().find_map(|e| e.pos.clone());
    TacError { pos, level: ErrorLevel::Error, code: ErrorCode::Stop, kind: ErrorKind::Stop(issues) }
  }

  /// Add a context line to the error.
  #[must_use]
  pub fn with_ctx(mut self, ctx: impl Into<String>) -> TacError {
    if let ErrorKind::Msg { ctx: c, .. } = &mut self.kind { c.push(ctx.into()) }
    self
  }

  /// Prepend a paragraph to the message, keeping the code, context and position.
  #[must_use]
  pub fn prepend(mut self, s: impl Into<String>) -> TacError {
    if let ErrorKind::Msg { msg, .. } = &mut self.kind { msg.insert(0, s.into()) }
    self
  }

  /// The message paragraphs (empty for opaque errors).
  #[must_use]
  pub fn msg(&self) -> &[String] {
    match &self.kind {
      ErrorKind::Msg { msg, .. } => msg,
      _ => &[],
    }
  }

  /// The foreign payload, if this is an opaque error.
  #[must_use]
  pub fn payload(&self) -> Option<&Payload> {
    if let ErrorKind::Opaque(p) = &self.kind {Some(p)} else {None}
  }

  /// The issues of an aggregate error.
  #[must_use]
  pub fn issues(&self) -> &[TacError] {
    if let ErrorKind::Stop(es) = &self.kind {es} else {&[]}
  }
}

impl fmt::Display for TacError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(pos) = &self.pos { write!(f, "{pos}: ")? }
    match &self.kind {
      ErrorKind::Msg { msg, ctx } => {
        write!(f, "{}", msg.join("\n"))?;
        for c in ctx { write!(f, "\n  (in {c})")? }
        Ok(())
      }
      ErrorKind::Opaque(p) => write!(f, "uncaught native exception {p:?}"),
      ErrorKind::Stop(es) => {
        write!(f, "{} error(s) reported", es.len())?;
        for e in es { write!(f, "\n{e}")? }
        Ok(())
      }
    }
  }
}

impl std::error::Error for TacError {}

//! The outcome of running a metaprogram, and a small native tactic monad.

use std::fmt;
use crate::error::{Payload, Result};
use crate::{ArcString, ProofState, TacError, Term};

/// Why a metaprogram failed.
#[derive(Clone, Debug)]
pub enum Failure {
  /// A structured engine error raised inside the metaprogram.
  Engine(TacError),
  /// An explicit failure with a message.
  TacticFailure(ArcString),
  /// An object level exception value.
  Exn(Term),
  /// A foreign payload which must be re-raised unchanged.
  Opaque(Payload),
}

impl fmt::Display for Failure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Failure::Engine(e) => write!(f, "{e}"),
      Failure::TacticFailure(msg) => write!(f, "{msg}"),
      Failure::Exn(t) => write!(f, "{t}"),
      Failure::Opaque(p) => write!(f, "{p:?}"),
    }
  }
}

/// The result of a metaprogram. The final proof state is always present.
#[derive(Clone, Debug)]
pub enum TacResult<T> {
  /// Finished with a value.
  Success(T, ProofState),
  /// Finished with a failure.
  Failed(Failure, ProofState),
}

impl<T> TacResult<T> {
  /// A failure with a message.
  pub fn fail(msg: impl Into<ArcString>, ps: ProofState) -> Self {
    TacResult::Failed(Failure::TacticFailure(msg.into()), ps)
  }

  /// Returns true on `Success`.
  pub fn is_success(&self) -> bool { matches!(self, TacResult::Success(..)) }

  /// The final proof state.
  pub fn state(&self) -> &ProofState {
    match self { TacResult::Success(_, ps) | TacResult::Failed(_, ps) => ps }
  }

  /// Take the final proof state.
  pub fn into_state(self) -> ProofState {
    match self { TacResult::Success(_, ps) | TacResult::Failed(_, ps) => ps }
  }

  /// Get the value, if successful.
  pub fn ok(self) -> Option<T> {
    if let TacResult::Success(v, _) = self {Some(v)} else {None}
  }

  /// Transform the value of a success.
  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TacResult<U> {
    match self {
      TacResult::Success(v, ps) => TacResult::Success(f(v), ps),
      TacResult::Failed(e, ps) => TacResult::Failed(e, ps),
    }
  }
}

/// A native tactic: a state transformer that may fail. This is a convenience
/// for writing primitive steps; it is not used by the bridge itself.
pub struct Tac<R>(Box<dyn FnOnce(ProofState) -> Result<TacResult<R>>>);

impl<R> fmt::Debug for Tac<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "<tactic>") }
}

impl<R: 'static> Tac<R> {
  /// Build a tactic from a state transformer.
  pub fn new(f: impl FnOnce(ProofState) -> Result<TacResult<R>> + 'static) -> Self { Tac(Box::new(f)) }

  /// Succeed with `r` without touching the state.
  pub fn ret(r: R) -> Self { Tac::new(move |ps| Ok(TacResult::Success(r, ps))) }

  /// Fail with a message.
  pub fn fail(msg: impl Into<ArcString>) -> Self {
    let msg = msg.into();
    Tac::new(move |ps| Ok(TacResult::fail(msg, ps)))
  }

  /// Run `self`, then `f` on its value. Failures short circuit.
  pub fn and_then<S: 'static>(self, f: impl FnOnce(R) -> Tac<S> + 'static) -> Tac<S> {
    Tac::new(move |ps| match (self.0)(ps)? {
      TacResult::Success(r, ps) => (f(r).0)(ps),
      TacResult::Failed(e, ps) => Ok(TacResult::Failed(e, ps)),
    })
  }

  /// Run the tactic on a state.
  pub fn run(self, ps: ProofState) -> Result<TacResult<R>> { (self.0)(ps) }
}

impl Tac<ProofState> {
  /// Read a copy of the current state.
  #[must_use]
  pub fn get() -> Self { Tac::new(|ps| Ok(TacResult::Success(ps.clone(), ps))) }
}

impl Tac<()> {
  /// Replace the current state.
  #[must_use]
  pub fn set(ps: ProofState) -> Self { Tac::new(move |_| Ok(TacResult::Success((), ps))) }
}

//! The interface to the type checker. The bridge never checks terms itself.

use crate::error::Result;
use crate::state::Implicit;
use crate::{Env, ProofState, Term};

/// A logical side condition produced by type checking.
#[derive(Clone, Debug, PartialEq)]
pub enum Guard {
  /// No condition.
  Trivial,
  /// A proposition that must still be proved.
  NonTrivial(Term),
}

/// The outcome of re-resolving an implicit after a metaprogram has run.
#[derive(Clone, Debug, PartialEq)]
pub enum ImplicitTag {
  /// The placeholder has no solution.
  Unresolved,
  /// Checking the solution was deferred on a universe constraint.
  DefersUnivConstraint,
  /// The placeholder was solved by `solution : ty`, but checking it left a
  /// non-trivial guard.
  HasTypingGuard(Term, Term),
}

/// The type checker, as seen by the bridge.
pub trait TypeChecker: Send + Sync {
  /// Check `tac` against the type of metaprograms from `arg_ty` to `res_ty`,
  /// returning the elaborated term, its type and a guard.
  fn tc_tactic(&self, env: &Env, arg_ty: &Term, res_ty: &Term, tac: &Term) -> Result<(Term, Term, Guard)>;

  /// Fail unless the guard is trivial (possibly after simplification).
  fn force_trivial_guard(&self, env: &Env, g: Guard) -> Result<()>;

  /// Unify two terms without deferring to a solver, assigning placeholders
  /// in `ps`. Returns false if they do not unify.
  fn teq_nosmt_force(&self, env: &Env, ps: &mut ProofState, t1: &Term, t2: &Term) -> bool;

  /// Try again to resolve and check the given implicits, returning those
  /// that still have a problem.
  fn resolve_implicits_tac(&self, env: &Env, ps: &mut ProofState, imps: &[Implicit])
    -> Vec<(Implicit, ImplicitTag)>;
}

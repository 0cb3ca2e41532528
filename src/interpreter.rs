//! The entry point: running a metaprogram on a proof state on behalf of
//! the type checker, and reconciling its outcome with the caller.

use std::fmt;
use std::sync::Arc;
use crate::codec::Codec;
use crate::diag;
use crate::error::{ErrorCode, Result};
use crate::profile::profile;
use crate::result::{Failure, TacResult};
use crate::state::Implicit;
use crate::typeck::TypeChecker;
use crate::{Driver, FileSpan, Goal, ProofState, TacError, Term};

/// Runs metaprograms. Cloning is cheap, so a primitive step can hold an
/// interpreter and run metaprograms recursively.
#[derive(Clone)]
pub struct Interpreter {
  /// The type checker of the host.
  pub tc: Arc<dyn TypeChecker>,
  /// How metaprograms are executed.
  pub driver: Driver,
}

impl fmt::Debug for Interpreter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Interpreter").field("driver", &self.driver).finish_non_exhaustive()
  }
}

impl Interpreter {
  /// Build an interpreter.
  pub fn new(tc: Arc<dyn TypeChecker>, driver: Driver) -> Self { Interpreter { tc, driver } }

  /// Run `tactic : A -> Tac R` on `arg` and `ps`.
  ///
  /// `rng_call` is where the metaprogram was invoked and `rng_goal` where
  /// the goal it works on comes from. `background` metaprograms report
  /// failures at their first remaining goal, deferred goals included (or
  /// `rng_call` if none remain), others at the entry range of the final
  /// state. Unless `already_typed`, the metaprogram is type checked first,
  /// and must produce a trivial guard.
  ///
  /// On success, returns the goals left over (active goals, then deferred
  /// ones) and the value. Irrelevant leftover goals are solved with `()`,
  /// and every other implicit of the final state must resolve.
  #[allow(clippy::too_many_arguments)]
  pub fn run_tactic_on_ps<A: 'static, R: 'static>(&self,
    rng_call: &FileSpan, rng_goal: &FileSpan, background: bool,
    arg: A, ea: &Codec<A>, er: &Codec<R>, tactic: &Term, already_typed: bool, ps: ProofState,
  ) -> Result<(Vec<Goal>, R)> {
    let module = ps.main_context.module.clone();
    profile(Some(&module), "tacrun::interpreter::run_tactic_on_ps", ||
      self.run_on_ps(rng_call, rng_goal, background, arg, ea, er, tactic, already_typed, ps))
  }

  #[allow(clippy::too_many_arguments)]
  fn run_on_ps<A: 'static, R: 'static>(&self,
    rng_call: &FileSpan, rng_goal: &FileSpan, background: bool,
    arg: A, ea: &Codec<A>, er: &Codec<R>, tactic: &Term, already_typed: bool, mut ps: ProofState,
  ) -> Result<(Vec<Goal>, R)> {
    ps.main_context.range = rng_goal.clone();
    ps.main_context.in_tactic = true;
    ps.main_context.enable_defer_to_tac = false;
    let env = ps.main_context.clone();

    if !already_typed {
      let (_, _, guard) = self.tc.tc_tactic(&env, ea.ty(), er.ty(), tactic)?;
      self.tc.force_trivial_guard(&env, guard)?;
    }

    if crate::tac_debug() {
      debug!("Running metaprogram with goal location {rng_goal}\n{}", ps.dump("Initial state"))
    }
    let tau = self.driver.unembed_tactic_1(ea.clone(), er.clone(), tactic.clone());
    let res = profile(Some(&env.module), "tacrun::interpreter::run_safe", || tau(arg, ps))?;

    match res {
      TacResult::Success(v, mut ps) => {
        if !ps.well_formed() {
          return Err(TacError::internal(Some(rng_goal.clone()),
            "metaprogram returned a goal whose witness is not an implicit of its state"))
        }
        if crate::tac_debug() { debug!("{}", ps.dump("Metaprogram succeeded")) }
        let remaining: Vec<Goal> = ps.goals.iter().chain(&ps.smt_goals).cloned().collect();
        for g in &remaining {
          if g.irrelevant && !self.tc.teq_nosmt_force(&g.env, &mut ps, &Term::uvar(g.witness), &Term::unit()) {
            return Err(TacError::internal(Some(ps.goal_range(g)),
              format!("irrelevant goal {} could not be solved with ()", g.witness)))
          }
          ps.mark_checked(g.witness);
        }
        let imps: Vec<Implicit> = ps.all_implicits.iter()
          .filter(|i| !remaining.iter().any(|g| g.witness == i.uvar))
          .cloned().collect();
        let tagged = self.tc.resolve_implicits_tac(&env, &mut ps, &imps);
        diag::report_implicits(rng_goal, &ps, &tagged)?;
        Ok((remaining, v))
      }
      TacResult::Failed(e, ps) => {
        if crate::tac_debug() { debug!("{}", ps.dump("Metaprogram failed")) }
        let pos = if background {
          ps.goals.iter().chain(&ps.smt_goals).next().map_or_else(|| rng_call.clone(), |g| ps.goal_range(g))
        } else {
          ps.entry_range.clone()
        };
        Err(match e {
          Failure::Engine(e) => e.prepend("Tactic failed"),
          Failure::TacticFailure(msg) =>
            TacError::new(Some(pos), ErrorCode::UserTacticFailure, vec!["Tactic failed".into(), msg.to_string()]),
          Failure::Exn(t) =>
            TacError::new(Some(pos), ErrorCode::UserTacticFailure, vec!["Tactic failed".into(), format!("Uncaught exception: {t}")]),
          Failure::Opaque(p) => TacError::opaque(p),
        })
      }
    }
  }
}

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};
use tacrun::codec::{self, lid};
use tacrun::state::Implicit;
use tacrun::term::{Branch, Pattern};
use tacrun::typeck::{Guard, ImplicitTag};
use tacrun::*;

pub fn init_logging() {
  static INIT: Once = Once::new();
  INIT.call_once(|| {
    let _ = simplelog::TestLogger::init(simplelog::LevelFilter::Debug, simplelog::Config::default());
  })
}

pub fn fsp(start: usize, end: usize) -> FileSpan { FileSpan::new("test.fst".into(), start..end) }

/// A type checker that accepts everything, solves placeholders by
/// assignment, and reports every unsolved implicit with `tag`.
#[derive(Default)]
pub struct TestChecker {
  /// Every metaprogram that was type checked.
  pub checked: Mutex<Vec<Term>>,
  /// Every unification problem, in order.
  pub unified: Mutex<Vec<(Term, Term)>>,
  /// The guard produced by `tc_tactic`.
  pub guard: Option<Term>,
  /// The problem reported for unsolved implicits, `Unresolved` if unset.
  pub tag: Option<ImplicitTag>,
}

impl TypeChecker for TestChecker {
  fn tc_tactic(&self, _: &Env, arg_ty: &Term, res_ty: &Term, tac: &Term) -> Result<(Term, Term, Guard)> {
    self.checked.lock().unwrap().push(tac.clone());
    let guard = self.guard.clone().map_or(Guard::Trivial, Guard::NonTrivial);
    Ok((tac.clone(), codec::tactic_type(arg_ty, res_ty), guard))
  }

  fn force_trivial_guard(&self, env: &Env, g: Guard) -> Result<()> {
    match g {
      Guard::Trivial => Ok(()),
      Guard::NonTrivial(t) => Err(TacError::new(Some(env.range.clone()), ErrorCode::IllTypedTactic,
        vec![format!("guard {t} is not trivial")])),
    }
  }

  fn teq_nosmt_force(&self, _: &Env, ps: &mut ProofState, t1: &Term, t2: &Term) -> bool {
    self.unified.lock().unwrap().push((t1.clone(), t2.clone()));
    match &**t1 {
      TermKind::UVar(u) => ps.solve(*u, t2.clone()),
      _ => t1 == t2,
    }
  }

  fn resolve_implicits_tac(&self, _: &Env, ps: &mut ProofState, imps: &[Implicit]) -> Vec<(Implicit, ImplicitTag)> {
    imps.iter().filter(|i| ps.solution(i.uvar).is_none())
      .map(|i| (i.clone(), self.tag.clone().unwrap_or(ImplicitTag::Unresolved))).collect()
  }
}

pub const BACKENDS: [Backend; 2] = [Backend::Rewrite, Backend::Compiled];

pub fn driver(backend: Backend, native: Vec<PrimitiveStep>) -> Driver {
  let native: Vec<Arc<PrimitiveStep>> = native.into_iter().map(Arc::new).collect();
  Driver::new(backend).with_native(native)
}

pub fn interpreter(driver: Driver) -> Interpreter {
  init_logging();
  Interpreter::new(Arc::new(TestChecker::default()), driver)
}

/// A proof state for module `Test`, entered at `0..10`, in which `Tac.bind`
/// is defined.
pub fn ps() -> ProofState {
  let mut env = Env::new("Test");
  env.define("Tac.bind", Some(bind()), false);
  ProofState::new(env, fsp(0, 10))
}

/// `fun x ps => Success x ps`
pub fn ret() -> Term { Term::abs(2, Term::ctor(lid::SUCCESS).app([Term::bvar(1), Term::bvar(0)])) }

/// `fun _ ps => Failed (TacticFailure msg) ps`
pub fn fail(msg: &str) -> Term {
  let exn = Term::ctor(lid::TACTIC_FAILURE).app([Term::string(msg)]);
  Term::abs(2, Term::ctor(lid::FAILED).app([exn, Term::bvar(0)]))
}

/// `fun m k ps => match m ps with Success v ps' => k v ps' | Failed e ps' => Failed e ps'`
pub fn bind() -> Term {
  Term::abs(3, Term::matches(Term::bvar(2).app([Term::bvar(0)]), [
    Branch { pat: Pattern::Ctor(lid::SUCCESS.into(), 2), body: Term::bvar(3).app([Term::bvar(1), Term::bvar(0)]) },
    Branch { pat: Pattern::Ctor(lid::FAILED.into(), 2), body: Term::ctor(lid::FAILED).app([Term::bvar(1), Term::bvar(0)]) },
  ]))
}

/// `fun _ ps => name ps`, running a primitive that takes only the state.
pub fn call0(name: &str) -> Term { Term::abs(2, Term::konst(name).app([Term::bvar(0)])) }

/// `fun x ps => name x ps`
pub fn call1(name: &str) -> Term { Term::abs(2, Term::konst(name).app([Term::bvar(1), Term::bvar(0)])) }

mod common;

use std::sync::Arc;
use common::*;
use num::BigInt;
use tacrun::codec::{self, lid};
use tacrun::error::Payload;
use tacrun::typeck::ImplicitTag;
use tacrun::*;

fn run<R: 'static>(backend: Backend, natives: Vec<PrimitiveStep>, background: bool,
  er: &Codec<R>, tactic: &Term, ps: ProofState,
) -> Result<(Vec<Goal>, R)> {
  let i = interpreter(driver(backend, natives));
  i.run_tactic_on_ps(&fsp(20, 30), &fsp(40, 50), background,
    BigInt::from(5), &codec::int(), er, tactic, true, ps)
}

#[test]
fn identity_keeps_goals() {
  for backend in BACKENDS {
    let mut ps = ps();
    let mut env = ps.main_context.clone();
    env.range = fsp(60, 70);
    let w = ps.new_goal(env, Term::konst("T"), "main", false);
    let (goals, v) = run(backend, vec![], false, &codec::int(), &ret(), ps).expect("succeeds");
    assert_eq!(v, BigInt::from(5));
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].witness, w);
    assert_eq!(goals[0].label, "main");
  }
}

#[test]
fn failure_in_foreground_is_at_entry() {
  for backend in BACKENDS {
    let e = run(backend, vec![], false, &codec::int(), &fail("boom"), ps()).expect_err("fails");
    assert_eq!(e.code, ErrorCode::UserTacticFailure);
    assert_eq!(e.msg(), ["Tactic failed", "boom"]);
    assert_eq!(e.pos, Some(fsp(0, 10)));
  }
}

#[test]
fn failure_in_background_is_at_goal_or_call() {
  for backend in BACKENDS {
    let e = run(backend, vec![], true, &codec::int(), &fail("boom"), ps()).expect_err("fails");
    assert_eq!(e.code, ErrorCode::UserTacticFailure);
    assert_eq!(e.pos, Some(fsp(20, 30)));

    let mut ps = ps();
    let mut env = ps.main_context.clone();
    env.range = fsp(60, 70);
    ps.new_goal(env, Term::konst("T"), "main", false);
    let e = run(backend, vec![], true, &codec::int(), &fail("boom"), ps).expect_err("fails");
    assert!(e.msg().iter().any(|m| m == "boom"));
    assert_eq!(e.pos, Some(fsp(60, 70)));
  }
}

#[test]
fn uncaught_exception() {
  for backend in BACKENDS {
    let tac = Term::abs(2, Term::ctor(lid::FAILED).app([Term::ctor("Test.MyExn"), Term::bvar(0)]));
    let e = run(backend, vec![], false, &codec::int(), &tac, ps()).expect_err("fails");
    assert_eq!(e.code, ErrorCode::UserTacticFailure);
    assert_eq!(e.msg(), ["Tactic failed", "Uncaught exception: Test.MyExn"]);
  }
}

#[test]
fn stuck_constructor_application() {
  for backend in BACKENDS {
    let tac = Term::abs(2, Term::ctor(lid::SOME).app([Term::bvar(1)]));
    let e = run(backend, vec![], false, &codec::int(), &tac, ps()).expect_err("stuck");
    assert_eq!(e.code, ErrorCode::TacticGotStuck);
    assert_eq!(e.msg(), ["Tactic got stuck!", "Reduction stopped at: (Prims.Some 5)"]);
    assert_eq!(e.pos, Some(fsp(40, 50)));
  }
}

#[test]
fn unresolved_placeholder() {
  let hole = || PrimitiveStep::tac0("test.hole", codec::unit(), |mut ps| {
    ps.new_uvar(Term::konst("T"), "made up", fsp(1, 2));
    Ok(TacResult::Success((), ps))
  });
  for backend in BACKENDS {
    let e = run(backend, vec![hole()], false, &codec::unit(), &call0("test.hole"), ps()).expect_err("unresolved");
    assert_eq!(e.code, ErrorCode::Stop);
    let [issue] = e.issues() else { panic!("expected one issue, got {e}") };
    assert_eq!(issue.code, ErrorCode::UninstantiatedUVarInTactic);
    assert_eq!(issue.pos, Some(fsp(40, 50)));
    assert_eq!(issue.msg()[0], "Tactic left uninstantiated unification variable ?0");
    assert_eq!(issue.msg()[1], "Type: T");
  }
}

#[test]
fn irrelevant_goals_are_solved_with_unit() {
  for backend in BACKENDS {
    let mut ps = ps();
    let env = ps.main_context.clone();
    let w1 = ps.new_goal(env.clone(), Term::konst("squash T"), "", true);
    ps.new_goal(env, Term::konst("T"), "", false);
    let tc = Arc::new(TestChecker::default());
    let i = Interpreter::new(tc.clone(), driver(backend, vec![]));
    let (goals, _) = i.run_tactic_on_ps(&fsp(20, 30), &fsp(40, 50), false,
      BigInt::from(0), &codec::int(), &codec::int(), &ret(), true, ps).expect("succeeds");
    assert_eq!(goals.len(), 2);
    assert_eq!(*tc.unified.lock().unwrap(), [(Term::uvar(w1), Term::unit())]);
  }
}

#[test]
fn guard_is_checked_before_running() {
  for backend in BACKENDS {
    let tc = Arc::new(TestChecker { guard: Some(Term::konst("False")), ..TestChecker::default() });
    let i = Interpreter::new(tc.clone(), driver(backend, vec![]));
    let e = i.run_tactic_on_ps(&fsp(20, 30), &fsp(40, 50), false,
      BigInt::from(0), &codec::int(), &codec::int(), &fail("boom"), false, ps()).expect_err("ill typed");
    assert_eq!(e.code, ErrorCode::IllTypedTactic);
    assert_eq!(tc.checked.lock().unwrap().len(), 1);

    let tc = Arc::new(TestChecker::default());
    let i = Interpreter::new(tc.clone(), driver(backend, vec![]));
    i.run_tactic_on_ps(&fsp(20, 30), &fsp(40, 50), false,
      BigInt::from(0), &codec::int(), &codec::int(), &ret(), false, ps()).expect("succeeds");
    assert_eq!(*tc.checked.lock().unwrap(), [ret()]);
  }
}

#[test]
fn engine_errors_are_reraised() {
  let kaput = || PrimitiveStep::tac0("test.kaput", codec::unit(), |_| {
    Err(TacError::new(Some(fsp(3, 4)), ErrorCode::Other(42), vec!["kaput".into()]))
  });
  for backend in BACKENDS {
    let e = run(backend, vec![kaput()], false, &codec::unit(), &call0("test.kaput"), ps()).expect_err("fails");
    assert_eq!(e.code, ErrorCode::Other(42));
    assert_eq!(e.msg(), ["Tactic failed", "kaput"]);
    assert_eq!(e.pos, Some(fsp(3, 4)));
  }
}

#[test]
fn opaque_errors_pass_through() {
  let raise = || PrimitiveStep::tac0("test.raise", codec::unit(), |_| {
    Err(TacError::opaque(Payload::new(7_u8)))
  });
  for backend in BACKENDS {
    let e = run(backend, vec![raise()], false, &codec::unit(), &call0("test.raise"), ps()).expect_err("fails");
    assert_eq!(e.payload().and_then(|p| p.downcast_ref::<u8>()), Some(&7));
  }
}

#[test]
fn native_closures_as_arguments() {
  for backend in BACKENDS {
    let d = driver(backend, vec![]);
    let ea = codec::tactic_fn(codec::int(), codec::int(), d.clone());
    let succ: TacFn<BigInt, BigInt> = Arc::new(|n, ps| Ok(TacResult::Success(n + 1, ps)));
    // fun f ps => f 41 ps
    let tac = Term::abs(2, Term::bvar(1).app([Term::int(41), Term::bvar(0)]));
    let (_, v) = interpreter(d).run_tactic_on_ps(&fsp(20, 30), &fsp(40, 50), false,
      succ, &ea, &codec::int(), &tac, true, ps()).expect("succeeds");
    assert_eq!(v, BigInt::from(42));
  }
}

#[test]
fn nested_runs() {
  for backend in BACKENDS {
    let inner = interpreter(driver(backend, vec![]));
    // runs `fail "inner"` if the argument is 0, and `ret` otherwise
    let nested = PrimitiveStep::tac1("test.nested", codec::int(), codec::int(), move |n, ps| {
      let tac = if n == BigInt::from(0) {fail("inner")} else {ret()};
      let (_, v) = inner.run_tactic_on_ps(&fsp(1, 2), &fsp(1, 2), false,
        n, &codec::int(), &codec::int(), &tac, true, ps.clone())?;
      Ok(TacResult::Success(v * 2, ps))
    });
    let i = interpreter(driver(backend, vec![nested]));
    let (_, v) = i.run_tactic_on_ps(&fsp(20, 30), &fsp(40, 50), false,
      BigInt::from(21), &codec::int(), &codec::int(), &call1("test.nested"), true, ps()).expect("succeeds");
    assert_eq!(v, BigInt::from(42));

    let e = i.run_tactic_on_ps(&fsp(20, 30), &fsp(40, 50), false,
      BigInt::from(0), &codec::int(), &codec::int(), &call1("test.nested"), true, ps()).expect_err("fails");
    assert_eq!(e.code, ErrorCode::UserTacticFailure);
    assert_eq!(e.msg(), ["Tactic failed", "Tactic failed", "inner"]);
  }
}

#[test]
fn most_recent_registration_wins() {
  register_step(PrimitiveStep::tac0("test.registered", codec::int(), |ps| Ok(TacResult::Success(BigInt::from(1), ps))));
  register_step(PrimitiveStep::tac0("test.registered", codec::int(), |ps| Ok(TacResult::Success(BigInt::from(2), ps))));
  for backend in BACKENDS {
    let (_, v) = run(backend, vec![], false, &codec::int(), &call0("test.registered"), ps()).expect("succeeds");
    assert_eq!(v, BigInt::from(2));
  }
}

#[test]
fn background_failure_at_deferred_goal() {
  for backend in BACKENDS {
    let mut ps = ps();
    let mut env = ps.main_context.clone();
    env.range = fsp(60, 70);
    ps.new_goal(env, Term::konst("T"), "deferred", false);
    let g = ps.goals.pop().expect("goal");
    ps.smt_goals.push(g);
    let e = run(backend, vec![], true, &codec::int(), &fail("boom"), ps).expect_err("fails");
    assert_eq!(e.pos, Some(fsp(60, 70)));
  }
}

#[test]
fn foreign_goal_is_an_internal_error() {
  let smuggle = || PrimitiveStep::tac0("test.smuggle", codec::unit(), |mut ps| {
    let env = ps.main_context.clone();
    ps.goals.push(Goal { env, witness: UVarId(99), irrelevant: false, label: "foreign".into() });
    Ok(TacResult::Success((), ps))
  });
  for backend in BACKENDS {
    let e = run(backend, vec![smuggle()], false, &codec::unit(), &call0("test.smuggle"), ps())
      .expect_err("malformed");
    assert_eq!(e.code, ErrorCode::InternalError);
    assert_eq!(e.pos, Some(fsp(40, 50)));
  }
}

#[test]
fn stuck_on_admit() {
  // fun _ ps => Prims.admit () ps
  let tac = Term::abs(2, Term::konst(lid::ADMIT).app([Term::unit(), Term::bvar(0)]));
  for backend in BACKENDS {
    let e = run(backend, vec![], false, &codec::int(), &tac, ps()).expect_err("stuck");
    assert_eq!(e.code, ErrorCode::TacticGotStuck);
    assert_eq!(e.msg().len(), 3);
    assert!(e.msg()[2].starts_with("The term contains `Prims.admit`"));
  }
}

fn hole() -> PrimitiveStep {
  PrimitiveStep::tac0("test.hole", codec::unit(), |mut ps| {
    ps.new_uvar(Term::konst("T"), "made up", fsp(1, 2));
    Ok(TacResult::Success((), ps))
  })
}

fn issue_with(tag: ImplicitTag, backend: Backend) -> TacError {
  let tc = Arc::new(TestChecker { tag: Some(tag), ..TestChecker::default() });
  let i = Interpreter::new(tc, driver(backend, vec![hole()]));
  let e = i.run_tactic_on_ps(&fsp(20, 30), &fsp(40, 50), false,
    BigInt::from(0), &codec::int(), &codec::unit(), &call0("test.hole"), true, ps()).expect_err("reported");
  let [issue] = e.issues() else { panic!("expected one issue, got {e}") };
  assert_eq!(issue.code, ErrorCode::UninstantiatedUVarInTactic);
  assert_eq!(issue.pos, Some(fsp(40, 50)));
  issue.clone()
}

#[test]
fn universe_constraints_are_reported() {
  for backend in BACKENDS {
    let issue = issue_with(ImplicitTag::DefersUnivConstraint, backend);
    assert_eq!(issue.msg()[0],
      "Tactic left uninstantiated unification variable ?0 (checking it is blocked on a universe constraint)");
    assert_eq!(issue.msg()[2], "Reason: made up");
  }
}

#[test]
fn typing_guards_are_reported() {
  for backend in BACKENDS {
    let issue = issue_with(ImplicitTag::HasTypingGuard(Term::konst("t"), Term::konst("T")), backend);
    assert_eq!(issue.msg()[0], "Tactic solved goal ?0 of type T");
    assert_eq!(issue.msg()[1], "To the term t : T");
    assert!(issue.msg()[2].starts_with("But it has a non-trivial typing guard."));
  }
}

mod common;

use common::*;
use num::BigInt;
use tacrun::codec::{self, lid};
use tacrun::step::StepFlags;
use tacrun::term::{Branch, Pattern};
use tacrun::*;

/// Increments the freshness counter and returns its new value.
fn fresh() -> PrimitiveStep {
  PrimitiveStep::tac0("test.fresh", codec::usize(), |mut ps| {
    let n = ps.fresh();
    Ok(TacResult::Success(n, ps))
  })
}

fn add() -> PrimitiveStep {
  PrimitiveStep::total2("test.add", codec::usize(), codec::usize(), codec::usize(), |a, b| a + b)
}

/// `fun _ ps => bind fresh (fun n ps => bind fresh (fun m ps => Success (add n m) ps) ps) ps`
fn program() -> Term {
  let bind = Term::konst("Tac.bind");
  let fresh = Term::konst("test.fresh");
  let last = Term::abs(2, Term::ctor(lid::SUCCESS).app([
    Term::konst("test.add").app([Term::bvar(3), Term::bvar(1)]), Term::bvar(0)]));
  let first = Term::abs(2, bind.app([fresh.clone(), last, Term::bvar(0)]));
  Term::abs(2, bind.app([fresh, first, Term::bvar(0)]))
}

fn run_both<R: 'static>(er: &Codec<R>, tac: &Term, natives: impl Fn() -> Vec<PrimitiveStep>)
  -> Vec<Result<TacResult<R>>> {
  init_logging();
  BACKENDS.into_iter().map(|b| driver(b, natives()).unembed_tactic_1(codec::unit(), er.clone(), tac.clone())((), ps()))
    .collect()
}

#[test]
fn sequenced_primitives_agree() {
  let rs = run_both(&codec::usize(), &program(), || vec![fresh(), add()]);
  for r in rs {
    match r {
      Ok(TacResult::Success(n, ps)) => { assert_eq!(n, 3); assert_eq!(ps.freshness, 2) }
      r => panic!("unexpected {r:?}"),
    }
  }
}

#[test]
fn failure_short_circuits_bind() {
  // bind (fun ps => Failed (TacticFailure "no") ps) (fun n ps => Success n ps)
  let fail_now = Term::abs(1, Term::ctor(lid::FAILED).app([
    Term::ctor(lid::TACTIC_FAILURE).app([Term::string("no")]), Term::bvar(0)]));
  let tac = Term::abs(2, Term::konst("Tac.bind").app([fail_now, ret(), Term::bvar(0)]));
  for r in run_both(&codec::usize(), &tac, Vec::new) {
    match r {
      Ok(TacResult::Failed(Failure::TacticFailure(m), _)) => assert_eq!(m.as_str(), "no"),
      r => panic!("unexpected {r:?}"),
    }
  }
}

#[test]
fn data_results_agree() {
  // fun _ ps => Success (match Some 1 with None => [] | Some x => [x; 2]) ps
  let scrut = Term::ctor(lid::SOME).app([Term::int(1)]);
  let list = |a: Term, b: Term| Term::ctor(lid::CONS).app([a,
    Term::ctor(lid::CONS).app([b, Term::ctor(lid::NIL)])]);
  let body = Term::matches(scrut, [
    Branch { pat: Pattern::Ctor(lid::NONE.into(), 0), body: Term::ctor(lid::NIL) },
    Branch { pat: Pattern::Ctor(lid::SOME.into(), 1), body: list(Term::bvar(0), Term::int(2)) },
  ]);
  let tac = Term::abs(2, Term::ctor(lid::SUCCESS).app([body, Term::bvar(0)]));
  let c = codec::list(codec::int());
  let rs: Vec<_> = run_both(&c, &tac, Vec::new).into_iter()
    .map(|r| r.ok().and_then(TacResult::ok)).collect();
  assert_eq!(rs, [Some(vec![BigInt::from(1), BigInt::from(2)]), Some(vec![BigInt::from(1), BigInt::from(2)])]);
}

#[test]
fn stuck_terms_agree() {
  // a match on a free name is stuck in both backends, with the same residue;
  // the branch refers to the (unit) argument of the metaprogram
  let m = Term::matches(Term::name("x"), [
    Branch { pat: Pattern::Lit(Literal::Bool(true)), body: Term::bvar(1) },
  ]);
  let tac = Term::abs(2, Term::ctor(lid::SUCCESS).app([m, Term::bvar(0)]));
  let msgs: Vec<_> = run_both(&codec::unit(), &tac, Vec::new).into_iter()
    .map(|r| r.expect_err("stuck").msg().to_vec()).collect();
  assert_eq!(msgs[0], msgs[1]);
  assert_eq!(msgs[0][1], "Reduction stopped at: (Tac.Result.Success (match x (true => ())) <ProofState>)");
}

/// `fun _ ps => Success body ps`
fn success(body: Term) -> Term { Term::abs(2, Term::ctor(lid::SUCCESS).app([body, Term::bvar(0)])) }

fn values<R: std::fmt::Debug + 'static>(er: &Codec<R>, tac: &Term, natives: impl Fn() -> Vec<PrimitiveStep>) -> Vec<R> {
  run_both(er, tac, natives).into_iter().map(|r| match r {
    Ok(TacResult::Success(v, _)) => v,
    r => panic!("unexpected {r:?}"),
  }).collect()
}

#[test]
fn lambdas_are_returned_as_written() {
  // fun x => (fun y => y) x
  let lam = Term::abs(1, Term::abs(1, Term::bvar(0)).app([Term::bvar(0)]));
  assert_eq!(values(&codec::any_term(), &success(lam.clone()), Vec::new), [lam.clone(), lam]);
  // (fun x y => x) 1
  let partial = Term::abs(2, Term::bvar(1)).app([Term::int(1)]);
  assert_eq!(values(&codec::any_term(), &success(partial.clone()), Vec::new), [partial.clone(), partial]);
}

#[test]
fn steps_returning_lambdas() {
  // konst x = fun _ => x
  let konst = || vec![PrimitiveStep::new("test.konst", 1, StepFlags::empty(),
    |_, args| Ok(Some(Term::abs(1, args[0].clone()))))];
  let k = Term::konst("test.konst");
  let tac = success(k.app([Term::int(5), Term::int(6)]));
  assert_eq!(values(&codec::int(), &tac, konst), [BigInt::from(5), BigInt::from(5)]);
  let tac = success(k.app([Term::int(5)]));
  let lam = Term::abs(1, Term::int(5));
  assert_eq!(values(&codec::any_term(), &tac, konst), [lam.clone(), lam]);
}

#[test]
fn unused_arguments_are_never_run() {
  let boom = || vec![PrimitiveStep::new("test.boom", 1, StepFlags::empty(),
    |_, _| Err(TacError::new(None, ErrorCode::Other(7), vec!["boom".into()])))];
  let arg = Term::konst("test.boom").app([Term::unit()]);
  // fun _ ps => (fun a s => Success 1 s) (test.boom ()) ps
  let ignore = Term::abs(2, Term::ctor(lid::SUCCESS).app([Term::int(1), Term::bvar(0)]));
  let tac = Term::abs(2, ignore.app([arg.clone(), Term::bvar(0)]));
  assert_eq!(values(&codec::int(), &tac, boom), [BigInt::from(1), BigInt::from(1)]);
  // but a used one is
  for r in run_both(&codec::int(), &success(arg), boom) {
    assert_eq!(r.expect_err("boom").code, ErrorCode::Other(7));
  }
}

#[test]
fn reification_is_transparent() {
  let tac = success(Term::reify(Term::abs(1, Term::bvar(0)).app([Term::int(3)])));
  assert_eq!(values(&codec::int(), &tac, Vec::new), [BigInt::from(3), BigInt::from(3)]);
}

#[test]
fn derived_step_shapes() {
  let natives = || vec![
    PrimitiveStep::total1("test.neg", codec::int(), codec::int(), |n: BigInt| -n),
    PrimitiveStep::tac2("test.tag", codec::string(), codec::int(), codec::string(),
      |s: ArcString, n: BigInt, mut ps: ProofState| {
        ps.freshness += 1;
        Ok(TacResult::Success(format!("{}{n}", s.as_str()).into(), ps))
      }),
  ];
  // fun _ ps => test.tag "x" (test.neg 4) ps
  let tac = Term::abs(2, Term::konst("test.tag").app([
    Term::string("x"), Term::konst("test.neg").app([Term::int(4)]), Term::bvar(0)]));
  for r in run_both(&codec::string(), &tac, natives) {
    match r {
      Ok(TacResult::Success(s, ps)) => { assert_eq!(s.as_str(), "x-4"); assert_eq!(ps.freshness, 1) }
      r => panic!("unexpected {r:?}"),
    }
  }
}

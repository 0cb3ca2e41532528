//! The rewriting backend: a weak-head reducer over terms.

use bitflags::bitflags;
use crate::error::Result;
use crate::step::{PrimitiveStep, StepTable};
use crate::term::{Branch, Pattern, TermKind};
use crate::{Env, Term};
use std::sync::Arc;

bitflags! {
  /// What a call to [`Reducer::normalize`] is allowed to do.
  #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
  pub struct Flags: u8 {
    /// Look through reification markers.
    const REIFY = 1 << 0;
    /// Unfold non-recursive definitions.
    const DELTA = 1 << 1;
    /// Fire primitive steps.
    const PRIMOPS = 1 << 2;
    /// Drop ascriptions met in head position.
    const UNASCRIBE = 1 << 3;
    /// Stop at weak head normal form, without normalizing arguments.
    const HNF = 1 << 4;
  }
}

impl Flags {
  /// The flags used to run a metaprogram.
  #[must_use]
  pub fn tactic() -> Flags { Flags::REIFY | Flags::DELTA | Flags::PRIMOPS | Flags::UNASCRIBE }
}

/// A term reducer.
pub trait Reducer: Send + Sync {
  /// Reduce `t` according to `flags`, using `steps` for primitive operations
  /// and `env` for definitions.
  fn normalize(&self, steps: &StepTable, flags: Flags, env: &Env, t: &Term) -> Result<Term>;
}

/// Weak normalization: reduce to weak head normal form, then normalize the
/// arguments of the head application. Nothing under a binder is reduced.
#[derive(Copy, Clone, Debug, Default)]
pub struct Whnf;

impl Reducer for Whnf {
  fn normalize(&self, steps: &StepTable, flags: Flags, env: &Env, t: &Term) -> Result<Term> {
    Norm { steps, flags, env }.norm(t)
  }
}

struct Norm<'a> {
  steps: &'a StepTable,
  flags: Flags,
  env: &'a Env,
}

/// Choose a branch for a scrutinee in weak head normal form. `None` means the
/// match is stuck, either because no branch matched or because the scrutinee
/// is not a value that the patterns can be tested against.
fn select(s: &Term, brs: &[Branch]) -> Option<Term> {
  for br in brs {
    match &br.pat {
      Pattern::Wild => return Some(br.body.clone()),
      Pattern::Var => return Some(br.body.beta(std::slice::from_ref(s))),
      Pattern::Lit(l) => if s.as_lit()? == l { return Some(br.body.clone()) },
      &Pattern::Ctor(ref c, n) => {
        let (c2, args) = s.as_ctor_app()?;
        if c == c2 && args.len() == n as usize { return Some(br.body.beta(args)) }
      }
    }
  }
  None
}

impl Norm<'_> {
  fn step_of(&self, head: &Term) -> Option<Arc<PrimitiveStep>> {
    if !self.flags.contains(Flags::PRIMOPS) {return None}
    match &**head {
      TermKind::Const(c) => self.steps.lookup(c).cloned(),
      TermKind::Native(s) => Some(s.clone()),
      _ => None,
    }
  }

  /// Fire `step` on `args`, which must have at least `step.arity` elements.
  /// On success the result is applied to the remaining arguments.
  fn fire(&self, step: &PrimitiveStep, head: &Term, args: &[Term]) -> Result<(bool, Term)> {
    let (now, rest) = args.split_at(step.arity);
    let now = now.iter().map(|a| self.norm(a)).collect::<Result<Vec<_>>>()?;
    if crate::tac_debug() { trace!("firing {} on {} arguments", step.name, now.len()) }
    Ok(match (step.interp)(self.env, &now)? {
      Some(r) => (true, r.app(rest.iter().cloned())),
      None => (false, head.app(now.into_iter().chain(rest.iter().cloned()))),
    })
  }

  fn whnf(&self, t: &Term) -> Result<Term> {
    let mut t = t.clone();
    loop {
      let next = match &*t {
        TermKind::Meta(e, _) => e.clone(),
        TermKind::Ascribed(e, _) if self.flags.contains(Flags::UNASCRIBE) => e.clone(),
        TermKind::Reify(e) if self.flags.contains(Flags::REIFY) => e.clone(),
        TermKind::Const(_) | TermKind::Native(_) => {
          if let Some(step) = self.step_of(&t) {
            if step.arity != 0 {return Ok(t)}
            match self.fire(&step, &t, &[])? {
              (true, r) => r,
              (false, _) => return Ok(t),
            }
          } else {
            if_chain! {
              if let TermKind::Const(c) = &*t;
              if self.flags.contains(Flags::DELTA);
              if self.steps.lookup(c).is_none();
              if let Some(body) = self.env.unfoldable(c);
              then { body.clone() }
              else { return Ok(t) }
            }
          }
        }
        TermKind::App(h, args) => {
          let h2 = self.whnf(h)?;
          match &*h2 {
            &TermKind::Abs(n, ref body) if args.len() >= n as usize => {
              let (now, rest) = args.split_at(n as usize);
              body.beta(now).app(rest.iter().cloned())
            }
            TermKind::App(..) => h2.app(args.iter().cloned()),
            _ => match self.step_of(&h2) {
              Some(step) if args.len() >= step.arity => match self.fire(&step, &h2, args)? {
                (true, r) => r,
                (false, stuck) => return Ok(stuck),
              },
              _ => return Ok(if h2.ptr_eq(h) {t} else {h2.app(args.iter().cloned())}),
            }
          }
        }
        TermKind::Match(s, brs) => {
          let s2 = self.whnf(s)?;
          match select(&s2, brs) {
            Some(body) => body,
            None => return Ok(if s2.ptr_eq(s) {t} else {Term::matches(s2, brs.iter().cloned())}),
          }
        }
        _ => return Ok(t),
      };
      t = next;
    }
  }

  fn norm(&self, t: &Term) -> Result<Term> {
    let t = self.whnf(t)?;
    if self.flags.contains(Flags::HNF) {return Ok(t)}
    match &*t {
      TermKind::App(h, args) =>
        Ok(h.app(args.iter().map(|a| self.norm(a)).collect::<Result<Vec<_>>>()?)),
      _ => Ok(t),
    }
  }
}

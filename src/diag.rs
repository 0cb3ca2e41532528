//! Turning opaque execution failures into errors a user can act on.

use crate::codec::lid;
use crate::error::{ErrorCode, Result};
use crate::state::Implicit;
use crate::term::TermKind;
use crate::typeck::ImplicitTag;
use crate::{Env, FileSpan, ProofState, TacError, Term};

/// Find the subterm responsible for a stuck reduction. For an application
/// whose head is a constant, constructor, variable, literal or native step,
/// that is the whole application; for other applications we look into the
/// head, and for a match into the scrutinee.
#[must_use]
pub fn stuck_head(t: &Term) -> &Term {
  let mut t = t.unmeta();
  loop {
    match &**t {
      TermKind::App(h, _) => {
        let h = h.unmeta();
        match &**h {
          TermKind::Const(_) | TermKind::Ctor(_) | TermKind::BVar(_) | TermKind::Name(_) |
          TermKind::Lit(_) | TermKind::Native(_) => return t,
          _ => t = h,
        }
      }
      TermKind::Match(s, _) => t = s.unmeta(),
      _ => return t,
    }
  }
}

/// Does `t` refer to the admit constant anywhere?
#[must_use]
pub fn mentions_admit(t: &Term) -> bool {
  t.any_subterm(&mut |t| matches!(&**t, TermKind::Const(c) if c.as_str() == lid::ADMIT))
}

/// The error raised when the result of a metaprogram is not a result value.
#[must_use]
pub fn stuck(env: &Env, result: &Term) -> TacError {
  let head = stuck_head(result);
  let mut msg = vec!["Tactic got stuck!".to_owned(), format!("Reduction stopped at: {head}")];
  if mentions_admit(head) {
    msg.push(format!("The term contains `{}`, which does not reduce. \
      A metaprogram that gives up should fail explicitly.", lid::ADMIT));
  }
  if crate::tac_debug() { debug!("stuck result: {result}") }
  TacError::new(Some(env.range.clone()), ErrorCode::TacticGotStuck, msg)
}

fn describe(ps: &ProofState, imp: &Implicit, tag: &ImplicitTag) -> Vec<String> {
  let ty = ps.uvar(imp.uvar).map_or_else(|| "<unknown>".to_owned(), |d| d.ty.to_string());
  match tag {
    ImplicitTag::Unresolved => vec![
      format!("Tactic left uninstantiated unification variable {}", imp.uvar),
      format!("Type: {ty}"),
      format!("Reason: {}", imp.reason),
    ],
    ImplicitTag::DefersUnivConstraint => vec![
      format!("Tactic left uninstantiated unification variable {} \
        (checking it is blocked on a universe constraint)", imp.uvar),
      format!("Type: {ty}"),
      format!("Reason: {}", imp.reason),
    ],
    ImplicitTag::HasTypingGuard(tm, tm_ty) => vec![
      format!("Tactic solved goal {} of type {ty}", imp.uvar),
      format!("To the term {tm} : {tm_ty}"),
      "But it has a non-trivial typing guard. \
        Use an explicit guard inspection primitive to see and prove these goals.".to_owned(),
    ],
  }
}

/// Report the implicits that could not be resolved after a metaprogram
/// succeeded, each at `rng`, and fail if there were any.
pub fn report_implicits(rng: &FileSpan, ps: &ProofState, imps: &[(Implicit, ImplicitTag)]) -> Result<()> {
  if imps.is_empty() { return Ok(()) }
  let errs = imps.iter().map(|(imp, tag)| {
    let e = TacError::new(Some(rng.clone()), ErrorCode::UninstantiatedUVarInTactic, describe(ps, imp, tag));
    error!("{e}");
    e
  }).collect();
  Err(TacError::stop(errs))
}

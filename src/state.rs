//! The verification state threaded through a metaprogram: the environment,
//! the placeholder table, the goals and the implicits introduced so far.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use itertools::Itertools;
use crate::{ArcString, FileSpan, Symbol, Term, UVarId, UVarVec};

/// A top level definition, as seen by delta unfolding.
#[derive(Clone, Debug)]
pub struct Definition {
  /// The body, if the definition is transparent.
  pub body: Option<Term>,
  /// Recursive definitions are never unfolded.
  pub recursive: bool,
}

/// The ambient type checking environment.
#[derive(Clone, Debug)]
pub struct Env {
  /// The name of the module being checked.
  pub module: ArcString,
  /// The current source range.
  pub range: FileSpan,
  /// Set while a metaprogram is running.
  pub in_tactic: bool,
  /// Whether the type checker may defer problems to a metaprogram.
  pub enable_defer_to_tac: bool,
  /// The top level definitions in scope.
  pub defs: Arc<HashMap<Symbol, Definition>>,
}

impl Env {
  /// A fresh environment for the given module.
  pub fn new(module: impl Into<ArcString>) -> Env {
    Env {
      module: module.into(),
      range: FileSpan::default(),
      in_tactic: false,
      enable_defer_to_tac: true,
      defs: Arc::default(),
    }
  }

  /// Add (or replace) a definition.
  pub fn define(&mut self, name: impl Into<Symbol>, body: Option<Term>, recursive: bool) {
    Arc::make_mut(&mut self.defs).insert(name.into(), Definition { body, recursive });
  }

  /// Look up a definition.
  #[must_use]
  pub fn lookup(&self, name: &str) -> Option<&Definition> { self.defs.get(name) }

  /// The body of `name` if delta unfolding is allowed to replace it.
  #[must_use]
  pub fn unfoldable(&self, name: &str) -> Option<&Term> {
    match self.lookup(name)? {
      Definition { body: Some(body), recursive: false } => Some(body),
      _ => None,
    }
  }
}

/// Whether a placeholder's solution still needs to be checked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShouldCheck {
  /// The solution must be type checked when resolving implicits.
  Strict,
  /// The solution was already checked (or is checked elsewhere).
  AlreadyChecked,
}

/// A placeholder declaration.
#[derive(Clone, Debug)]
pub struct UVarDecl {
  /// The expected type of the solution.
  pub ty: Term,
  /// Why the placeholder was introduced.
  pub reason: String,
  /// Where it was introduced.
  pub range: FileSpan,
  /// The assignment, if it has been solved.
  pub solution: Option<Term>,
  /// Check status of the solution.
  pub should_check: ShouldCheck,
}

/// An open proof obligation. The goal is solved by assigning its witness.
#[derive(Clone, Debug)]
pub struct Goal {
  /// The environment the goal lives in.
  pub env: Env,
  /// The placeholder standing for the proof.
  pub witness: UVarId,
  /// Proof irrelevant goals must be solved by `()`.
  pub irrelevant: bool,
  /// A user facing label.
  pub label: String,
}

/// A placeholder introduced during checking, which must be resolved eventually.
#[derive(Clone, Debug)]
pub struct Implicit {
  /// The placeholder.
  pub uvar: UVarId,
  /// Why it was introduced.
  pub reason: String,
  /// Where it was introduced.
  pub range: FileSpan,
}

/// The state a metaprogram runs against. It has a single logical owner and
/// is passed in and returned by value; a term level copy is a [`Blob`](crate::term::Blob)
/// holding a clone.
#[derive(Clone, Debug)]
pub struct ProofState {
  /// The environment of the enclosing declaration.
  pub main_context: Env,
  /// The active goals, focused goal first.
  pub goals: Vec<Goal>,
  /// Goals deferred to the SMT solver.
  pub smt_goals: Vec<Goal>,
  /// Every implicit introduced so far, goal witnesses included.
  pub all_implicits: Vec<Implicit>,
  /// The placeholder table.
  pub uvars: UVarVec<UVarDecl>,
  /// Where the metaprogram was entered.
  pub entry_range: FileSpan,
  /// Nesting depth of debug dumps.
  pub depth: usize,
  /// Counter for fresh names.
  pub freshness: usize,
  /// Verbose debugging for this state.
  pub tac_verb_dbg: bool,
}

impl ProofState {
  /// An empty proof state.
  #[must_use]
  pub fn new(main_context: Env, entry_range: FileSpan) -> ProofState {
    ProofState {
      main_context,
      goals: vec![],
      smt_goals: vec![],
      all_implicits: vec![],
      uvars: UVarVec::default(),
      entry_range,
      depth: 0,
      freshness: 0,
      tac_verb_dbg: false,
    }
  }

  /// Introduce a placeholder and record it as an implicit.
  pub fn new_uvar(&mut self, ty: Term, reason: impl Into<String>, range: FileSpan) -> UVarId {
    let reason = reason.into();
    let uvar = self.uvars.push(UVarDecl {
      ty, reason: reason.clone(), range: range.clone(), solution: None, should_check: ShouldCheck::Strict
    });
    self.all_implicits.push(Implicit { uvar, reason, range });
    uvar
  }

  /// Introduce a goal of type `ty` at the end of the goal list, returning its witness.
  pub fn new_goal(&mut self, env: Env, ty: Term, label: impl Into<String>, irrelevant: bool) -> UVarId {
    let label = label.into();
    let witness = self.new_uvar(ty, format!("goal {label}"), env.range.clone());
    self.goals.push(Goal { env, witness, irrelevant, label });
    witness
  }

  /// Get a placeholder declaration.
  #[must_use]
  pub fn uvar(&self, u: UVarId) -> Option<&UVarDecl> { self.uvars.get(u) }

  /// The solution of a placeholder, if any.
  #[must_use]
  pub fn solution(&self, u: UVarId) -> Option<&Term> { self.uvar(u)?.solution.as_ref() }

  /// Assign a placeholder. Returns false if it does not exist or is already
  /// assigned to something else.
  pub fn solve(&mut self, u: UVarId, t: Term) -> bool {
    let Some(d) = self.uvars.get_mut(u) else {return false};
    match &d.solution {
      Some(old) => *old == t,
      None => {d.solution = Some(t); true}
    }
  }

  /// Mark a placeholder's solution as already checked.
  pub fn mark_checked(&mut self, u: UVarId) {
    if let Some(d) = self.uvars.get_mut(u) { d.should_check = ShouldCheck::AlreadyChecked }
  }

  /// Where a goal was introduced.
  #[must_use]
  pub fn goal_range(&self, g: &Goal) -> FileSpan {
    self.uvar(g.witness).map_or_else(|| g.env.range.clone(), |d| d.range.clone())
  }

  /// The type of a goal, if its witness is known.
  #[must_use]
  pub fn goal_type(&self, g: &Goal) -> Option<&Term> { self.uvar(g.witness).map(|d| &d.ty) }

  /// A fresh number, distinct from all previous ones for this state.
  pub fn fresh(&mut self) -> usize {
    self.freshness += 1;
    self.freshness
  }

  /// Every goal witness (active and deferred) is a known placeholder that
  /// appears among the implicits of this state.
  #[must_use]
  pub fn well_formed(&self) -> bool {
    self.goals.iter().chain(&self.smt_goals).all(|g|
      self.uvar(g.witness).is_some() && self.all_implicits.iter().any(|i| i.uvar == g.witness))
  }

  /// Render the state for debugging, prefixed by `msg`.
  #[must_use]
  pub fn dump(&self, msg: &str) -> String { format!("{}{msg}\n{self}", "  ".repeat(self.depth)) }

  fn fmt_goal(&self, f: &mut fmt::Formatter<'_>, i: usize, n: usize, g: &Goal) -> fmt::Result {
    write!(f, "Goal {}/{n}", i + 1)?;
    if !g.label.is_empty() { write!(f, " ({})", g.label)? }
    match self.goal_type(g) {
      Some(ty) => writeln!(f, "\n  {} : {ty}", g.witness),
      None => writeln!(f, "\n  {} : <unknown>", g.witness),
    }
  }
}

impl fmt::Display for ProofState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "ProofState at {} ({} goals, {} smt goals)",
      self.entry_range, self.goals.len(), self.smt_goals.len())?;
    let n = self.goals.len();
    for (i, g) in self.goals.iter().enumerate() { self.fmt_goal(f, i, n, g)? }
    if !self.smt_goals.is_empty() {
      writeln!(f, "SMT goals: {}", self.smt_goals.iter().map(|g| g.witness).format(", "))?;
    }
    Ok(())
  }
}

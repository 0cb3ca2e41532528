//! The object language in which metaprograms and their data are represented.
//!
//! Terms are immutable and shared through an [`Arc`]. Binders use de Bruijn
//! indices: `Abs(n, body)` binds `n` variables at once, and the last argument
//! of an application to it is `BVar(0)` in the body. Pattern match branches
//! bind the fields of a constructor the same way.

pub mod pretty;

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use num::BigInt;
use crate::{ArcString, FileSpan, UVarId};
use crate::step::PrimitiveStep;

/// A fully qualified name of a constant or constructor.
pub type Symbol = ArcString;

/// A literal constant of the object language.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
  /// The unit value `()`.
  Unit,
  /// A boolean.
  Bool(bool),
  /// An arbitrary precision integer.
  Int(BigInt),
  /// A string.
  String(ArcString),
}

/// Metadata attached to a term with [`TermKind::Meta`]. Reduction ignores it.
#[derive(Clone, Debug, PartialEq)]
pub enum Meta {
  /// The source location the term came from.
  Span(FileSpan),
  /// Marks a term as the lifted form of a computation in the named effect.
  Monadic(Symbol),
}

/// The kinds of native values that can be carried inside a term as a [`Blob`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlobKind {
  /// A [`ProofState`](crate::ProofState).
  ProofState,
  /// A [`Goal`](crate::Goal).
  Goal,
  /// An [`Env`](crate::Env).
  Env,
  /// A structured engine error, [`TacError`](crate::TacError).
  Error,
  /// Anything else; the payload of [`Failure::Opaque`](crate::Failure::Opaque).
  Opaque,
}

/// A native value embedded in a term. Blobs are compared by identity.
#[derive(Clone)]
pub struct Blob {
  /// What the payload is.
  pub kind: BlobKind,
  val: Arc<dyn Any + Send + Sync>,
}

impl Blob {
  /// Wrap a native value.
  pub fn new<T: Any + Send + Sync>(kind: BlobKind, val: T) -> Self { Self::from_arc(kind, Arc::new(val)) }

  /// Wrap an already shared native value.
  #[must_use]
  pub fn from_arc(kind: BlobKind, val: Arc<dyn Any + Send + Sync>) -> Self { Blob { kind, val } }

  /// Get the payload if it has type `T`.
  #[must_use]
  pub fn downcast_ref<T: Any>(&self) -> Option<&T> { self.val.downcast_ref() }

  /// The shared payload.
  #[must_use]
  pub fn payload(&self) -> &Arc<dyn Any + Send + Sync> { &self.val }
}

impl PartialEq for Blob {
  fn eq(&self, other: &Self) -> bool {
    self.kind == other.kind && std::ptr::addr_eq(Arc::as_ptr(&self.val), Arc::as_ptr(&other.val))
  }
}

impl fmt::Debug for Blob {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "<{:?}>", self.kind) }
}

/// A pattern in a [`TermKind::Match`] branch.
#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
  /// A constructor applied to `n` fields, each bound by the branch.
  Ctor(Symbol, u32),
  /// A literal; binds nothing.
  Lit(Literal),
  /// Binds the scrutinee itself.
  Var,
  /// Matches anything, binds nothing.
  Wild,
}

impl Pattern {
  /// The number of variables bound in the branch body.
  #[must_use]
  pub fn binders(&self) -> u32 {
    match *self {
      Pattern::Ctor(_, n) => n,
      Pattern::Var => 1,
      Pattern::Lit(_) | Pattern::Wild => 0,
    }
  }
}

/// A branch `pat => body` of a match.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
  /// The pattern.
  pub pat: Pattern,
  /// The body, under [`Pattern::binders`] new variables.
  pub body: Term,
}

/// The shapes of a [`Term`].
#[derive(Debug, PartialEq)]
pub enum TermKind {
  /// A reference to a top level definition or primitive.
  Const(Symbol),
  /// A data constructor.
  Ctor(Symbol),
  /// A bound variable (de Bruijn index).
  BVar(u32),
  /// A free local variable.
  Name(Symbol),
  /// A placeholder (unification variable).
  UVar(UVarId),
  /// A literal.
  Lit(Literal),
  /// An application to a nonempty argument list. Never directly nested:
  /// the head of an `App` is not itself an `App`.
  App(Term, Box<[Term]>),
  /// A lambda binding `n > 0` variables.
  Abs(u32, Term),
  /// A pattern match; the first matching branch is taken.
  Match(Term, Box<[Branch]>),
  /// A type ascription `e <: ty`.
  Ascribed(Term, Term),
  /// A term with metadata.
  Meta(Term, Meta),
  /// The reified representation of an effectful computation.
  Reify(Term),
  /// An embedded native value.
  Blob(Blob),
  /// An anonymous primitive step, used to represent native closures.
  Native(Arc<PrimitiveStep>),
}

/// A term of the object language.
#[derive(Clone, PartialEq)]
pub struct Term(Arc<TermKind>);

impl Deref for Term {
  type Target = TermKind;
  fn deref(&self) -> &TermKind { &self.0 }
}

impl fmt::Debug for Term {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

impl Term {
  /// Construct a term from its shape.
  #[must_use]
  pub fn new(k: TermKind) -> Term { Term(Arc::new(k)) }

  /// A constant.
  pub fn konst(s: impl Into<Symbol>) -> Term { Term::new(TermKind::Const(s.into())) }
  /// A constructor.
  pub fn ctor(s: impl Into<Symbol>) -> Term { Term::new(TermKind::Ctor(s.into())) }
  /// A bound variable.
  #[must_use]
  pub fn bvar(i: u32) -> Term { Term::new(TermKind::BVar(i)) }
  /// A free variable.
  pub fn name(s: impl Into<Symbol>) -> Term { Term::new(TermKind::Name(s.into())) }
  /// A placeholder.
  #[must_use]
  pub fn uvar(u: UVarId) -> Term { Term::new(TermKind::UVar(u)) }
  /// A literal.
  #[must_use]
  pub fn lit(l: Literal) -> Term { Term::new(TermKind::Lit(l)) }
  /// The unit literal.
  #[must_use]
  pub fn unit() -> Term { Term::lit(Literal::Unit) }
  /// A boolean literal.
  #[must_use]
  pub fn bool(b: bool) -> Term { Term::lit(Literal::Bool(b)) }
  /// An integer literal.
  pub fn int(n: impl Into<BigInt>) -> Term { Term::lit(Literal::Int(n.into())) }
  /// A string literal.
  pub fn string(s: impl Into<ArcString>) -> Term { Term::lit(Literal::String(s.into())) }
  /// A lambda binding `n` variables. `abs(0, e)` is `e`.
  #[must_use]
  pub fn abs(n: u32, body: Term) -> Term {
    if n == 0 {body} else {Term::new(TermKind::Abs(n, body))}
  }
  /// A pattern match.
  pub fn matches(scrut: Term, brs: impl IntoIterator<Item=Branch>) -> Term {
    Term::new(TermKind::Match(scrut, brs.into_iter().collect()))
  }
  /// A type ascription.
  #[must_use]
  pub fn ascribe(e: Term, ty: Term) -> Term { Term::new(TermKind::Ascribed(e, ty)) }
  /// A term annotated with a source span.
  #[must_use]
  pub fn span(e: Term, fsp: FileSpan) -> Term { Term::new(TermKind::Meta(e, Meta::Span(fsp))) }
  /// A reification marker.
  #[must_use]
  pub fn reify(e: Term) -> Term { Term::new(TermKind::Reify(e)) }
  /// An embedded native value.
  #[must_use]
  pub fn blob(b: Blob) -> Term { Term::new(TermKind::Blob(b)) }
  /// An anonymous native step.
  #[must_use]
  pub fn native(step: Arc<PrimitiveStep>) -> Term { Term::new(TermKind::Native(step)) }

  /// Apply this term to some arguments. Applications are kept flat, so
  /// `(f a).app([b])` is `(f a b)`.
  #[must_use]
  pub fn app(&self, args: impl IntoIterator<Item=Term>) -> Term {
    let mut args = args.into_iter().peekable();
    if args.peek().is_none() {return self.clone()}
    match &**self {
      TermKind::App(h, es) => Term::new(TermKind::App(h.clone(), es.iter().cloned().chain(args).collect())),
      _ => Term::new(TermKind::App(self.clone(), args.collect())),
    }
  }

  /// Returns true if the two terms are the same allocation.
  #[must_use]
  pub fn ptr_eq(&self, other: &Term) -> bool { Arc::ptr_eq(&self.0, &other.0) }

  /// Strip metadata and ascriptions from the outside of this term.
  #[must_use]
  pub fn unmeta(&self) -> &Term {
    let mut t = self;
    loop {
      match &**t {
        TermKind::Meta(e, _) | TermKind::Ascribed(e, _) => t = e,
        _ => return t
      }
    }
  }

  /// Split a term into its head and arguments. Non-applications have no arguments.
  #[must_use]
  pub fn head_args(&self) -> (&Term, &[Term]) {
    match &**self {
      TermKind::App(h, args) => (h, args),
      _ => (self, &[]),
    }
  }

  /// If this term (modulo metadata) is a constructor application, get the
  /// constructor and its arguments.
  #[must_use]
  pub fn as_ctor_app(&self) -> Option<(&Symbol, &[Term])> {
    let (h, args) = self.unmeta().head_args();
    match &**h.unmeta() {
      TermKind::Ctor(c) => Some((c, args)),
      _ => None,
    }
  }

  /// If this term (modulo metadata) is a literal, get it.
  #[must_use]
  pub fn as_lit(&self) -> Option<&Literal> {
    if let TermKind::Lit(l) = &**self.unmeta() {Some(l)} else {None}
  }

  /// If this term (modulo metadata) is a blob of the given kind, get it.
  #[must_use]
  pub fn as_blob(&self, kind: BlobKind) -> Option<&Blob> {
    match &**self.unmeta() {
      TermKind::Blob(b) if b.kind == kind => Some(b),
      _ => None,
    }
  }

  /// Returns true if `f` holds of this term or any of its subterms, including
  /// those under binders. Blob payloads are not inspected.
  pub fn any_subterm(&self, f: &mut impl FnMut(&Term) -> bool) -> bool {
    if f(self) {return true}
    match &**self {
      TermKind::App(h, args) => h.any_subterm(f) || args.iter().any(|a| a.any_subterm(f)),
      TermKind::Abs(_, e) | TermKind::Meta(e, _) | TermKind::Reify(e) => e.any_subterm(f),
      TermKind::Ascribed(e, ty) => e.any_subterm(f) || ty.any_subterm(f),
      TermKind::Match(s, brs) => s.any_subterm(f) || brs.iter().any(|br| br.body.any_subterm(f)),
      _ => false,
    }
  }

  /// Rebuild the term, replacing every bound variable `i` that is free at
  /// binder depth `k` (that is, `i >= k`) by `f(k, i)` where it returns a value.
  fn map_bvars(&self, cutoff: u32, f: &impl Fn(u32, u32) -> Option<Term>) -> Term {
    match &**self {
      &TermKind::BVar(i) if i >= cutoff => f(cutoff, i).unwrap_or_else(|| self.clone()),
      TermKind::App(h, args) =>
        h.map_bvars(cutoff, f).app(args.iter().map(|a| a.map_bvars(cutoff, f))),
      &TermKind::Abs(n, ref e) => Term::abs(n, e.map_bvars(cutoff + n, f)),
      TermKind::Match(s, brs) => Term::matches(s.map_bvars(cutoff, f),
        brs.iter().map(|br| Branch {
          pat: br.pat.clone(),
          body: br.body.map_bvars(cutoff + br.pat.binders(), f),
        })),
      TermKind::Ascribed(e, ty) => Term::ascribe(e.map_bvars(cutoff, f), ty.map_bvars(cutoff, f)),
      TermKind::Meta(e, m) => Term::new(TermKind::Meta(e.map_bvars(cutoff, f), m.clone())),
      TermKind::Reify(e) => Term::reify(e.map_bvars(cutoff, f)),
      _ => self.clone(),
    }
  }

  /// Shift the free bound variables (those `>= cutoff`) up by `by`.
  #[must_use]
  pub fn shift(&self, by: u32, cutoff: u32) -> Term {
    if by == 0 {return self.clone()}
    self.map_bvars(cutoff, &|_, i| Some(Term::bvar(i + by)))
  }

  /// Substitute `vals` for the variables bound just outside `cutoff` binders:
  /// `BVar(cutoff + j)` becomes `vals[j]`, so `vals[0]` is the innermost.
  /// Variables beyond the substituted ones are lowered accordingly.
  #[must_use]
  #[allow(clippy::cast_possible_truncation)]
  pub fn instantiate_from(&self, cutoff: u32, vals: &[Term]) -> Term {
    if vals.is_empty() {return self.clone()}
    let n = vals.len() as u32;
    self.map_bvars(cutoff, &|k, i| Some(if i - k < n {
      vals[(i - k) as usize].shift(k, 0)
    } else {
      Term::bvar(i - n)
    }))
  }

  /// Beta-reduce the body of an `Abs(args.len(), body)` against `args`,
  /// given in application order.
  #[must_use]
  pub fn beta(&self, args: &[Term]) -> Term {
    let vals: Vec<Term> = args.iter().rev().cloned().collect();
    self.instantiate_from(0, &vals)
  }
}

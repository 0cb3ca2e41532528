//! Pretty printer for terms, in a lisp-like concrete syntax.

use std::fmt;
use pretty::RcDoc;
use super::{Branch, Literal, Meta, Pattern, Term, TermKind};

type Doc = RcDoc<'static, ()>;

fn list(items: impl IntoIterator<Item=Doc>) -> Doc {
  RcDoc::text("(")
    .append(RcDoc::intersperse(items, RcDoc::line()).nest(2).group())
    .append(")")
}

impl fmt::Display for Literal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Literal::Unit => write!(f, "()"),
      Literal::Bool(b) => write!(f, "{b}"),
      Literal::Int(n) => write!(f, "{n}"),
      Literal::String(s) => write!(f, "{s:?}"),
    }
  }
}

impl fmt::Display for Pattern {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Pattern::Ctor(c, 0) => write!(f, "{c}"),
      Pattern::Ctor(c, n) => write!(f, "({c}{})", " _".repeat(*n as usize)),
      Pattern::Lit(l) => write!(f, "{l}"),
      Pattern::Var => write!(f, "x"),
      Pattern::Wild => write!(f, "_"),
    }
  }
}

impl Branch {
  fn pretty(&self) -> Doc {
    list([RcDoc::text(self.pat.to_string()), RcDoc::text("=>"), self.body.pretty()])
  }
}

impl Term {
  /// Build a pretty printing document for this term.
  #[must_use]
  pub fn pretty(&self) -> Doc {
    match &**self {
      TermKind::Const(c) | TermKind::Ctor(c) | TermKind::Name(c) => RcDoc::text(c.to_string()),
      TermKind::BVar(i) => RcDoc::text(format!("#{i}")),
      TermKind::UVar(u) => RcDoc::text(u.to_string()),
      TermKind::Lit(l) => RcDoc::text(l.to_string()),
      TermKind::App(h, args) => list(std::iter::once(h.pretty()).chain(args.iter().map(Term::pretty))),
      TermKind::Abs(n, e) => list([RcDoc::text(format!("fun/{n}")), e.pretty()]),
      TermKind::Match(s, brs) =>
        list([RcDoc::text("match"), s.pretty()].into_iter().chain(brs.iter().map(Branch::pretty))),
      TermKind::Ascribed(e, ty) => list([e.pretty(), RcDoc::text("<:"), ty.pretty()]),
      TermKind::Meta(e, Meta::Span(_)) => e.pretty(),
      TermKind::Meta(e, Meta::Monadic(m)) => list([RcDoc::text(format!("monadic[{m}]")), e.pretty()]),
      TermKind::Reify(e) => list([RcDoc::text("reify"), e.pretty()]),
      TermKind::Blob(b) => RcDoc::text(format!("{b:?}")),
      TermKind::Native(s) => RcDoc::text(format!("<native {}>", s.name)),
    }
  }
}

impl fmt::Display for Term {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.pretty().render_fmt(80, f) }
}

//! Conversions between native values and terms.
//!
//! A [`Codec<T>`] pairs an encoder (`&T -> Term`, which never fails) with a
//! decoder (`&Term -> Option<T>`, which sees through metadata and ascriptions
//! and returns `None` on a term of the wrong shape), plus the type of the
//! encoded terms. Codecs compose: [`list`], [`option`], [`tuple2`] and
//! [`result`] build codecs from codecs, and [`tactic_fn`] turns codecs for
//! `A` and `R` into a codec for metaprograms `A -> Tac R`.

use std::fmt;
use std::sync::Arc;
use num::{BigInt, ToPrimitive};
use crate::error::Payload;
use crate::result::{Failure, TacResult};
use crate::state::{Env, Goal, ProofState};
use crate::step::PrimitiveStep;
use crate::term::{Blob, BlobKind, Literal, TermKind};
use crate::{ArcString, Driver, Result, TacError, Term};

/// Names of the constants and constructors the codecs produce.
pub mod lid {
  /// The unit type.
  pub const UNIT: &str = "Prims.unit";
  /// The boolean type.
  pub const BOOL: &str = "Prims.bool";
  /// The integer type.
  pub const INT: &str = "Prims.int";
  /// The natural number type (used for `usize`).
  pub const NAT: &str = "Prims.nat";
  /// The string type.
  pub const STRING: &str = "Prims.string";
  /// The type of terms.
  pub const TERM: &str = "Tac.term";
  /// The list type constructor.
  pub const LIST: &str = "Prims.list";
  /// List cons.
  pub const CONS: &str = "Prims.Cons";
  /// The empty list.
  pub const NIL: &str = "Prims.Nil";
  /// The option type constructor.
  pub const OPTION: &str = "Prims.option";
  /// `Some`.
  pub const SOME: &str = "Prims.Some";
  /// `None`.
  pub const NONE: &str = "Prims.None";
  /// The pair type constructor.
  pub const TUPLE2: &str = "Prims.tuple2";
  /// The pair constructor.
  pub const MKTUPLE2: &str = "Prims.Mktuple2";
  /// The proof state type.
  pub const PROOFSTATE: &str = "Tac.proofstate";
  /// The goal type.
  pub const GOAL: &str = "Tac.goal";
  /// The environment type.
  pub const ENV: &str = "Tac.env";
  /// The exception type.
  pub const EXN: &str = "Prims.exn";
  /// The explicit failure exception, carrying a message.
  pub const TACTIC_FAILURE: &str = "Tac.TacticFailure";
  /// The result type constructor.
  pub const RESULT: &str = "Tac.result";
  /// A successful result.
  pub const SUCCESS: &str = "Tac.Result.Success";
  /// A failed result.
  pub const FAILED: &str = "Tac.Result.Failed";
  /// The tactic effect type constructor.
  pub const TAC: &str = "Tac.tac";
  /// The function type constructor.
  pub const ARROW: &str = "Tac.arrow";
  /// The constant that stands for an unfinished proof, which never reduces.
  pub const ADMIT: &str = "Prims.admit";
}

/// A metaprogram taking an argument, as a native function.
pub type TacFn<A, R> = Arc<dyn Fn(A, ProofState) -> Result<TacResult<R>> + Send + Sync>;

/// A metaprogram taking only the proof state, as a native function.
pub type TacThunk<R> = Arc<dyn Fn(ProofState) -> Result<TacResult<R>> + Send + Sync>;

/// A converter between native values of type `T` and terms.
pub struct Codec<T> {
  ty: Term,
  encode: Arc<dyn Fn(&T) -> Term + Send + Sync>,
  decode: Arc<dyn Fn(&Term) -> Option<T> + Send + Sync>,
}

impl<T> Clone for Codec<T> {
  fn clone(&self) -> Self {
    Codec { ty: self.ty.clone(), encode: self.encode.clone(), decode: self.decode.clone() }
  }
}

impl<T> fmt::Debug for Codec<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Codec({})", self.ty) }
}

impl<T> Codec<T> {
  /// Build a codec. The decoder is only ever passed terms with outer
  /// metadata and ascriptions removed.
  pub fn new(ty: Term,
    encode: impl Fn(&T) -> Term + Send + Sync + 'static,
    decode: impl Fn(&Term) -> Option<T> + Send + Sync + 'static,
  ) -> Self {
    Codec { ty, encode: Arc::new(encode), decode: Arc::new(decode) }
  }

  /// The type of the encoded terms.
  pub fn ty(&self) -> &Term { &self.ty }

  /// Encode a value.
  pub fn encode(&self, t: &T) -> Term { (self.encode)(t) }

  /// Decode a term, or return `None` if it does not have the right shape.
  pub fn decode(&self, t: &Term) -> Option<T> { (self.decode)(t.unmeta()) }
}

fn lit_codec<T: 'static>(ty: &str,
  encode: impl Fn(&T) -> Literal + Send + Sync + 'static,
  decode: impl Fn(&Literal) -> Option<T> + Send + Sync + 'static,
) -> Codec<T> {
  Codec::new(Term::konst(ty), move |t| Term::lit(encode(t)), move |t| decode(t.as_lit()?))
}

/// The unit type.
#[must_use]
pub fn unit() -> Codec<()> {
  lit_codec(lid::UNIT, |_: &()| Literal::Unit, |l| matches!(l, Literal::Unit).then_some(()))
}

/// Booleans.
#[must_use]
pub fn bool() -> Codec<bool> {
  lit_codec(lid::BOOL, |&b: &bool| Literal::Bool(b), |l| if let Literal::Bool(b) = *l {Some(b)} else {None})
}

/// Arbitrary precision integers.
#[must_use]
pub fn int() -> Codec<BigInt> {
  lit_codec(lid::INT, |n: &BigInt| Literal::Int(n.clone()), |l| if let Literal::Int(n) = l {Some(n.clone())} else {None})
}

/// Machine sized naturals, as integer literals. Out of range integers do not decode.
#[must_use]
pub fn usize() -> Codec<usize> {
  lit_codec(lid::NAT, |&n: &usize| Literal::Int(n.into()),
    |l| if let Literal::Int(n) = l {n.to_usize()} else {None})
}

/// Strings.
#[must_use]
pub fn string() -> Codec<ArcString> {
  lit_codec(lid::STRING, |s: &ArcString| Literal::String(s.clone()),
    |l| if let Literal::String(s) = l {Some(s.clone())} else {None})
}

/// Terms themselves. Decoding still strips outer metadata.
#[must_use]
pub fn any_term() -> Codec<Term> {
  Codec::new(Term::konst(lid::TERM), Term::clone, |t| Some(t.clone()))
}

/// Lists, as chains of `Cons` ending in `Nil`.
#[must_use]
pub fn list<T: 'static>(c: Codec<T>) -> Codec<Vec<T>> {
  let c2 = c.clone();
  Codec::new(Term::konst(lid::LIST).app([c.ty.clone()]),
    move |v: &Vec<T>| v.iter().rev().fold(Term::ctor(lid::NIL), |tl, hd|
      Term::ctor(lid::CONS).app([c.encode(hd), tl])),
    move |t| {
      let mut out = vec![];
      let mut t = t.clone();
      loop {
        let (ctor, args) = t.as_ctor_app()?;
        match (ctor.as_str(), args) {
          (lid::NIL, []) => return Some(out),
          (lid::CONS, [hd, tl]) => {
            out.push(c2.decode(hd)?);
            let tl = tl.clone();
            t = tl;
          }
          _ => return None,
        }
      }
    })
}

/// Optional values.
#[must_use]
pub fn option<T: 'static>(c: Codec<T>) -> Codec<Option<T>> {
  let c2 = c.clone();
  Codec::new(Term::konst(lid::OPTION).app([c.ty.clone()]),
    move |v: &Option<T>| match v {
      None => Term::ctor(lid::NONE),
      Some(v) => Term::ctor(lid::SOME).app([c.encode(v)]),
    },
    move |t| match t.as_ctor_app()? {
      (s, []) if s.as_str() == lid::NONE => Some(None),
      (s, [v]) if s.as_str() == lid::SOME => Some(Some(c2.decode(v)?)),
      _ => None,
    })
}

/// Pairs.
#[must_use]
pub fn tuple2<A: 'static, B: 'static>(a: Codec<A>, b: Codec<B>) -> Codec<(A, B)> {
  let (a2, b2) = (a.clone(), b.clone());
  Codec::new(Term::konst(lid::TUPLE2).app([a.ty.clone(), b.ty.clone()]),
    move |(x, y): &(A, B)| Term::ctor(lid::MKTUPLE2).app([a.encode(x), b.encode(y)]),
    move |t| match t.as_ctor_app()? {
      (s, [x, y]) if s.as_str() == lid::MKTUPLE2 => Some((a2.decode(x)?, b2.decode(y)?)),
      _ => None,
    })
}

fn blob_codec<T: Clone + Send + Sync + 'static>(ty: &str, kind: BlobKind) -> Codec<T> {
  Codec::new(Term::konst(ty),
    move |v: &T| Term::blob(Blob::new(kind, v.clone())),
    move |t| t.as_blob(kind)?.downcast_ref::<T>().cloned())
}

/// Proof states, embedded as native blobs.
#[must_use]
pub fn proof_state() -> Codec<ProofState> { blob_codec(lid::PROOFSTATE, BlobKind::ProofState) }

/// Goals, embedded as native blobs.
#[must_use]
pub fn goal() -> Codec<Goal> { blob_codec(lid::GOAL, BlobKind::Goal) }

/// Environments, embedded as native blobs.
#[must_use]
pub fn env() -> Codec<Env> { blob_codec(lid::ENV, BlobKind::Env) }

/// Failure reasons. Engine errors and foreign payloads are embedded as blobs,
/// explicit failures as `TacticFailure msg`, and any other term is an object
/// level exception, so decoding never fails.
#[must_use]
pub fn exn() -> Codec<Failure> {
  Codec::new(Term::konst(lid::EXN),
    |f: &Failure| match f {
      Failure::Engine(e) => Term::blob(Blob::new(BlobKind::Error, e.clone())),
      Failure::TacticFailure(msg) => Term::ctor(lid::TACTIC_FAILURE).app([Term::string(msg.clone())]),
      Failure::Exn(t) => t.clone(),
      Failure::Opaque(p) => Term::blob(Blob::from_arc(BlobKind::Opaque, p.0.clone())),
    },
    |t| {
      if let TermKind::Blob(b) = &**t {
        match b.kind {
          BlobKind::Error => return b.downcast_ref::<TacError>().cloned().map(Failure::Engine),
          BlobKind::Opaque => return Some(Failure::Opaque(Payload(b.payload().clone()))),
          _ => {}
        }
      }
      if_chain! {
        if let Some((c, [msg])) = t.as_ctor_app();
        if c.as_str() == lid::TACTIC_FAILURE;
        if let Some(Literal::String(msg)) = msg.as_lit();
        then { return Some(Failure::TacticFailure(msg.clone())) }
      }
      Some(Failure::Exn(t.clone()))
    })
}

/// Results of metaprograms: `Success v ps` or `Failed exn ps`.
#[must_use]
pub fn result<T: 'static>(c: Codec<T>) -> Codec<TacResult<T>> {
  let (ps, ex) = (proof_state(), exn());
  let (ps2, ex2, c2) = (ps.clone(), ex.clone(), c.clone());
  Codec::new(Term::konst(lid::RESULT).app([c.ty.clone()]),
    move |r: &TacResult<T>| match r {
      TacResult::Success(v, s) => Term::ctor(lid::SUCCESS).app([c.encode(v), ps.encode(s)]),
      TacResult::Failed(e, s) => Term::ctor(lid::FAILED).app([ex.encode(e), ps.encode(s)]),
    },
    move |t| match t.as_ctor_app()? {
      (k, [v, s]) if k.as_str() == lid::SUCCESS => Some(TacResult::Success(c2.decode(v)?, ps2.decode(s)?)),
      (k, [e, s]) if k.as_str() == lid::FAILED => Some(TacResult::Failed(ex2.decode(e)?, ps2.decode(s)?)),
      _ => None,
    })
}

/// The type of metaprograms from `a` to `r`.
#[must_use]
pub fn tactic_type(a: &Term, r: &Term) -> Term {
  Term::konst(lid::ARROW).app([a.clone(), Term::konst(lid::TAC).app([r.clone()])])
}

/// Metaprograms `A -> Tac R`.
///
/// Decoding a term yields a native function which, on each call, encodes its
/// argument, applies the term to it and the proof state, and runs the
/// application to completion through `driver`. Encoding a native function
/// wraps it as an anonymous primitive step of arity 2, which a term level
/// metaprogram can call like any other.
#[must_use]
pub fn tactic_fn<A: 'static, R: 'static>(ea: Codec<A>, er: Codec<R>, driver: Driver) -> Codec<TacFn<A, R>> {
  let ty = tactic_type(ea.ty(), er.ty());
  let (ea2, er2) = (ea.clone(), er.clone());
  Codec::new(ty,
    move |f: &TacFn<A, R>| {
      let f = f.clone();
      Term::native(Arc::new(PrimitiveStep::tac1("<native tactic>", ea.clone(), er.clone(),
        move |a, ps| f(a, ps))))
    },
    move |t| Some(driver.unembed_tactic_1(ea2.clone(), er2.clone(), t.clone())))
}

/// Metaprograms `Tac R`, which take only the proof state.
#[must_use]
pub fn tactic_thunk<R: 'static>(er: Codec<R>, driver: Driver) -> Codec<TacThunk<R>> {
  let ty = Term::konst(lid::TAC).app([er.ty().clone()]);
  let er2 = er.clone();
  Codec::new(ty,
    move |f: &TacThunk<R>| {
      let f = f.clone();
      Term::native(Arc::new(PrimitiveStep::tac0("<native tactic>", er.clone(), move |ps| f(ps))))
    },
    move |t| Some(driver.unembed_tactic_0(er2.clone(), t.clone())))
}

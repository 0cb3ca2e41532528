//! The compiled backend. Terms are compiled to native closures over a frame
//! of values and evaluated call-by-need: arguments are passed as thunks and
//! only forced when a match, a primitive step or the final read back needs
//! them.
//!
//! Every value remembers the term it stands for. A closure keeps its source
//! lambda and a thunk its source term, and both are read back by
//! substituting their frame, so read back never reduces under a binder and
//! gives the same residue as the rewriting backend. Constants are unfolded
//! lazily, the first time their code runs, so an unused definition is never
//! compiled.

use std::fmt;
use std::sync::{Arc, OnceLock};
use crate::error::Result;
use crate::step::{PrimitiveStep, StepTable};
use crate::term::{Blob, Branch, Literal, Pattern, TermKind};
use crate::{Env, Symbol, TacError, Term};

/// Compiled code: given the machine and the values of the bound variables,
/// produce a value. The result is never a [`Value::Thunk`].
pub type Code = Arc<dyn Fn(&Machine<'_>, &Frame) -> Result<Value> + Send + Sync>;

/// How to pass an argument without evaluating it.
type Delayed = Arc<dyn Fn(&Frame) -> Result<Value> + Send + Sync>;

/// The values of the variables in scope, outermost first.
#[derive(Clone, Debug, Default)]
pub struct Frame(Arc<Vec<Value>>);

impl Frame {
  /// Get the value of the de Bruijn index `i`.
  #[must_use]
  pub fn get(&self, i: u32) -> Option<&Value> {
    self.0.get(self.0.len().checked_sub(i as usize + 1)?)
  }

  /// Extend the frame. The last value pushed is index 0.
  #[must_use]
  pub fn extend(&self, vs: impl IntoIterator<Item=Value>) -> Frame {
    let mut v = (*self.0).clone();
    v.extend(vs);
    Frame(Arc::new(v))
  }

  fn lookup(&self, i: u32) -> Result<&Value> {
    self.get(i).ok_or_else(|| TacError::internal(None, format!("unbound variable #{i}")))
  }

  /// Replace the variables of this frame in `t`, which lives under `cutoff`
  /// further binders.
  fn substitute(&self, cutoff: u32, t: &Term) -> Term {
    let vals = self.0.iter().rev().map(Value::source).collect::<Vec<_>>();
    t.instantiate_from(cutoff, &vals)
  }
}

/// A compiled lambda together with its frame.
pub struct Closure {
  /// The number of arguments it takes.
  pub arity: u32,
  frame: Frame,
  body: Code,
  src: Term,
}

impl fmt::Debug for Closure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "<closure/{}>", self.arity) }
}

/// A suspended computation, evaluated at most once.
pub struct Thunk {
  src: Term,
  frame: Frame,
  code: Option<Code>,
  val: OnceLock<Value>,
}

impl fmt::Debug for Thunk {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.val.get() {
      Some(v) => v.fmt(f),
      None => write!(f, "<thunk {}>", self.src),
    }
  }
}

/// The head of a neutral value.
#[derive(Clone, Debug)]
pub enum Head {
  /// A term that does not evaluate further: a free name, a placeholder,
  /// an opaque constant, a literal in function position, or a declined step
  /// application with its arguments normalized.
  Term(Term),
  /// A match on a neutral scrutinee, with the frame of its branches.
  Match(Box<Value>, Arc<[Branch]>, Frame),
}

impl Head {
  fn source(&self) -> Term {
    match self {
      Head::Term(t) => t.clone(),
      Head::Match(s, brs, fr) => Term::matches(s.source(), brs.iter().map(|br| Branch {
        pat: br.pat.clone(),
        body: fr.substitute(br.pat.binders(), &br.body),
      })),
    }
  }
}

/// The result of evaluation.
#[derive(Clone, Debug)]
pub enum Value {
  /// A constructor applied to arguments.
  Ctor(Symbol, Vec<Value>),
  /// A literal.
  Lit(Literal),
  /// A native value.
  Blob(Blob),
  /// A closure applied to fewer arguments than its arity.
  Lam(Arc<Closure>, Vec<Value>),
  /// A primitive step applied to fewer arguments than its arity. The term
  /// is used for read back.
  Step(Term, Arc<PrimitiveStep>, Vec<Value>),
  /// A stuck computation applied to arguments.
  Neutral(Head, Vec<Value>),
  /// A computation that has not been forced yet.
  Thunk(Arc<Thunk>),
}

impl Value {
  /// Suspend a closed term. Literals and blobs are taken as they are.
  #[must_use]
  pub fn of_term(t: &Term) -> Value {
    match &**t {
      TermKind::Lit(l) => Value::Lit(l.clone()),
      TermKind::Blob(b) => Value::Blob(b.clone()),
      _ => Value::Thunk(Arc::new(Thunk {
        src: t.clone(), frame: Frame::default(), code: None, val: OnceLock::new() })),
    }
  }

  /// The term this value stands for, without evaluating anything. Thunks
  /// give their source term, and closures their source lambda.
  #[must_use]
  pub fn source(&self) -> Term {
    let srcs = |vs: &[Value]| vs.iter().map(Value::source).collect::<Vec<_>>();
    match self {
      Value::Ctor(c, vs) => Term::ctor(c.clone()).app(srcs(vs)),
      Value::Lit(l) => Term::lit(l.clone()),
      Value::Blob(b) => Term::blob(b.clone()),
      Value::Lam(cl, held) => cl.frame.substitute(0, &cl.src).app(srcs(held)),
      Value::Step(h, _, held) => h.app(srcs(held)),
      Value::Neutral(h, vs) => h.source().app(srcs(vs)),
      Value::Thunk(th) => th.frame.substitute(0, &th.src),
    }
  }
}

/// Choose a branch for an evaluated scrutinee, returning its index and the
/// values it binds. `None` means the match is stuck.
fn select(v: &Value, brs: &[Branch]) -> Option<(usize, Vec<Value>)> {
  for (i, br) in brs.iter().enumerate() {
    match &br.pat {
      Pattern::Wild => return Some((i, vec![])),
      Pattern::Var => return Some((i, vec![v.clone()])),
      Pattern::Lit(l) => match v {
        Value::Lit(l2) => if l == l2 { return Some((i, vec![])) },
        _ => return None,
      },
      &Pattern::Ctor(ref c, n) => match v {
        Value::Ctor(c2, args) => if c == c2 && args.len() == n as usize { return Some((i, args.clone())) },
        _ => return None,
      },
    }
  }
  None
}

#[derive(Clone, Debug)]
struct Compiler {
  steps: StepTable,
}

impl Compiler {
  fn constant(v: Value) -> Code { Arc::new(move |_, _| Ok(v.clone())) }

  fn compile_const(&self, t: &Term, c: &Symbol) -> Code {
    let t = t.clone();
    if let Some(s) = self.steps.lookup(c) {
      let s = s.clone();
      return Arc::new(move |m, _| m.apply(Value::Step(t.clone(), s.clone(), vec![]), vec![]))
    }
    let (c, cache) = (c.clone(), OnceLock::new());
    Arc::new(move |m, _| {
      if let Some(v) = cache.get() { return Ok(Value::clone(v)) }
      let v = match m.env.unfoldable(&c) {
        Some(body) => m.compiler.compile(body)(m, &Frame::default())?,
        None => Value::Neutral(Head::Term(t.clone()), vec![]),
      };
      Ok(cache.get_or_init(|| v).clone())
    })
  }

  fn delay(&self, t: &Term) -> Delayed {
    match &**t {
      &TermKind::BVar(i) => Arc::new(move |fr| fr.lookup(i).cloned()),
      TermKind::Lit(l) => { let l = l.clone(); Arc::new(move |_| Ok(Value::Lit(l.clone()))) }
      TermKind::Blob(b) => { let b = b.clone(); Arc::new(move |_| Ok(Value::Blob(b.clone()))) }
      _ => {
        let (src, code) = (t.clone(), self.compile(t));
        Arc::new(move |fr| Ok(Value::Thunk(Arc::new(Thunk {
          src: src.clone(), frame: fr.clone(), code: Some(code.clone()), val: OnceLock::new() }))))
      }
    }
  }

  fn compile(&self, t: &Term) -> Code {
    match &**t {
      &TermKind::BVar(i) => Arc::new(move |m, fr| m.force(fr.lookup(i)?)),
      TermKind::Const(c) => self.compile_const(t, c),
      TermKind::Ctor(c) => Self::constant(Value::Ctor(c.clone(), vec![])),
      TermKind::Name(_) | TermKind::UVar(_) => Self::constant(Value::Neutral(Head::Term(t.clone()), vec![])),
      TermKind::Lit(l) => Self::constant(Value::Lit(l.clone())),
      TermKind::Blob(b) => Self::constant(Value::Blob(b.clone())),
      TermKind::Native(s) => {
        let (t, s) = (t.clone(), s.clone());
        Arc::new(move |m, _| m.apply(Value::Step(t.clone(), s.clone(), vec![]), vec![]))
      }
      TermKind::App(h, args) => {
        let h = self.compile(h);
        let args = args.iter().map(|a| self.delay(a)).collect::<Vec<_>>();
        Arc::new(move |m, fr| {
          let f = h(m, fr)?;
          let vs = args.iter().map(|a| a(fr)).collect::<Result<Vec<_>>>()?;
          m.apply(f, vs)
        })
      }
      &TermKind::Abs(arity, ref body) => {
        let (src, body) = (t.clone(), self.compile(body));
        Arc::new(move |_, fr| Ok(Value::Lam(Arc::new(Closure {
          arity, frame: fr.clone(), body: body.clone(), src: src.clone() }), vec![])))
      }
      TermKind::Match(s, brs) => {
        let s = self.compile(s);
        let bodies = brs.iter().map(|br| self.compile(&br.body)).collect::<Vec<_>>();
        let brs: Arc<[Branch]> = brs.iter().cloned().collect();
        Arc::new(move |m, fr| {
          let v = s(m, fr)?;
          match select(&v, &brs) {
            Some((i, binds)) => bodies[i](m, &fr.extend(binds)),
            None => Ok(Value::Neutral(Head::Match(Box::new(v), brs.clone(), fr.clone()), vec![])),
          }
        })
      }
      TermKind::Ascribed(e, _) | TermKind::Meta(e, _) | TermKind::Reify(e) => self.compile(e),
    }
  }
}

/// The state of one evaluation: the environment for definitions and the
/// primitive steps in force.
#[derive(Clone, Debug)]
pub struct Machine<'a> {
  /// Definitions and the current module.
  pub env: &'a Env,
  compiler: Compiler,
}

impl<'a> Machine<'a> {
  /// A machine over `env` and `steps`.
  #[must_use]
  pub fn new(env: &'a Env, steps: &StepTable) -> Self {
    Machine { env, compiler: Compiler { steps: steps.clone() } }
  }

  /// Compile and evaluate a closed term.
  pub fn eval(&self, t: &Term) -> Result<Value> { self.compiler.compile(t)(self, &Frame::default()) }

  /// Evaluate a thunk, if it is one. The result is cached in the thunk.
  pub fn force(&self, v: &Value) -> Result<Value> {
    let Value::Thunk(th) = v else { return Ok(v.clone()) };
    if let Some(v) = th.val.get() { return Ok(v.clone()) }
    let v = match &th.code {
      Some(code) => code(self, &th.frame)?,
      None => self.compiler.compile(&th.src)(self, &th.frame)?,
    };
    Ok(th.val.get_or_init(|| v).clone())
  }

  /// Apply a value to arguments, firing closures and steps once saturated.
  pub fn apply(&self, f: Value, mut args: Vec<Value>) -> Result<Value> {
    let mut f = self.force(&f)?;
    loop {
      f = match f {
        Value::Lam(cl, mut held) => {
          held.append(&mut args);
          let n = cl.arity as usize;
          if held.len() < n { return Ok(Value::Lam(cl, held)) }
          args = held.split_off(n);
          (cl.body)(self, &cl.frame.extend(held))?
        }
        Value::Step(h, s, mut held) => {
          held.append(&mut args);
          if held.len() < s.arity { return Ok(Value::Step(h, s, held)) }
          args = held.split_off(s.arity);
          match (s.compiled)(self, &held)? {
            Some(r) => self.force(&r)?,
            None => {
              let now = held.iter().map(|v| self.readback(v)).collect::<Result<Vec<_>>>()?;
              return Ok(Value::Neutral(Head::Term(h.app(now)), args))
            }
          }
        }
        Value::Ctor(c, mut held) => { held.append(&mut args); return Ok(Value::Ctor(c, held)) }
        Value::Neutral(h, mut held) => { held.append(&mut args); return Ok(Value::Neutral(h, held)) }
        v @ (Value::Lit(_) | Value::Blob(_)) => {
          if args.is_empty() { return Ok(v) }
          return Ok(Value::Neutral(Head::Term(v.source()), args))
        }
        v @ Value::Thunk(_) => self.force(&v)?,
      };
      if args.is_empty() { return Ok(f) }
    }
  }

  /// Read a value back to a term, forcing it and normalizing the arguments
  /// of its head application. Bodies of closures and branches of stuck
  /// matches are left as they were written.
  pub fn readback(&self, v: &Value) -> Result<Term> {
    let args = |vs: &[Value]| vs.iter().map(|v| self.readback(v)).collect::<Result<Vec<_>>>();
    Ok(match self.force(v)? {
      Value::Ctor(c, vs) => Term::ctor(c).app(args(&vs)?),
      Value::Lit(l) => Term::lit(l),
      Value::Blob(b) => Term::blob(b),
      Value::Lam(cl, held) => cl.frame.substitute(0, &cl.src).app(args(&held)?),
      Value::Step(h, _, held) => h.app(args(&held)?),
      Value::Neutral(h, vs) => h.source().app(args(&vs)?),
      Value::Thunk(_) => return Err(TacError::internal(None, "forcing left a thunk")),
    })
  }
}

/// A compiling evaluator.
pub trait Evaluator: Send + Sync {
  /// Compile and evaluate a closed term.
  fn eval(&self, steps: &StepTable, env: &Env, t: &Term) -> Result<Value>;

  /// Apply a value to arguments.
  fn apply(&self, steps: &StepTable, env: &Env, f: &Value, args: Vec<Value>) -> Result<Value>;

  /// Convert a value back into a term.
  fn readback(&self, steps: &StepTable, env: &Env, v: &Value) -> Result<Term>;
}

/// Closure compilation with call-by-need evaluation.
#[derive(Copy, Clone, Debug, Default)]
pub struct Nbe;

impl Evaluator for Nbe {
  fn eval(&self, steps: &StepTable, env: &Env, t: &Term) -> Result<Value> {
    Machine::new(env, steps).eval(t)
  }

  fn apply(&self, steps: &StepTable, env: &Env, f: &Value, args: Vec<Value>) -> Result<Value> {
    Machine::new(env, steps).apply(f.clone(), args)
  }

  fn readback(&self, steps: &StepTable, env: &Env, v: &Value) -> Result<Term> {
    Machine::new(env, steps).readback(v)
  }
}

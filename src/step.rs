//! Primitive steps: natively implemented functions that the reducers call
//! when they meet a saturated application of a known name.
//!
//! The process-wide registry is append-only. Steps are registered during a
//! load phase with [`register_step`] and read as a snapshot ([`StepTable`])
//! at the start of every execution, after the steps built into the host
//! ([`NativeSteps`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use bitflags::bitflags;
use crate::codec::{self, Codec};
use crate::error::Result;
use crate::nbe::{Machine, Value};
use crate::result::{Failure, TacResult};
use crate::{Env, ProofState, RwLockExt, Symbol, Term};

bitflags! {
  /// Properties of a primitive step. Neither built in backend reads these:
  /// they never reduce under binders, and every step result is a term. They
  /// are kept for reducers supplied by the host.
  #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
  pub struct StepFlags: u8 {
    /// The step may fire under binders during strong reduction.
    const STRONG_REDUCTION_OK = 1 << 0;
    /// The step's result is reflected back into the object language automatically.
    const AUTO_REFLECT = 1 << 1;
  }
}

/// The interpretation of a step over terms. `Ok(None)` means the step does
/// not apply to these arguments and the application is stuck.
pub type StepInterp = Arc<dyn Fn(&Env, &[Term]) -> Result<Option<Term>> + Send + Sync>;

/// The interpretation of a step over compiled values.
pub type StepCompiled = Arc<dyn Fn(&Machine<'_>, &[Value]) -> Result<Option<Value>> + Send + Sync>;

/// A natively implemented function of fixed arity.
pub struct PrimitiveStep {
  /// The name of the constant this step implements.
  pub name: Symbol,
  /// The number of arguments needed to fire.
  pub arity: usize,
  /// Properties of the step.
  pub flags: StepFlags,
  /// Used by the rewriting reducer.
  pub interp: StepInterp,
  /// Used by the compiled evaluator.
  pub compiled: StepCompiled,
}

impl fmt::Debug for PrimitiveStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<step {}/{} {:?}>", self.name, self.arity, self.flags)
  }
}

/// Steps are compared by identity.
impl PartialEq for PrimitiveStep {
  fn eq(&self, other: &Self) -> bool { std::ptr::eq(self, other) }
}

/// Run a native tactic. An engine error becomes a failure in the state the
/// tactic was started in, so that the metaprogram observes it as a result.
fn catch<R>(ps: ProofState, f: impl FnOnce(ProofState) -> Result<TacResult<R>>) -> TacResult<R> {
  let old = ps.clone();
  match f(ps) {
    Ok(r) => r,
    Err(e) => match e.payload() {
      Some(p) => TacResult::Failed(Failure::Opaque(p.clone()), old),
      None => TacResult::Failed(Failure::Engine(e), old),
    }
  }
}

impl PrimitiveStep {
  /// Build a step from its term interpretation. The compiled interpretation
  /// reads the argument values back to terms and converts the result into
  /// a value.
  pub fn new(name: impl Into<Symbol>, arity: usize, flags: StepFlags,
    interp: impl Fn(&Env, &[Term]) -> Result<Option<Term>> + Send + Sync + 'static,
  ) -> Self {
    let interp: StepInterp = Arc::new(interp);
    let interp2 = interp.clone();
    let compiled: StepCompiled = Arc::new(move |m, vs| {
      let args = vs.iter().map(|v| m.readback(v)).collect::<Result<Vec<_>>>()?;
      Ok(interp2(m.env, &args)?.map(|t| Value::of_term(&t)))
    });
    PrimitiveStep { name: name.into(), arity, flags, interp, compiled }
  }

  /// Replace the compiled interpretation.
  #[must_use]
  pub fn with_compiled(mut self,
    compiled: impl Fn(&Machine<'_>, &[Value]) -> Result<Option<Value>> + Send + Sync + 'static,
  ) -> Self {
    self.compiled = Arc::new(compiled);
    self
  }

  /// A tactic primitive taking only the proof state.
  pub fn tac0<R: 'static>(name: impl Into<Symbol>, er: Codec<R>,
    f: impl Fn(ProofState) -> Result<TacResult<R>> + Send + Sync + 'static,
  ) -> Self {
    let (ps_c, res) = (codec::proof_state(), codec::result(er));
    PrimitiveStep::new(name, 1, StepFlags::AUTO_REFLECT, move |_, args| {
      let [ps] = args else {return Ok(None)};
      let Some(ps) = ps_c.decode(ps) else {return Ok(None)};
      Ok(Some(res.encode(&catch(ps, &f))))
    })
  }

  /// A tactic primitive taking one argument and the proof state.
  pub fn tac1<A: 'static, R: 'static>(name: impl Into<Symbol>, ea: Codec<A>, er: Codec<R>,
    f: impl Fn(A, ProofState) -> Result<TacResult<R>> + Send + Sync + 'static,
  ) -> Self {
    let (ps_c, res) = (codec::proof_state(), codec::result(er));
    PrimitiveStep::new(name, 2, StepFlags::AUTO_REFLECT, move |_, args| {
      let [a, ps] = args else {return Ok(None)};
      let (Some(a), Some(ps)) = (ea.decode(a), ps_c.decode(ps)) else {return Ok(None)};
      Ok(Some(res.encode(&catch(ps, |ps| f(a, ps)))))
    })
  }

  /// A tactic primitive taking two arguments and the proof state.
  pub fn tac2<A: 'static, B: 'static, R: 'static>(name: impl Into<Symbol>,
    ea: Codec<A>, eb: Codec<B>, er: Codec<R>,
    f: impl Fn(A, B, ProofState) -> Result<TacResult<R>> + Send + Sync + 'static,
  ) -> Self {
    let (ps_c, res) = (codec::proof_state(), codec::result(er));
    PrimitiveStep::new(name, 3, StepFlags::AUTO_REFLECT, move |_, args| {
      let [a, b, ps] = args else {return Ok(None)};
      let (Some(a), Some(b), Some(ps)) = (ea.decode(a), eb.decode(b), ps_c.decode(ps))
      else {return Ok(None)};
      Ok(Some(res.encode(&catch(ps, |ps| f(a, b, ps)))))
    })
  }

  /// A pure function of one argument.
  pub fn total1<A: 'static, R: 'static>(name: impl Into<Symbol>, ea: Codec<A>, er: Codec<R>,
    f: impl Fn(A) -> R + Send + Sync + 'static,
  ) -> Self {
    PrimitiveStep::new(name, 1, StepFlags::STRONG_REDUCTION_OK, move |_, args| {
      let [a] = args else {return Ok(None)};
      Ok(ea.decode(a).map(|a| er.encode(&f(a))))
    })
  }

  /// A pure function of two arguments.
  pub fn total2<A: 'static, B: 'static, R: 'static>(name: impl Into<Symbol>,
    ea: Codec<A>, eb: Codec<B>, er: Codec<R>,
    f: impl Fn(A, B) -> R + Send + Sync + 'static,
  ) -> Self {
    PrimitiveStep::new(name, 2, StepFlags::STRONG_REDUCTION_OK, move |_, args| {
      let [a, b] = args else {return Ok(None)};
      let (Some(a), Some(b)) = (ea.decode(a), eb.decode(b)) else {return Ok(None)};
      Ok(Some(er.encode(&f(a, b))))
    })
  }
}

/// The steps built into the host, queried afresh for every execution.
pub trait NativeSteps: Send + Sync {
  /// The current native steps.
  fn native_steps(&self) -> Vec<Arc<PrimitiveStep>>;
}

impl NativeSteps for () {
  fn native_steps(&self) -> Vec<Arc<PrimitiveStep>> { vec![] }
}

impl NativeSteps for Vec<Arc<PrimitiveStep>> {
  fn native_steps(&self) -> Vec<Arc<PrimitiveStep>> { self.clone() }
}

static REGISTRY: RwLock<Vec<Arc<PrimitiveStep>>> = RwLock::new(Vec::new());

/// Add a step to the process-wide registry. Later registrations are seen
/// before earlier ones; there is no way to remove a step.
pub fn register_step(step: PrimitiveStep) {
  let step = Arc::new(step);
  debug!("registering primitive step {}", step.name);
  let mut reg = REGISTRY.uwrite();
  if reg.iter().any(|s| s.name == step.name) {
    warn!("primitive step {} registered again, the new one shadows the old", step.name)
  }
  reg.push(step)
}

/// The native steps followed by the registered ones, most recent first.
#[must_use]
pub fn all_steps(native: &dyn NativeSteps) -> Vec<Arc<PrimitiveStep>> {
  let mut steps = native.native_steps();
  steps.extend(REGISTRY.uread().iter().rev().cloned());
  steps
}

/// A snapshot of the available steps, indexed by name. When several steps
/// share a name the earliest one in the list wins.
#[derive(Clone, Default)]
pub struct StepTable {
  steps: Arc<[Arc<PrimitiveStep>]>,
  index: Arc<HashMap<Symbol, usize>>,
}

impl fmt::Debug for StepTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.steps.iter()).finish()
  }
}

impl StepTable {
  /// Index a list of steps.
  #[must_use]
  pub fn new(steps: Vec<Arc<PrimitiveStep>>) -> Self {
    let mut index = HashMap::new();
    for (i, s) in steps.iter().enumerate() { index.entry(s.name.clone()).or_insert(i); }
    StepTable { steps: steps.into(), index: Arc::new(index) }
  }

  /// Take a snapshot of [`all_steps`].
  #[must_use]
  pub fn snapshot(native: &dyn NativeSteps) -> Self { Self::new(all_steps(native)) }

  /// Find the step for a name.
  #[must_use]
  pub fn lookup(&self, name: &str) -> Option<&Arc<PrimitiveStep>> {
    self.steps.get(*self.index.get(name)?)
  }

  /// All steps, in priority order.
  pub fn iter(&self) -> impl Iterator<Item=&Arc<PrimitiveStep>> { self.steps.iter() }

  /// The number of steps, shadowed ones included.
  #[must_use]
  pub fn len(&self) -> usize { self.steps.len() }

  /// Returns true if there are no steps.
  #[must_use]
  pub fn is_empty(&self) -> bool { self.steps.is_empty() }
}

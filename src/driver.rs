//! Running an applied metaprogram to completion.
//!
//! The driver encodes the proof state, applies the metaprogram term to its
//! arguments and the state, reduces (or evaluates) the application using a
//! fresh snapshot of the primitive steps, and decodes the outcome as a
//! result. An outcome that does not decode means reduction got stuck, which
//! is reported through [`diag::stuck`].

use std::fmt;
use std::sync::Arc;
use crate::codec::{self, Codec, TacFn, TacThunk};
use crate::diag;
use crate::error::Result;
use crate::nbe::{Evaluator, Nbe, Value};
use crate::profile::profile;
use crate::reduce::{Flags, Reducer, Whnf};
use crate::result::TacResult;
use crate::step::{NativeSteps, StepTable};
use crate::{ProofState, Term};

/// Which backend executes metaprograms.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Backend {
  /// Term rewriting with a [`Reducer`].
  #[default]
  Rewrite,
  /// Compilation and evaluation with an [`Evaluator`].
  Compiled,
}

/// The configuration used to execute metaprograms. Cloning is cheap.
#[derive(Clone)]
pub struct Driver {
  /// The backend in use.
  pub backend: Backend,
  /// The reducer for [`Backend::Rewrite`].
  pub reducer: Arc<dyn Reducer>,
  /// The evaluator for [`Backend::Compiled`].
  pub evaluator: Arc<dyn Evaluator>,
  /// The host's built in steps.
  pub native: Arc<dyn NativeSteps>,
}

impl fmt::Debug for Driver {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Driver").field("backend", &self.backend).finish_non_exhaustive()
  }
}

impl Default for Driver {
  fn default() -> Self { Self::new(Backend::default()) }
}

impl Driver {
  /// A driver with the built in reducer and evaluator and no native steps.
  #[must_use]
  pub fn new(backend: Backend) -> Self {
    Driver { backend, reducer: Arc::new(Whnf), evaluator: Arc::new(Nbe), native: Arc::new(()) }
  }

  /// Use the given native steps.
  #[must_use]
  pub fn with_native(mut self, native: impl NativeSteps + 'static) -> Self {
    self.native = Arc::new(native);
    self
  }

  /// The steps available right now.
  #[must_use]
  pub fn steps(&self) -> StepTable { StepTable::snapshot(&*self.native) }

  /// Apply `tactic` to `args` and the encoded state `ps`, run it to
  /// completion, and decode the outcome with `er`.
  pub fn run<R: 'static>(&self, er: &Codec<R>, tactic: &Term, args: Vec<Term>, ps: ProofState)
    -> Result<TacResult<R>> {
    let env = ps.main_context.clone();
    let steps = self.steps();
    let mut args = args;
    args.push(codec::proof_state().encode(&ps));
    drop(ps);
    let result = profile(Some(&env.module), "tacrun::driver::run", || match self.backend {
      Backend::Rewrite =>
        self.reducer.normalize(&steps, Flags::tactic(), &env, &tactic.app(args)),
      Backend::Compiled => {
        let f = self.evaluator.eval(&steps, &env, tactic)?;
        let vs = args.iter().map(Value::of_term).collect();
        let v = self.evaluator.apply(&steps, &env, &f, vs)?;
        self.evaluator.readback(&steps, &env, &v)
      }
    })?;
    match codec::result(er.clone()).decode(&result) {
      Some(r) => {
        if crate::tac_debug() {
          debug!("metaprogram {} with {}", if r.is_success() {"succeeded"} else {"failed"}, r.state().dump(""))
        }
        Ok(r)
      }
      None => Err(diag::stuck(&env, &result)),
    }
  }

  /// Turn a metaprogram term `A -> Tac R` into a native function. Each call
  /// runs the term once on the given argument and state.
  pub fn unembed_tactic_1<A: 'static, R: 'static>(&self, ea: Codec<A>, er: Codec<R>, f: Term) -> TacFn<A, R> {
    let this = self.clone();
    Arc::new(move |a, ps| this.run(&er, &f, vec![ea.encode(&a)], ps))
  }

  /// Turn a metaprogram term `Tac R` into a native function of the state.
  pub fn unembed_tactic_0<R: 'static>(&self, er: Codec<R>, f: Term) -> TacThunk<R> {
    let this = self.clone();
    Arc::new(move |ps| this.run(&er, &f, vec![], ps))
  }
}

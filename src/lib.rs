//! Metaprogram execution bridge. A tactic is a term of the object language
//! denoting a function from an argument and a proof state to a result; this
//! crate converts native values to and from terms ([`codec`]), drives the
//! application of a tactic to completion with one of two interchangeable
//! backends ([`driver`]), and reconciles the final proof state with the caller
//! ([`interpreter`]).
//!
//! ```text
//! Interpreter::run_tactic_on_ps
//!   -> TypeChecker::tc_tactic          (unless already typed)
//!   -> Driver::unembed_tactic_1        (rewriting: reduce::Whnf, compiled: nbe::Nbe)
//!        uses codec::* and step::all_steps()
//!   -> residual goals, diag::report_implicits / diag::stuck
//! ```

// rust lints we want
#![warn(bare_trait_objects, elided_lifetimes_in_paths,
  missing_copy_implementations, missing_debug_implementations, future_incompatible,
  rust_2018_idioms, trivial_numeric_casts, variant_size_differences, unreachable_pub,
  unused, missing_docs)]
// all the clippy
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
// all the clippy::restriction lints we want
#![warn(clippy::float_arithmetic,
  clippy::get_unwrap, clippy::integer_division,
  clippy::rc_buffer, clippy::rest_pat_in_fully_bound_structs,
  clippy::string_add, clippy::unwrap_used)]
// all the clippy lints we don't want
#![allow(clippy::cognitive_complexity, clippy::comparison_chain,
  clippy::default_trait_access, clippy::enum_glob_use, clippy::inline_always,
  clippy::manual_map, clippy::map_err_ignore, clippy::missing_const_for_fn,
  clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions,
  clippy::multiple_crate_versions, clippy::option_if_let_else, clippy::redundant_pub_crate,
  clippy::semicolon_if_nothing_returned, clippy::shadow_unrelated, clippy::too_many_lines,
  clippy::type_complexity, clippy::use_self)]

#[macro_use] extern crate if_chain;
#[macro_use] extern crate log;

pub mod term;
pub mod state;
pub mod error;
pub mod result;
pub mod codec;
pub mod step;
pub mod reduce;
pub mod nbe;
pub mod driver;
pub mod typeck;
pub mod diag;
pub mod profile;
pub mod interpreter;

use std::sync::atomic::{AtomicBool, Ordering};

pub use tacrun_util::*;
pub use term::{Term, TermKind, Literal, Symbol};
pub use state::{Env, Goal, ProofState};
pub use error::{TacError, ErrorCode, ErrorLevel, Result};
pub use result::{TacResult, Failure, Tac};
pub use codec::{Codec, TacFn, TacThunk};
pub use step::{PrimitiveStep, StepTable, register_step, all_steps};
pub use driver::{Backend, Driver};
pub use typeck::TypeChecker;
pub use interpreter::Interpreter;

static TAC_DEBUG: AtomicBool = AtomicBool::new(false);
pub(crate) fn tac_debug() -> bool { TAC_DEBUG.load(Ordering::Relaxed) }

/// Turn on tactic debugging output (logged at `debug` level). This is a
/// module-wide switch, off by default, and is only read by this crate.
pub fn set_tac_debug(b: bool) { TAC_DEBUG.store(b, Ordering::Relaxed) }

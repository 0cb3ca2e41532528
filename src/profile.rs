//! Advisory timing of named spans. Profiling is off by default and never
//! changes the outcome of the code being timed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::{Duration, Instant};
use crate::MutexExt;

static PROFILING: AtomicBool = AtomicBool::new(false);

static STATS: LazyLock<Mutex<HashMap<String, (u32, Duration)>>> = LazyLock::new(Default::default);

/// Turn span timing on or off.
pub fn set_profiling(b: bool) { PROFILING.store(b, Ordering::Relaxed) }

/// Is span timing on?
#[must_use]
pub fn profiling() -> bool { PROFILING.load(Ordering::Relaxed) }

/// Run `f` inside a span called `name`, attributed to `module` if given.
pub fn profile<T>(module: Option<&str>, name: &str, f: impl FnOnce() -> T) -> T {
  if !profiling() { return f() }
  let start = Instant::now();
  let r = f();
  let d = start.elapsed();
  let key = match module {
    Some(m) => format!("{name} [{m}]"),
    None => name.to_owned(),
  };
  trace!("{key}: {d:?}");
  let mut stats = STATS.ulock();
  let e = stats.entry(key).or_default();
  e.0 += 1;
  e.1 += d;
  r
}

/// The accumulated spans as `(key, count, total time)`, slowest first.
#[must_use]
pub fn report() -> Vec<(String, u32, Duration)> {
  let mut v: Vec<_> = STATS.ulock().iter().map(|(k, &(n, d))| (k.clone(), n, d)).collect();
  v.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
  v
}

/// Forget the accumulated spans.
pub fn reset() { STATS.ulock().clear() }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn spans_do_not_change_results() {
    assert_eq!(profile(Some("M"), "profile::tests::off", || 3), 3);
    set_profiling(true);
    assert_eq!(profile(Some("M"), "profile::tests::on", || 4), 4);
    assert!(report().iter().any(|(k, n, _)| k == "profile::tests::on [M]" && *n >= 1));
  }
}

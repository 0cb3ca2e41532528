//! Utilities shared by the tacrun crates: source positions, shared strings,
//! lock helpers and strongly typed index newtypes.

// rust lints we want
#![warn(
  bare_trait_objects,
  elided_lifetimes_in_paths,
  missing_copy_implementations,
  missing_debug_implementations,
  future_incompatible,
  rust_2018_idioms,
  trivial_numeric_casts,
  variant_size_differences,
  unreachable_pub,
  unused,
  missing_docs
)]
// all the clippy
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
// all the clippy::restriction lints we want
#![warn(
  clippy::else_if_without_else,
  clippy::float_arithmetic,
  clippy::get_unwrap,
  clippy::rc_buffer,
  clippy::rest_pat_in_fully_bound_structs,
  clippy::string_add,
  clippy::unwrap_used
)]
// all the clippy lints we don't want
#![allow(
  clippy::cognitive_complexity,
  clippy::default_trait_access,
  clippy::inline_always,
  clippy::missing_const_for_fn,
  clippy::missing_errors_doc,
  clippy::missing_panics_doc,
  clippy::module_name_repetitions,
  clippy::multiple_crate_versions,
  clippy::option_if_let_else,
  clippy::redundant_pub_crate,
  clippy::semicolon_if_nothing_returned,
  clippy::shadow_unrelated,
  clippy::too_many_lines,
  clippy::use_self
)]

use std::borrow::Borrow;
use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

mod ids;

pub use ids::*;

/// Newtype for `Box<dyn Error + Send + Sync>`
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Extension trait for [`Mutex`]`<T>`.
pub trait MutexExt<T> {
  /// Like `lock`, but propagates instead of catches panics.
  fn ulock(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
  fn ulock(&self) -> MutexGuard<'_, T> {
    self.lock().expect("propagating poisoned mutex")
  }
}

/// Extension trait for [`RwLock`]`<T>`.
pub trait RwLockExt<T> {
  /// Like `read`, but propagates instead of catches panics.
  fn uread(&self) -> RwLockReadGuard<'_, T>;
  /// Like `write`, but propagates instead of catches panics.
  fn uwrite(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> RwLockExt<T> for RwLock<T> {
  fn uread(&self) -> RwLockReadGuard<'_, T> {
    self.read().expect("propagating poisoned lock")
  }
  fn uwrite(&self) -> RwLockWriteGuard<'_, T> {
    self.write().expect("propagating poisoned lock")
  }
}

/// Newtype for an `Arc<str>`, so that names can be cloned cheaply and
/// looked up in maps by `&str`.
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArcString(pub Arc<str>);

impl Borrow<str> for ArcString {
  fn borrow(&self) -> &str { &self.0 }
}
impl Deref for ArcString {
  type Target = str;
  fn deref(&self) -> &str { &self.0 }
}
impl ArcString {
  /// Turn this `ArcString` into a `&str`.
  #[must_use]
  pub fn as_str(&self) -> &str { &self.0 }
}
impl fmt::Display for ArcString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}
impl fmt::Debug for ArcString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", &*self.0) }
}
impl From<&str> for ArcString {
  fn from(s: &str) -> Self { Self(s.into()) }
}
impl From<String> for ArcString {
  fn from(s: String) -> Self { Self(s.into()) }
}
impl From<&String> for ArcString {
  fn from(s: &String) -> Self { Self(s.as_str().into()) }
}

/// Points to a specific region of a source file by identifying the region's start and end points.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Span {
  /// The byte index of the beginning of the span (inclusive).
  pub start: usize,
  /// The byte index of the end of the span (exclusive).
  pub end: usize,
}

impl From<std::ops::Range<usize>> for Span {
  #[inline]
  fn from(r: std::ops::Range<usize>) -> Self { Span { start: r.start, end: r.end } }
}

impl fmt::Debug for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.start, self.end)
  }
}

/// A reference to a file. It wraps an [`Arc`] so it can be cloned thread-safely.
#[derive(Clone, Default)]
pub struct FileRef(Arc<PathBuf>);

impl From<&str> for FileRef {
  fn from(path: &str) -> FileRef { FileRef(Arc::new(path.into())) }
}

impl FileRef {
  /// Compare this with `other` for pointer equality.
  #[must_use]
  pub fn ptr_eq(&self, other: &FileRef) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl PartialEq for FileRef {
  fn eq(&self, other: &Self) -> bool { self.ptr_eq(other) || self.0 == other.0 }
}
impl Eq for FileRef {}

impl Hash for FileRef {
  fn hash<H: Hasher>(&self, state: &mut H) { self.0.hash(state) }
}

impl fmt::Display for FileRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = self.0.file_name().unwrap_or(self.0.as_os_str());
    s.to_string_lossy().fmt(f)
  }
}

impl fmt::Debug for FileRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

/// A span paired with a [`FileRef`].
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct FileSpan {
  /// The file in which this span occured.
  pub file: FileRef,
  /// The span (as byte indexes into the file source text).
  pub span: Span,
}

impl FileSpan {
  /// Construct a new [`FileSpan`] from a file and anything convertible to a span.
  pub fn new(file: FileRef, span: impl Into<Span>) -> Self { FileSpan { file, span: span.into() } }
}

impl fmt::Debug for FileSpan {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{:?}", self.file, self.span)
  }
}

impl fmt::Display for FileSpan {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Debug::fmt(self, f) }
}

//! A per-compile string interner for SL string literals and color-space names.

use shading_common::FastHashMap;

/// A handle to an interned string, cheap to copy and compare.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct StringHandle(u32);

/// Interns string literals for the duration of a single compile.
///
/// Unlike the engine-wide `StringName` singleton this is modelled on, the
/// pool lives on the `Compiler` and is dropped with it; there is no global
/// table and no `unsafe`.
#[derive(Default)]
pub struct StringPool {
  strings: Vec<String>,
  lookup: FastHashMap<String, StringHandle>,
}

impl StringPool {
  pub fn new() -> Self {
    Self::default()
  }

  /// Interns `value`, returning its handle. Repeated interning of the same
  /// string returns the same handle.
  pub fn intern(&mut self, value: &str) -> StringHandle {
    if let Some(handle) = self.lookup.get(value) {
      return *handle;
    }
    let handle = StringHandle(self.strings.len() as u32);
    self.strings.push(value.to_owned());
    self.lookup.insert(value.to_owned(), handle);
    handle
  }

  pub fn resolve(&self, handle: StringHandle) -> &str {
    &self.strings[handle.0 as usize]
  }
}

impl StringHandle {
  /// The handle's raw index, for embedding into a string-backed register's
  /// `u32` buffer (see [`crate::vm`]).
  pub fn index(self) -> u32 {
    self.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn interning_the_same_string_twice_returns_the_same_handle() {
    let mut pool = StringPool::new();
    let a = pool.intern("hsv");
    let b = pool.intern("hsv");
    assert_eq!(a, b);
    assert_eq!(pool.resolve(a), "hsv");
  }

  #[test]
  fn distinct_strings_get_distinct_handles() {
    let mut pool = StringPool::new();
    let a = pool.intern("hsv");
    let b = pool.intern("hsl");
    assert_ne!(a, b);
  }
}

use shading::error::{CollectingErrorPolicy, RenderError};
use shading::grid::Grid;
use shading::shader::{compile, CompileOptions};
use shading::vm::shade;

/// Compiles `source` and runs it over `grid`, panicking with the collected
/// diagnostics on any failure. Mirrors the compile-then-shade idiom the unit
/// tests in `src/vm.rs` already use, just hoisted out for reuse here.
pub fn compile_and_shade(source: &str, grid: &mut Grid) {
  let mut policy = CollectingErrorPolicy::new();
  let shader = compile(source, &CompileOptions::default(), &mut policy)
    .unwrap_or_else(|| panic!("compilation failed: {:#?}", policy.diagnostics()));
  shade(&shader, grid, &mut policy).expect("shading should not produce a runtime error");
}

/// Compiles `source`, returning `true` on success and `false` on any
/// diagnostic, for tests that assert a shader is rejected.
pub fn compiles(source: &str) -> bool {
  let mut policy = CollectingErrorPolicy::new();
  compile(source, &CompileOptions::default(), &mut policy).is_some()
}

/// Like [`compiles`], but also returns the collected diagnostics so a test
/// can assert on the error code and message text.
pub fn compile_diagnostics(source: &str) -> Vec<RenderError> {
  let mut policy = CollectingErrorPolicy::new();
  compile(source, &CompileOptions::default(), &mut policy);
  policy.diagnostics().to_vec()
}

//! A thin demonstration CLI: compiles an SL source file and prints its
//! diagnostics or its bytecode listing. Not a renderer — it never dices,
//! samples, or writes an image.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use shading::error::{CollectingErrorPolicy, ErrorPolicy};
use shading::shader::{compile, CompileOptions};

#[derive(Parser, Debug)]
#[command(name = "shadec", version, about = "Compiles an SL shader and prints its bytecode")]
struct Args {
  /// Path to the `.sl` source file to compile.
  path: PathBuf,

  /// Treat warnings (unknown color space, invalid display mode) as errors.
  #[arg(long)]
  warnings_as_errors: bool,

  /// Maximum diagnostics collected per phase before giving up early.
  #[arg(long, default_value_t = 32)]
  error_budget: usize,
}

fn main() -> anyhow::Result<()> {
  let args = Args::parse();

  let source = fs::read_to_string(&args.path)
    .with_context(|| format!("reading shader source from {}", args.path.display()))?;

  let options = CompileOptions {
    error_budget: args.error_budget,
    warnings_as_errors: args.warnings_as_errors,
    max_loop_unroll_depth: 0,
  };

  let mut policy = CollectingErrorPolicy::new();
  let shader = compile(&source, &options, &mut policy);

  for diagnostic in policy.diagnostics() {
    eprintln!("{diagnostic}");
  }

  let Some(shader) = shader else {
    anyhow::bail!("compilation of {} failed with {} error(s)", args.path.display(), policy.total_errors());
  };

  println!("; {:?} {}", shader.kind, shader.name);
  for (index, instruction) in shader.program.instructions.iter().enumerate() {
    println!("{index:>4}: {:?} {} {:?}", instruction.opcode, instruction.dispatch, instruction.slots);
  }

  Ok(())
}

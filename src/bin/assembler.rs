//! Assembly to binary image CLI.
//!
//! Reads an assembly source file, writes the packed binary image and a JSON trace of every
//! encoded instruction. Nothing is written unless the whole file assembles.
//!
//! # Usage
//! ```text
//! assembler -i <program.asm> -o <program.bin> -l <trace.json> [-v]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

use uvm::{assemble, Assembly};

#[derive(Parser)]
#[command(name = "assembler", version, about = "Assembler for the educational virtual machine")]
struct Cli {
  /// Assembly source file
  #[arg(short, long)]
  input: PathBuf,

  /// Binary image to write
  #[arg(short, long)]
  output: PathBuf,

  /// JSON trace of the encoded instructions
  #[arg(short, long)]
  log: PathBuf,

  /// Log every assembled line
  #[arg(short, long)]
  verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
  let level = if verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
    .init();
  Ok(())
}

/// Assembles `input`, then writes the image to `output` and the trace to `log`. Neither file is
/// touched unless the whole source assembles.
fn assemble_file(input: &Path, output: &Path, log: &Path) -> Result<Assembly> {
  let text = fs::read_to_string(input)
    .with_context(|| format!("cannot read {}", input.display()))?;

  let assembly = assemble(&text)
    .with_context(|| format!("assembly of {} failed", input.display()))?;
  let trace = assembly.trace.to_json().context("cannot serialize trace")?;

  fs::write(output, &assembly.image)
    .with_context(|| format!("cannot write {}", output.display()))?;
  fs::write(log, trace)
    .with_context(|| format!("cannot write {}", log.display()))?;
  Ok(assembly)
}

fn run(cli: &Cli) -> Result<()> {
  let assembly = assemble_file(&cli.input, &cli.output, &cli.log)?;
  info!(
    instructions = assembly.trace.len(),
    bytes = assembly.image.len(),
    output = %cli.output.display(),
    "assembled"
  );
  Ok(())
}

fn main() {
  let cli = Cli::parse();
  if let Err(e) = init_logging(cli.verbose) {
    eprintln!("cannot initialize logging: {}", e);
    process::exit(1);
  }

  if let Err(e) = run(&cli) {
    eprintln!("error: {:#}", e);
    process::exit(1);
  }
}

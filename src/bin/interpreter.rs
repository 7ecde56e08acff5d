//! Binary image interpreter CLI.
//!
//! Executes a binary image on a fresh machine and writes the requested inclusive memory range as
//! `{"memory": [...]}`. The range is validated before the program runs, and the result file is
//! only written after the program halts cleanly.
//!
//! # Usage
//! ```text
//! interpreter -i <program.bin> -r <start:end> -o <result.json> [--memory-size N] [--step-limit N]
//!             [--trace] [--dump] [-v]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

use uvm::bytecode::disassemble;
use uvm::uvm::Observer;
use uvm::{MachineConfig, MemoryRange, Word, UVM};

#[derive(Parser)]
#[command(name = "interpreter", version, about = "Interpreter for the educational virtual machine")]
struct Cli {
  /// Binary image to execute
  #[arg(short, long)]
  input: PathBuf,

  /// Inclusive memory range to save, as start:end
  #[arg(short, long)]
  range: String,

  /// JSON file receiving the memory range
  #[arg(short, long)]
  output: PathBuf,

  /// Number of memory cells
  #[arg(long, default_value_t = uvm::uvm::DEFAULT_MEMORY_SIZE, value_parser = parse_memory_size)]
  memory_size: usize,

  /// Abort after this many instructions
  #[arg(long)]
  step_limit: Option<u64>,

  /// Print every step and the machine tables to stderr
  #[cfg(feature = "trace_computation")]
  #[arg(long)]
  trace: bool,

  /// Print the program listing and the final machine state to stderr
  #[arg(long)]
  dump: bool,

  /// Log every executed instruction
  #[arg(short, long)]
  verbose: bool,
}

#[derive(Serialize)]
struct MemoryDump<'a> {
  memory: &'a [Word]
}

fn parse_memory_size(text: &str) -> std::result::Result<usize, String> {
  match text.parse::<usize>() {
    Ok(0)     => Err("memory must have at least one cell".to_string()),
    Ok(size)  => Ok(size),
    Err(e)    => Err(e.to_string())
  }
}

fn init_logging(verbose: bool) -> Result<()> {
  let level = if verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
    .init();
  Ok(())
}

/**
  Runs the image in `input` on a fresh machine and writes the `request`ed memory range to
  `output`. The range is checked before execution, and `output` is only written once the program
  has halted cleanly. Returns the number of executed steps.
*/
fn interpret_file(
  input    : &Path,
  request  : &str,
  output   : &Path,
  config   : MachineConfig,
  observer : &mut dyn Observer,
  dump     : bool
) -> Result<u64>
{
  let image = fs::read(input)
    .with_context(|| format!("cannot read {}", input.display()))?;
  let range = MemoryRange::parse(request, config.memory_size)?;

  let mut machine = UVM::with_config(config);
  machine.load(image);

  if dump {
    match disassemble(machine.image()) {
      Ok(listing) => {
        for (offset, instruction) in listing {
          eprintln!("{:04}: {}", offset, instruction);
        }
      }
      Err(e) => eprintln!("listing incomplete: {}", e)
    }
  }

  let steps = machine.run_with(observer).context("execution failed")?;

  if dump {
    eprintln!("{}", machine);
  }

  let slice    = machine.memory_slice(&range)?;
  let document = serde_json::to_string_pretty(&MemoryDump { memory: slice })
    .context("cannot serialize result")?;
  fs::write(output, document)
    .with_context(|| format!("cannot write {}", output.display()))?;

  info!(steps, range = %range, output = %output.display(), "saved memory range");
  Ok(steps)
}

fn run(cli: &Cli) -> Result<()> {
  let config = MachineConfig {
    memory_size : cli.memory_size,
    step_limit  : cli.step_limit
  };

  #[cfg(feature = "trace_computation")]
  {
    if cli.trace {
      let mut table = uvm::uvm::StepTable::new(std::io::stderr());
      interpret_file(&cli.input, &cli.range, &cli.output, config, &mut table, cli.dump)?;
      table.finish().context("cannot write trace")?;
      return Ok(());
    }
  }

  interpret_file(&cli.input, &cli.range, &cli.output, config, &mut (), cli.dump)?;
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

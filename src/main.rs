// femtoc: compile a small C dialect to stack-machine assembly

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use femtoc::compiler::{Compiler, Limits};
use femtoc::vm::{MachineConfig, StdConsole};
use femtoc::Error;

#[derive(Parser, Debug)]
#[command(name = "femtoc", version, about = "Compile C to stack-machine assembly")]
struct Cli {
    /// C source file
    source: PathBuf,

    /// Write the assembly to FILE instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Assemble and run the program after compiling it
    #[arg(long)]
    run: bool,

    /// Trace every executed instruction to standard error (with --run)
    #[arg(short, long)]
    debug: bool,

    /// Stop the program after this many instructions (with --run)
    #[arg(long, value_name = "N")]
    step_limit: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, Error> {
    let source = fs::read_to_string(&cli.source)?;
    let compilation = Compiler::new(&source, Limits::default()).compile();

    // The output is written even on failure; its last line says which.
    match &cli.output {
        Some(path) => fs::write(path, &compilation.output)?,
        None if !cli.run => print!("{}", compilation.output),
        None => {}
    }
    let assembly = compilation.into_result()?;
    if !cli.run {
        return Ok(ExitCode::SUCCESS);
    }

    let config = MachineConfig {
        debug: cli.debug,
        step_limit: cli.step_limit,
        ..MachineConfig::default()
    };
    let outcome = femtoc::run_assembly(&assembly, config, StdConsole::new())?;
    Ok(ExitCode::from(outcome.result as u8))
}

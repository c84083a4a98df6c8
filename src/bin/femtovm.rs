// femtovm: assemble and run stack-machine assembly

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::info;

use femtoc::vm::constants::DEFAULT_MEMORY_WORDS;
use femtoc::vm::{assemble, Machine, MachineConfig, StdConsole};
use femtoc::Error;

#[derive(Parser, Debug)]
#[command(name = "femtovm", version, about = "Run stack-machine assembly")]
struct Cli {
    /// Trace every instruction to standard error
    #[arg(short, long)]
    debug: bool,

    /// Assembly file
    file: PathBuf,

    /// Pause after each traced instruction (with --debug)
    #[arg(long, value_name = "MS")]
    throttle_ms: Option<u64>,

    /// Stop after this many instructions
    #[arg(long, value_name = "N")]
    step_limit: Option<u64>,

    /// Size of the machine's memory, in words
    #[arg(long, value_name = "WORDS", default_value_t = DEFAULT_MEMORY_WORDS)]
    memory_words: usize,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(result) => {
            info!("program returned {}", result);
            // Exit status is the low byte of the result word.
            ExitCode::from(result as u8)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<i64, Error> {
    let text = fs::read_to_string(&cli.file)?;
    let image = assemble(&text)?;

    let config = MachineConfig {
        memory_words: cli.memory_words,
        step_limit: cli.step_limit,
        debug: cli.debug,
        throttle: cli.throttle_ms.map(Duration::from_millis),
        ..MachineConfig::default()
    };
    let mut machine = Machine::new(&image, config, StdConsole::new())?;
    Ok(machine.run()?)
}

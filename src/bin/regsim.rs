use std::{error::Error, fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use regbank::{
    BankConfig,
    demo::{DEMO_SCRIPT, demo_bank},
    script::Script,
};

/// Drive the demonstration register map with a command script.
#[derive(Parser, Debug)]
#[command(name = "regsim", version, about)]
struct Args {
    /// Script to run instead of the built-in walkthrough.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Number of accesses to keep in the bank history (printed at exit).
    #[arg(long, default_value_t = 0)]
    history: usize,

    /// Log register traffic at trace level (overridden by RUST_LOG).
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.verbose { "trace" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&args) {
        // The walkthrough fails some commands on purpose.
        Ok(failures) if failures == 0 || args.script.is_none() => ExitCode::SUCCESS,
        Ok(failures) => {
            eprintln!("{failures} command(s) failed");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("regsim: {err}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<usize, Box<dyn Error>> {
    let source = match &args.script {
        Some(path) => fs::read_to_string(path)?,
        None => DEMO_SCRIPT.to_string(),
    };
    let script = Script::parse(&source)?;
    let mut bank = demo_bank(BankConfig::new("demo").with_history(args.history))?;

    let mut out = String::new();
    let failures = script.run(&mut bank, &mut out)?;
    print!("{out}");

    if args.history > 0 {
        println!("\nhistory:");
        for record in bank.history() {
            println!("  {record}");
        }
    }
    Ok(failures)
}

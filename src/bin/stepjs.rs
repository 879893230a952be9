//! CLI tool for running JavaScript files with stepjs.
//!
//! Usage: stepjs [options] <file.js>
//!
//! Options:
//!   --trace             Print every instruction before it executes
//!   --skip-unsupported  Ignore unsupported syntax at runtime

use std::env;
use std::fs;
use std::process;

use stepjs::{Config, RunState, Runtime};

struct CliArgs {
    path: String,
    trace: bool,
    config: Config,
}

fn main() {
    if let Err(message) = run() {
        eprintln!("Error: {message}");
        process::exit(1);
    }
}

fn parse_args() -> Result<CliArgs, String> {
    let args: Vec<String> = env::args().collect();
    let mut trace = false;
    let mut config = Config::default();
    let mut path: Option<String> = None;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--trace" => trace = true,
            "--skip-unsupported" => config.skip_unsupported_nodes = true,
            "--help" | "-h" => {
                return Err("usage: stepjs [--trace] [--skip-unsupported] <file.js>".to_string());
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option '{other}'"));
            }
            other => {
                if path.is_some() {
                    return Err("expected exactly one input file".to_string());
                }
                path = Some(other.to_string());
            }
        }
    }

    let path = path.ok_or_else(|| "usage: stepjs [--trace] [--skip-unsupported] <file.js>".to_string())?;
    Ok(CliArgs { path, trace, config })
}

fn run() -> Result<(), String> {
    let args = parse_args()?;
    let source =
        fs::read_to_string(&args.path).map_err(|e| format!("cannot read {}: {e}", args.path))?;

    let mut runtime = Runtime::with_config(args.config);
    runtime.load(&source).map_err(|e| e.to_string())?;

    let result = if args.trace {
        trace_run(&mut runtime)?
    } else {
        match runtime.run().map_err(|e| e.to_string())? {
            RunState::Completed(value) => value,
            RunState::Halted(_) | RunState::Paused(_) => {
                return Err("execution halted unexpectedly".to_string());
            }
        }
    };

    println!("{}", result.to_js_string());
    Ok(())
}

fn trace_run(runtime: &mut Runtime) -> Result<stepjs::RuntimeValue, String> {
    loop {
        match runtime.step().map_err(|e| e.to_string())? {
            RunState::Paused(instruction) | RunState::Halted(instruction) => {
                eprintln!(
                    "{:>5}  {}  {}",
                    instruction.sequence_id, instruction.node, instruction.kind
                );
            }
            RunState::Completed(value) => return Ok(value),
        }
    }
}

use std::env;
use std::process::ExitCode;

mod commands;
mod error;

use error::{CliError, Result};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<()> {
    let program = args.first().map(String::as_str).unwrap_or("gguf");
    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage(program);
        return Err(CliError::Usage("missing command".to_string()));
    };

    match command {
        "show" => commands::show::run(&args[2..]),
        "inspect-tensor" => commands::inspect_tensor::run(&args[2..]),
        "compare" => commands::compare::run(&args[2..]),
        "split-mixtral" => commands::split_mixtral::run(&args[2..]),
        "help" | "-h" | "--help" => {
            print_usage(program);
            Ok(())
        }
        other => {
            print_usage(program);
            Err(CliError::Usage(format!("unknown command '{other}'")))
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("usage: {program} <command> [args]");
    eprintln!("commands:");
    eprintln!("  show <file.gguf> [--verbose]");
    eprintln!("  inspect-tensor <file.gguf> <name> [count]");
    eprintln!("  compare <a.gguf> <b.gguf>");
    eprintln!("  split-mixtral <32 digits 0-7> <in.gguf> <out.gguf>");
}

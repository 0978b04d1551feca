//! Thin CLI front end (grounded on `ouros-cli/src/main.rs`).
//!
//! A two-argument tool doesn't earn a flag-parsing dependency: this mirrors
//! the teacher's plain `std::env::args()` walk rather than pulling in `clap`.

use std::{env, fs, process::ExitCode, time::Instant};

use wisp::{EvalOptions, eval_string};

fn read_file(path: &str) -> Result<String, String> {
    let meta = fs::metadata(path).map_err(|e| format!("cannot read {path}: {e}"))?;
    if !meta.is_file() {
        return Err(format!("{path} is not a file"));
    }
    fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map_or("example.wisp", String::as_str);

    let source = match read_file(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    match eval_string(&source, EvalOptions::new()) {
        Ok(value) => {
            eprintln!("success after: {:?}\n{value}", start.elapsed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error after: {:?}\n{e}", start.elapsed());
            ExitCode::FAILURE
        }
    }
}

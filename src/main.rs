// Copyright (c) 2024 Mudit Bhargava
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//

// main.rs
//
// Entry point for the pipesim binary: wires the config and trace parsers,
// the pipeline engine, and the report writer together behind a small CLI.

use clap::Parser;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use pipesim::config::parse_config_file;
use pipesim::engine::simulate;
use pipesim::errors::PipesimError;
use pipesim::report::render;
use pipesim::trace::parse_trace;

/// Cycle-accurate Tomasulo pipeline simulator.
#[derive(Parser)]
#[command(name = "pipesim")]
#[command(about = "Simulates a Tomasulo-style out-of-order pipeline over an instruction trace")]
#[command(version)]
struct Cli {
    /// Path to the buffers/latencies configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Path to the instruction trace. Reads stdin when omitted.
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Default log level, overridable by RUST_LOG.
    #[arg(long, default_value = "info")]
    log_level: String,
}

const EX_DATAERR: u8 = 2;
const EX_SOFTWARE: u8 = 70;

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level)).init();

    let config = match parse_config_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("pipesim: {}", err);
            return ExitCode::from(EX_DATAERR);
        },
    };

    let instructions = match read_trace(cli.trace.as_deref()) {
        Ok(instructions) => instructions,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("pipesim: {}", err);
            return ExitCode::from(EX_DATAERR);
        },
    };

    let (timing, stalls) = match simulate(config, instructions) {
        Ok(outcome) => outcome,
        Err(err @ PipesimError::UnknownOpcode { .. }) => {
            log::error!("{}", err);
            eprintln!("pipesim: {}", err);
            return ExitCode::from(EX_DATAERR);
        },
        Err(err) => {
            log::error!("simulator invariant violated: {}", err);
            eprintln!("pipesim: internal error: {}", err);
            return ExitCode::from(EX_SOFTWARE);
        },
    };

    print!("{}", render(&config, timing.records(), &stalls));
    ExitCode::SUCCESS
}

fn read_trace(path: Option<&std::path::Path>) -> Result<Vec<pipesim::InstructionRecord>, PipesimError> {
    match path {
        Some(path) => {
            let file = std::fs::File::open(path).map_err(|source| PipesimError::ConfigUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
            parse_trace(io::BufReader::new(file))
        },
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| PipesimError::MalformedTrace { line: 0, reason: format!("failed to read stdin: {}", e) })?;
            parse_trace(text.as_bytes())
        },
    }
}

use std::{env, fs, process};

use anyhow::{bail, Context, Result};
use log::LevelFilter;

use lasm::{assemble, AsmError, Source};

const DEFAULT_OUTPUT: &str = "lasm.liq";

/// Configuration handed to the core: input order matters and is preserved
/// through to the output stream.
struct Args {
    inputs: Vec<String>,
    output: String,
    verbosity: u8,
}

fn usage() {
    eprintln!("usage: lasm [-o OUTPUT] [-v | -vv] INPUT...");
}

fn parse_args() -> Result<Args> {
    let mut inputs = Vec::new();
    let mut output = None;
    let mut verbosity = 0u8;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                output = Some(
                    args.next()
                        .ok_or_else(|| anyhow::Error::msg("-o requires a file name"))?,
                );
            }
            "-v" | "--verbose" => verbosity += 1,
            "-vv" => verbosity += 2,
            opt if opt.starts_with('-') => bail!("unknown option {}", opt),
            _ => inputs.push(arg),
        }
    }

    if inputs.is_empty() {
        usage();
        bail!("no input files");
    }

    Ok(Args {
        inputs,
        output: output.unwrap_or_else(|| DEFAULT_OUTPUT.to_owned()),
        verbosity,
    })
}

fn run() -> Result<()> {
    let args = parse_args()?;

    // The warn channel is always on; -v adds info, -vv adds debug.
    env_logger::Builder::new()
        .filter_level(match args.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        })
        .init();

    let mut sources = Vec::new();
    for path in &args.inputs {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
        sources.push(Source::new(path.clone(), text));
    }

    // Nothing below opens the output until every file has assembled, so a
    // fatal error can't leave a partially-written file behind.
    let bytes = assemble(&sources)?;

    fs::write(&args.output, &bytes).with_context(|| format!("writing {}", args.output))?;
    log::info!("wrote {} bytes to {}", bytes.len(), args.output);

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!();
        eprintln!("lasm: error!");
        match err.downcast::<AsmError>() {
            Ok(asm) => {
                eprintln!("{}", asm.kind);
                eprintln!("in file {}, on line {}", asm.file, asm.line);
            }
            Err(other) => eprintln!("{:#}", other),
        }
        process::exit(1);
    }
}

//! b6xzp: prefix a raw ROM image with a B6X header page.
//!
//! The payload is padded to whole 256-byte pages. Input `-` (or no input at
//! all) reads from stdin.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use b6x::rom::{self, DEFAULT_VERSION, HeaderInfo};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "b6xzp")]
#[command(about = "Append a B6X header to an input ROM, extended to the nearest whole page")]
struct Args {
    /// Title (up to 48 bytes)
    #[arg(short = 't', default_value = "")]
    title: String,

    /// Author (up to 32 bytes)
    #[arg(short = 'c', default_value = "")]
    author: String,

    /// Target version (16-bit hex)
    #[arg(short = 'v', value_parser = parse_version)]
    version: Option<u16>,

    /// Input ROM ('-' for stdin)
    #[arg(short = 'i', value_name = "INPUT")]
    input: Option<String>,

    /// Output ROM
    #[arg(short = 'o', value_name = "OUTPUT")]
    output: Option<String>,

    /// [INPUT] OUTPUT, when not given with -i / -o
    #[arg(value_name = "FILE", num_args = 0..=2)]
    files: Vec<String>,
}

fn parse_version(s: &str) -> Result<u16, String> {
    u16::from_str_radix(s, 16).map_err(|_| format!("invalid target version: {s}"))
}

/// Fill `-i` / `-o` from positionals in order, the way the flags would.
fn resolve(args: &Args) -> Result<(Option<String>, String), String> {
    let mut rest: VecDeque<String> = args.files.iter().cloned().collect();
    let input = args.input.clone().or_else(|| rest.pop_front());
    let output = args.output.clone().or_else(|| rest.pop_front());
    if let Some(extra) = rest.pop_front() {
        return Err(format!("invalid argument: {extra}"));
    }
    let output = output.ok_or_else(|| "output filename is missing".to_string())?;
    Ok((input, output))
}

fn read_input(input: Option<&str>) -> io::Result<Vec<u8>> {
    let mut payload = Vec::new();
    match input {
        None | Some("-") => {
            io::stdin().lock().read_to_end(&mut payload)?;
        }
        Some(path) => payload = fs::read(path)?,
    }
    Ok(payload)
}

fn run(args: &Args) -> Result<(), String> {
    let (input, output) = resolve(args)?;
    let payload = read_input(input.as_deref()).map_err(|e| format!("can't read input: {e}"))?;

    let info = HeaderInfo {
        title: args.title.clone(),
        author: args.author.clone(),
        version: args.version.unwrap_or(DEFAULT_VERSION),
        ..HeaderInfo::now()
    };
    let image = rom::stamp(&payload, &info).map_err(|e| e.to_string())?;
    fs::write(&output, &image).map_err(|e| format!("can't write {output}: {e}"))?;
    log::info!("{output}: {} pages", image.len() / rom::PAGE_SIZE);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

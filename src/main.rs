//! B6X console host.
//!
//! Boots a ROM image (optionally behind a separate BIOS image), then renders
//! frames either into a window (feature `display`) or headless.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use b6x::rom::{HEADERED_ENTRY, Rom};
use b6x::{Machine, MachineConfig, RunOutcome};
use clap::Parser;

/// Image booted when no ROM is named.
const DEFAULT_ROM: &str = "boot.rom";

#[derive(Parser, Debug)]
#[command(name = "b6x")]
#[command(about = "B6X fantasy console", long_about = None)]
struct Args {
    /// ROM image; also backs the ROM pager device
    rom: Option<PathBuf>,

    /// Boot image loaded at 0 and run from 0 instead of the ROM itself
    #[arg(long, value_name = "FILE")]
    bios: Option<PathBuf>,

    /// Entry point override (hex)
    #[arg(long, value_parser = parse_hex_u16)]
    entry: Option<u16>,

    /// Instruction bound per evaluator invocation
    #[arg(long)]
    step_limit: Option<u64>,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Frames to render in headless mode
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Save the last rendered frame as a PNG
    #[cfg(feature = "screenshot")]
    #[arg(long, value_name = "PNG")]
    screenshot: Option<PathBuf>,
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value {s:?}: {e}"))
}

fn window_title(rom: &Path) -> String {
    let name = rom.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    format!("B6X {:04x} - {name}", b6x::rom::DEFAULT_VERSION)
}

/// Read the ROM at `path`. Without `required` (a BIOS is booting instead) a
/// missing or unreadable file only leaves the pager without a backing image.
fn open_rom(path: &Path, required: bool) -> b6x::Result<Option<Rom>> {
    match Rom::from_file(path) {
        Ok(rom) => Ok(Some(rom)),
        Err(e) if !required => {
            log::warn!("rom: {}: {e}; pager has no image", path.display());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn log_header(rom: &Rom) {
    let Some(h) = rom.header() else {
        return;
    };
    log::info!(
        "rom: \"{}\" by \"{}\", version {:04x}, {} pages",
        h.title,
        h.author,
        h.version,
        h.page_count
    );
    if !h.verify(rom.bytes()) {
        log::warn!("rom: checksum mismatch (header says {:04x})", h.checksum);
    }
}

/// Image and entry point to boot: the BIOS from 0 when given, else the ROM.
fn boot_image(bios: Option<Vec<u8>>, rom: Option<&Rom>) -> (Vec<u8>, u16) {
    match (bios, rom) {
        (Some(image), _) => (image, 0),
        (None, Some(rom)) => (rom.bytes().to_vec(), rom.entry()),
        (None, None) => (Vec::new(), 0),
    }
}

fn boot(args: &Args) -> b6x::Result<Machine> {
    let rom_path = args.rom.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_ROM));
    let rom = open_rom(&rom_path, args.bios.is_none())?;
    if let Some(rom) = &rom {
        log_header(rom);
    }

    let mut config = MachineConfig::default();
    if let Some(limit) = args.step_limit {
        config = config.with_step_limit(limit);
    }

    let bios = match &args.bios {
        Some(path) => Some(std::fs::read(path)?),
        None => None,
    };
    let (image, entry) = boot_image(bios, rom.as_ref());
    let entry = args.entry.unwrap_or(entry);
    if args.bios.is_none() && entry == HEADERED_ENTRY {
        log::debug!("rom carries a header; skipping page 0");
    }

    let mut vm = Machine::with_default_devices(config, rom);
    if vm.boot(&image, entry) == RunOutcome::RanOff {
        log::warn!("boot code did not halt (exit code {})", RunOutcome::RanOff.code());
    }
    Ok(vm)
}

fn run_headless(vm: &mut Machine, args: &Args) -> b6x::Result<()> {
    let mut frame = vec![0u32; b6x::WIDTH * b6x::HEIGHT];
    for _ in 0..args.frames {
        vm.render(&mut frame);
    }
    log::info!("rendered {} frames", args.frames);

    #[cfg(feature = "screenshot")]
    if let Some(path) = &args.screenshot {
        b6x::screenshot::save_png(path, &frame)?;
    }
    Ok(())
}

fn run(args: Args) -> b6x::Result<()> {
    let mut vm = boot(&args)?;

    if args.headless {
        return run_headless(&mut vm, &args);
    }

    #[cfg(feature = "display")]
    {
        let title = window_title(args.rom.as_deref().unwrap_or(Path::new(DEFAULT_ROM)));
        b6x::display::run(vm, &title)
    }
    #[cfg(not(feature = "display"))]
    {
        let title = window_title(args.rom.as_deref().unwrap_or(Path::new(DEFAULT_ROM)));
        log::warn!("{title}: built without the display feature, running headless");
        run_headless(&mut vm, &args)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

use std::path::PathBuf;

use clap::Parser;
use log::{info, LevelFilter};
use nesu::{
    ppu::{HEIGHT, WIDTH},
    NES001,
};

/// Runs a cartridge without a window.
#[derive(Parser, Debug)]
#[command(name = "nesu-run")]
#[command(about = "Headless NES runner", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    #[arg(short, long)]
    rom: PathBuf,

    /// Number of frames to run
    #[arg(short, long, default_value = "60")]
    frames: u64,

    /// Pace emulation to the console's frame rate
    #[arg(long)]
    realtime: bool,

    /// Dump CPU state after execution
    #[arg(short = 'c', long)]
    dump_cpu: bool,

    /// Dump PPU state after execution
    #[arg(short = 'p', long)]
    dump_ppu: bool,

    /// Save the last frame as a PNG image
    #[arg(short, long)]
    screenshot: Option<PathBuf>,

    /// Log every executed instruction
    #[arg(short, long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.trace {
        logger.filter_module("nesu::cpu", LevelFilter::Trace);
    }
    logger.init();

    let cart = nesu_std::load_cartridge(&args.rom)?;
    let mut nes = NES001::new(cart);

    let summary = nesu_std::run(&mut nes, args.frames, args.realtime);
    info!(
        "ran {} frames in {:.2?} ({} CPU cycles)",
        summary.frames,
        summary.elapsed,
        nes.cpu().total_cycles
    );

    if args.dump_cpu {
        dump_cpu_state(&nes);
    }

    if args.dump_ppu {
        dump_ppu_state(&nes);
    }

    if let Some(path) = &args.screenshot {
        nesu_std::save_screenshot(path, nes.frame(), WIDTH as u32, HEIGHT as u32)?;
    }

    Ok(())
}

fn dump_cpu_state(nes: &NES001) {
    let cpu = nes.cpu();
    println!("\nCPU State:");
    println!("  {}", cpu.registers());
    println!("  Status: {:?}", cpu.status);
}

fn dump_ppu_state(nes: &NES001) {
    let ppu = nes.ppu();
    println!("\nPPU State:");
    println!("  Scanline: {}", ppu.scanline());
    println!("  Cycle: {}", ppu.cycle());
    println!("  Frames: {}", ppu.frame().count());
    println!("  CTRL: ${:02X}", ppu.ctrl().into_bits());
    println!("  MASK: ${:02X}", ppu.mask().into_bits());
    println!("  STATUS: ${:02X}", ppu.status().into_bits());
    println!("  v: ${:04X}  t: ${:04X}  x: {}", ppu.vram_address().addr(), ppu.temp_address().addr(), ppu.fine_x());
    println!("  OAMADDR: ${:02X}", ppu.oam_addr());
}

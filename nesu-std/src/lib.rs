use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
    thread,
    time::{Duration, Instant},
};

use anyhow::{ensure, Context};
use log::{debug, info};
use nesu::{Cartridge, NES001};

/// One NTSC frame, ~60.0988 Hz.
pub const FRAME_DURATION: Duration = Duration::from_nanos(16_639_267);

pub fn load_cartridge(path: impl AsRef<Path>) -> anyhow::Result<Cartridge> {
    let path = path.as_ref();
    let rom = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let cart = Cartridge::from_bytes(&rom)
        .with_context(|| format!("{} is not a usable cartridge", path.display()))?;
    debug!("loaded {} ({} bytes)", path.display(), rom.len());
    Ok(cart)
}

/// Accumulates wall-clock time and hands it out in whole frames.
pub struct FramePacer {
    target: Duration,
    last: Instant,
    accum: Duration,
}

impl FramePacer {
    pub fn new(target: Duration) -> Self {
        Self {
            target,
            last: Instant::now(),
            accum: Duration::ZERO,
        }
    }

    /// Frames owed since the last call. A stall of a second or more is
    /// forgiven rather than caught up.
    pub fn frames_due(&mut self) -> u32 {
        let now = Instant::now();
        self.frames_due_after(now - self.last, now)
    }

    fn frames_due_after(&mut self, mut delta: Duration, now: Instant) -> u32 {
        self.last = now;
        if delta >= Duration::from_secs(1) {
            delta = self.target;
            self.accum = Duration::ZERO;
        }

        self.accum += delta;
        let mut due = 0;
        while self.accum >= self.target {
            self.accum -= self.target;
            due += 1;
        }
        due
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub frames: u64,
    pub elapsed: Duration,
}

/// Runs `frames` frames, as fast as possible or paced to real time.
pub fn run(nes: &mut NES001, frames: u64, realtime: bool) -> RunSummary {
    let start = Instant::now();

    if !realtime {
        for _ in 0..frames {
            nes.tick_frame();
        }
        return RunSummary {
            frames,
            elapsed: start.elapsed(),
        };
    }

    let mut pacer = FramePacer::new(FRAME_DURATION);
    let mut done = 0;
    let mut second = Instant::now();
    let mut frames_this_second = 0;

    while done < frames {
        let due = (pacer.frames_due() as u64).min(frames - done);
        for _ in 0..due {
            nes.tick_frame();
        }
        done += due;
        frames_this_second += due;

        if second.elapsed() >= Duration::from_secs(1) {
            info!("{} fps", frames_this_second);
            frames_this_second = 0;
            second = Instant::now();
        }

        thread::sleep(Duration::from_millis(1));
    }

    RunSummary {
        frames: done,
        elapsed: start.elapsed(),
    }
}

/// Saves an RGB888 image as an 8-bit PNG.
pub fn save_screenshot(
    path: impl AsRef<Path>,
    rgb: &[u8],
    width: u32,
    height: u32,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    ensure!(
        rgb.len() == width as usize * height as usize * 3,
        "image is {} bytes, expected {}x{}x3",
        rgb.len(),
        width,
        height
    );

    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder
        .write_header()
        .and_then(|mut writer| writer.write_image_data(rgb))
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

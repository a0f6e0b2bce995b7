mod frame;
mod palette;
mod registers;

use alloc::{vec, vec::Vec};

pub use frame::{Frame, FRAME_BYTES, HEIGHT, WIDTH};
pub use palette::{palette_index, rgb, PALETTE_COLORS};
pub use registers::{PpuCtrl, PpuMask, PpuStatus, VramAddress};

use crate::bus::PpuBus;

pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES_PER_FRAME: u16 = 262;
pub const VBLANK_SCANLINE: u16 = 241;
pub const PRE_RENDER_SCANLINE: u16 = 261;

/// Dots the PPU sits idle after reset while the CPU runs its own reset sequence.
const WARMUP_DOTS: u16 = 3 * 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvalStage {
    Scan,
    Advance,
    Overflow,
    Done,
}

#[allow(clippy::upper_case_acronyms)]
pub struct PPU {
    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    oam_addr: u8,
    v: VramAddress,
    t: VramAddress,
    fine_x: u8,
    w: bool,
    data_buffer: u8,
    palette: [u8; 32],
    oam: [u8; 256],

    // Sprites found for the next scanline.
    secondary_oam: [u8; 32],
    sprite_count: u8,
    sprite_zero_next: bool,
    eval_n: u8,
    eval_stage: EvalStage,

    // Sprites being drawn on the current scanline.
    current_oam: [u8; 32],
    current_count: u8,
    sprite_zero_current: bool,
    sprite_patterns: [[u8; 2]; 8],

    nametable_latch: u8,
    attribute_latch: u8,
    pattern_lo_latch: u8,
    pattern_addr: u16,
    bg_shift: [u16; 2],
    bg_palette: [u8; 2],

    scanline: u16,
    cycle: u16,
    odd_frame: bool,
    warmup: u16,
    frame: Frame,
}

impl Default for PPU {
    fn default() -> Self {
        Self::new()
    }
}

impl PPU {
    pub fn new() -> Self {
        Self {
            ctrl: PpuCtrl::new(),
            mask: PpuMask::new(),
            status: PpuStatus::new(),
            oam_addr: 0,
            v: VramAddress::new(),
            t: VramAddress::new(),
            fine_x: 0,
            w: false,
            data_buffer: 0,
            palette: [0; 32],
            oam: [0; 256],
            secondary_oam: [0xFF; 32],
            sprite_count: 0,
            sprite_zero_next: false,
            eval_n: 0,
            eval_stage: EvalStage::Done,
            current_oam: [0xFF; 32],
            current_count: 0,
            sprite_zero_current: false,
            sprite_patterns: [[0; 2]; 8],
            nametable_latch: 0,
            attribute_latch: 0,
            pattern_lo_latch: 0,
            pattern_addr: 0,
            bg_shift: [0; 2],
            bg_palette: [0; 2],
            scanline: 0,
            cycle: 0,
            odd_frame: false,
            warmup: 0,
            frame: Frame::new(),
        }
    }

    /// OAM, palette RAM, `v` and the status flags survive a reset.
    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::new();
        self.mask = PpuMask::new();
        self.t = VramAddress::new();
        self.fine_x = 0;
        self.w = false;
        self.data_buffer = 0;
        self.current_count = 0;
        self.sprite_zero_current = false;
        self.eval_stage = EvalStage::Done;
        self.scanline = 0;
        self.cycle = 0;
        self.odd_frame = false;
        self.warmup = WARMUP_DOTS;
    }

    fn read(&self, address: u16, mem: &impl PpuBus) -> u8 {
        let address = address & 0x3FFF;
        if address >= 0x3F00 {
            self.palette[palette_index(address)]
        } else {
            mem.ppu_read(address)
        }
    }

    fn write(&mut self, address: u16, value: u8, mem: &mut impl PpuBus) {
        let address = address & 0x3FFF;
        if address >= 0x3F00 {
            self.palette[palette_index(address)] = value;
        } else {
            mem.ppu_write(address, value);
        }
    }

    fn vram_increment(&self) -> u16 {
        if self.ctrl.increment_32() {
            32
        } else {
            1
        }
    }

    fn on_render_line(&self) -> bool {
        self.scanline < 240 || self.scanline == PRE_RENDER_SCANLINE
    }

    /// CPU read of register `$2000 + register`. Write-only registers read 0.
    pub fn read_register(&mut self, register: u16, read_only: bool, mem: &impl PpuBus) -> u8 {
        match register & 7 {
            2 => {
                let value = self.status.into_bits() & 0xE0;
                if !read_only {
                    self.status.set_vblank(false);
                    self.w = false;
                }
                value
            }
            4 => self.oam[self.oam_addr as usize],
            7 => {
                let address = self.v.addr() & 0x3FFF;
                let value = if address >= 0x3F00 {
                    if !read_only {
                        // The buffer picks up the nametable byte underneath the palette.
                        self.data_buffer = mem.ppu_read(address & 0x2FFF);
                    }
                    self.palette[palette_index(address)]
                } else if read_only {
                    mem.ppu_read(address)
                } else {
                    let buffered = self.data_buffer;
                    self.data_buffer = mem.ppu_read(address);
                    buffered
                };
                if !read_only {
                    self.v = VramAddress::from_bits(
                        self.v.addr().wrapping_add(self.vram_increment()) & 0x7FFF,
                    );
                }
                value
            }
            _ => 0,
        }
    }

    /// CPU write of register `$2000 + register`.
    pub fn write_register(&mut self, register: u16, value: u8, mem: &mut impl PpuBus) {
        match register & 7 {
            0 => {
                self.ctrl = PpuCtrl::from_bits(value);
                self.t.set_nametable_x(value & 1 != 0);
                self.t.set_nametable_y(value & 2 != 0);
            }
            1 => self.mask = PpuMask::from_bits(value),
            3 => self.oam_addr = value,
            4 => {
                self.oam[self.oam_addr as usize] = value;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            5 => {
                if self.w {
                    self.t.set_coarse_y(value >> 3);
                    self.t.set_fine_y(value & 7);
                } else {
                    self.t.set_coarse_x(value >> 3);
                    self.fine_x = value & 7;
                }
                self.w = !self.w;
            }
            6 => {
                let t = self.t.into_bits();
                self.t = if self.w {
                    VramAddress::from_bits((t & 0xFF00) | value as u16)
                } else {
                    VramAddress::from_bits((t & 0x00FF) | (((value & 0x3F) as u16) << 8))
                };
                if self.w {
                    self.v = self.t;
                }
                self.w = !self.w;
            }
            7 => {
                self.write(self.v.addr(), value, mem);
                if self.mask.rendering_enabled() && self.on_render_line() {
                    self.v.increment_coarse_x();
                    self.v.increment_fine_y();
                } else {
                    self.v = VramAddress::from_bits(
                        self.v.addr().wrapping_add(self.vram_increment()) & 0x7FFF,
                    );
                }
            }
            // $2002 is read-only
            _ => {}
        }
    }

    /// OAM DMA payload, written through OAMADDR.
    pub fn write_oam_dma(&mut self, page: &[u8; 256]) {
        for &byte in page {
            self.oam[self.oam_addr as usize] = byte;
            self.oam_addr = self.oam_addr.wrapping_add(1);
        }
    }

    /// Advance one dot. Returns true when an NMI should be raised.
    pub fn clock(&mut self, mem: &impl PpuBus) -> bool {
        if self.warmup > 0 {
            self.warmup -= 1;
            return false;
        }

        let mut nmi = false;
        if self.on_render_line() {
            self.render_dot(mem);
            self.evaluate_sprites();
            self.sprite_fetch_dot(mem);
        } else if self.scanline == VBLANK_SCANLINE && self.cycle == 1 {
            self.status.set_vblank(true);
            nmi = self.ctrl.nmi_enable();
        }

        if self.scanline == 239 && self.cycle == 256 {
            self.frame.swap();
        }

        self.advance();
        nmi
    }

    fn advance(&mut self) {
        if self.scanline == PRE_RENDER_SCANLINE
            && self.cycle == DOTS_PER_SCANLINE - 2
            && self.odd_frame
            && self.mask.rendering_enabled()
        {
            self.cycle = DOTS_PER_SCANLINE - 1;
        }

        self.cycle += 1;
        if self.cycle == DOTS_PER_SCANLINE {
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline == SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.odd_frame = !self.odd_frame;
            }
        }
    }

    fn render_dot(&mut self, mem: &impl PpuBus) {
        let dot = self.cycle;
        if self.scanline == PRE_RENDER_SCANLINE && dot == 1 {
            self.status.set_vblank(false);
            self.status.set_sprite_overflow(false);
            self.status.set_sprite_0_hit(false);
        }

        let visible_dot = (1..=256).contains(&dot);
        if self.scanline < 240 && visible_dot {
            self.draw_pixel(dot - 1);
        }
        if !self.mask.rendering_enabled() {
            return;
        }

        if visible_dot || (321..=336).contains(&dot) {
            self.fetch_background((dot - 1) % 8, mem);
        }
        if (visible_dot || dot >= 328) && dot % 8 == 0 {
            self.v.increment_coarse_x();
        }
        if dot == 256 {
            self.v.increment_fine_y();
        }
        if dot == 257 {
            self.v.copy_bits(self.t, VramAddress::HORIZONTAL_BITS);
        }
        if self.scanline == PRE_RENDER_SCANLINE && (280..=304).contains(&dot) {
            self.v.copy_bits(self.t, VramAddress::VERTICAL_BITS);
        }
    }

    fn fetch_background(&mut self, stage: u16, mem: &impl PpuBus) {
        let v = self.v.addr();
        match stage {
            1 => self.nametable_latch = self.read(0x2000 | (v & 0x0FFF), mem),
            3 => {
                let attribute =
                    self.read(0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07), mem);
                let shift = ((self.v.coarse_y() & 2) << 1) | (self.v.coarse_x() & 2);
                self.attribute_latch = (attribute >> shift) & 3;
            }
            5 => {
                self.pattern_addr = ((self.ctrl.background_table_high() as u16) << 12)
                    | ((self.nametable_latch as u16) << 4)
                    | self.v.fine_y() as u16;
                self.pattern_lo_latch = self.read(self.pattern_addr, mem);
            }
            7 => {
                let hi = self.read(self.pattern_addr + 8, mem);
                self.bg_shift[0] = (self.bg_shift[0] >> 8) | ((self.pattern_lo_latch as u16) << 8);
                self.bg_shift[1] = (self.bg_shift[1] >> 8) | ((hi as u16) << 8);
                self.bg_palette[0] = self.bg_palette[1];
                self.bg_palette[1] = self.attribute_latch;
            }
            _ => {}
        }
    }

    /// Background pixel (0-3) and palette (0-3) at screen column `x`.
    fn background_pixel(&self, x: u16) -> (u8, u8) {
        let mut offset = 7 - (x % 8) as i16 - self.fine_x as i16;
        if offset < 0 {
            offset += 16;
        }
        let lo = (self.bg_shift[0] >> offset) & 1;
        let hi = (self.bg_shift[1] >> offset) & 1;
        let palette = self.bg_palette[(offset > 7) as usize];
        (((hi << 1) | lo) as u8, palette)
    }

    /// First opaque sprite at column `x`: (slot, pixel, palette, behind background).
    fn sprite_pixel(&self, x: u16) -> Option<(usize, u8, u8, bool)> {
        (0..self.current_count as usize).find_map(|slot| {
            let attributes = self.current_oam[slot * 4 + 2];
            let column = x.checked_sub(self.current_oam[slot * 4 + 3] as u16)?;
            if column >= 8 {
                return None;
            }
            let bit = if attributes & 0x40 != 0 { column } else { 7 - column };
            let [lo, hi] = self.sprite_patterns[slot];
            let pixel = (((hi >> bit) & 1) << 1) | ((lo >> bit) & 1);
            (pixel != 0).then_some((slot, pixel, attributes & 3, attributes & 0x20 != 0))
        })
    }

    fn draw_pixel(&mut self, x: u16) {
        let mut address = 0;
        if self.mask.rendering_enabled() {
            let (bg_pixel, bg_palette) = if self.mask.show_background()
                && (x >= 8 || self.mask.show_background_left())
            {
                self.background_pixel(x)
            } else {
                (0, 0)
            };

            let sprite = if self.mask.show_sprites() && (x >= 8 || self.mask.show_sprites_left()) {
                self.sprite_pixel(x)
            } else {
                None
            };

            if bg_pixel != 0 {
                address = ((bg_palette << 2) | bg_pixel) as u16;
            }
            if let Some((slot, pixel, palette, behind)) = sprite {
                if slot == 0 && self.sprite_zero_current && bg_pixel != 0 && x < 255 {
                    self.status.set_sprite_0_hit(true);
                }
                if bg_pixel == 0 || !behind {
                    address = 0x10 | ((palette << 2) | pixel) as u16;
                }
            }
        }

        let mut colour = self.palette[palette_index(address)];
        if self.mask.greyscale() {
            colour &= 0x30;
        }
        self.frame
            .set_pixel(x as usize, self.scanline as usize, rgb(colour));
    }

    fn sprite_in_range(&self, y: u8) -> bool {
        let row = self.scanline as i16 - y as i16;
        row >= 0 && row < self.ctrl.sprite_height() as i16
    }

    /// One step of secondary OAM evaluation for the next scanline.
    fn evaluate_sprites(&mut self) {
        if self.scanline >= 240 || !self.mask.rendering_enabled() {
            return;
        }

        match self.cycle {
            0 => {
                self.eval_n = 0;
                self.sprite_count = 0;
                self.sprite_zero_next = false;
                self.eval_stage = EvalStage::Scan;
            }
            dot @ 1..=64 => {
                if dot % 2 == 0 {
                    self.secondary_oam[(dot / 2 - 1) as usize] = 0xFF;
                }
            }
            65..=256 => self.evaluation_step(),
            _ => {}
        }
    }

    fn evaluation_step(&mut self) {
        let n = self.eval_n as usize;
        match self.eval_stage {
            EvalStage::Scan => {
                let y = self.oam[n * 4];
                let slot = self.sprite_count as usize * 4;
                self.secondary_oam[slot] = y;
                if self.sprite_in_range(y) {
                    self.secondary_oam[slot + 1..slot + 4].copy_from_slice(&self.oam[n * 4 + 1..n * 4 + 4]);
                    if n == 0 {
                        self.sprite_zero_next = true;
                    }
                    self.sprite_count += 1;
                }
                self.eval_stage = EvalStage::Advance;
            }
            EvalStage::Advance => {
                self.eval_n += 1;
                self.eval_stage = if self.eval_n >= 64 {
                    EvalStage::Done
                } else if self.sprite_count < 8 {
                    EvalStage::Scan
                } else {
                    EvalStage::Overflow
                };
            }
            EvalStage::Overflow => {
                if self.sprite_in_range(self.oam[n * 4]) {
                    self.status.set_sprite_overflow(true);
                    self.eval_stage = EvalStage::Done;
                    return;
                }
                self.eval_n += 1;
                if self.eval_n >= 64 {
                    self.eval_stage = EvalStage::Done;
                }
            }
            EvalStage::Done => {}
        }
    }

    /// Dots 257-320: latch the evaluated set and fetch its pattern rows.
    fn sprite_fetch_dot(&mut self, mem: &impl PpuBus) {
        if !self.mask.rendering_enabled() {
            return;
        }

        match self.cycle {
            257 => {
                self.oam_addr = 0;
                if self.scanline < 240 {
                    self.current_oam = self.secondary_oam;
                    self.current_count = self.sprite_count;
                    self.sprite_zero_current = self.sprite_zero_next;
                } else {
                    self.current_count = 0;
                    self.sprite_zero_current = false;
                }
            }
            dot @ 258..=320 if (dot - 257) % 8 == 7 => {
                self.oam_addr = 0;
                self.fetch_sprite_pattern(((dot - 257) / 8) as usize, mem);
            }
            258..=320 => self.oam_addr = 0,
            _ => {}
        }
    }

    fn fetch_sprite_pattern(&mut self, slot: usize, mem: &impl PpuBus) {
        if slot >= self.current_count as usize {
            self.sprite_patterns[slot] = [0, 0];
            return;
        }

        let entry = &self.current_oam[slot * 4..slot * 4 + 4];
        let (y, tile, attributes) = (entry[0], entry[1] as u16, entry[2]);
        let height = self.ctrl.sprite_height();
        let mut row = self.scanline.wrapping_sub(y as u16) & (height - 1);
        if attributes & 0x80 != 0 {
            row = height - 1 - row;
        }

        let address = if self.ctrl.tall_sprites() {
            let half = if row > 7 { 16 } else { 0 };
            ((tile & 1) << 12) | ((tile & 0xFE) << 4) | half | (row & 7)
        } else {
            ((self.ctrl.sprite_table_high() as u16) << 12) | (tile << 4) | row
        };

        self.sprite_patterns[slot] = [self.read(address, mem), self.read(address + 8, mem)];
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn ctrl(&self) -> PpuCtrl {
        self.ctrl
    }

    pub fn mask(&self) -> PpuMask {
        self.mask
    }

    pub fn status(&self) -> PpuStatus {
        self.status
    }

    pub fn oam_addr(&self) -> u8 {
        self.oam_addr
    }

    pub fn vram_address(&self) -> VramAddress {
        self.v
    }

    pub fn temp_address(&self) -> VramAddress {
        self.t
    }

    pub fn fine_x(&self) -> u8 {
        self.fine_x
    }

    pub fn write_toggle(&self) -> bool {
        self.w
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn cycle(&self) -> u16 {
        self.cycle
    }

    pub fn odd_frame(&self) -> bool {
        self.odd_frame
    }

    pub fn oam(&self) -> &[u8; 256] {
        &self.oam
    }

    pub fn palette(&self) -> &[u8; 32] {
        &self.palette
    }

    fn colour_rgb(&self, palette_address: u16) -> [u8; 3] {
        rgb(self.palette[palette_index(palette_address)])
    }

    /// One nametable (0-3) drawn with the current background pattern table
    /// and attribute palettes, as 256x240 RGB.
    pub fn render_nametable(&self, index: u8, mem: &impl PpuBus) -> Vec<u8> {
        let mut out = vec![0; FRAME_BYTES];
        let base = 0x2000 | ((index as u16 & 3) << 10);
        let table = (self.ctrl.background_table_high() as u16) << 12;

        for tile_y in 0..30u16 {
            for tile_x in 0..32u16 {
                let tile = self.read(base + tile_y * 32 + tile_x, mem) as u16;
                let attribute = self.read(base + 0x3C0 + (tile_y / 4) * 8 + tile_x / 4, mem);
                let shift = ((tile_y & 2) << 1) | (tile_x & 2);
                let palette = ((attribute >> shift) & 3) as u16;

                for row in 0..8u16 {
                    let lo = self.read(table | (tile << 4) | row, mem);
                    let hi = self.read(table | (tile << 4) | row | 8, mem);
                    for col in 0..8u16 {
                        let bit = 7 - col;
                        let pixel = ((((hi >> bit) & 1) << 1) | ((lo >> bit) & 1)) as u16;
                        let address = if pixel == 0 { 0 } else { (palette << 2) | pixel };
                        let x = (tile_x * 8 + col) as usize;
                        let y = (tile_y * 8 + row) as usize;
                        let offset = (y * WIDTH + x) * 3;
                        out[offset..offset + 3].copy_from_slice(&self.colour_rgb(address));
                    }
                }
            }
        }

        out
    }

    /// Pattern table `half` (0 or 1) as 128x128 RGB using palette `palette`
    /// (0-3 background, 4-7 sprite).
    pub fn render_pattern_table(&self, half: u8, palette: u8, mem: &impl PpuBus) -> Vec<u8> {
        const SIDE: usize = 128;
        let mut out = vec![0; SIDE * SIDE * 3];
        let base = (half as u16 & 1) << 12;
        let palette = (palette as u16 & 7) << 2;

        for tile in 0..256u16 {
            let (tile_x, tile_y) = ((tile % 16) as usize, (tile / 16) as usize);
            for row in 0..8u16 {
                let lo = self.read(base | (tile << 4) | row, mem);
                let hi = self.read(base | (tile << 4) | row | 8, mem);
                for col in 0..8usize {
                    let bit = 7 - col;
                    let pixel = ((((hi >> bit) & 1) << 1) | ((lo >> bit) & 1)) as u16;
                    let offset = ((tile_y * 8 + row as usize) * SIDE + tile_x * 8 + col) * 3;
                    out[offset..offset + 3].copy_from_slice(&self.colour_rgb(palette | pixel));
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOTS_PER_FRAME: usize = DOTS_PER_SCANLINE as usize * SCANLINES_PER_FRAME as usize;

    /// Flat 8 KB of CHR plus two nametables, vertically mirrored.
    struct TestVram {
        chr: Vec<u8>,
        nametables: Vec<u8>,
    }

    impl TestVram {
        fn new() -> Self {
            Self {
                chr: vec![0; 0x2000],
                nametables: vec![0; 0x800],
            }
        }

        /// Tile 1 is solid colour 1, and every nametable entry points at it.
        fn solid() -> Self {
            let mut vram = Self::new();
            for row in 0..8 {
                vram.chr[0x10 + row] = 0xFF;
            }
            for i in 0..0x3C0 {
                vram.nametables[i] = 1;
                vram.nametables[0x400 + i] = 1;
            }
            vram
        }
    }

    impl PpuBus for TestVram {
        fn ppu_read(&self, address: u16) -> u8 {
            if address < 0x2000 {
                self.chr[address as usize]
            } else {
                self.nametables[(address & 0x7FF) as usize]
            }
        }

        fn ppu_write(&mut self, address: u16, value: u8) {
            if address < 0x2000 {
                self.chr[address as usize] = value;
            } else {
                self.nametables[(address & 0x7FF) as usize] = value;
            }
        }
    }

    fn set_address(ppu: &mut PPU, vram: &mut TestVram, address: u16) {
        ppu.write_register(6, (address >> 8) as u8, vram);
        ppu.write_register(6, address as u8, vram);
    }

    fn run_to(ppu: &mut PPU, vram: &TestVram, scanline: u16, cycle: u16) {
        while !(ppu.scanline() == scanline && ppu.cycle() == cycle) {
            ppu.clock(vram);
        }
    }

    #[test]
    fn vblank_and_nmi_once_per_frame() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();
        ppu.write_register(0, 0x80, &mut vram);

        let nmis = (0..2 * DOTS_PER_FRAME).filter(|_| ppu.clock(&vram)).count();
        assert_eq!(nmis, 2);
        assert_eq!(ppu.frame().count(), 2);
        assert_eq!((ppu.scanline(), ppu.cycle()), (0, 0));
    }

    #[test]
    fn no_nmi_when_disabled() {
        let mut ppu = PPU::new();
        let vram = TestVram::new();
        assert!(!(0..DOTS_PER_FRAME).any(|_| ppu.clock(&vram)));
    }

    #[test]
    fn vblank_flag_timing_and_status_read() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();

        run_to(&mut ppu, &vram, VBLANK_SCANLINE, 1);
        assert!(!ppu.status().vblank());
        ppu.clock(&vram);
        assert!(ppu.status().vblank());

        ppu.write_register(5, 0x10, &mut vram);
        assert!(ppu.write_toggle());
        assert_eq!(ppu.read_register(2, true, &vram), 0x80);
        assert!(ppu.write_toggle());
        assert_eq!(ppu.read_register(2, false, &vram), 0x80);
        assert!(!ppu.write_toggle());
        assert_eq!(ppu.read_register(2, false, &vram), 0x00);

        run_to(&mut ppu, &vram, VBLANK_SCANLINE, 2);
        assert!(ppu.status().vblank());
        run_to(&mut ppu, &vram, PRE_RENDER_SCANLINE, 1);
        assert!(ppu.status().vblank());
        ppu.clock(&vram);
        assert!(!ppu.status().vblank());
    }

    #[test]
    fn data_reads_are_buffered_except_palette() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();

        set_address(&mut ppu, &mut vram, 0x2005);
        ppu.write_register(7, 0xAB, &mut vram);
        ppu.write_register(7, 0xCD, &mut vram);
        assert_eq!(vram.nametables[5], 0xAB);

        set_address(&mut ppu, &mut vram, 0x2005);
        assert_eq!(ppu.read_register(7, true, &vram), 0xAB);
        ppu.read_register(7, false, &vram);
        assert_eq!(ppu.read_register(7, false, &vram), 0xAB);
        assert_eq!(ppu.read_register(7, false, &vram), 0xCD);

        set_address(&mut ppu, &mut vram, 0x3F01);
        ppu.write_register(7, 0x21, &mut vram);
        set_address(&mut ppu, &mut vram, 0x3F01);
        assert_eq!(ppu.read_register(7, false, &vram), 0x21);
    }

    #[test]
    fn palette_mirror_round_trip() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();

        set_address(&mut ppu, &mut vram, 0x3F10);
        ppu.write_register(7, 0x2C, &mut vram);
        set_address(&mut ppu, &mut vram, 0x3F00);
        assert_eq!(ppu.read_register(7, false, &vram), 0x2C);

        set_address(&mut ppu, &mut vram, 0x3F08);
        ppu.write_register(7, 0x15, &mut vram);
        set_address(&mut ppu, &mut vram, 0x3F38);
        assert_eq!(ppu.read_register(7, false, &vram), 0x15);
        set_address(&mut ppu, &mut vram, 0x3F18);
        assert_eq!(ppu.read_register(7, false, &vram), 0x15);
        assert_eq!(ppu.palette()[0x08], 0x15);
    }

    #[test]
    fn data_increment_of_32() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();
        ppu.write_register(0, 0x04, &mut vram);
        set_address(&mut ppu, &mut vram, 0x2000);
        ppu.write_register(7, 1, &mut vram);
        ppu.write_register(7, 2, &mut vram);
        assert_eq!(vram.nametables[0x00], 1);
        assert_eq!(vram.nametables[0x20], 2);
        assert_eq!(ppu.vram_address().addr(), 0x2040);
    }

    #[test]
    fn scroll_and_address_writes_fill_t() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();

        ppu.write_register(0, 0x03, &mut vram);
        ppu.write_register(5, 0x7D, &mut vram);
        ppu.write_register(5, 0x5E, &mut vram);
        let t = ppu.temp_address();
        assert_eq!(t.coarse_x(), 15);
        assert_eq!(ppu.fine_x(), 5);
        assert_eq!(t.coarse_y(), 11);
        assert_eq!(t.fine_y(), 6);
        assert!(t.nametable_x() && t.nametable_y());

        ppu.write_register(6, 0xFF, &mut vram);
        assert_eq!(ppu.temp_address().addr() >> 8, 0x3F);
        ppu.write_register(6, 0x10, &mut vram);
        assert_eq!(ppu.vram_address().addr(), 0x3F10);
    }

    #[test]
    fn oam_dma_writes_through_oamaddr() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();
        ppu.write_register(3, 0x10, &mut vram);

        let page: [u8; 256] = core::array::from_fn(|i| i as u8);
        ppu.write_oam_dma(&page);
        assert_eq!(ppu.oam()[0x10], 0);
        assert_eq!(ppu.oam()[0x0F], 0xFF);
        assert_eq!(ppu.oam_addr(), 0x10);

        ppu.write_register(3, 0x11, &mut vram);
        assert_eq!(ppu.read_register(4, false, &vram), 1);
    }

    #[test]
    fn renders_background_tiles() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::solid();
        set_address(&mut ppu, &mut vram, 0x3F00);
        ppu.write_register(7, 0x0F, &mut vram);
        ppu.write_register(7, 0x30, &mut vram);
        set_address(&mut ppu, &mut vram, 0x0000);
        ppu.write_register(1, 0x0A, &mut vram);

        for _ in 0..2 * DOTS_PER_FRAME {
            ppu.clock(&vram);
        }
        assert_eq!(ppu.frame().pixel(100, 100), [0xFE, 0xFF, 0xFF]);
        assert_eq!(ppu.frame().pixel(0, 200), [0xFE, 0xFF, 0xFF]);
    }

    #[test]
    fn greyscale_backdrop_when_rendering_disabled() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::solid();
        set_address(&mut ppu, &mut vram, 0x3F00);
        ppu.write_register(7, 0x16, &mut vram);
        ppu.write_register(7, 0x0F, &mut vram);
        ppu.write_register(1, 0x01, &mut vram);

        for _ in 0..DOTS_PER_FRAME {
            ppu.clock(&vram);
        }
        assert_eq!(ppu.frame().pixel(17, 33), [0xA0, 0xA0, 0xA0]);
    }

    #[test]
    fn sprite_zero_hit_over_opaque_background() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::solid();
        let sprite = [10, 1, 0x00, 20];
        for (i, byte) in sprite.iter().enumerate() {
            ppu.write_register(3, i as u8, &mut vram);
            ppu.write_register(4, *byte, &mut vram);
        }
        set_address(&mut ppu, &mut vram, 0x0000);
        ppu.write_register(1, 0x1E, &mut vram);

        run_to(&mut ppu, &vram, 11, 20);
        assert!(!ppu.status().sprite_0_hit());
        run_to(&mut ppu, &vram, 11, 30);
        assert!(ppu.status().sprite_0_hit());
        assert_eq!(ppu.read_register(2, false, &vram) & 0x40, 0x40);

        run_to(&mut ppu, &vram, PRE_RENDER_SCANLINE, 2);
        assert!(!ppu.status().sprite_0_hit());
    }

    #[test]
    fn ninth_sprite_sets_overflow() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();
        ppu.write_register(3, 0, &mut vram);
        for i in 0..64u8 {
            let y = if i < 9 { 50 } else { 0xF0 };
            for byte in [y, 0, 0, i * 2] {
                ppu.write_register(4, byte, &mut vram);
            }
        }
        ppu.write_register(1, 0x10, &mut vram);

        run_to(&mut ppu, &vram, 49, 340);
        assert!(!ppu.status().sprite_overflow());
        run_to(&mut ppu, &vram, 51, 0);
        assert!(ppu.status().sprite_overflow());
    }

    #[test]
    fn eight_sprites_do_not_overflow() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();
        ppu.write_register(3, 0, &mut vram);
        for i in 0..64u8 {
            let y = if i < 8 { 50 } else { 0xF0 };
            for byte in [y, 0, 0, i] {
                ppu.write_register(4, byte, &mut vram);
            }
        }
        ppu.write_register(1, 0x10, &mut vram);
        run_to(&mut ppu, &vram, 60, 0);
        assert!(!ppu.status().sprite_overflow());
    }

    #[test]
    fn reset_idles_before_counting() {
        let mut ppu = PPU::new();
        let vram = TestVram::new();
        ppu.reset();
        for _ in 0..WARMUP_DOTS {
            ppu.clock(&vram);
        }
        assert_eq!((ppu.scanline(), ppu.cycle()), (0, 0));
        ppu.clock(&vram);
        assert_eq!(ppu.cycle(), 1);
    }

    #[test]
    fn pattern_table_viewer() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::solid();
        set_address(&mut ppu, &mut vram, 0x3F00);
        ppu.write_register(7, 0x0F, &mut vram);
        ppu.write_register(7, 0x30, &mut vram);

        let image = ppu.render_pattern_table(0, 0, &vram);
        assert_eq!(image.len(), 128 * 128 * 3);
        assert_eq!(&image[0..3], &[0, 0, 0]);
        let tile_one = 8 * 3;
        assert_eq!(&image[tile_one..tile_one + 3], &[0xFE, 0xFF, 0xFF]);

        let nametable = ppu.render_nametable(0, &vram);
        assert_eq!(nametable.len(), FRAME_BYTES);
        assert_eq!(&nametable[0..3], &[0xFE, 0xFF, 0xFF]);
    }

    /// Dots from one (0, 0) to the next, for each of `frames` frames.
    fn frame_lengths(ppu: &mut PPU, vram: &TestVram, frames: usize) -> Vec<usize> {
        (0..frames)
            .map(|_| {
                let mut dots = 0;
                loop {
                    ppu.clock(vram);
                    dots += 1;
                    if (ppu.scanline(), ppu.cycle()) == (0, 0) {
                        break dots;
                    }
                }
            })
            .collect()
    }

    #[test]
    fn odd_frames_skip_a_dot_while_rendering() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();
        ppu.write_register(1, 0x08, &mut vram);
        assert_eq!(
            frame_lengths(&mut ppu, &vram, 4),
            [DOTS_PER_FRAME, DOTS_PER_FRAME - 1, DOTS_PER_FRAME, DOTS_PER_FRAME - 1]
        );
        assert!(!ppu.odd_frame());
    }

    #[test]
    fn frames_keep_full_length_when_rendering_disabled() {
        let mut ppu = PPU::new();
        let vram = TestVram::new();
        assert_eq!(frame_lengths(&mut ppu, &vram, 4), [DOTS_PER_FRAME; 4]);
    }

    fn write_sprite(ppu: &mut PPU, vram: &mut TestVram, index: u8, sprite: [u8; 4]) {
        ppu.write_register(3, index * 4, vram);
        for byte in sprite {
            ppu.write_register(4, byte, vram);
        }
    }

    fn write_palette(ppu: &mut PPU, vram: &mut TestVram, address: u16, colours: &[u8]) {
        set_address(ppu, vram, address);
        for &colour in colours {
            ppu.write_register(7, colour, vram);
        }
        set_address(ppu, vram, 0x0000);
    }

    #[test]
    fn tall_sprite_flipped_vertically_reads_bottom_tile() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();
        // Odd tile index selects $1000; tile 3 covers $1020-$103F
        vram.chr[0x1037] = 0x80;
        write_sprite(&mut ppu, &mut vram, 0, [20, 3, 0x80, 40]);
        write_palette(&mut ppu, &mut vram, 0x3F11, &[0x30]);
        ppu.write_register(0, 0x20, &mut vram);
        ppu.write_register(1, 0x14, &mut vram);

        for _ in 0..2 * DOTS_PER_FRAME {
            ppu.clock(&vram);
        }
        let frame = ppu.frame();
        assert_eq!(frame.pixel(40, 21), rgb(0x30));
        assert_eq!(frame.pixel(41, 21), rgb(0x00));
        assert_eq!(frame.pixel(40, 22), rgb(0x00));
        assert_eq!(frame.pixel(40, 36), rgb(0x00));
    }

    #[test]
    fn sprite_flipped_horizontally() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();
        vram.chr[0x10] = 0x80;
        write_sprite(&mut ppu, &mut vram, 0, [30, 1, 0x40, 60]);
        write_sprite(&mut ppu, &mut vram, 1, [30, 1, 0x00, 100]);
        write_palette(&mut ppu, &mut vram, 0x3F11, &[0x30]);
        ppu.write_register(1, 0x14, &mut vram);

        for _ in 0..2 * DOTS_PER_FRAME {
            ppu.clock(&vram);
        }
        let frame = ppu.frame();
        assert_eq!(frame.pixel(67, 31), rgb(0x30));
        assert_eq!(frame.pixel(60, 31), rgb(0x00));
        assert_eq!(frame.pixel(100, 31), rgb(0x30));
        assert_eq!(frame.pixel(107, 31), rgb(0x00));
    }

    #[test]
    fn sprite_behind_background_shows_only_over_transparent_pixels() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::solid();
        write_sprite(&mut ppu, &mut vram, 0, [40, 1, 0x20, 16]);
        write_sprite(&mut ppu, &mut vram, 1, [40, 1, 0x00, 80]);
        write_sprite(&mut ppu, &mut vram, 2, [40, 1, 0x20, 0]);
        write_palette(&mut ppu, &mut vram, 0x3F00, &[0x0F, 0x30]);
        write_palette(&mut ppu, &mut vram, 0x3F11, &[0x16]);
        // Background hidden in the leftmost 8 columns, sprites shown there
        ppu.write_register(1, 0x1C, &mut vram);

        for _ in 0..2 * DOTS_PER_FRAME {
            ppu.clock(&vram);
        }
        let frame = ppu.frame();
        assert_eq!(frame.pixel(20, 44), rgb(0x30));
        assert_eq!(frame.pixel(84, 44), rgb(0x16));
        assert_eq!(frame.pixel(2, 44), rgb(0x16));
        assert_eq!(frame.pixel(2, 60), rgb(0x0F));
    }

    #[test]
    fn data_write_while_rendering_steps_scroll() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();
        ppu.write_register(1, 0x08, &mut vram);

        run_to(&mut ppu, &vram, 10, 100);
        set_address(&mut ppu, &mut vram, 0x202E);
        ppu.write_register(7, 0x42, &mut vram);
        assert_eq!(vram.nametables[0x2E], 0x42);
        assert_eq!(ppu.vram_address().addr(), 0x302F);

        run_to(&mut ppu, &vram, VBLANK_SCANLINE + 1, 10);
        set_address(&mut ppu, &mut vram, 0x202E);
        ppu.write_register(7, 0x43, &mut vram);
        assert_eq!(vram.nametables[0x2E], 0x43);
        assert_eq!(ppu.vram_address().addr(), 0x202F);
    }

    #[test]
    fn fine_x_change_takes_effect_mid_scanline() {
        let mut ppu = PPU::new();
        let mut vram = TestVram::new();
        // Tile 1: left half colour 1, right half transparent
        for row in 0..8 {
            vram.chr[0x10 + row] = 0xF0;
        }
        vram.nametables[..0x3C0].fill(1);
        write_palette(&mut ppu, &mut vram, 0x3F00, &[0x0F, 0x30]);
        ppu.write_register(1, 0x0A, &mut vram);

        run_to(&mut ppu, &vram, 100, 129);
        ppu.write_register(5, 0x02, &mut vram);
        run_to(&mut ppu, &vram, 240, 0);

        let frame = ppu.frame();
        assert_eq!(frame.pixel(122, 99), rgb(0x30));
        assert_eq!(frame.pixel(126, 99), rgb(0x0F));
        assert_eq!(frame.pixel(126, 100), rgb(0x0F));
        assert_eq!(frame.pixel(130, 100), rgb(0x0F));
        assert_eq!(frame.pixel(134, 100), rgb(0x30));
        assert_eq!(frame.pixel(134, 99), rgb(0x0F));
    }
}

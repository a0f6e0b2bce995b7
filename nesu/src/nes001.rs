use alloc::{string::String, sync::Arc, vec::Vec};

use crate::{
    bus::{Bus, PpuBus},
    cartridge::Cartridge,
    controller::{ButtonLatch, Controller},
    cpu::{self, MOS6502},
    error::CartridgeError,
    ppu::PPU,
};

/// The PPU's view of memory: 2 KB of console nametable RAM beside the
/// cartridge's CHR.
pub struct VideoMemory {
    ciram: [u8; 2048],
    cart: Cartridge,
}

impl VideoMemory {
    fn new(cart: Cartridge) -> Self {
        Self {
            ciram: [0; 2048],
            cart,
        }
    }

    fn ciram_index(&self, address: u16) -> usize {
        let folded = self.cart.mirrored_nametable_address(address);
        let folded = if folded >= 0x0800 {
            folded - 0x0400
        } else {
            folded
        };
        (folded & 0x07FF) as usize
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cart
    }
}

impl PpuBus for VideoMemory {
    fn ppu_read(&self, address: u16) -> u8 {
        let address = address & 0x3FFF;
        if address < 0x2000 {
            self.cart.ppu_read(address)
        } else {
            self.ciram[self.ciram_index(address)]
        }
    }

    fn ppu_write(&mut self, address: u16, value: u8) {
        let address = address & 0x3FFF;
        if address < 0x2000 {
            self.cart.ppu_write(address, value);
        } else {
            let index = self.ciram_index(address);
            self.ciram[index] = value;
        }
    }
}

/// Everything on the CPU's address bus.
pub struct NesBus {
    ram: [u8; 2048],
    ppu: PPU,
    vram: VideoMemory,
    controllers: [Option<Controller>; 2],
    oam_dma: bool,
}

impl NesBus {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            ram: [0; 2048],
            ppu: PPU::new(),
            vram: VideoMemory::new(cart),
            controllers: [None, None],
            oam_dma: false,
        }
    }

    pub fn ppu(&self) -> &PPU {
        &self.ppu
    }

    pub fn video_memory(&self) -> &VideoMemory {
        &self.vram
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.vram.cart
    }

    pub fn ram(&self) -> &[u8; 2048] {
        &self.ram
    }

    fn run_oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        let data: [u8; 256] = core::array::from_fn(|i| self.cpu_read(base | i as u16, false));
        self.ppu.write_oam_dma(&data);
        self.oam_dma = true;
    }
}

impl Bus for NesBus {
    fn cpu_read(&mut self, address: u16, read_only: bool) -> u8 {
        match address {
            0x0000..=0x1FFF => self.ram[(address & 0x07FF) as usize],
            0x2000..=0x3FFF => self
                .ppu
                .read_register(address & 7, read_only, &self.vram),
            0x4016 | 0x4017 => self.controllers[(address & 1) as usize]
                .as_ref()
                .map_or(0, |pad| pad.get_input(read_only)),
            // APU and test registers are not modelled
            0x4000..=0x401F => 0,
            _ => self.vram.cart.cpu_read(address),
        }
    }

    fn cpu_write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF => self.ram[(address & 0x07FF) as usize] = value,
            0x2000..=0x3FFF => self.ppu.write_register(address & 7, value, &mut self.vram),
            0x4014 => self.run_oam_dma(value),
            0x4016 => {
                for pad in self.controllers.iter().flatten() {
                    pad.set_strobe(value);
                }
            }
            0x4000..=0x401F => {}
            _ => self.vram.cart.cpu_write(address, value),
        }
    }

    fn take_oam_dma(&mut self) -> bool {
        core::mem::take(&mut self.oam_dma)
    }
}

/// A complete console: CPU plus everything on its bus.
pub struct NES001 {
    cpu: MOS6502,
    bus: NesBus,
}

impl NES001 {
    pub fn from_rom(rom: &[u8]) -> Result<Self, CartridgeError> {
        Ok(Self::new(Cartridge::from_bytes(rom)?))
    }

    pub fn new(cart: Cartridge) -> Self {
        let mut nes = Self {
            cpu: MOS6502::new(),
            bus: NesBus::new(cart),
        };
        nes.reset();
        nes
    }

    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        self.bus.ppu.reset();
    }

    /// One CPU cycle followed by three PPU dots.
    pub fn clock(&mut self) {
        self.cpu.clock(&mut self.bus);
        for _ in 0..3 {
            if self.bus.ppu.clock(&self.bus.vram) {
                self.cpu.nmi(&mut self.bus);
            }
        }
    }

    /// Finishes the instruction in flight, then runs one more. Returns the
    /// CPU cycles the new instruction took.
    pub fn step_instruction(&mut self) -> u64 {
        while !self.cpu.complete() {
            self.clock();
        }
        let start = self.cpu.total_cycles;
        loop {
            self.clock();
            if self.cpu.complete() {
                return self.cpu.total_cycles - start;
            }
        }
    }

    /// Runs until the PPU completes a frame.
    pub fn tick_frame(&mut self) {
        let frame = self.frame_count();
        while self.frame_count() == frame {
            self.clock();
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.bus.ppu.frame().count()
    }

    /// Last complete picture, 256x240 RGB.
    pub fn frame(&self) -> &[u8] {
        self.bus.ppu.frame().front()
    }

    pub fn nmi(&mut self) {
        self.cpu.nmi(&mut self.bus);
    }

    pub fn irq(&mut self) {
        self.cpu.irq(&mut self.bus);
    }

    pub fn connect_controller(&mut self, port: u8, controller: Controller) {
        self.bus.controllers[(port & 1) as usize] = Some(controller);
    }

    pub fn disconnect_controller(&mut self, port: u8) {
        self.bus.controllers[(port & 1) as usize] = None;
    }

    /// Plugs a standard joypad into `port` and hands back its button latch.
    pub fn connect_joypad(&mut self, port: u8) -> Arc<ButtonLatch> {
        let (pad, latch) = Controller::with_latch();
        self.connect_controller(port, pad);
        latch
    }

    pub fn cpu(&self) -> &MOS6502 {
        &self.cpu
    }

    pub fn ppu(&self) -> &PPU {
        &self.bus.ppu
    }

    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    pub fn cartridge(&self) -> &Cartridge {
        self.bus.cartridge()
    }

    /// Reads CPU memory without side effects.
    pub fn peek(&mut self, address: u16) -> u8 {
        self.bus.cpu_read(address, true)
    }

    pub fn ppu_read(&self, address: u16) -> u8 {
        self.bus.vram.ppu_read(address)
    }

    pub fn ppu_write(&mut self, address: u16, value: u8) {
        self.bus.vram.ppu_write(address, value);
    }

    pub fn disassemble(&mut self, address: u16) -> (String, u16) {
        cpu::disassemble(&mut self.bus, address)
    }

    pub fn render_nametable(&self, index: u8) -> Vec<u8> {
        self.bus.ppu.render_nametable(index, &self.bus.vram)
    }

    pub fn render_pattern_table(&self, half: u8, palette: u8) -> Vec<u8> {
        self.bus.ppu.render_pattern_table(half, palette, &self.bus.vram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{controller::Button, ines::tests::image};

    /// NROM-128 with a program at $8000 and the reset vector pointing at it.
    fn console(program: &[u8], flags6: u8) -> NES001 {
        let mut rom = image(1, 1, flags6, 0);
        let prg = 16;
        rom[prg..prg + program.len()].copy_from_slice(program);
        rom[prg + 0x3FFC] = 0x00;
        rom[prg + 0x3FFD] = 0x80;
        NES001::from_rom(&rom).unwrap()
    }

    #[test]
    fn work_ram_is_mirrored_every_2k() {
        let mut nes = console(&[], 0);
        nes.bus.cpu_write(0x0123, 0x5A);
        for base in [0x0000, 0x0800, 0x1000, 0x1800] {
            assert_eq!(nes.peek(base + 0x0123), 0x5A);
        }
        nes.bus.cpu_write(0x1FFF, 0x77);
        assert_eq!(nes.bus.ram()[0x07FF], 0x77);
    }

    #[test]
    fn ppu_registers_repeat_every_8_bytes() {
        let mut nes = console(&[], 0);
        nes.bus.cpu_write(0x3FFE, 0x21);
        nes.bus.cpu_write(0x2006, 0x08);
        assert_eq!(nes.ppu().vram_address().addr(), 0x2108);
        nes.bus.cpu_write(0x3FFF, 0x99);
        assert_eq!(nes.ppu_read(0x2108), 0x99);
    }

    #[test]
    fn unmapped_io_reads_zero() {
        let mut nes = console(&[], 0);
        assert_eq!(nes.peek(0x4015), 0);
        assert_eq!(nes.peek(0x4016), 0);
        assert_eq!(nes.peek(0x4017), 0);
        assert_eq!(nes.peek(0x401F), 0);
    }

    #[test]
    fn nametable_mirroring_through_bus() {
        let mut vertical = console(&[], 0x01);
        vertical.ppu_write(0x2005, 1);
        assert_eq!(vertical.ppu_read(0x2805), 1);
        assert_eq!(vertical.ppu_read(0x3005), 1);
        assert_eq!(vertical.ppu_read(0x2405), 0);

        let mut horizontal = console(&[], 0x00);
        horizontal.ppu_write(0x2805, 2);
        assert_eq!(horizontal.ppu_read(0x2C05), 2);
        assert_eq!(horizontal.ppu_read(0x2005), 0);
        horizontal.ppu_write(0x2405, 3);
        assert_eq!(horizontal.ppu_read(0x2005), 3);
    }

    #[test]
    fn oam_dma_copies_a_page() {
        let mut nes = console(&[], 0);
        for i in 0..256u16 {
            nes.bus.cpu_write(0x0200 + i, (i as u8).wrapping_mul(3));
        }
        nes.bus.cpu_write(0x4014, 0x02);
        assert!(nes.bus.take_oam_dma());
        assert!(!nes.bus.take_oam_dma());
        assert_eq!(nes.ppu().oam()[5], 15);
        assert_eq!(nes.ppu().oam()[255], 255u8.wrapping_mul(3));
    }

    #[test]
    fn joypad_on_port_one() {
        let mut nes = console(&[], 0);
        let latch = nes.connect_joypad(0);
        latch.set_button(Button::Start, true);

        nes.bus.cpu_write(0x4016, 1);
        nes.bus.cpu_write(0x4016, 0);
        let bits: Vec<u8> = (0..8).map(|_| nes.bus.cpu_read(0x4016, false)).collect();
        assert_eq!(bits, [0, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(nes.peek(0x4017), 0);
    }

    #[test]
    fn step_instruction_counts_cycles() {
        // LDA #$01; STA $0200; JMP $8005
        let mut nes = console(&[0xA9, 0x01, 0x8D, 0x00, 0x02, 0x4C, 0x05, 0x80], 0);
        assert_eq!(nes.step_instruction(), 2);
        assert_eq!(nes.step_instruction(), 4);
        assert_eq!(nes.peek(0x0200), 1);
        assert_eq!(nes.step_instruction(), 3);
        assert_eq!(nes.cpu().pc, 0x8005);
    }

    #[test]
    fn disassembles_from_cartridge() {
        let mut nes = console(&[0xA9, 0x01], 0);
        assert_eq!(nes.disassemble(0x8000), ("LDA #$01".into(), 2));
    }
}

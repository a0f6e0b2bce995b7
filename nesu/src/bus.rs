/// The CPU side of the system bus.
pub trait Bus {
    /// `read_only` reads must not disturb any device state, so debuggers can
    /// inspect registers with side effects.
    fn cpu_read(&mut self, address: u16, read_only: bool) -> u8;
    fn cpu_write(&mut self, address: u16, value: u8);

    /// Reports, once, that the last write started an OAM DMA transfer.
    fn take_oam_dma(&mut self) -> bool {
        false
    }
}

/// The PPU side of the bus: pattern tables and nametables, $0000-$3EFF.
pub trait PpuBus {
    fn ppu_read(&self, address: u16) -> u8;
    fn ppu_write(&mut self, address: u16, value: u8);
}

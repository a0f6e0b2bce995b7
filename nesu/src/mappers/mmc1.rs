use bitfield_struct::bitfield;
use log::{debug, warn};

use super::{prg_ram_index, write_chr, Mirroring};
use crate::{bit_helpers::SubType, ines::INES};

#[bitfield(u8)]
struct Control {
    #[bits(2)]
    mirroring: u8,
    #[bits(2)]
    prg_mode: u8,
    chr_4k_mode: bool,
    #[bits(3)]
    _padding: u8,
}

/// Mapper 1. Registers are loaded one bit at a time through a 5-bit
/// serial port at $8000-$FFFF.
#[allow(clippy::upper_case_acronyms)]
pub struct MMC1 {
    shift: u8,
    write_count: u8,
    control: Control,
    chr_bank_0: u8,
    chr_bank_1: u8,
    prg_bank: u8,
}

impl MMC1 {
    pub fn new() -> Self {
        Self {
            shift: 0,
            write_count: 0,
            control: Control::from_bits(0x0C),
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
        }
    }

    fn prg_ram_enabled(&self) -> bool {
        (self.prg_bank & 0x10) == 0
    }

    fn prg_bank_for(&self, ines: &INES, address: u16) -> usize {
        let upper = address >= 0xC000;
        let selected = (self.prg_bank & 0x0F) as usize;
        match self.control.prg_mode() {
            0 | 1 => (selected & !1) | upper as usize,
            2 => {
                if upper {
                    selected
                } else {
                    0
                }
            }
            _ => {
                if upper {
                    ines.prg_bank_count().saturating_sub(1)
                } else {
                    selected
                }
            }
        }
    }

    fn chr_index(&self, ines: &INES, address: u16) -> usize {
        let upper = address >= 0x1000;
        let window = if self.control.chr_4k_mode() {
            if upper {
                self.chr_bank_1
            } else {
                self.chr_bank_0
            }
        } else {
            (self.chr_bank_0 & 0x1E) | upper as u8
        };
        ines.chr_index_4k(window as usize, address.lower_4k())
    }

    pub fn mirroring(&self) -> Mirroring {
        match self.control.mirroring() {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    pub fn cpu_read(&self, ines: &INES, address: u16) -> u8 {
        match address {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled() {
                    ines.prg_ram[prg_ram_index(address)]
                } else {
                    0
                }
            }
            0x8000..=0xFFFF => ines.prg_byte(self.prg_bank_for(ines, address), address.lower_16k()),
            _ => {
                warn!("MMC1 read from unmapped ${:04X}", address);
                0
            }
        }
    }

    pub fn cpu_write(&mut self, ines: &mut INES, address: u16, value: u8) {
        match address {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled() {
                    ines.prg_ram[prg_ram_index(address)] = value;
                }
            }
            0x8000..=0xFFFF => self.serial_write(address, value),
            _ => warn!("MMC1 write ${:02X} to unmapped ${:04X}", value, address),
        }
    }

    fn serial_write(&mut self, address: u16, value: u8) {
        if (value & 0x80) != 0 {
            self.shift = 0;
            self.write_count = 0;
            return;
        }

        self.shift = (self.shift >> 1) | ((value & 1) << 4);
        self.write_count += 1;
        if self.write_count < 5 {
            return;
        }

        let data = self.shift & 0x1F;
        match (address >> 13) & 0b11 {
            0 => self.control = Control::from_bits(data),
            1 => self.chr_bank_0 = data,
            2 => self.chr_bank_1 = data,
            _ => self.prg_bank = data,
        }
        debug!("MMC1 register {} <- ${:02X}", (address >> 13) & 0b11, data);

        self.shift = 0;
        self.write_count = 0;
    }

    pub fn ppu_read(&self, ines: &INES, address: u16) -> u8 {
        ines.chr[self.chr_index(ines, address)]
    }

    pub fn ppu_write(&mut self, ines: &mut INES, address: u16, value: u8) {
        let index = self.chr_index(ines, address);
        write_chr(ines, index, address, value);
    }
}

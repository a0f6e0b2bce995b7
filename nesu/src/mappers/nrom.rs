use log::warn;

use super::{prg_ram_index, Mirroring};
use crate::{bit_helpers::SubType, ines::INES};

/// Mapper 0: 16 or 32 KB of fixed PRG, a single CHR bank.
#[allow(clippy::upper_case_acronyms)]
pub struct NROM {
    pub mirroring: Mirroring,
}

impl NROM {
    pub fn new(ines: &INES) -> Self {
        Self {
            mirroring: Mirroring::from_header(ines),
        }
    }

    pub fn cpu_read(&self, ines: &INES, address: u16) -> u8 {
        match address {
            0x6000..=0x7FFF => ines.prg_ram[prg_ram_index(address)],
            // NROM-128 repeats its only bank at $C000
            0x8000..=0xBFFF => ines.prg_byte(0, address.lower_16k()),
            0xC000..=0xFFFF => ines.prg_byte(1, address.lower_16k()),
            _ => {
                warn!("NROM read from unmapped ${:04X}", address);
                0
            }
        }
    }

    pub fn cpu_write(&mut self, ines: &mut INES, address: u16, value: u8) {
        match address {
            0x6000..=0x7FFF => ines.prg_ram[prg_ram_index(address)] = value,
            0x8000..=0xFFFF => {}
            _ => warn!("NROM write ${:02X} to unmapped ${:04X}", value, address),
        }
    }
}

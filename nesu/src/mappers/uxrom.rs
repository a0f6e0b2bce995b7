use log::warn;

use super::{prg_ram_index, Mirroring};
use crate::{bit_helpers::SubType, ines::INES};

/// Mapper 2: a switchable 16 KB bank at $8000, the last bank fixed at $C000.
pub struct UxROM {
    pub mirroring: Mirroring,
    selected_bank: u8,
    bank_mask: u8,
}

impl UxROM {
    pub fn new(ines: &INES) -> Self {
        let banks = ines.prg_bank_count().max(1).next_power_of_two();
        Self {
            mirroring: Mirroring::from_header(ines),
            selected_bank: 0,
            bank_mask: (banks - 1) as u8,
        }
    }

    pub fn cpu_read(&self, ines: &INES, address: u16) -> u8 {
        match address {
            0x6000..=0x7FFF => ines.prg_ram[prg_ram_index(address)],
            0x8000..=0xBFFF => ines.prg_byte(self.selected_bank as usize, address.lower_16k()),
            0xC000..=0xFFFF => ines.prg_byte(
                ines.prg_bank_count().saturating_sub(1),
                address.lower_16k(),
            ),
            _ => {
                warn!("UxROM read from unmapped ${:04X}", address);
                0
            }
        }
    }

    pub fn cpu_write(&mut self, ines: &mut INES, address: u16, value: u8) {
        match address {
            0x6000..=0x7FFF => ines.prg_ram[prg_ram_index(address)] = value,
            0x8000..=0xFFFF => self.selected_bank = value & self.bank_mask,
            _ => warn!("UxROM write ${:02X} to unmapped ${:04X}", value, address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ines::tests::image;

    #[test]
    fn switches_low_window_only() {
        let mut ines = INES::new(&image(8, 0, 0x20, 0)).unwrap();
        let mut uxrom = UxROM::new(&ines);
        assert_eq!(uxrom.cpu_read(&ines, 0x8000), 0);
        assert_eq!(uxrom.cpu_read(&ines, 0xC000), 7);

        uxrom.cpu_write(&mut ines, 0x8000, 3);
        assert_eq!(uxrom.cpu_read(&ines, 0x8000), 3);
        assert_eq!(uxrom.cpu_read(&ines, 0xFFFF), 7);
    }

    #[test]
    fn bank_number_is_masked_to_board_width() {
        let mut ines = INES::new(&image(8, 0, 0x20, 0)).unwrap();
        let mut uxrom = UxROM::new(&ines);
        uxrom.cpu_write(&mut ines, 0xFFF0, 0xFA);
        assert_eq!(uxrom.cpu_read(&ines, 0x8000), 2);
    }
}

use log::{info, warn};

use crate::{bit_helpers::SubType, error::CartridgeError, ines::INES};

mod mmc1;
mod nrom;
mod uxrom;

pub use mmc1::MMC1;
pub use nrom::NROM;
pub use uxrom::UxROM;

/// Nametable arrangement, as seen through the 2 KB of console VRAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenLower,
    SingleScreenUpper,
}

impl Mirroring {
    pub fn from_header(ines: &INES) -> Self {
        if ines.header.vertical_mirroring() {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    /// Folds a $2000-$3EFF PPU address onto the layout the bus expects:
    /// results below $0800 select CIRAM directly, results from $0800 up
    /// are shifted down by $0400 by the bus.
    pub fn nametable_address(self, address: u16) -> u16 {
        match self {
            Mirroring::Vertical => address & !0xF800,
            Mirroring::Horizontal => address & !0xF400,
            Mirroring::SingleScreenLower => address.lower_1k(),
            Mirroring::SingleScreenUpper => address.lower_1k() | 0x0400,
        }
    }
}

/// The bank switching hardware on the cartridge board.
pub enum Mapper {
    Nrom(NROM),
    Mmc1(MMC1),
    UxRom(UxROM),
}

impl Mapper {
    pub fn for_image(ines: &INES) -> Result<Self, CartridgeError> {
        if ines.header.flags6.four_screen() {
            warn!("four-screen VRAM is not fitted, using header mirroring");
        }

        let mapper = match ines.header.mapper_id {
            0 => Mapper::Nrom(NROM::new(ines)),
            1 => Mapper::Mmc1(MMC1::new()),
            2 => Mapper::UxRom(UxROM::new(ines)),
            id => return Err(CartridgeError::UnsupportedMapper(id)),
        };

        info!(
            "mapper {} ({}), PRG {}x16K, CHR {}, {:?}",
            ines.header.mapper_id,
            mapper.name(),
            ines.prg_bank_count(),
            if ines.is_chr_ram {
                "RAM"
            } else {
                "ROM"
            },
            ines.header.tv_system
        );

        Ok(mapper)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mapper::Nrom(_) => "NROM",
            Mapper::Mmc1(_) => "MMC1",
            Mapper::UxRom(_) => "UxROM",
        }
    }

    pub fn cpu_read(&self, ines: &INES, address: u16) -> u8 {
        match self {
            Mapper::Nrom(m) => m.cpu_read(ines, address),
            Mapper::Mmc1(m) => m.cpu_read(ines, address),
            Mapper::UxRom(m) => m.cpu_read(ines, address),
        }
    }

    pub fn cpu_write(&mut self, ines: &mut INES, address: u16, value: u8) {
        match self {
            Mapper::Nrom(m) => m.cpu_write(ines, address, value),
            Mapper::Mmc1(m) => m.cpu_write(ines, address, value),
            Mapper::UxRom(m) => m.cpu_write(ines, address, value),
        }
    }

    pub fn ppu_read(&self, ines: &INES, address: u16) -> u8 {
        match self {
            Mapper::Nrom(_) | Mapper::UxRom(_) => ines.chr[chr_8k_index(address)],
            Mapper::Mmc1(m) => m.ppu_read(ines, address),
        }
    }

    pub fn ppu_write(&mut self, ines: &mut INES, address: u16, value: u8) {
        match self {
            Mapper::Nrom(_) | Mapper::UxRom(_) => {
                write_chr(ines, chr_8k_index(address), address, value)
            }
            Mapper::Mmc1(m) => m.ppu_write(ines, address, value),
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        match self {
            Mapper::Nrom(m) => m.mirroring,
            Mapper::Mmc1(m) => m.mirroring(),
            Mapper::UxRom(m) => m.mirroring,
        }
    }

    pub fn mirrored_nametable_address(&self, address: u16) -> u16 {
        self.mirroring().nametable_address(address)
    }
}

fn chr_8k_index(address: u16) -> usize {
    address.lower_8k() as usize
}

/// Shared CHR write path: RAM takes the byte, ROM reports a fault.
fn write_chr(ines: &mut INES, index: usize, address: u16, value: u8) {
    if ines.is_chr_ram {
        ines.chr[index] = value;
    } else {
        warn!("write ${:02X} to CHR-ROM at ${:04X} ignored", value, address);
    }
}

/// $6000-$7FFF work RAM shared by every board here.
fn prg_ram_index(address: u16) -> usize {
    (address - 0x6000) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ines::tests::image;

    #[test]
    fn vertical_folds_horizontally_adjacent_tables() {
        let m = Mirroring::Vertical;
        assert_eq!(m.nametable_address(0x2000), 0x0000);
        assert_eq!(m.nametable_address(0x2400), 0x0400);
        assert_eq!(m.nametable_address(0x2800), 0x0000);
        assert_eq!(m.nametable_address(0x2C05), 0x0405);
    }

    #[test]
    fn horizontal_keeps_bit_11() {
        let m = Mirroring::Horizontal;
        assert_eq!(m.nametable_address(0x2000), 0x0000);
        assert_eq!(m.nametable_address(0x2400), 0x0000);
        assert_eq!(m.nametable_address(0x2800), 0x0800);
        assert_eq!(m.nametable_address(0x2C10), 0x0810);
    }

    #[test]
    fn single_screen() {
        assert_eq!(Mirroring::SingleScreenLower.nametable_address(0x2C10), 0x0010);
        assert_eq!(Mirroring::SingleScreenUpper.nametable_address(0x2010), 0x0410);
    }

    #[test]
    fn unknown_mapper_is_rejected() {
        let ines = INES::new(&image(1, 1, 0x30, 0)).unwrap();
        assert!(matches!(
            Mapper::for_image(&ines),
            Err(CartridgeError::UnsupportedMapper(3))
        ));
    }

    #[test]
    fn chr_rom_ignores_writes() {
        let mut ines = INES::new(&image(1, 1, 0, 0)).unwrap();
        let mut mapper = Mapper::for_image(&ines).unwrap();
        mapper.ppu_write(&mut ines, 0x0010, 0x55);
        assert_eq!(mapper.ppu_read(&ines, 0x0010), 0x80);
    }

    #[test]
    fn chr_ram_takes_writes() {
        let mut ines = INES::new(&image(1, 0, 0x20, 0)).unwrap();
        let mut mapper = Mapper::for_image(&ines).unwrap();
        mapper.ppu_write(&mut ines, 0x1FF0, 0x55);
        assert_eq!(mapper.ppu_read(&ines, 0x1FF0), 0x55);
    }
}

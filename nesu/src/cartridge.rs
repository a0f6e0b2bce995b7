use crate::{
    error::CartridgeError,
    ines::INES,
    mappers::{Mapper, Mirroring},
};

/// A cartridge image together with the board that switches its banks.
pub struct Cartridge {
    ines: INES,
    mapper: Mapper,
}

impl Cartridge {
    pub fn new(ines: INES) -> Result<Self, CartridgeError> {
        let mapper = Mapper::for_image(&ines)?;
        Ok(Self { ines, mapper })
    }

    pub fn from_bytes(rom: &[u8]) -> Result<Self, CartridgeError> {
        Self::new(INES::new(rom)?)
    }

    pub fn ines(&self) -> &INES {
        &self.ines
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn cpu_read(&self, address: u16) -> u8 {
        self.mapper.cpu_read(&self.ines, address)
    }

    pub fn cpu_write(&mut self, address: u16, value: u8) {
        self.mapper.cpu_write(&mut self.ines, address, value)
    }

    pub fn ppu_read(&self, address: u16) -> u8 {
        self.mapper.ppu_read(&self.ines, address)
    }

    pub fn ppu_write(&mut self, address: u16, value: u8) {
        self.mapper.ppu_write(&mut self.ines, address, value)
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    pub fn mirrored_nametable_address(&self, address: u16) -> u16 {
        self.mapper.mirrored_nametable_address(address)
    }
}

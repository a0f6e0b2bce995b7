use alloc::{vec, vec::Vec};
use bitfield_struct::bitfield;

use crate::{
    bit_helpers::{CHR_BANK_SIZE, MAX_BANKS, PRG_BANK_SIZE, PRG_RAM_SIZE, TRAINER_SIZE},
    error::FormatError,
};

pub const MAGIC: [u8; 4] = [b'N', b'E', b'S', 0x1A];
pub const HEADER_SIZE: usize = 16;

/// Header byte 6.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct Flags6 {
    pub vertical_mirroring: bool,
    pub battery: bool,
    pub trainer: bool,
    pub four_screen: bool,
    #[bits(4)]
    pub mapper_low: u8,
}

/// Header byte 7.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct Flags7 {
    pub vs_unisystem: bool,
    pub playchoice_10: bool,
    #[bits(2)]
    pub format_version: u8,
    #[bits(4)]
    pub mapper_high: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvSystem {
    Ntsc,
    Pal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub prg_rom_banks: u8,
    pub chr_rom_banks: u8,
    pub flags6: Flags6,
    pub flags7: Flags7,
    pub prg_ram_size: u8,
    pub tv_system: TvSystem,
    pub mapper_id: u8,
}

impl Header {
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self, FormatError> {
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }

        let flags6 = Flags6::from_bits(bytes[6]);
        let flags7 = Flags7::from_bits(bytes[7]);
        if flags7.format_version() == 2 {
            return Err(FormatError::Nes20Header);
        }

        let mut mapper_id = (flags7.mapper_high() << 4) | flags6.mapper_low();
        // Old dumping tools left garbage in byte 10 and beyond, which also
        // pollutes the upper mapper nibble.
        if (bytes[10] & 0x0F) != 0 {
            mapper_id &= 0x0F;
        }

        Ok(Self {
            prg_rom_banks: bytes[4],
            chr_rom_banks: bytes[5],
            flags6,
            flags7,
            prg_ram_size: bytes[8],
            tv_system: if (bytes[9] & 1) != 0 {
                TvSystem::Pal
            } else {
                TvSystem::Ntsc
            },
            mapper_id,
        })
    }

    pub fn vertical_mirroring(&self) -> bool {
        self.flags6.vertical_mirroring()
    }
}

struct SimpleBinaryReader<'a> {
    pos: usize,
    data: &'a [u8],
}

impl<'a> SimpleBinaryReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { pos: 0, data }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_slice(&mut self, len: usize, section: &'static str) -> Result<&'a [u8], FormatError> {
        let slice = self
            .data
            .get(self.pos..self.pos + len)
            .ok_or(FormatError::Truncated {
                section,
                expected: len,
                available: self.remaining(),
            })?;
        self.pos += len;
        Ok(slice)
    }
}

/// A parsed cartridge image: header, banked ROM and the cartridge-side RAM.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone)]
pub struct INES {
    pub header: Header,
    pub trainer: Option<Vec<u8>>,
    pub prg_rom: Vec<u8>,
    /// CHR-ROM, or CHR-RAM when the header declares no CHR banks.
    pub chr: Vec<u8>,
    pub is_chr_ram: bool,
    pub prg_ram: Vec<u8>,
}

impl INES {
    pub fn new(rom_data: &[u8]) -> Result<Self, FormatError> {
        let mut f = SimpleBinaryReader::new(rom_data);

        let mut header_bytes = [0_u8; HEADER_SIZE];
        header_bytes.copy_from_slice(f.read_slice(HEADER_SIZE, "header")?);
        let header = Header::parse(&header_bytes)?;

        if header.prg_rom_banks as usize > MAX_BANKS {
            return Err(FormatError::TooManyBanks {
                kind: "PRG-ROM",
                count: header.prg_rom_banks,
            });
        }
        if header.chr_rom_banks as usize > MAX_BANKS {
            return Err(FormatError::TooManyBanks {
                kind: "CHR-ROM",
                count: header.chr_rom_banks,
            });
        }

        let trainer = if header.flags6.trainer() {
            Some(f.read_slice(TRAINER_SIZE, "trainer")?.to_vec())
        } else {
            None
        };

        let prg_rom = f
            .read_slice(PRG_BANK_SIZE * header.prg_rom_banks as usize, "PRG-ROM")?
            .to_vec();

        let is_chr_ram = header.chr_rom_banks == 0;
        let chr = if is_chr_ram {
            vec![0; CHR_BANK_SIZE * MAX_BANKS]
        } else {
            f.read_slice(CHR_BANK_SIZE * header.chr_rom_banks as usize, "CHR-ROM")?
                .to_vec()
        };

        Ok(Self {
            header,
            trainer,
            prg_rom,
            chr,
            is_chr_ram,
            prg_ram: vec![0; PRG_RAM_SIZE],
        })
    }

    pub fn prg_bank_count(&self) -> usize {
        self.prg_rom.len() / PRG_BANK_SIZE
    }

    pub fn chr_bank_count(&self) -> usize {
        self.chr.len() / CHR_BANK_SIZE
    }

    /// Byte `offset` of 16 KB PRG bank `bank`, wrapping the bank number
    /// onto the banks actually present.
    pub fn prg_byte(&self, bank: usize, offset: u16) -> u8 {
        match self.prg_bank_count() {
            0 => 0,
            count => self.prg_rom[(bank % count) * PRG_BANK_SIZE + offset as usize],
        }
    }

    /// Index into CHR memory for a 4 KB window; out-of-range window numbers wrap.
    pub fn chr_index_4k(&self, window: usize, offset: u16) -> usize {
        let windows = self.chr.len() / 0x1000;
        (window % windows.max(1)) * 0x1000 + offset as usize
    }
}

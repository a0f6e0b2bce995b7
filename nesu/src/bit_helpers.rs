pub const PRG_BANK_SIZE: usize = 16 * 1024;
pub const CHR_BANK_SIZE: usize = 8 * 1024;
pub const PRG_RAM_SIZE: usize = 8 * 1024;
pub const TRAINER_SIZE: usize = 512;

/// Bank capacity of the image container, for both PRG and CHR.
pub const MAX_BANKS: usize = 32;

pub trait SubType<T> {
    fn lower_1k(&self) -> T;
    fn lower_4k(&self) -> T;
    fn lower_8k(&self) -> T;
    fn lower_16k(&self) -> T;
}

impl SubType<u16> for u16 {
    fn lower_1k(&self) -> u16 {
        self & 0x03FF
    }

    fn lower_4k(&self) -> u16 {
        self & 0x0FFF
    }

    fn lower_8k(&self) -> u16 {
        self & 0x1FFF
    }

    fn lower_16k(&self) -> u16 {
        self & 0x3FFF
    }
}

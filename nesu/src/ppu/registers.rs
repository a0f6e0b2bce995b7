use bitfield_struct::bitfield;

/// $2000
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct PpuCtrl {
    #[bits(2)]
    pub base_nametable: u8,
    pub increment_32: bool,
    pub sprite_table_high: bool,
    pub background_table_high: bool,
    pub tall_sprites: bool,
    pub master: bool,
    pub nmi_enable: bool,
}

impl PpuCtrl {
    pub fn sprite_height(&self) -> u16 {
        if self.tall_sprites() {
            16
        } else {
            8
        }
    }
}

/// $2001
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct PpuMask {
    pub greyscale: bool,
    pub show_background_left: bool,
    pub show_sprites_left: bool,
    pub show_background: bool,
    pub show_sprites: bool,
    pub emphasize_red: bool,
    pub emphasize_green: bool,
    pub emphasize_blue: bool,
}

impl PpuMask {
    pub fn rendering_enabled(&self) -> bool {
        self.show_background() || self.show_sprites()
    }
}

/// $2002. The low five bits are open bus and always read as zero here.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct PpuStatus {
    #[bits(5)]
    _open_bus: u8,
    pub sprite_overflow: bool,
    pub sprite_0_hit: bool,
    pub vblank: bool,
}

/// The internal `v`/`t` scroll address.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct VramAddress {
    #[bits(5)]
    pub coarse_x: u8,
    #[bits(5)]
    pub coarse_y: u8,
    pub nametable_x: bool,
    pub nametable_y: bool,
    #[bits(3)]
    pub fine_y: u8,
    _padding: bool,
}

impl VramAddress {
    pub const HORIZONTAL_BITS: u16 = 0x041F;
    pub const VERTICAL_BITS: u16 = 0x7BE0;

    pub fn addr(&self) -> u16 {
        self.into_bits() & 0x7FFF
    }

    pub fn copy_bits(&mut self, from: VramAddress, mask: u16) {
        *self = VramAddress::from_bits((self.into_bits() & !mask) | (from.into_bits() & mask));
    }

    pub fn increment_coarse_x(&mut self) {
        if self.coarse_x() == 31 {
            self.set_coarse_x(0);
            self.set_nametable_x(!self.nametable_x());
        } else {
            self.set_coarse_x(self.coarse_x() + 1);
        }
    }

    /// Row 29 is the last row of a nametable; rows 30 and 31 hold the
    /// attribute table and wrap without switching nametables.
    pub fn increment_fine_y(&mut self) {
        if self.fine_y() < 7 {
            self.set_fine_y(self.fine_y() + 1);
            return;
        }

        self.set_fine_y(0);
        match self.coarse_y() {
            29 => {
                self.set_coarse_y(0);
                self.set_nametable_y(!self.nametable_y());
            }
            31 => self.set_coarse_y(0),
            y => self.set_coarse_y(y + 1),
        }
    }
}

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bit_helpers;
pub mod bus;
pub mod cartridge;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod ines;
pub mod mappers;
pub mod nes001;
pub mod ppu;

pub use cartridge::Cartridge;
pub use controller::{Button, ButtonLatch, Controller, ControllerState, InputSource};
pub use error::{CartridgeError, FormatError};
pub use nes001::NES001;

use alloc::{format, string::String};

use super::instructions::{AddressingMode, INSTRUCTIONS};
use crate::bus::Bus;

/// Renders the instruction at `address` and returns it with its length in
/// bytes. Memory is read with `read_only` set, so this is safe on I/O space.
pub fn disassemble<B: Bus + ?Sized>(bus: &mut B, address: u16) -> (String, u16) {
    let opcode = bus.cpu_read(address, true);
    let instruction = INSTRUCTIONS[opcode as usize];
    let length = 1 + instruction.mode.operand_len();

    let byte = bus.cpu_read(address.wrapping_add(1), true);
    let word = ((bus.cpu_read(address.wrapping_add(2), true) as u16) << 8) | byte as u16;

    let operand = match instruction.mode {
        AddressingMode::Imp => String::new(),
        AddressingMode::Acc => String::from(" A"),
        AddressingMode::Imm => format!(" #${:02X}", byte),
        AddressingMode::Zp0 => format!(" ${:02X}", byte),
        AddressingMode::Zpx => format!(" ${:02X},X", byte),
        AddressingMode::Zpy => format!(" ${:02X},Y", byte),
        AddressingMode::Rel => {
            let target = address
                .wrapping_add(2)
                .wrapping_add_signed(byte as i8 as i16);
            format!(" ${:04X}", target)
        }
        AddressingMode::Abs => format!(" ${:04X}", word),
        AddressingMode::Abx => format!(" ${:04X},X", word),
        AddressingMode::Aby => format!(" ${:04X},Y", word),
        AddressingMode::Ind => format!(" (${:04X})", word),
        AddressingMode::Izx => format!(" (${:02X},X)", byte),
        AddressingMode::Izy => format!(" (${:02X}),Y", byte),
    };

    let prefix = if instruction.official { "" } else { "*" };
    (
        format!("{}{}{}", prefix, instruction.operation.mnemonic(), operand),
        length,
    )
}

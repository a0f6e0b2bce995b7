use AddressingMode::*;
use Operation::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Imp,
    Acc,
    Imm,
    Zp0,
    Zpx,
    Zpy,
    Rel,
    Abs,
    Abx,
    Aby,
    Ind,
    Izx,
    Izy,
}

impl AddressingMode {
    /// Operand bytes following the opcode.
    pub fn operand_len(self) -> u16 {
        match self {
            Imp | Acc => 0,
            Imm | Zp0 | Zpx | Zpy | Rel | Izx | Izy => 1,
            Abs | Abx | Aby | Ind => 2,
        }
    }
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Undocumented
    Lax, Sax, Dcp, Isb, Slo, Rla, Sre, Rra,
    /// Unstable undocumented opcodes, executed as no-ops.
    Xxx,
}

impl Operation {
    #[rustfmt::skip]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC", Bcs => "BCS",
            Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
            Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
            Inx => "INX", Iny => "INY", Jmp => "JMP", Jsr => "JSR", Lda => "LDA",
            Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
            Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC", Sec => "SEC",
            Sed => "SED", Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
            Tya => "TYA", Lax => "LAX", Sax => "SAX", Dcp => "DCP", Isb => "ISB",
            Slo => "SLO", Rla => "RLA", Sre => "SRE", Rra => "RRA", Xxx => "???",
        }
    }

    /// Whether the operation consumes the byte at the effective address.
    /// Stores and control transfers only need the address itself.
    pub fn reads_operand(self) -> bool {
        !matches!(
            self,
            Sta | Stx | Sty | Sax | Jmp | Jsr | Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs | Xxx
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub operation: Operation,
    pub mode: AddressingMode,
    pub cycles: u8,
    pub official: bool,
}

const fn op(operation: Operation, mode: AddressingMode, cycles: u8) -> Instruction {
    Instruction {
        operation,
        mode,
        cycles,
        official: true,
    }
}

const fn un(operation: Operation, mode: AddressingMode, cycles: u8) -> Instruction {
    Instruction {
        operation,
        mode,
        cycles,
        official: false,
    }
}

#[rustfmt::skip]
pub static INSTRUCTIONS: [Instruction; 256] = [
/* 0 */ op(Brk,Imm,7), op(Ora,Izx,6), un(Xxx,Imp,2), un(Slo,Izx,8), un(Nop,Zp0,3), op(Ora,Zp0,3), op(Asl,Zp0,5), un(Slo,Zp0,5),
        op(Php,Imp,3), op(Ora,Imm,2), op(Asl,Acc,2), un(Xxx,Imm,2), un(Nop,Abs,4), op(Ora,Abs,4), op(Asl,Abs,6), un(Slo,Abs,6),
/* 1 */ op(Bpl,Rel,2), op(Ora,Izy,5), un(Xxx,Imp,2), un(Slo,Izy,8), un(Nop,Zpx,4), op(Ora,Zpx,4), op(Asl,Zpx,6), un(Slo,Zpx,6),
        op(Clc,Imp,2), op(Ora,Aby,4), un(Nop,Imp,2), un(Slo,Aby,7), un(Nop,Abx,4), op(Ora,Abx,4), op(Asl,Abx,7), un(Slo,Abx,7),
/* 2 */ op(Jsr,Abs,6), op(And,Izx,6), un(Xxx,Imp,2), un(Rla,Izx,8), op(Bit,Zp0,3), op(And,Zp0,3), op(Rol,Zp0,5), un(Rla,Zp0,5),
        op(Plp,Imp,4), op(And,Imm,2), op(Rol,Acc,2), un(Xxx,Imm,2), op(Bit,Abs,4), op(And,Abs,4), op(Rol,Abs,6), un(Rla,Abs,6),
/* 3 */ op(Bmi,Rel,2), op(And,Izy,5), un(Xxx,Imp,2), un(Rla,Izy,8), un(Nop,Zpx,4), op(And,Zpx,4), op(Rol,Zpx,6), un(Rla,Zpx,6),
        op(Sec,Imp,2), op(And,Aby,4), un(Nop,Imp,2), un(Rla,Aby,7), un(Nop,Abx,4), op(And,Abx,4), op(Rol,Abx,7), un(Rla,Abx,7),
/* 4 */ op(Rti,Imp,6), op(Eor,Izx,6), un(Xxx,Imp,2), un(Sre,Izx,8), un(Nop,Zp0,3), op(Eor,Zp0,3), op(Lsr,Zp0,5), un(Sre,Zp0,5),
        op(Pha,Imp,3), op(Eor,Imm,2), op(Lsr,Acc,2), un(Xxx,Imm,2), op(Jmp,Abs,3), op(Eor,Abs,4), op(Lsr,Abs,6), un(Sre,Abs,6),
/* 5 */ op(Bvc,Rel,2), op(Eor,Izy,5), un(Xxx,Imp,2), un(Sre,Izy,8), un(Nop,Zpx,4), op(Eor,Zpx,4), op(Lsr,Zpx,6), un(Sre,Zpx,6),
        op(Cli,Imp,2), op(Eor,Aby,4), un(Nop,Imp,2), un(Sre,Aby,7), un(Nop,Abx,4), op(Eor,Abx,4), op(Lsr,Abx,7), un(Sre,Abx,7),
/* 6 */ op(Rts,Imp,6), op(Adc,Izx,6), un(Xxx,Imp,2), un(Rra,Izx,8), un(Nop,Zp0,3), op(Adc,Zp0,3), op(Ror,Zp0,5), un(Rra,Zp0,5),
        op(Pla,Imp,4), op(Adc,Imm,2), op(Ror,Acc,2), un(Xxx,Imm,2), op(Jmp,Ind,5), op(Adc,Abs,4), op(Ror,Abs,6), un(Rra,Abs,6),
/* 7 */ op(Bvs,Rel,2), op(Adc,Izy,5), un(Xxx,Imp,2), un(Rra,Izy,8), un(Nop,Zpx,4), op(Adc,Zpx,4), op(Ror,Zpx,6), un(Rra,Zpx,6),
        op(Sei,Imp,2), op(Adc,Aby,4), un(Nop,Imp,2), un(Rra,Aby,7), un(Nop,Abx,4), op(Adc,Abx,4), op(Ror,Abx,7), un(Rra,Abx,7),
/* 8 */ un(Nop,Imm,2), op(Sta,Izx,6), un(Nop,Imm,2), un(Sax,Izx,6), op(Sty,Zp0,3), op(Sta,Zp0,3), op(Stx,Zp0,3), un(Sax,Zp0,3),
        op(Dey,Imp,2), un(Nop,Imm,2), op(Txa,Imp,2), un(Xxx,Imm,2), op(Sty,Abs,4), op(Sta,Abs,4), op(Stx,Abs,4), un(Sax,Abs,4),
/* 9 */ op(Bcc,Rel,2), op(Sta,Izy,6), un(Xxx,Imp,2), un(Xxx,Izy,6), op(Sty,Zpx,4), op(Sta,Zpx,4), op(Stx,Zpy,4), un(Sax,Zpy,4),
        op(Tya,Imp,2), op(Sta,Aby,5), op(Txs,Imp,2), un(Xxx,Aby,5), un(Xxx,Abx,5), op(Sta,Abx,5), un(Xxx,Aby,5), un(Xxx,Aby,5),
/* A */ op(Ldy,Imm,2), op(Lda,Izx,6), op(Ldx,Imm,2), un(Lax,Izx,6), op(Ldy,Zp0,3), op(Lda,Zp0,3), op(Ldx,Zp0,3), un(Lax,Zp0,3),
        op(Tay,Imp,2), op(Lda,Imm,2), op(Tax,Imp,2), un(Xxx,Imm,2), op(Ldy,Abs,4), op(Lda,Abs,4), op(Ldx,Abs,4), un(Lax,Abs,4),
/* B */ op(Bcs,Rel,2), op(Lda,Izy,5), un(Xxx,Imp,2), un(Lax,Izy,5), op(Ldy,Zpx,4), op(Lda,Zpx,4), op(Ldx,Zpy,4), un(Lax,Zpy,4),
        op(Clv,Imp,2), op(Lda,Aby,4), op(Tsx,Imp,2), un(Xxx,Aby,4), op(Ldy,Abx,4), op(Lda,Abx,4), op(Ldx,Aby,4), un(Lax,Aby,4),
/* C */ op(Cpy,Imm,2), op(Cmp,Izx,6), un(Nop,Imm,2), un(Dcp,Izx,8), op(Cpy,Zp0,3), op(Cmp,Zp0,3), op(Dec,Zp0,5), un(Dcp,Zp0,5),
        op(Iny,Imp,2), op(Cmp,Imm,2), op(Dex,Imp,2), un(Xxx,Imm,2), op(Cpy,Abs,4), op(Cmp,Abs,4), op(Dec,Abs,6), un(Dcp,Abs,6),
/* D */ op(Bne,Rel,2), op(Cmp,Izy,5), un(Xxx,Imp,2), un(Dcp,Izy,8), un(Nop,Zpx,4), op(Cmp,Zpx,4), op(Dec,Zpx,6), un(Dcp,Zpx,6),
        op(Cld,Imp,2), op(Cmp,Aby,4), un(Nop,Imp,2), un(Dcp,Aby,7), un(Nop,Abx,4), op(Cmp,Abx,4), op(Dec,Abx,7), un(Dcp,Abx,7),
/* E */ op(Cpx,Imm,2), op(Sbc,Izx,6), un(Nop,Imm,2), un(Isb,Izx,8), op(Cpx,Zp0,3), op(Sbc,Zp0,3), op(Inc,Zp0,5), un(Isb,Zp0,5),
        op(Inx,Imp,2), op(Sbc,Imm,2), op(Nop,Imp,2), un(Sbc,Imm,2), op(Cpx,Abs,4), op(Sbc,Abs,4), op(Inc,Abs,6), un(Isb,Abs,6),
/* F */ op(Beq,Rel,2), op(Sbc,Izy,5), un(Xxx,Imp,2), un(Isb,Izy,8), un(Nop,Zpx,4), op(Sbc,Zpx,4), op(Inc,Zpx,6), un(Isb,Zpx,6),
        op(Sed,Imp,2), op(Sbc,Aby,4), un(Nop,Imp,2), un(Isb,Aby,7), un(Nop,Abx,4), op(Sbc,Abx,4), op(Inc,Abx,7), un(Isb,Abx,7),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_check_table() {
        let lda_abs_x = INSTRUCTIONS[0xBD];
        assert_eq!(lda_abs_x.operation, Lda);
        assert_eq!(lda_abs_x.mode, Abx);
        assert_eq!(lda_abs_x.cycles, 4);

        let jmp_ind = INSTRUCTIONS[0x6C];
        assert_eq!((jmp_ind.operation, jmp_ind.mode, jmp_ind.cycles), (Jmp, Ind, 5));

        assert_eq!(INSTRUCTIONS[0xEA].operation, Nop);
        assert!(INSTRUCTIONS[0xEA].official);
        assert!(!INSTRUCTIONS[0xEB].official);
        assert_eq!(INSTRUCTIONS[0x00].cycles, 7);
    }

    #[test]
    fn official_opcode_count() {
        assert_eq!(INSTRUCTIONS.iter().filter(|i| i.official).count(), 151);
    }
}

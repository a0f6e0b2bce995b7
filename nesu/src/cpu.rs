use core::fmt;

use bitfield_struct::bitfield;
use log::{log_enabled, trace, Level};

use crate::bus::Bus;

mod disasm;
mod instructions;

pub use disasm::disassemble;
pub use instructions::{AddressingMode, Instruction, Operation, INSTRUCTIONS};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

const STACK_PAGE: u16 = 0x0100;
const OAM_DMA_CYCLES: u16 = 513;

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct StatusRegister {
    pub carry: bool,
    pub zero: bool,
    pub interrupt_inhibit: bool,
    pub decimal: bool,
    pub break_: bool,
    pub unused: bool,
    pub overflow: bool,
    pub negative: bool,
}

/// The operand location an addressing mode resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    Implied,
    Accumulator,
    Memory(u16),
}

/// Register snapshot for debuggers and trace logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub p: u8,
    pub total_cycles: u64,
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.a, self.x, self.y, self.p, self.sp, self.total_cycles
        )
    }
}

/// The 2A03's 6502 core, without decimal mode. Each instruction executes on
/// its first cycle; the remaining cycles are spent idling so that bus
/// timing against the PPU stays cycle-accurate per instruction.
pub struct MOS6502 {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: StatusRegister,

    pub opcode: u8,
    pub operand: OperandType,
    pub fetched: u8,
    /// Cycles left before the next opcode fetch.
    pub cycles: u16,
    pub total_cycles: u64,
}

impl Default for MOS6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl MOS6502 {
    pub fn new() -> Self {
        Self {
            pc: 0,
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            status: StatusRegister::from_bits(0x24),
            opcode: 0,
            operand: OperandType::Implied,
            fetched: 0,
            cycles: 0,
            total_cycles: 0,
        }
    }

    pub fn registers(&self) -> Registers {
        Registers {
            pc: self.pc,
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            p: self.status.into_bits(),
            total_cycles: self.total_cycles,
        }
    }

    /// True between instructions.
    pub fn complete(&self) -> bool {
        self.cycles == 0
    }

    /// A, X and Y survive a reset.
    pub fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.pc = self.read16_at(RESET_VECTOR, bus);
        self.sp = 0xFD;
        self.status = StatusRegister::from_bits(0x24);
        self.operand = OperandType::Implied;
        self.fetched = 0;
        self.cycles = 7;
        self.total_cycles = 0;
    }

    pub fn irq<B: Bus>(&mut self, bus: &mut B) {
        if !self.status.interrupt_inhibit() {
            self.interrupt(IRQ_VECTOR, bus);
        }
    }

    pub fn nmi<B: Bus>(&mut self, bus: &mut B) {
        self.interrupt(NMI_VECTOR, bus);
    }

    fn interrupt<B: Bus>(&mut self, vector: u16, bus: &mut B) {
        self.push_stack16(self.pc, bus);
        let pushed = self.status.with_break_(false).with_unused(true);
        self.push_stack8(pushed.into_bits(), bus);
        self.status.set_interrupt_inhibit(true);
        self.pc = self.read16_at(vector, bus);
        self.cycles += 7;
    }

    /// One CPU cycle.
    pub fn clock<B: Bus>(&mut self, bus: &mut B) {
        if self.cycles == 0 {
            if log_enabled!(Level::Trace) {
                let (text, _) = disassemble(bus, self.pc);
                trace!("{:04X}  {:<14}{}", self.pc, text, self.registers());
            }

            self.opcode = self.read8(bus);
            let instruction = INSTRUCTIONS[self.opcode as usize];
            self.cycles = instruction.cycles as u16;

            let page_crossed = self.resolve(instruction.mode, bus);
            self.fetch(instruction.operation, bus);
            if self.execute(instruction.operation, bus) && page_crossed {
                self.cycles += 1;
            }

            if bus.take_oam_dma() {
                self.cycles += OAM_DMA_CYCLES + (self.total_cycles & 1) as u16;
            }
        }

        self.cycles -= 1;
        self.total_cycles += 1;
    }

    /// Finishes the instruction in flight, then runs exactly one more.
    /// Returns the cycles the new instruction took.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> u64 {
        while self.cycles > 0 {
            self.clock(bus);
        }
        let start = self.total_cycles;
        loop {
            self.clock(bus);
            if self.cycles == 0 {
                return self.total_cycles - start;
            }
        }
    }

    fn read8<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.cpu_read(self.pc, false);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    fn read16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read8(bus) as u16;
        let hi = self.read8(bus) as u16;
        (hi << 8) | lo
    }

    fn read16_at<B: Bus>(&self, address: u16, bus: &mut B) -> u16 {
        let lo = bus.cpu_read(address, false) as u16;
        let hi = bus.cpu_read(address.wrapping_add(1), false) as u16;
        (hi << 8) | lo
    }

    /// Zero-page pointer fetch; the high byte wraps within page zero.
    fn read16_zp<B: Bus>(&self, pointer: u8, bus: &mut B) -> u16 {
        let lo = bus.cpu_read(pointer as u16, false) as u16;
        let hi = bus.cpu_read(pointer.wrapping_add(1) as u16, false) as u16;
        (hi << 8) | lo
    }

    fn indexed(base: u16, index: u8) -> (u16, bool) {
        let ea = base.wrapping_add(index as u16);
        (ea, (base & 0xFF00) != (ea & 0xFF00))
    }

    /// Resolves the operand location. Returns whether a page boundary was
    /// crossed.
    fn resolve<B: Bus>(&mut self, mode: AddressingMode, bus: &mut B) -> bool {
        use AddressingMode::*;

        let (operand, page_crossed) = match mode {
            Imp => (OperandType::Implied, false),
            Acc => (OperandType::Accumulator, false),
            Imm => {
                let address = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (OperandType::Memory(address), false)
            }
            Zp0 => (OperandType::Memory(self.read8(bus) as u16), false),
            Zpx => {
                let zp_addr = self.read8(bus);
                (OperandType::Memory(zp_addr.wrapping_add(self.x) as u16), false)
            }
            Zpy => {
                let zp_addr = self.read8(bus);
                (OperandType::Memory(zp_addr.wrapping_add(self.y) as u16), false)
            }
            Rel => {
                let offset = self.read8(bus) as i8;
                let target = self.pc.wrapping_add_signed(offset as i16);
                (
                    OperandType::Memory(target),
                    (target & 0xFF00) != (self.pc & 0xFF00),
                )
            }
            Abs => (OperandType::Memory(self.read16(bus)), false),
            Abx => {
                let (ea, crossed) = Self::indexed(self.read16(bus), self.x);
                (OperandType::Memory(ea), crossed)
            }
            Aby => {
                let (ea, crossed) = Self::indexed(self.read16(bus), self.y);
                (OperandType::Memory(ea), crossed)
            }
            Ind => {
                // The pointer's high byte is fetched without carrying into
                // the page: JMP ($10FF) reads $10FF and $1000.
                let pointer = self.read16(bus);
                let hi_pointer = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
                let lo = bus.cpu_read(pointer, false) as u16;
                let hi = bus.cpu_read(hi_pointer, false) as u16;
                (OperandType::Memory((hi << 8) | lo), false)
            }
            Izx => {
                let pointer = self.read8(bus).wrapping_add(self.x);
                (OperandType::Memory(self.read16_zp(pointer, bus)), false)
            }
            Izy => {
                let pointer = self.read8(bus);
                let (ea, crossed) = Self::indexed(self.read16_zp(pointer, bus), self.y);
                (OperandType::Memory(ea), crossed)
            }
        };

        self.operand = operand;
        page_crossed
    }

    fn fetch<B: Bus>(&mut self, operation: Operation, bus: &mut B) {
        match self.operand {
            OperandType::Implied => {}
            OperandType::Accumulator => self.fetched = self.a,
            OperandType::Memory(address) => {
                self.fetched = bus.cpu_read(address, !operation.reads_operand())
            }
        }
    }

    fn put_value<B: Bus>(&mut self, value: u8, bus: &mut B) {
        match self.operand {
            OperandType::Implied => {}
            OperandType::Accumulator => self.a = value,
            OperandType::Memory(address) => bus.cpu_write(address, value),
        }
    }

    fn target(&self) -> u16 {
        match self.operand {
            OperandType::Memory(address) => address,
            _ => self.pc,
        }
    }

    fn set_zn(&mut self, value: u8) {
        self.status.set_zero(value == 0);
        self.status.set_negative((value & 0x80) != 0);
    }

    fn push_stack8<B: Bus>(&mut self, value: u8, bus: &mut B) {
        bus.cpu_write(STACK_PAGE + self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn push_stack16<B: Bus>(&mut self, value: u16, bus: &mut B) {
        self.push_stack8((value >> 8) as u8, bus);
        self.push_stack8(value as u8, bus);
    }

    fn pull_stack8<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.cpu_read(STACK_PAGE + self.sp as u16, false)
    }

    fn pull_stack16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pull_stack8(bus) as u16;
        let hi = self.pull_stack8(bus) as u16;
        (hi << 8) | lo
    }

    /// B and the unused bit are not stored in the register; keep ours.
    fn pull_status<B: Bus>(&mut self, bus: &mut B) {
        let pulled = self.pull_stack8(bus) & 0xCF;
        let kept = self.status.into_bits() & 0x30;
        self.status = StatusRegister::from_bits(pulled | kept);
    }

    fn adc(&mut self, value: u8) {
        let result = self.a as u16 + value as u16 + self.status.carry() as u16;
        let result8 = result as u8;

        self.status.set_carry(result > 0xFF);
        self.status
            .set_overflow((!(self.a ^ value) & (self.a ^ result8) & 0x80) != 0);
        self.set_zn(result8);
        self.a = result8;
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.status.set_carry(register >= value);
        self.set_zn(register.wrapping_sub(value));
    }

    fn branch(&mut self, condition: bool) -> bool {
        if condition {
            self.cycles += 1;
            self.pc = self.target();
        }
        condition
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.status.set_carry((value & 0x80) != 0);
        let result = value << 1;
        self.set_zn(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.status.set_carry((value & 1) != 0);
        let result = value >> 1;
        self.set_zn(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let result = (value << 1) | self.status.carry() as u8;
        self.status.set_carry((value & 0x80) != 0);
        self.set_zn(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | ((self.status.carry() as u8) << 7);
        self.status.set_carry((value & 1) != 0);
        self.set_zn(result);
        result
    }

    /// Runs `operation` on the resolved operand. Returns whether the
    /// operation pays the extra cycle when its addressing crossed a page.
    fn execute<B: Bus>(&mut self, operation: Operation, bus: &mut B) -> bool {
        use Operation::*;

        let value = self.fetched;
        match operation {
            Adc => {
                self.adc(value);
                true
            }
            // A - M - (1 - C) == A + !M + C
            Sbc => {
                self.adc(!value);
                true
            }
            And => {
                self.a &= value;
                self.set_zn(self.a);
                true
            }
            Ora => {
                self.a |= value;
                self.set_zn(self.a);
                true
            }
            Eor => {
                self.a ^= value;
                self.set_zn(self.a);
                true
            }
            Asl => {
                let result = self.asl(value);
                self.put_value(result, bus);
                false
            }
            Lsr => {
                let result = self.lsr(value);
                self.put_value(result, bus);
                false
            }
            Rol => {
                let result = self.rol(value);
                self.put_value(result, bus);
                false
            }
            Ror => {
                let result = self.ror(value);
                self.put_value(result, bus);
                false
            }
            Bit => {
                self.status.set_zero((self.a & value) == 0);
                self.status.set_negative((value & 0x80) != 0);
                self.status.set_overflow((value & 0x40) != 0);
                false
            }
            Bcc => self.branch(!self.status.carry()),
            Bcs => self.branch(self.status.carry()),
            Beq => self.branch(self.status.zero()),
            Bne => self.branch(!self.status.zero()),
            Bmi => self.branch(self.status.negative()),
            Bpl => self.branch(!self.status.negative()),
            Bvc => self.branch(!self.status.overflow()),
            Bvs => self.branch(self.status.overflow()),
            Brk => {
                // The padding byte after BRK was consumed as an immediate.
                self.push_stack16(self.pc, bus);
                self.push_stack8(self.status.into_bits() | 0x30, bus);
                self.status.set_interrupt_inhibit(true);
                self.pc = self.read16_at(IRQ_VECTOR, bus);
                false
            }
            Clc => {
                self.status.set_carry(false);
                false
            }
            Cld => {
                self.status.set_decimal(false);
                false
            }
            Cli => {
                self.status.set_interrupt_inhibit(false);
                false
            }
            Clv => {
                self.status.set_overflow(false);
                false
            }
            Sec => {
                self.status.set_carry(true);
                false
            }
            Sed => {
                self.status.set_decimal(true);
                false
            }
            Sei => {
                self.status.set_interrupt_inhibit(true);
                false
            }
            Cmp => {
                self.compare(self.a, value);
                true
            }
            Cpx => {
                self.compare(self.x, value);
                false
            }
            Cpy => {
                self.compare(self.y, value);
                false
            }
            Dec => {
                let result = value.wrapping_sub(1);
                self.set_zn(result);
                self.put_value(result, bus);
                false
            }
            Inc => {
                let result = value.wrapping_add(1);
                self.set_zn(result);
                self.put_value(result, bus);
                false
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.set_zn(self.x);
                false
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.set_zn(self.y);
                false
            }
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.set_zn(self.x);
                false
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.set_zn(self.y);
                false
            }
            Jmp => {
                self.pc = self.target();
                false
            }
            Jsr => {
                self.push_stack16(self.pc.wrapping_sub(1), bus);
                self.pc = self.target();
                false
            }
            Rts => {
                self.pc = self.pull_stack16(bus).wrapping_add(1);
                false
            }
            Rti => {
                self.pull_status(bus);
                self.pc = self.pull_stack16(bus);
                false
            }
            Lda => {
                self.a = value;
                self.set_zn(value);
                true
            }
            Ldx => {
                self.x = value;
                self.set_zn(value);
                true
            }
            Ldy => {
                self.y = value;
                self.set_zn(value);
                true
            }
            Sta => {
                self.put_value(self.a, bus);
                false
            }
            Stx => {
                self.put_value(self.x, bus);
                false
            }
            Sty => {
                self.put_value(self.y, bus);
                false
            }
            Pha => {
                self.push_stack8(self.a, bus);
                false
            }
            Php => {
                self.push_stack8(self.status.into_bits() | 0x30, bus);
                false
            }
            Pla => {
                self.a = self.pull_stack8(bus);
                self.set_zn(self.a);
                false
            }
            Plp => {
                self.pull_status(bus);
                false
            }
            Tax => {
                self.x = self.a;
                self.set_zn(self.x);
                false
            }
            Tay => {
                self.y = self.a;
                self.set_zn(self.y);
                false
            }
            Tsx => {
                self.x = self.sp;
                self.set_zn(self.x);
                false
            }
            Txa => {
                self.a = self.x;
                self.set_zn(self.a);
                false
            }
            Txs => {
                self.sp = self.x;
                false
            }
            Tya => {
                self.a = self.y;
                self.set_zn(self.a);
                false
            }
            Nop => true,
            Xxx => false,

            Lax => {
                self.a = value;
                self.x = value;
                self.set_zn(value);
                true
            }
            Sax => {
                self.put_value(self.a & self.x, bus);
                false
            }
            Dcp => {
                let result = value.wrapping_sub(1);
                self.put_value(result, bus);
                self.compare(self.a, result);
                false
            }
            Isb => {
                let result = value.wrapping_add(1);
                self.put_value(result, bus);
                self.adc(!result);
                false
            }
            Slo => {
                let result = self.asl(value);
                self.put_value(result, bus);
                self.a |= result;
                self.set_zn(self.a);
                false
            }
            Rla => {
                let result = self.rol(value);
                self.put_value(result, bus);
                self.a &= result;
                self.set_zn(self.a);
                false
            }
            Sre => {
                let result = self.lsr(value);
                self.put_value(result, bus);
                self.a ^= result;
                self.set_zn(self.a);
                false
            }
            Rra => {
                let result = self.ror(value);
                self.put_value(result, bus);
                self.adc(result);
                false
            }
        }
    }
}

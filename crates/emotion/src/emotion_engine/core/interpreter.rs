use tracing::{debug, warn};

use crate::{
    bits::{Bits, SignExtend},
    bytes::Bytes,
    emotion_engine::bus::Bus,
};

use super::{
    control::Exception,
    instruction::{absolute_target, relative_target, Instruction},
    register::Register,
    Core,
};

const LWL_MASK: [u32; 4] = [0x00FF_FFFF, 0x0000_FFFF, 0x0000_00FF, 0x0000_0000];
const LWL_SHIFT: [u32; 4] = [24, 16, 8, 0];
const LWR_MASK: [u32; 4] = [0x0000_0000, 0xFF00_0000, 0xFFFF_0000, 0xFFFF_FF00];
const LWR_SHIFT: [u32; 4] = [0, 8, 16, 24];
const SWL_MASK: [u32; 4] = [0xFFFF_FF00, 0xFFFF_0000, 0xFF00_0000, 0x0000_0000];
const SWL_SHIFT: [u32; 4] = [24, 16, 8, 0];
const SWR_MASK: [u32; 4] = [0x0000_0000, 0x0000_00FF, 0x0000_FFFF, 0x00FF_FFFF];
const SWR_SHIFT: [u32; 4] = [0, 8, 16, 24];

const LDL_MASK: [u64; 8] = [
    0x00FF_FFFF_FFFF_FFFF,
    0x0000_FFFF_FFFF_FFFF,
    0x0000_00FF_FFFF_FFFF,
    0x0000_0000_FFFF_FFFF,
    0x0000_0000_00FF_FFFF,
    0x0000_0000_0000_FFFF,
    0x0000_0000_0000_00FF,
    0x0000_0000_0000_0000,
];
const LDL_SHIFT: [u32; 8] = [56, 48, 40, 32, 24, 16, 8, 0];
const LDR_MASK: [u64; 8] = [
    0x0000_0000_0000_0000,
    0xFF00_0000_0000_0000,
    0xFFFF_0000_0000_0000,
    0xFFFF_FF00_0000_0000,
    0xFFFF_FFFF_0000_0000,
    0xFFFF_FFFF_FF00_0000,
    0xFFFF_FFFF_FFFF_0000,
    0xFFFF_FFFF_FFFF_FF00,
];
const LDR_SHIFT: [u32; 8] = [0, 8, 16, 24, 32, 40, 48, 56];
const SDL_MASK: [u64; 8] = [
    0xFFFF_FFFF_FFFF_FF00,
    0xFFFF_FFFF_FFFF_0000,
    0xFFFF_FFFF_FF00_0000,
    0xFFFF_FFFF_0000_0000,
    0xFFFF_FF00_0000_0000,
    0xFFFF_0000_0000_0000,
    0xFF00_0000_0000_0000,
    0x0000_0000_0000_0000,
];
const SDL_SHIFT: [u32; 8] = [56, 48, 40, 32, 24, 16, 8, 0];
const SDR_MASK: [u64; 8] = [
    0x0000_0000_0000_0000,
    0x0000_0000_0000_00FF,
    0x0000_0000_0000_FFFF,
    0x0000_0000_00FF_FFFF,
    0x0000_0000_FFFF_FFFF,
    0x0000_00FF_FFFF_FFFF,
    0x0000_FFFF_FFFF_FFFF,
    0x00FF_FFFF_FFFF_FFFF,
];
const SDR_SHIFT: [u32; 8] = [0, 8, 16, 24, 32, 40, 48, 56];

const LOWER_HALF: u128 = u64::MAX as u128;

/// Which multiply/divide pipeline an instruction targets. Pipeline 1 keeps
/// HI1/LO1 in the upper halves of HI/LO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pipeline {
    Zero,
    One,
}

impl Core {
    pub fn set_delayed_branch_target(&mut self, target: u32) {
        self.state.branch_target = target;
        self.state.is_branching = true;
        self.state.delay_slot = 1;
    }

    fn branch(&mut self, condition: bool, target: u32) {
        if condition {
            self.set_delayed_branch_target(target);
        }
    }

    // Likely branches annul their delay slot when not taken.
    fn branch_likely(&mut self, condition: bool, target: u32, next_program_counter: &mut u32) {
        if condition {
            self.set_delayed_branch_target(target);
        } else {
            *next_program_counter = self.state.program_counter.wrapping_add(8);
        }
    }

    fn effective_address(&self, base: Register, offset: u16) -> u32 {
        let offset: u32 = offset.sign_extend();
        self.get_register::<u32>(base).wrapping_add(offset)
    }

    fn load<T: Bytes>(
        &mut self,
        bus: &mut Bus,
        base: Register,
        offset: u16,
    ) -> Result<T, Exception> {
        let address = self.effective_address(base, offset);
        if address & (T::WIDTH as u32 - 1) != 0 {
            return Err(Exception::AddressErrorLoad(address));
        }
        Ok(self.read_virtual(bus, address))
    }

    fn store<T: Bytes>(
        &mut self,
        bus: &mut Bus,
        base: Register,
        offset: u16,
        value: T,
    ) -> Result<(), Exception> {
        let address = self.effective_address(base, offset);
        if address & (T::WIDTH as u32 - 1) != 0 {
            return Err(Exception::AddressErrorStore(address));
        }
        self.write_virtual(bus, address, value);
        Ok(())
    }

    fn get_half(&self, register: Register, pipeline: Pipeline) -> u64 {
        let value = self.get_register::<u128>(register);
        match pipeline {
            Pipeline::Zero => value as u64,
            Pipeline::One => (value >> 64) as u64,
        }
    }

    fn set_half(&mut self, register: Register, pipeline: Pipeline, half: u64) {
        let value = self.get_register::<u128>(register);
        let value = match pipeline {
            Pipeline::Zero => value & !LOWER_HALF | half as u128,
            Pipeline::One => value & LOWER_HALF | (half as u128) << 64,
        };
        self.set_register(register, value);
    }

    fn set_hi_lo(&mut self, pipeline: Pipeline, hi: u32, lo: u32) {
        self.set_half(Register::Hi, pipeline, hi.sign_extend());
        self.set_half(Register::Lo, pipeline, lo.sign_extend());
    }

    fn multiply(&mut self, pipeline: Pipeline, rd: Register, product: u64) {
        let lo = product as u32;
        self.set_hi_lo(pipeline, (product >> 32) as u32, lo);
        self.set_register(rd, lo);
    }

    fn accumulator(&self, pipeline: Pipeline) -> u64 {
        let hi = self.get_half(Register::Hi, pipeline) as u32 as u64;
        let lo = self.get_half(Register::Lo, pipeline) as u32 as u64;
        hi << 32 | lo
    }

    fn divide(&mut self, pipeline: Pipeline, rs: Register, rt: Register) {
        let dividend = self.get_register::<i32>(rs);
        let divisor = self.get_register::<i32>(rt);
        let (quotient, remainder) = if divisor == 0 {
            (if dividend < 0 { 1 } else { -1 }, dividend)
        } else if dividend == i32::MIN && divisor == -1 {
            (i32::MIN, 0)
        } else {
            (dividend / divisor, dividend % divisor)
        };
        self.set_hi_lo(pipeline, remainder as u32, quotient as u32);
    }

    fn divide_unsigned(&mut self, pipeline: Pipeline, rs: Register, rt: Register) {
        let dividend = self.get_register::<u32>(rs);
        let divisor = self.get_register::<u32>(rt);
        let (quotient, remainder) = if divisor == 0 {
            (u32::MAX, dividend)
        } else {
            (dividend / divisor, dividend % divisor)
        };
        self.set_hi_lo(pipeline, remainder, quotient);
    }

    fn trap_if(condition: bool) -> Result<(), Exception> {
        if condition {
            Err(Exception::Trap)
        } else {
            Ok(())
        }
    }

    pub fn interpret_instruction(
        &mut self,
        instruction: Instruction,
        bus: &mut Bus,
    ) -> Result<(), Exception> {
        let program_counter = self.state.program_counter;
        let mut next_program_counter = program_counter.wrapping_add(4);
        let link_address = program_counter.wrapping_add(8);
        match instruction {
            Instruction::Unknown(data) => {
                warn!(
                    "Unknown instruction {:#010x} at {:#010x}",
                    data, program_counter
                );
            }
            Instruction::Sll(rd, rt, sa) => {
                let value = self.get_register::<u32>(rt) << sa;
                self.set_register(rd, value);
            }
            Instruction::Srl(rd, rt, sa) => {
                let value = self.get_register::<u32>(rt) >> sa;
                self.set_register(rd, value);
            }
            Instruction::Sra(rd, rt, sa) => {
                let value = self.get_register::<i32>(rt) >> sa;
                self.set_register(rd, value);
            }
            Instruction::Sllv(rd, rt, rs) => {
                let value = self.get_register::<u32>(rt) << self.get_register::<u32>(rs).bits(0..5);
                self.set_register(rd, value);
            }
            Instruction::Srlv(rd, rt, rs) => {
                let value = self.get_register::<u32>(rt) >> self.get_register::<u32>(rs).bits(0..5);
                self.set_register(rd, value);
            }
            Instruction::Srav(rd, rt, rs) => {
                let value = self.get_register::<i32>(rt) >> self.get_register::<u32>(rs).bits(0..5);
                self.set_register(rd, value);
            }
            Instruction::Jr(rs) => {
                self.set_delayed_branch_target(self.get_register::<u32>(rs));
            }
            Instruction::Jalr(rd, rs) => {
                let target = self.get_register::<u32>(rs);
                self.set_register(rd, link_address);
                self.set_delayed_branch_target(target);
            }
            Instruction::Movz(rd, rs, rt) => {
                if self.get_register::<u64>(rt) == 0 {
                    let value = self.get_register::<u64>(rs);
                    self.set_register(rd, value);
                }
            }
            Instruction::Movn(rd, rs, rt) => {
                if self.get_register::<u64>(rt) != 0 {
                    let value = self.get_register::<u64>(rs);
                    self.set_register(rd, value);
                }
            }
            Instruction::Syscall => return Err(Exception::Syscall),
            Instruction::Break => return Err(Exception::Breakpoint),
            Instruction::Sync => {}
            Instruction::Mfhi(rd) => {
                let value = self.get_register::<u64>(Register::Hi);
                self.set_register(rd, value);
            }
            Instruction::Mthi(rs) => {
                let value = self.get_register::<u64>(rs);
                self.set_register(Register::Hi, value);
            }
            Instruction::Mflo(rd) => {
                let value = self.get_register::<u64>(Register::Lo);
                self.set_register(rd, value);
            }
            Instruction::Mtlo(rs) => {
                let value = self.get_register::<u64>(rs);
                self.set_register(Register::Lo, value);
            }
            Instruction::Dsllv(rd, rt, rs) => {
                let value = self.get_register::<u64>(rt) << self.get_register::<u32>(rs).bits(0..6);
                self.set_register(rd, value);
            }
            Instruction::Dsrlv(rd, rt, rs) => {
                let value = self.get_register::<u64>(rt) >> self.get_register::<u32>(rs).bits(0..6);
                self.set_register(rd, value);
            }
            Instruction::Dsrav(rd, rt, rs) => {
                let value = self.get_register::<i64>(rt) >> self.get_register::<u32>(rs).bits(0..6);
                self.set_register(rd, value);
            }
            Instruction::Mult(rd, rs, rt) => {
                let product =
                    self.get_register::<i32>(rs) as i64 * self.get_register::<i32>(rt) as i64;
                self.multiply(Pipeline::Zero, rd, product as u64);
            }
            Instruction::Multu(rd, rs, rt) => {
                let product =
                    self.get_register::<u32>(rs) as u64 * self.get_register::<u32>(rt) as u64;
                self.multiply(Pipeline::Zero, rd, product);
            }
            Instruction::Div(rs, rt) => self.divide(Pipeline::Zero, rs, rt),
            Instruction::Divu(rs, rt) => self.divide_unsigned(Pipeline::Zero, rs, rt),
            // Signed overflow does not trap.
            Instruction::Add(rd, rs, rt) | Instruction::Addu(rd, rs, rt) => {
                let value = self
                    .get_register::<u32>(rs)
                    .wrapping_add(self.get_register::<u32>(rt));
                self.set_register(rd, value);
            }
            Instruction::Sub(rd, rs, rt) | Instruction::Subu(rd, rs, rt) => {
                let value = self
                    .get_register::<u32>(rs)
                    .wrapping_sub(self.get_register::<u32>(rt));
                self.set_register(rd, value);
            }
            Instruction::And(rd, rs, rt) => {
                let value = self.get_register::<u64>(rs) & self.get_register::<u64>(rt);
                self.set_register(rd, value);
            }
            Instruction::Or(rd, rs, rt) => {
                let value = self.get_register::<u64>(rs) | self.get_register::<u64>(rt);
                self.set_register(rd, value);
            }
            Instruction::Xor(rd, rs, rt) => {
                let value = self.get_register::<u64>(rs) ^ self.get_register::<u64>(rt);
                self.set_register(rd, value);
            }
            Instruction::Nor(rd, rs, rt) => {
                let value = !(self.get_register::<u64>(rs) | self.get_register::<u64>(rt));
                self.set_register(rd, value);
            }
            Instruction::Mfsa(rd) => self.set_register(rd, self.state.shift_amount as u64),
            Instruction::Mtsa(rs) => self.state.shift_amount = self.get_register::<u32>(rs),
            Instruction::Slt(rd, rs, rt) => {
                let value = self.get_register::<i64>(rs) < self.get_register::<i64>(rt);
                self.set_register(rd, value as u64);
            }
            Instruction::Sltu(rd, rs, rt) => {
                let value = self.get_register::<u64>(rs) < self.get_register::<u64>(rt);
                self.set_register(rd, value as u64);
            }
            Instruction::Dadd(rd, rs, rt) | Instruction::Daddu(rd, rs, rt) => {
                let value = self
                    .get_register::<u64>(rs)
                    .wrapping_add(self.get_register::<u64>(rt));
                self.set_register(rd, value);
            }
            Instruction::Dsub(rd, rs, rt) | Instruction::Dsubu(rd, rs, rt) => {
                let value = self
                    .get_register::<u64>(rs)
                    .wrapping_sub(self.get_register::<u64>(rt));
                self.set_register(rd, value);
            }
            Instruction::Tge(rs, rt) => {
                Self::trap_if(self.get_register::<i64>(rs) >= self.get_register::<i64>(rt))?
            }
            Instruction::Tgeu(rs, rt) => {
                Self::trap_if(self.get_register::<u64>(rs) >= self.get_register::<u64>(rt))?
            }
            Instruction::Tlt(rs, rt) => {
                Self::trap_if(self.get_register::<i64>(rs) < self.get_register::<i64>(rt))?
            }
            Instruction::Tltu(rs, rt) => {
                Self::trap_if(self.get_register::<u64>(rs) < self.get_register::<u64>(rt))?
            }
            Instruction::Teq(rs, rt) => {
                Self::trap_if(self.get_register::<u64>(rs) == self.get_register::<u64>(rt))?
            }
            Instruction::Tne(rs, rt) => {
                Self::trap_if(self.get_register::<u64>(rs) != self.get_register::<u64>(rt))?
            }
            Instruction::Dsll(rd, rt, sa) => {
                let value = self.get_register::<u64>(rt) << sa;
                self.set_register(rd, value);
            }
            Instruction::Dsrl(rd, rt, sa) => {
                let value = self.get_register::<u64>(rt) >> sa;
                self.set_register(rd, value);
            }
            Instruction::Dsra(rd, rt, sa) => {
                let value = self.get_register::<i64>(rt) >> sa;
                self.set_register(rd, value);
            }
            Instruction::Dsll32(rd, rt, sa) => {
                let value = self.get_register::<u64>(rt) << (sa + 32);
                self.set_register(rd, value);
            }
            Instruction::Dsrl32(rd, rt, sa) => {
                let value = self.get_register::<u64>(rt) >> (sa + 32);
                self.set_register(rd, value);
            }
            Instruction::Dsra32(rd, rt, sa) => {
                let value = self.get_register::<i64>(rt) >> (sa + 32);
                self.set_register(rd, value);
            }
            Instruction::Bltz(rs, offset) => {
                let condition = self.get_register::<i64>(rs) < 0;
                self.branch(condition, relative_target(program_counter, offset));
            }
            Instruction::Bgez(rs, offset) => {
                let condition = self.get_register::<i64>(rs) >= 0;
                self.branch(condition, relative_target(program_counter, offset));
            }
            Instruction::Bltzl(rs, offset) => {
                let condition = self.get_register::<i64>(rs) < 0;
                let target = relative_target(program_counter, offset);
                self.branch_likely(condition, target, &mut next_program_counter);
            }
            Instruction::Bgezl(rs, offset) => {
                let condition = self.get_register::<i64>(rs) >= 0;
                let target = relative_target(program_counter, offset);
                self.branch_likely(condition, target, &mut next_program_counter);
            }
            Instruction::Tgei(rs, imm) => {
                let imm: u64 = imm.sign_extend();
                Self::trap_if(self.get_register::<i64>(rs) >= imm as i64)?
            }
            Instruction::Tgeiu(rs, imm) => {
                let imm: u64 = imm.sign_extend();
                Self::trap_if(self.get_register::<u64>(rs) >= imm)?
            }
            Instruction::Tlti(rs, imm) => {
                let imm: u64 = imm.sign_extend();
                Self::trap_if(self.get_register::<i64>(rs) < imm as i64)?
            }
            Instruction::Tltiu(rs, imm) => {
                let imm: u64 = imm.sign_extend();
                Self::trap_if(self.get_register::<u64>(rs) < imm)?
            }
            Instruction::Teqi(rs, imm) => {
                let imm: u64 = imm.sign_extend();
                Self::trap_if(self.get_register::<u64>(rs) == imm)?
            }
            Instruction::Tnei(rs, imm) => {
                let imm: u64 = imm.sign_extend();
                Self::trap_if(self.get_register::<u64>(rs) != imm)?
            }
            Instruction::Bltzal(rs, offset) => {
                let condition = self.get_register::<i64>(rs) < 0;
                self.set_register(Register::Ra, link_address);
                self.branch(condition, relative_target(program_counter, offset));
            }
            Instruction::Bgezal(rs, offset) => {
                let condition = self.get_register::<i64>(rs) >= 0;
                self.set_register(Register::Ra, link_address);
                self.branch(condition, relative_target(program_counter, offset));
            }
            Instruction::Bltzall(rs, offset) => {
                let condition = self.get_register::<i64>(rs) < 0;
                self.set_register(Register::Ra, link_address);
                let target = relative_target(program_counter, offset);
                self.branch_likely(condition, target, &mut next_program_counter);
            }
            Instruction::Bgezall(rs, offset) => {
                let condition = self.get_register::<i64>(rs) >= 0;
                self.set_register(Register::Ra, link_address);
                let target = relative_target(program_counter, offset);
                self.branch_likely(condition, target, &mut next_program_counter);
            }
            Instruction::J(target) => {
                self.set_delayed_branch_target(absolute_target(program_counter, target));
            }
            Instruction::Jal(target) => {
                self.set_register(Register::Ra, link_address);
                self.set_delayed_branch_target(absolute_target(program_counter, target));
            }
            Instruction::Beq(rs, rt, offset) => {
                let condition = self.get_register::<u64>(rs) == self.get_register::<u64>(rt);
                self.branch(condition, relative_target(program_counter, offset));
            }
            Instruction::Bne(rs, rt, offset) => {
                let condition = self.get_register::<u64>(rs) != self.get_register::<u64>(rt);
                self.branch(condition, relative_target(program_counter, offset));
            }
            Instruction::Blez(rs, offset) => {
                let condition = self.get_register::<i64>(rs) <= 0;
                self.branch(condition, relative_target(program_counter, offset));
            }
            Instruction::Bgtz(rs, offset) => {
                let condition = self.get_register::<i64>(rs) > 0;
                self.branch(condition, relative_target(program_counter, offset));
            }
            Instruction::Addi(rt, rs, imm) | Instruction::Addiu(rt, rs, imm) => {
                let imm: u32 = imm.sign_extend();
                let value = self.get_register::<u32>(rs).wrapping_add(imm);
                self.set_register(rt, value);
            }
            Instruction::Slti(rt, rs, imm) => {
                let imm: u64 = imm.sign_extend();
                let value = self.get_register::<i64>(rs) < imm as i64;
                self.set_register(rt, value as u64);
            }
            Instruction::Sltiu(rt, rs, imm) => {
                let imm: u64 = imm.sign_extend();
                let value = self.get_register::<u64>(rs) < imm;
                self.set_register(rt, value as u64);
            }
            Instruction::Andi(rt, rs, imm) => {
                let value = self.get_register::<u64>(rs) & imm as u64;
                self.set_register(rt, value);
            }
            Instruction::Ori(rt, rs, imm) => {
                let value = self.get_register::<u64>(rs) | imm as u64;
                self.set_register(rt, value);
            }
            Instruction::Xori(rt, rs, imm) => {
                let value = self.get_register::<u64>(rs) ^ imm as u64;
                self.set_register(rt, value);
            }
            Instruction::Lui(rt, imm) => {
                self.set_register(rt, (imm as u32) << 16);
            }
            Instruction::Beql(rs, rt, offset) => {
                let condition = self.get_register::<u64>(rs) == self.get_register::<u64>(rt);
                let target = relative_target(program_counter, offset);
                self.branch_likely(condition, target, &mut next_program_counter);
            }
            Instruction::Bnel(rs, rt, offset) => {
                let condition = self.get_register::<u64>(rs) != self.get_register::<u64>(rt);
                let target = relative_target(program_counter, offset);
                self.branch_likely(condition, target, &mut next_program_counter);
            }
            Instruction::Blezl(rs, offset) => {
                let condition = self.get_register::<i64>(rs) <= 0;
                let target = relative_target(program_counter, offset);
                self.branch_likely(condition, target, &mut next_program_counter);
            }
            Instruction::Bgtzl(rs, offset) => {
                let condition = self.get_register::<i64>(rs) > 0;
                let target = relative_target(program_counter, offset);
                self.branch_likely(condition, target, &mut next_program_counter);
            }
            Instruction::Daddi(rt, rs, imm) | Instruction::Daddiu(rt, rs, imm) => {
                let imm: u64 = imm.sign_extend();
                let value = self.get_register::<u64>(rs).wrapping_add(imm);
                self.set_register(rt, value);
            }
            Instruction::Mfc0(rt, cd) => {
                let value = self.state.control.get_register(cd);
                self.set_register(rt, value);
            }
            Instruction::Mtc0(cd, rt) => {
                let value = self.get_register::<u32>(rt);
                self.state.control.set_register(cd, value);
            }
            Instruction::Tlbr | Instruction::Tlbwi | Instruction::Tlbwr | Instruction::Tlbp => {
                debug!("Ignoring {} at {:#010x}", instruction, program_counter);
            }
            Instruction::Eret => {
                next_program_counter = self.state.control.exception_return();
            }
            Instruction::Ei => {
                let mut status = self.state.control.status();
                status.set_master_interrupts_enabled(true);
                self.state.control.set_status(status);
            }
            Instruction::Di => {
                let mut status = self.state.control.status();
                status.set_master_interrupts_enabled(false);
                self.state.control.set_status(status);
            }
            Instruction::Mfc1(rt, fs) => {
                let value: u32 = self.state.fpu.get_register(fs);
                self.set_register(rt, value);
            }
            Instruction::Cfc1(rt, fs) => {
                let value = self.state.fpu.get_control(fs);
                self.set_register(rt, value);
            }
            Instruction::Mtc1(fs, rt) => {
                let value = self.get_register::<u32>(rt);
                self.state.fpu.set_register(fs, value);
            }
            Instruction::Ctc1(fs, rt) => {
                let value = self.get_register::<u32>(rt);
                self.state.fpu.set_control(fs, value);
            }
            Instruction::Bc1f(offset) => {
                let condition = !self.state.fpu.condition();
                self.branch(condition, relative_target(program_counter, offset));
            }
            Instruction::Bc1t(offset) => {
                let condition = self.state.fpu.condition();
                self.branch(condition, relative_target(program_counter, offset));
            }
            Instruction::Bc1fl(offset) => {
                let condition = !self.state.fpu.condition();
                let target = relative_target(program_counter, offset);
                self.branch_likely(condition, target, &mut next_program_counter);
            }
            Instruction::Bc1tl(offset) => {
                let condition = self.state.fpu.condition();
                let target = relative_target(program_counter, offset);
                self.branch_likely(condition, target, &mut next_program_counter);
            }
            Instruction::Adds(fd, fs, ft) => {
                let fpu = &mut self.state.fpu;
                let value = fpu.get_register::<f32>(fs) + fpu.get_register::<f32>(ft);
                fpu.set_register(fd, value);
            }
            Instruction::Subs(fd, fs, ft) => {
                let fpu = &mut self.state.fpu;
                let value = fpu.get_register::<f32>(fs) - fpu.get_register::<f32>(ft);
                fpu.set_register(fd, value);
            }
            Instruction::Muls(fd, fs, ft) => {
                let fpu = &mut self.state.fpu;
                let value = fpu.get_register::<f32>(fs) * fpu.get_register::<f32>(ft);
                fpu.set_register(fd, value);
            }
            Instruction::Divs(fd, fs, ft) => {
                let fpu = &mut self.state.fpu;
                let value = fpu.get_register::<f32>(fs) / fpu.get_register::<f32>(ft);
                fpu.set_register(fd, value);
            }
            Instruction::Abss(fd, fs) => {
                let fpu = &mut self.state.fpu;
                let value = fpu.get_register::<f32>(fs).abs();
                fpu.set_register(fd, value);
            }
            Instruction::Movs(fd, fs) => {
                let fpu = &mut self.state.fpu;
                let value: u32 = fpu.get_register(fs);
                fpu.set_register(fd, value);
            }
            Instruction::Negs(fd, fs) => {
                let fpu = &mut self.state.fpu;
                let value = -fpu.get_register::<f32>(fs);
                fpu.set_register(fd, value);
            }
            Instruction::Cvtws(fd, fs) => {
                let fpu = &mut self.state.fpu;
                let value = fpu.get_register::<f32>(fs) as i32;
                fpu.set_register(fd, value as u32);
            }
            Instruction::Ceqs(fs, ft) => {
                let fpu = &mut self.state.fpu;
                let condition = fpu.get_register::<f32>(fs) == fpu.get_register::<f32>(ft);
                fpu.set_condition(condition);
            }
            Instruction::Clts(fs, ft) => {
                let fpu = &mut self.state.fpu;
                let condition = fpu.get_register::<f32>(fs) < fpu.get_register::<f32>(ft);
                fpu.set_condition(condition);
            }
            Instruction::Cles(fs, ft) => {
                let fpu = &mut self.state.fpu;
                let condition = fpu.get_register::<f32>(fs) <= fpu.get_register::<f32>(ft);
                fpu.set_condition(condition);
            }
            Instruction::Cvtsw(fd, fs) => {
                let fpu = &mut self.state.fpu;
                let value = fpu.get_register::<u32>(fs) as i32 as f32;
                fpu.set_register(fd, value);
            }
            Instruction::Madd(rd, rs, rt) => {
                let product =
                    self.get_register::<i32>(rs) as i64 * self.get_register::<i32>(rt) as i64;
                let value = (self.accumulator(Pipeline::Zero) as i64).wrapping_add(product);
                self.multiply(Pipeline::Zero, rd, value as u64);
            }
            Instruction::Maddu(rd, rs, rt) => {
                let product =
                    self.get_register::<u32>(rs) as u64 * self.get_register::<u32>(rt) as u64;
                let value = self.accumulator(Pipeline::Zero).wrapping_add(product);
                self.multiply(Pipeline::Zero, rd, value);
            }
            Instruction::Plzcw(rd, rs) => {
                let value = self.get_register::<u64>(rs);
                let count = |word: u32| {
                    let word = if word.bit(31) { !word } else { word };
                    word.leading_zeros() as u64 - 1
                };
                let value = count((value >> 32) as u32) << 32 | count(value as u32);
                self.set_register(rd, value);
            }
            Instruction::Mfhi1(rd) => {
                let value = self.get_half(Register::Hi, Pipeline::One);
                self.set_register(rd, value);
            }
            Instruction::Mthi1(rs) => {
                let value = self.get_register::<u64>(rs);
                self.set_half(Register::Hi, Pipeline::One, value);
            }
            Instruction::Mflo1(rd) => {
                let value = self.get_half(Register::Lo, Pipeline::One);
                self.set_register(rd, value);
            }
            Instruction::Mtlo1(rs) => {
                let value = self.get_register::<u64>(rs);
                self.set_half(Register::Lo, Pipeline::One, value);
            }
            Instruction::Mult1(rd, rs, rt) => {
                let product =
                    self.get_register::<i32>(rs) as i64 * self.get_register::<i32>(rt) as i64;
                self.multiply(Pipeline::One, rd, product as u64);
            }
            Instruction::Multu1(rd, rs, rt) => {
                let product =
                    self.get_register::<u32>(rs) as u64 * self.get_register::<u32>(rt) as u64;
                self.multiply(Pipeline::One, rd, product);
            }
            Instruction::Div1(rs, rt) => self.divide(Pipeline::One, rs, rt),
            Instruction::Divu1(rs, rt) => self.divide_unsigned(Pipeline::One, rs, rt),
            Instruction::Madd1(rd, rs, rt) => {
                let product =
                    self.get_register::<i32>(rs) as i64 * self.get_register::<i32>(rt) as i64;
                let value = (self.accumulator(Pipeline::One) as i64).wrapping_add(product);
                self.multiply(Pipeline::One, rd, value as u64);
            }
            Instruction::Maddu1(rd, rs, rt) => {
                let product =
                    self.get_register::<u32>(rs) as u64 * self.get_register::<u32>(rt) as u64;
                let value = self.accumulator(Pipeline::One).wrapping_add(product);
                self.multiply(Pipeline::One, rd, value);
            }
            Instruction::Pcpyld(rd, rs, rt) => {
                let value = (self.get_register::<u64>(rs) as u128) << 64
                    | self.get_register::<u64>(rt) as u128;
                self.set_register(rd, value);
            }
            Instruction::Pand(rd, rs, rt) => {
                let value = self.get_register::<u128>(rs) & self.get_register::<u128>(rt);
                self.set_register(rd, value);
            }
            Instruction::Pxor(rd, rs, rt) => {
                let value = self.get_register::<u128>(rs) ^ self.get_register::<u128>(rt);
                self.set_register(rd, value);
            }
            Instruction::Pcpyud(rd, rs, rt) => {
                let value = self.get_register::<u128>(rt) & !LOWER_HALF
                    | self.get_register::<u128>(rs) >> 64;
                self.set_register(rd, value);
            }
            Instruction::Por(rd, rs, rt) => {
                let value = self.get_register::<u128>(rs) | self.get_register::<u128>(rt);
                self.set_register(rd, value);
            }
            Instruction::Pnor(rd, rs, rt) => {
                let value = !(self.get_register::<u128>(rs) | self.get_register::<u128>(rt));
                self.set_register(rd, value);
            }
            Instruction::Lb(rt, offset, base) => {
                let value: u8 = self.load(bus, base, offset)?;
                self.set_register::<u64>(rt, value.sign_extend());
            }
            Instruction::Lbu(rt, offset, base) => {
                let value: u8 = self.load(bus, base, offset)?;
                self.set_register(rt, value as u64);
            }
            Instruction::Lh(rt, offset, base) => {
                let value: u16 = self.load(bus, base, offset)?;
                self.set_register::<u64>(rt, value.sign_extend());
            }
            Instruction::Lhu(rt, offset, base) => {
                let value: u16 = self.load(bus, base, offset)?;
                self.set_register(rt, value as u64);
            }
            Instruction::Lw(rt, offset, base) => {
                let value: u32 = self.load(bus, base, offset)?;
                self.set_register(rt, value);
            }
            Instruction::Lwu(rt, offset, base) => {
                let value: u32 = self.load(bus, base, offset)?;
                self.set_register(rt, value as u64);
            }
            Instruction::Ld(rt, offset, base) => {
                let value: u64 = self.load(bus, base, offset)?;
                self.set_register(rt, value);
            }
            Instruction::Lq(rt, offset, base) => {
                let value: u128 = self.load(bus, base, offset)?;
                self.set_register(rt, value);
            }
            Instruction::Lwl(rt, offset, base) => {
                let address = self.effective_address(base, offset);
                let shift = address.bits(0..2) as usize;
                let memory: u32 = self.read_virtual(bus, address & !0b11);
                let value =
                    self.get_register::<u32>(rt) & LWL_MASK[shift] | memory << LWL_SHIFT[shift];
                self.set_register(rt, value);
            }
            Instruction::Lwr(rt, offset, base) => {
                let address = self.effective_address(base, offset);
                let shift = address.bits(0..2) as usize;
                let memory: u32 = self.read_virtual(bus, address & !0b11);
                let value =
                    self.get_register::<u32>(rt) & LWR_MASK[shift] | memory >> LWR_SHIFT[shift];
                if shift == 0 {
                    self.set_register(rt, value);
                } else {
                    let upper = self.get_register::<u64>(rt) & !(u32::MAX as u64);
                    self.set_register(rt, upper | value as u64);
                }
            }
            Instruction::Ldl(rt, offset, base) => {
                let address = self.effective_address(base, offset);
                let shift = address.bits(0..3) as usize;
                let memory: u64 = self.read_virtual(bus, address & !0b111);
                let value =
                    self.get_register::<u64>(rt) & LDL_MASK[shift] | memory << LDL_SHIFT[shift];
                self.set_register(rt, value);
            }
            Instruction::Ldr(rt, offset, base) => {
                let address = self.effective_address(base, offset);
                let shift = address.bits(0..3) as usize;
                let memory: u64 = self.read_virtual(bus, address & !0b111);
                let value =
                    self.get_register::<u64>(rt) & LDR_MASK[shift] | memory >> LDR_SHIFT[shift];
                self.set_register(rt, value);
            }
            Instruction::Sb(rt, offset, base) => {
                let value = self.get_register::<u8>(rt);
                self.store(bus, base, offset, value)?;
            }
            Instruction::Sh(rt, offset, base) => {
                let value = self.get_register::<u16>(rt);
                self.store(bus, base, offset, value)?;
            }
            Instruction::Sw(rt, offset, base) => {
                let value = self.get_register::<u32>(rt);
                self.store(bus, base, offset, value)?;
            }
            Instruction::Sd(rt, offset, base) => {
                let value = self.get_register::<u64>(rt);
                self.store(bus, base, offset, value)?;
            }
            Instruction::Sq(rt, offset, base) => {
                let value = self.get_register::<u128>(rt);
                self.store(bus, base, offset, value)?;
            }
            Instruction::Swl(rt, offset, base) => {
                let address = self.effective_address(base, offset);
                let shift = address.bits(0..2) as usize;
                let memory: u32 = self.read_virtual(bus, address & !0b11);
                let value =
                    memory & SWL_MASK[shift] | self.get_register::<u32>(rt) >> SWL_SHIFT[shift];
                self.write_virtual(bus, address & !0b11, value);
            }
            Instruction::Swr(rt, offset, base) => {
                let address = self.effective_address(base, offset);
                let shift = address.bits(0..2) as usize;
                let memory: u32 = self.read_virtual(bus, address & !0b11);
                let value =
                    memory & SWR_MASK[shift] | self.get_register::<u32>(rt) << SWR_SHIFT[shift];
                self.write_virtual(bus, address & !0b11, value);
            }
            Instruction::Sdl(rt, offset, base) => {
                let address = self.effective_address(base, offset);
                let shift = address.bits(0..3) as usize;
                let memory: u64 = self.read_virtual(bus, address & !0b111);
                let value =
                    memory & SDL_MASK[shift] | self.get_register::<u64>(rt) >> SDL_SHIFT[shift];
                self.write_virtual(bus, address & !0b111, value);
            }
            Instruction::Sdr(rt, offset, base) => {
                let address = self.effective_address(base, offset);
                let shift = address.bits(0..3) as usize;
                let memory: u64 = self.read_virtual(bus, address & !0b111);
                let value =
                    memory & SDR_MASK[shift] | self.get_register::<u64>(rt) << SDR_SHIFT[shift];
                self.write_virtual(bus, address & !0b111, value);
            }
            Instruction::Lwc1(ft, offset, base) => {
                let value: u32 = self.load(bus, base, offset)?;
                self.state.fpu.set_register(ft, value);
            }
            Instruction::Swc1(ft, offset, base) => {
                let value: u32 = self.state.fpu.get_register(ft);
                self.store(bus, base, offset, value)?;
            }
            Instruction::Cache | Instruction::Pref => {}
        }
        self.state.program_counter = next_program_counter;
        Ok(())
    }
}

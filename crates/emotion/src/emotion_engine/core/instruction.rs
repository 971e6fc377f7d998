use std::fmt::{Display, Formatter};

use crate::bits::{Bits, SignExtend};

use super::{control, fpu, register::Register};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Instruction {
    Unknown(u32),
    // SPECIAL
    Sll(Register, Register, u8),
    Srl(Register, Register, u8),
    Sra(Register, Register, u8),
    Sllv(Register, Register, Register),
    Srlv(Register, Register, Register),
    Srav(Register, Register, Register),
    Jr(Register),
    Jalr(Register, Register),
    Movz(Register, Register, Register),
    Movn(Register, Register, Register),
    Syscall,
    Break,
    Sync,
    Mfhi(Register),
    Mthi(Register),
    Mflo(Register),
    Mtlo(Register),
    Dsllv(Register, Register, Register),
    Dsrlv(Register, Register, Register),
    Dsrav(Register, Register, Register),
    Mult(Register, Register, Register),
    Multu(Register, Register, Register),
    Div(Register, Register),
    Divu(Register, Register),
    Add(Register, Register, Register),
    Addu(Register, Register, Register),
    Sub(Register, Register, Register),
    Subu(Register, Register, Register),
    And(Register, Register, Register),
    Or(Register, Register, Register),
    Xor(Register, Register, Register),
    Nor(Register, Register, Register),
    Mfsa(Register),
    Mtsa(Register),
    Slt(Register, Register, Register),
    Sltu(Register, Register, Register),
    Dadd(Register, Register, Register),
    Daddu(Register, Register, Register),
    Dsub(Register, Register, Register),
    Dsubu(Register, Register, Register),
    Tge(Register, Register),
    Tgeu(Register, Register),
    Tlt(Register, Register),
    Tltu(Register, Register),
    Teq(Register, Register),
    Tne(Register, Register),
    Dsll(Register, Register, u8),
    Dsrl(Register, Register, u8),
    Dsra(Register, Register, u8),
    Dsll32(Register, Register, u8),
    Dsrl32(Register, Register, u8),
    Dsra32(Register, Register, u8),
    // REGIMM
    Bltz(Register, u16),
    Bgez(Register, u16),
    Bltzl(Register, u16),
    Bgezl(Register, u16),
    Tgei(Register, u16),
    Tgeiu(Register, u16),
    Tlti(Register, u16),
    Tltiu(Register, u16),
    Teqi(Register, u16),
    Tnei(Register, u16),
    Bltzal(Register, u16),
    Bgezal(Register, u16),
    Bltzall(Register, u16),
    Bgezall(Register, u16),
    // Primary opcodes
    J(u32),
    Jal(u32),
    Beq(Register, Register, u16),
    Bne(Register, Register, u16),
    Blez(Register, u16),
    Bgtz(Register, u16),
    Addi(Register, Register, u16),
    Addiu(Register, Register, u16),
    Slti(Register, Register, u16),
    Sltiu(Register, Register, u16),
    Andi(Register, Register, u16),
    Ori(Register, Register, u16),
    Xori(Register, Register, u16),
    Lui(Register, u16),
    Beql(Register, Register, u16),
    Bnel(Register, Register, u16),
    Blezl(Register, u16),
    Bgtzl(Register, u16),
    Daddi(Register, Register, u16),
    Daddiu(Register, Register, u16),
    // COP0
    Mfc0(Register, control::Register),
    Mtc0(control::Register, Register),
    Tlbr,
    Tlbwi,
    Tlbwr,
    Tlbp,
    Eret,
    Ei,
    Di,
    // COP1
    Mfc1(Register, fpu::Register),
    Cfc1(Register, fpu::Register),
    Mtc1(fpu::Register, Register),
    Ctc1(fpu::Register, Register),
    Bc1f(u16),
    Bc1t(u16),
    Bc1fl(u16),
    Bc1tl(u16),
    Adds(fpu::Register, fpu::Register, fpu::Register),
    Subs(fpu::Register, fpu::Register, fpu::Register),
    Muls(fpu::Register, fpu::Register, fpu::Register),
    Divs(fpu::Register, fpu::Register, fpu::Register),
    Abss(fpu::Register, fpu::Register),
    Movs(fpu::Register, fpu::Register),
    Negs(fpu::Register, fpu::Register),
    Cvtws(fpu::Register, fpu::Register),
    Ceqs(fpu::Register, fpu::Register),
    Clts(fpu::Register, fpu::Register),
    Cles(fpu::Register, fpu::Register),
    Cvtsw(fpu::Register, fpu::Register),
    // MMI
    Madd(Register, Register, Register),
    Maddu(Register, Register, Register),
    Plzcw(Register, Register),
    Mfhi1(Register),
    Mthi1(Register),
    Mflo1(Register),
    Mtlo1(Register),
    Mult1(Register, Register, Register),
    Multu1(Register, Register, Register),
    Div1(Register, Register),
    Divu1(Register, Register),
    Madd1(Register, Register, Register),
    Maddu1(Register, Register, Register),
    Pcpyld(Register, Register, Register),
    Pand(Register, Register, Register),
    Pxor(Register, Register, Register),
    Pcpyud(Register, Register, Register),
    Por(Register, Register, Register),
    Pnor(Register, Register, Register),
    // Loads and stores: (rt, offset, base)
    Ldl(Register, u16, Register),
    Ldr(Register, u16, Register),
    Lq(Register, u16, Register),
    Sq(Register, u16, Register),
    Lb(Register, u16, Register),
    Lh(Register, u16, Register),
    Lwl(Register, u16, Register),
    Lw(Register, u16, Register),
    Lbu(Register, u16, Register),
    Lhu(Register, u16, Register),
    Lwr(Register, u16, Register),
    Lwu(Register, u16, Register),
    Sb(Register, u16, Register),
    Sh(Register, u16, Register),
    Swl(Register, u16, Register),
    Sw(Register, u16, Register),
    Sdl(Register, u16, Register),
    Sdr(Register, u16, Register),
    Swr(Register, u16, Register),
    Cache,
    Lwc1(fpu::Register, u16, Register),
    Pref,
    Ld(Register, u16, Register),
    Swc1(fpu::Register, u16, Register),
    Sd(Register, u16, Register),
}

impl Instruction {
    pub fn decode(data: u32) -> Self {
        let rs = || Register::from(data.bits(21..26));
        let rt = || Register::from(data.bits(16..21));
        let rd = || Register::from(data.bits(11..16));
        let ft = || fpu::Register::from(data.bits(16..21));
        let fs = || fpu::Register::from(data.bits(11..16));
        let fd = || fpu::Register::from(data.bits(6..11));
        let cd = || control::Register::from(data.bits(11..16));
        let sa = || data.bits(6..11) as u8;
        let imm16 = || data.bits(0..16) as u16;
        let imm26 = || data.bits(0..26);
        match data.bits(26..32) {
            0x00 => match data.bits(0..6) {
                0x00 => Instruction::Sll(rd(), rt(), sa()),
                0x02 => Instruction::Srl(rd(), rt(), sa()),
                0x03 => Instruction::Sra(rd(), rt(), sa()),
                0x04 => Instruction::Sllv(rd(), rt(), rs()),
                0x06 => Instruction::Srlv(rd(), rt(), rs()),
                0x07 => Instruction::Srav(rd(), rt(), rs()),
                0x08 => Instruction::Jr(rs()),
                0x09 => Instruction::Jalr(rd(), rs()),
                0x0A => Instruction::Movz(rd(), rs(), rt()),
                0x0B => Instruction::Movn(rd(), rs(), rt()),
                0x0C => Instruction::Syscall,
                0x0D => Instruction::Break,
                0x0F => Instruction::Sync,
                0x10 => Instruction::Mfhi(rd()),
                0x11 => Instruction::Mthi(rs()),
                0x12 => Instruction::Mflo(rd()),
                0x13 => Instruction::Mtlo(rs()),
                0x14 => Instruction::Dsllv(rd(), rt(), rs()),
                0x16 => Instruction::Dsrlv(rd(), rt(), rs()),
                0x17 => Instruction::Dsrav(rd(), rt(), rs()),
                0x18 => Instruction::Mult(rd(), rs(), rt()),
                0x19 => Instruction::Multu(rd(), rs(), rt()),
                0x1A => Instruction::Div(rs(), rt()),
                0x1B => Instruction::Divu(rs(), rt()),
                0x20 => Instruction::Add(rd(), rs(), rt()),
                0x21 => Instruction::Addu(rd(), rs(), rt()),
                0x22 => Instruction::Sub(rd(), rs(), rt()),
                0x23 => Instruction::Subu(rd(), rs(), rt()),
                0x24 => Instruction::And(rd(), rs(), rt()),
                0x25 => Instruction::Or(rd(), rs(), rt()),
                0x26 => Instruction::Xor(rd(), rs(), rt()),
                0x27 => Instruction::Nor(rd(), rs(), rt()),
                0x28 => Instruction::Mfsa(rd()),
                0x29 => Instruction::Mtsa(rs()),
                0x2A => Instruction::Slt(rd(), rs(), rt()),
                0x2B => Instruction::Sltu(rd(), rs(), rt()),
                0x2C => Instruction::Dadd(rd(), rs(), rt()),
                0x2D => Instruction::Daddu(rd(), rs(), rt()),
                0x2E => Instruction::Dsub(rd(), rs(), rt()),
                0x2F => Instruction::Dsubu(rd(), rs(), rt()),
                0x30 => Instruction::Tge(rs(), rt()),
                0x31 => Instruction::Tgeu(rs(), rt()),
                0x32 => Instruction::Tlt(rs(), rt()),
                0x33 => Instruction::Tltu(rs(), rt()),
                0x34 => Instruction::Teq(rs(), rt()),
                0x36 => Instruction::Tne(rs(), rt()),
                0x38 => Instruction::Dsll(rd(), rt(), sa()),
                0x3A => Instruction::Dsrl(rd(), rt(), sa()),
                0x3B => Instruction::Dsra(rd(), rt(), sa()),
                0x3C => Instruction::Dsll32(rd(), rt(), sa()),
                0x3E => Instruction::Dsrl32(rd(), rt(), sa()),
                0x3F => Instruction::Dsra32(rd(), rt(), sa()),
                _ => Instruction::Unknown(data),
            },
            0x01 => match data.bits(16..21) {
                0x00 => Instruction::Bltz(rs(), imm16()),
                0x01 => Instruction::Bgez(rs(), imm16()),
                0x02 => Instruction::Bltzl(rs(), imm16()),
                0x03 => Instruction::Bgezl(rs(), imm16()),
                0x08 => Instruction::Tgei(rs(), imm16()),
                0x09 => Instruction::Tgeiu(rs(), imm16()),
                0x0A => Instruction::Tlti(rs(), imm16()),
                0x0B => Instruction::Tltiu(rs(), imm16()),
                0x0C => Instruction::Teqi(rs(), imm16()),
                0x0E => Instruction::Tnei(rs(), imm16()),
                0x10 => Instruction::Bltzal(rs(), imm16()),
                0x11 => Instruction::Bgezal(rs(), imm16()),
                0x12 => Instruction::Bltzall(rs(), imm16()),
                0x13 => Instruction::Bgezall(rs(), imm16()),
                _ => Instruction::Unknown(data),
            },
            0x02 => Instruction::J(imm26()),
            0x03 => Instruction::Jal(imm26()),
            0x04 => Instruction::Beq(rs(), rt(), imm16()),
            0x05 => Instruction::Bne(rs(), rt(), imm16()),
            0x06 => Instruction::Blez(rs(), imm16()),
            0x07 => Instruction::Bgtz(rs(), imm16()),
            0x08 => Instruction::Addi(rt(), rs(), imm16()),
            0x09 => Instruction::Addiu(rt(), rs(), imm16()),
            0x0A => Instruction::Slti(rt(), rs(), imm16()),
            0x0B => Instruction::Sltiu(rt(), rs(), imm16()),
            0x0C => Instruction::Andi(rt(), rs(), imm16()),
            0x0D => Instruction::Ori(rt(), rs(), imm16()),
            0x0E => Instruction::Xori(rt(), rs(), imm16()),
            0x0F => Instruction::Lui(rt(), imm16()),
            0x10 => match data.bits(21..26) {
                0x00 => Instruction::Mfc0(rt(), cd()),
                0x04 => Instruction::Mtc0(cd(), rt()),
                0x10 => match data.bits(0..6) {
                    0x01 => Instruction::Tlbr,
                    0x02 => Instruction::Tlbwi,
                    0x06 => Instruction::Tlbwr,
                    0x08 => Instruction::Tlbp,
                    0x18 => Instruction::Eret,
                    0x38 => Instruction::Ei,
                    0x39 => Instruction::Di,
                    _ => Instruction::Unknown(data),
                },
                _ => Instruction::Unknown(data),
            },
            0x11 => match data.bits(21..26) {
                0x00 => Instruction::Mfc1(rt(), fs()),
                0x02 => Instruction::Cfc1(rt(), fs()),
                0x04 => Instruction::Mtc1(fs(), rt()),
                0x06 => Instruction::Ctc1(fs(), rt()),
                0x08 => match data.bits(16..21) {
                    0x00 => Instruction::Bc1f(imm16()),
                    0x01 => Instruction::Bc1t(imm16()),
                    0x02 => Instruction::Bc1fl(imm16()),
                    0x03 => Instruction::Bc1tl(imm16()),
                    _ => Instruction::Unknown(data),
                },
                0x10 => match data.bits(0..6) {
                    0x00 => Instruction::Adds(fd(), fs(), ft()),
                    0x01 => Instruction::Subs(fd(), fs(), ft()),
                    0x02 => Instruction::Muls(fd(), fs(), ft()),
                    0x03 => Instruction::Divs(fd(), fs(), ft()),
                    0x05 => Instruction::Abss(fd(), fs()),
                    0x06 => Instruction::Movs(fd(), fs()),
                    0x07 => Instruction::Negs(fd(), fs()),
                    0x24 => Instruction::Cvtws(fd(), fs()),
                    0x32 => Instruction::Ceqs(fs(), ft()),
                    0x34 => Instruction::Clts(fs(), ft()),
                    0x36 => Instruction::Cles(fs(), ft()),
                    _ => Instruction::Unknown(data),
                },
                0x14 => match data.bits(0..6) {
                    0x20 => Instruction::Cvtsw(fd(), fs()),
                    _ => Instruction::Unknown(data),
                },
                _ => Instruction::Unknown(data),
            },
            0x14 => Instruction::Beql(rs(), rt(), imm16()),
            0x15 => Instruction::Bnel(rs(), rt(), imm16()),
            0x16 => Instruction::Blezl(rs(), imm16()),
            0x17 => Instruction::Bgtzl(rs(), imm16()),
            0x18 => Instruction::Daddi(rt(), rs(), imm16()),
            0x19 => Instruction::Daddiu(rt(), rs(), imm16()),
            0x1A => Instruction::Ldl(rt(), imm16(), rs()),
            0x1B => Instruction::Ldr(rt(), imm16(), rs()),
            0x1C => match data.bits(0..6) {
                0x00 => Instruction::Madd(rd(), rs(), rt()),
                0x01 => Instruction::Maddu(rd(), rs(), rt()),
                0x04 => Instruction::Plzcw(rd(), rs()),
                0x09 => match data.bits(6..11) {
                    0x0E => Instruction::Pcpyld(rd(), rs(), rt()),
                    0x12 => Instruction::Pand(rd(), rs(), rt()),
                    0x13 => Instruction::Pxor(rd(), rs(), rt()),
                    _ => Instruction::Unknown(data),
                },
                0x10 => Instruction::Mfhi1(rd()),
                0x11 => Instruction::Mthi1(rs()),
                0x12 => Instruction::Mflo1(rd()),
                0x13 => Instruction::Mtlo1(rs()),
                0x18 => Instruction::Mult1(rd(), rs(), rt()),
                0x19 => Instruction::Multu1(rd(), rs(), rt()),
                0x1A => Instruction::Div1(rs(), rt()),
                0x1B => Instruction::Divu1(rs(), rt()),
                0x20 => Instruction::Madd1(rd(), rs(), rt()),
                0x21 => Instruction::Maddu1(rd(), rs(), rt()),
                0x29 => match data.bits(6..11) {
                    0x0E => Instruction::Pcpyud(rd(), rs(), rt()),
                    0x12 => Instruction::Por(rd(), rs(), rt()),
                    0x13 => Instruction::Pnor(rd(), rs(), rt()),
                    _ => Instruction::Unknown(data),
                },
                _ => Instruction::Unknown(data),
            },
            0x1E => Instruction::Lq(rt(), imm16(), rs()),
            0x1F => Instruction::Sq(rt(), imm16(), rs()),
            0x20 => Instruction::Lb(rt(), imm16(), rs()),
            0x21 => Instruction::Lh(rt(), imm16(), rs()),
            0x22 => Instruction::Lwl(rt(), imm16(), rs()),
            0x23 => Instruction::Lw(rt(), imm16(), rs()),
            0x24 => Instruction::Lbu(rt(), imm16(), rs()),
            0x25 => Instruction::Lhu(rt(), imm16(), rs()),
            0x26 => Instruction::Lwr(rt(), imm16(), rs()),
            0x27 => Instruction::Lwu(rt(), imm16(), rs()),
            0x28 => Instruction::Sb(rt(), imm16(), rs()),
            0x29 => Instruction::Sh(rt(), imm16(), rs()),
            0x2A => Instruction::Swl(rt(), imm16(), rs()),
            0x2B => Instruction::Sw(rt(), imm16(), rs()),
            0x2C => Instruction::Sdl(rt(), imm16(), rs()),
            0x2D => Instruction::Sdr(rt(), imm16(), rs()),
            0x2E => Instruction::Swr(rt(), imm16(), rs()),
            0x2F => Instruction::Cache,
            0x31 => Instruction::Lwc1(ft(), imm16(), rs()),
            0x33 => Instruction::Pref,
            0x37 => Instruction::Ld(rt(), imm16(), rs()),
            0x39 => Instruction::Swc1(ft(), imm16(), rs()),
            0x3F => Instruction::Sd(rt(), imm16(), rs()),
            _ => Instruction::Unknown(data),
        }
    }

    pub fn is_nop(&self) -> bool {
        match self {
            Instruction::Sll(rd, _, _) => *rd == Register::Zero,
            Instruction::Addiu(reg1, reg2, imm) => *imm == 0 && reg1 == reg2,
            Instruction::Ori(reg1, reg2, imm) => *imm == 0 && reg1 == reg2,
            _ => false,
        }
    }

    /// Statically known target of a branch located at `address`.
    pub fn branch_target(&self, address: u32) -> Option<u32> {
        match self {
            Instruction::Bltz(_, offset)
            | Instruction::Bgez(_, offset)
            | Instruction::Bltzl(_, offset)
            | Instruction::Bgezl(_, offset)
            | Instruction::Bltzal(_, offset)
            | Instruction::Bgezal(_, offset)
            | Instruction::Bltzall(_, offset)
            | Instruction::Bgezall(_, offset)
            | Instruction::Beq(_, _, offset)
            | Instruction::Bne(_, _, offset)
            | Instruction::Blez(_, offset)
            | Instruction::Bgtz(_, offset)
            | Instruction::Beql(_, _, offset)
            | Instruction::Bnel(_, _, offset)
            | Instruction::Blezl(_, offset)
            | Instruction::Bgtzl(_, offset)
            | Instruction::Bc1f(offset)
            | Instruction::Bc1t(offset)
            | Instruction::Bc1fl(offset)
            | Instruction::Bc1tl(offset) => Some(relative_target(address, *offset)),
            Instruction::J(target) | Instruction::Jal(target) => {
                Some(absolute_target(address, *target))
            }
            _ => None,
        }
    }
}

pub fn relative_target(address: u32, offset: u16) -> u32 {
    let offset: u32 = offset.sign_extend();
    address.wrapping_add(4).wrapping_add(offset << 2)
}

pub fn absolute_target(address: u32, target: u32) -> u32 {
    (address.wrapping_add(4) & 0xF000_0000) | (target << 2)
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match *self {
            Instruction::Unknown(data) => write!(f, "unknown {data:#010x}"),
            Instruction::Sll(rd, rt, sa) => write!(f, "{rd} = sll {rt}, {sa}"),
            Instruction::Srl(rd, rt, sa) => write!(f, "{rd} = srl {rt}, {sa}"),
            Instruction::Sra(rd, rt, sa) => write!(f, "{rd} = sra {rt}, {sa}"),
            Instruction::Sllv(rd, rt, rs) => write!(f, "{rd} = sllv {rt}, {rs}"),
            Instruction::Srlv(rd, rt, rs) => write!(f, "{rd} = srlv {rt}, {rs}"),
            Instruction::Srav(rd, rt, rs) => write!(f, "{rd} = srav {rt}, {rs}"),
            Instruction::Jr(rs) => write!(f, "jr {rs}"),
            Instruction::Jalr(rd, rs) => write!(f, "{rd} = jalr {rs}"),
            Instruction::Movz(rd, rs, rt) => write!(f, "{rd} = movz {rs}, {rt}"),
            Instruction::Movn(rd, rs, rt) => write!(f, "{rd} = movn {rs}, {rt}"),
            Instruction::Syscall => write!(f, "syscall"),
            Instruction::Break => write!(f, "break"),
            Instruction::Sync => write!(f, "sync"),
            Instruction::Mfhi(rd) => write!(f, "{rd} = mfhi"),
            Instruction::Mthi(rs) => write!(f, "mthi {rs}"),
            Instruction::Mflo(rd) => write!(f, "{rd} = mflo"),
            Instruction::Mtlo(rs) => write!(f, "mtlo {rs}"),
            Instruction::Dsllv(rd, rt, rs) => write!(f, "{rd} = dsllv {rt}, {rs}"),
            Instruction::Dsrlv(rd, rt, rs) => write!(f, "{rd} = dsrlv {rt}, {rs}"),
            Instruction::Dsrav(rd, rt, rs) => write!(f, "{rd} = dsrav {rt}, {rs}"),
            Instruction::Mult(rd, rs, rt) => write!(f, "{rd} = mult {rs}, {rt}"),
            Instruction::Multu(rd, rs, rt) => write!(f, "{rd} = multu {rs}, {rt}"),
            Instruction::Div(rs, rt) => write!(f, "div {rs}, {rt}"),
            Instruction::Divu(rs, rt) => write!(f, "divu {rs}, {rt}"),
            Instruction::Add(rd, rs, rt) => write!(f, "{rd} = add {rs}, {rt}"),
            Instruction::Addu(rd, rs, rt) => write!(f, "{rd} = addu {rs}, {rt}"),
            Instruction::Sub(rd, rs, rt) => write!(f, "{rd} = sub {rs}, {rt}"),
            Instruction::Subu(rd, rs, rt) => write!(f, "{rd} = subu {rs}, {rt}"),
            Instruction::And(rd, rs, rt) => write!(f, "{rd} = and {rs}, {rt}"),
            Instruction::Or(rd, rs, rt) => write!(f, "{rd} = or {rs}, {rt}"),
            Instruction::Xor(rd, rs, rt) => write!(f, "{rd} = xor {rs}, {rt}"),
            Instruction::Nor(rd, rs, rt) => write!(f, "{rd} = nor {rs}, {rt}"),
            Instruction::Mfsa(rd) => write!(f, "{rd} = mfsa"),
            Instruction::Mtsa(rs) => write!(f, "mtsa {rs}"),
            Instruction::Slt(rd, rs, rt) => write!(f, "{rd} = slt {rs}, {rt}"),
            Instruction::Sltu(rd, rs, rt) => write!(f, "{rd} = sltu {rs}, {rt}"),
            Instruction::Dadd(rd, rs, rt) => write!(f, "{rd} = dadd {rs}, {rt}"),
            Instruction::Daddu(rd, rs, rt) => write!(f, "{rd} = daddu {rs}, {rt}"),
            Instruction::Dsub(rd, rs, rt) => write!(f, "{rd} = dsub {rs}, {rt}"),
            Instruction::Dsubu(rd, rs, rt) => write!(f, "{rd} = dsubu {rs}, {rt}"),
            Instruction::Tge(rs, rt) => write!(f, "tge {rs}, {rt}"),
            Instruction::Tgeu(rs, rt) => write!(f, "tgeu {rs}, {rt}"),
            Instruction::Tlt(rs, rt) => write!(f, "tlt {rs}, {rt}"),
            Instruction::Tltu(rs, rt) => write!(f, "tltu {rs}, {rt}"),
            Instruction::Teq(rs, rt) => write!(f, "teq {rs}, {rt}"),
            Instruction::Tne(rs, rt) => write!(f, "tne {rs}, {rt}"),
            Instruction::Dsll(rd, rt, sa) => write!(f, "{rd} = dsll {rt}, {sa}"),
            Instruction::Dsrl(rd, rt, sa) => write!(f, "{rd} = dsrl {rt}, {sa}"),
            Instruction::Dsra(rd, rt, sa) => write!(f, "{rd} = dsra {rt}, {sa}"),
            Instruction::Dsll32(rd, rt, sa) => write!(f, "{rd} = dsll32 {rt}, {sa}"),
            Instruction::Dsrl32(rd, rt, sa) => write!(f, "{rd} = dsrl32 {rt}, {sa}"),
            Instruction::Dsra32(rd, rt, sa) => write!(f, "{rd} = dsra32 {rt}, {sa}"),
            Instruction::Bltz(rs, imm16) => write!(f, "bltz {rs}, {imm16:#x}"),
            Instruction::Bgez(rs, imm16) => write!(f, "bgez {rs}, {imm16:#x}"),
            Instruction::Bltzl(rs, imm16) => write!(f, "bltzl {rs}, {imm16:#x}"),
            Instruction::Bgezl(rs, imm16) => write!(f, "bgezl {rs}, {imm16:#x}"),
            Instruction::Tgei(rs, imm16) => write!(f, "tgei {rs}, {imm16:#x}"),
            Instruction::Tgeiu(rs, imm16) => write!(f, "tgeiu {rs}, {imm16:#x}"),
            Instruction::Tlti(rs, imm16) => write!(f, "tlti {rs}, {imm16:#x}"),
            Instruction::Tltiu(rs, imm16) => write!(f, "tltiu {rs}, {imm16:#x}"),
            Instruction::Teqi(rs, imm16) => write!(f, "teqi {rs}, {imm16:#x}"),
            Instruction::Tnei(rs, imm16) => write!(f, "tnei {rs}, {imm16:#x}"),
            Instruction::Bltzal(rs, imm16) => write!(f, "bltzal {rs}, {imm16:#x}"),
            Instruction::Bgezal(rs, imm16) => write!(f, "bgezal {rs}, {imm16:#x}"),
            Instruction::Bltzall(rs, imm16) => write!(f, "bltzall {rs}, {imm16:#x}"),
            Instruction::Bgezall(rs, imm16) => write!(f, "bgezall {rs}, {imm16:#x}"),
            Instruction::J(imm26) => write!(f, "j {imm26:#x}"),
            Instruction::Jal(imm26) => write!(f, "jal {imm26:#x}"),
            Instruction::Beq(rs, rt, imm16) => write!(f, "beq {rs}, {rt}, {imm16:#x}"),
            Instruction::Bne(rs, rt, imm16) => write!(f, "bne {rs}, {rt}, {imm16:#x}"),
            Instruction::Blez(rs, imm16) => write!(f, "blez {rs}, {imm16:#x}"),
            Instruction::Bgtz(rs, imm16) => write!(f, "bgtz {rs}, {imm16:#x}"),
            Instruction::Addi(rt, rs, imm16) => write!(f, "{rt} = addi {rs}, {imm16:#x}"),
            Instruction::Addiu(rt, rs, imm16) => write!(f, "{rt} = addiu {rs}, {imm16:#x}"),
            Instruction::Slti(rt, rs, imm16) => write!(f, "{rt} = slti {rs}, {imm16:#x}"),
            Instruction::Sltiu(rt, rs, imm16) => write!(f, "{rt} = sltiu {rs}, {imm16:#x}"),
            Instruction::Andi(rt, rs, imm16) => write!(f, "{rt} = andi {rs}, {imm16:#x}"),
            Instruction::Ori(rt, rs, imm16) => write!(f, "{rt} = ori {rs}, {imm16:#x}"),
            Instruction::Xori(rt, rs, imm16) => write!(f, "{rt} = xori {rs}, {imm16:#x}"),
            Instruction::Lui(rt, imm16) => write!(f, "{rt} = lui {imm16:#x}"),
            Instruction::Beql(rs, rt, imm16) => write!(f, "beql {rs}, {rt}, {imm16:#x}"),
            Instruction::Bnel(rs, rt, imm16) => write!(f, "bnel {rs}, {rt}, {imm16:#x}"),
            Instruction::Blezl(rs, imm16) => write!(f, "blezl {rs}, {imm16:#x}"),
            Instruction::Bgtzl(rs, imm16) => write!(f, "bgtzl {rs}, {imm16:#x}"),
            Instruction::Daddi(rt, rs, imm16) => write!(f, "{rt} = daddi {rs}, {imm16:#x}"),
            Instruction::Daddiu(rt, rs, imm16) => write!(f, "{rt} = daddiu {rs}, {imm16:#x}"),
            Instruction::Mfc0(rt, cd) => write!(f, "{rt} = mfc0 {cd}"),
            Instruction::Mtc0(cd, rt) => write!(f, "{cd} = mtc0 {rt}"),
            Instruction::Tlbr => write!(f, "tlbr"),
            Instruction::Tlbwi => write!(f, "tlbwi"),
            Instruction::Tlbwr => write!(f, "tlbwr"),
            Instruction::Tlbp => write!(f, "tlbp"),
            Instruction::Eret => write!(f, "eret"),
            Instruction::Ei => write!(f, "ei"),
            Instruction::Di => write!(f, "di"),
            Instruction::Mfc1(rt, fs) => write!(f, "{rt} = mfc1 {fs}"),
            Instruction::Cfc1(rt, fs) => write!(f, "{rt} = cfc1 {fs}"),
            Instruction::Mtc1(fs, rt) => write!(f, "{fs} = mtc1 {rt}"),
            Instruction::Ctc1(fs, rt) => write!(f, "{fs} = ctc1 {rt}"),
            Instruction::Bc1f(imm16) => write!(f, "bc1f {imm16:#x}"),
            Instruction::Bc1t(imm16) => write!(f, "bc1t {imm16:#x}"),
            Instruction::Bc1fl(imm16) => write!(f, "bc1fl {imm16:#x}"),
            Instruction::Bc1tl(imm16) => write!(f, "bc1tl {imm16:#x}"),
            Instruction::Adds(fd, fs, ft) => write!(f, "{fd} = add.s {fs}, {ft}"),
            Instruction::Subs(fd, fs, ft) => write!(f, "{fd} = sub.s {fs}, {ft}"),
            Instruction::Muls(fd, fs, ft) => write!(f, "{fd} = mul.s {fs}, {ft}"),
            Instruction::Divs(fd, fs, ft) => write!(f, "{fd} = div.s {fs}, {ft}"),
            Instruction::Abss(fd, fs) => write!(f, "{fd} = abs.s {fs}"),
            Instruction::Movs(fd, fs) => write!(f, "{fd} = mov.s {fs}"),
            Instruction::Negs(fd, fs) => write!(f, "{fd} = neg.s {fs}"),
            Instruction::Cvtws(fd, fs) => write!(f, "{fd} = cvt.w.s {fs}"),
            Instruction::Ceqs(fs, ft) => write!(f, "c.eq.s {fs}, {ft}"),
            Instruction::Clts(fs, ft) => write!(f, "c.lt.s {fs}, {ft}"),
            Instruction::Cles(fs, ft) => write!(f, "c.le.s {fs}, {ft}"),
            Instruction::Cvtsw(fd, fs) => write!(f, "{fd} = cvt.s.w {fs}"),
            Instruction::Madd(rd, rs, rt) => write!(f, "{rd} = madd {rs}, {rt}"),
            Instruction::Maddu(rd, rs, rt) => write!(f, "{rd} = maddu {rs}, {rt}"),
            Instruction::Plzcw(rd, rs) => write!(f, "{rd} = plzcw {rs}"),
            Instruction::Mfhi1(rd) => write!(f, "{rd} = mfhi1"),
            Instruction::Mthi1(rs) => write!(f, "mthi1 {rs}"),
            Instruction::Mflo1(rd) => write!(f, "{rd} = mflo1"),
            Instruction::Mtlo1(rs) => write!(f, "mtlo1 {rs}"),
            Instruction::Mult1(rd, rs, rt) => write!(f, "{rd} = mult1 {rs}, {rt}"),
            Instruction::Multu1(rd, rs, rt) => write!(f, "{rd} = multu1 {rs}, {rt}"),
            Instruction::Div1(rs, rt) => write!(f, "div1 {rs}, {rt}"),
            Instruction::Divu1(rs, rt) => write!(f, "divu1 {rs}, {rt}"),
            Instruction::Madd1(rd, rs, rt) => write!(f, "{rd} = madd1 {rs}, {rt}"),
            Instruction::Maddu1(rd, rs, rt) => write!(f, "{rd} = maddu1 {rs}, {rt}"),
            Instruction::Pcpyld(rd, rs, rt) => write!(f, "{rd} = pcpyld {rs}, {rt}"),
            Instruction::Pand(rd, rs, rt) => write!(f, "{rd} = pand {rs}, {rt}"),
            Instruction::Pxor(rd, rs, rt) => write!(f, "{rd} = pxor {rs}, {rt}"),
            Instruction::Pcpyud(rd, rs, rt) => write!(f, "{rd} = pcpyud {rs}, {rt}"),
            Instruction::Por(rd, rs, rt) => write!(f, "{rd} = por {rs}, {rt}"),
            Instruction::Pnor(rd, rs, rt) => write!(f, "{rd} = pnor {rs}, {rt}"),
            Instruction::Ldl(rt, imm16, rs) => write!(f, "{rt} = ldl {imm16:#x}({rs})"),
            Instruction::Ldr(rt, imm16, rs) => write!(f, "{rt} = ldr {imm16:#x}({rs})"),
            Instruction::Lq(rt, imm16, rs) => write!(f, "{rt} = lq {imm16:#x}({rs})"),
            Instruction::Sq(rt, imm16, rs) => write!(f, "sq {rt}, {imm16:#x}({rs})"),
            Instruction::Lb(rt, imm16, rs) => write!(f, "{rt} = lb {imm16:#x}({rs})"),
            Instruction::Lh(rt, imm16, rs) => write!(f, "{rt} = lh {imm16:#x}({rs})"),
            Instruction::Lwl(rt, imm16, rs) => write!(f, "{rt} = lwl {imm16:#x}({rs})"),
            Instruction::Lw(rt, imm16, rs) => write!(f, "{rt} = lw {imm16:#x}({rs})"),
            Instruction::Lbu(rt, imm16, rs) => write!(f, "{rt} = lbu {imm16:#x}({rs})"),
            Instruction::Lhu(rt, imm16, rs) => write!(f, "{rt} = lhu {imm16:#x}({rs})"),
            Instruction::Lwr(rt, imm16, rs) => write!(f, "{rt} = lwr {imm16:#x}({rs})"),
            Instruction::Lwu(rt, imm16, rs) => write!(f, "{rt} = lwu {imm16:#x}({rs})"),
            Instruction::Sb(rt, imm16, rs) => write!(f, "sb {rt}, {imm16:#x}({rs})"),
            Instruction::Sh(rt, imm16, rs) => write!(f, "sh {rt}, {imm16:#x}({rs})"),
            Instruction::Swl(rt, imm16, rs) => write!(f, "swl {rt}, {imm16:#x}({rs})"),
            Instruction::Sw(rt, imm16, rs) => write!(f, "sw {rt}, {imm16:#x}({rs})"),
            Instruction::Sdl(rt, imm16, rs) => write!(f, "sdl {rt}, {imm16:#x}({rs})"),
            Instruction::Sdr(rt, imm16, rs) => write!(f, "sdr {rt}, {imm16:#x}({rs})"),
            Instruction::Swr(rt, imm16, rs) => write!(f, "swr {rt}, {imm16:#x}({rs})"),
            Instruction::Cache => write!(f, "cache"),
            Instruction::Lwc1(ft, imm16, rs) => write!(f, "{ft} = lwc1 {imm16:#x}({rs})"),
            Instruction::Pref => write!(f, "pref"),
            Instruction::Ld(rt, imm16, rs) => write!(f, "{rt} = ld {imm16:#x}({rs})"),
            Instruction::Swc1(ft, imm16, rs) => write!(f, "swc1 {ft}, {imm16:#x}({rs})"),
            Instruction::Sd(rt, imm16, rs) => write!(f, "sd {rt}, {imm16:#x}({rs})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_lui() {
        assert_eq!(
            Instruction::decode(0x3C08_1234),
            Instruction::Lui(Register::T0, 0x1234)
        );
    }

    #[test]
    fn decodes_secondary_tables() {
        // addu v0, a0, a1
        assert_eq!(
            Instruction::decode(0x0085_1021),
            Instruction::Addu(Register::V0, Register::A0, Register::A1)
        );
        // bgezal s0, 4
        assert_eq!(
            Instruction::decode(0x0611_0004),
            Instruction::Bgezal(Register::S0, 4)
        );
        // mtc0 t0, Status
        assert_eq!(
            Instruction::decode(0x4088_6000),
            Instruction::Mtc0(control::Register::Status, Register::T0)
        );
        assert_eq!(Instruction::decode(0x4200_0018), Instruction::Eret);
        // mflo1 v0
        assert_eq!(Instruction::decode(0x7000_1012), Instruction::Mflo1(Register::V0));
        // por v0, a0, a1
        assert_eq!(
            Instruction::decode(0x7085_14A9),
            Instruction::Por(Register::V0, Register::A0, Register::A1)
        );
    }

    #[test]
    fn unknown_encodings_are_reported_not_fatal() {
        assert_eq!(Instruction::decode(0x0000_0005), Instruction::Unknown(0x0000_0005));
        assert_eq!(Instruction::decode(0xF400_0000), Instruction::Unknown(0xF400_0000));
    }

    #[test]
    fn branch_targets() {
        // beq zero, zero, -1
        let beq = Instruction::decode(0x1000_FFFF);
        assert_eq!(beq.branch_target(0x8000_1000), Some(0x8000_1000));
        let jal = Instruction::Jal(0x0010_0000);
        assert_eq!(jal.branch_target(0x9000_0000), Some(0x9040_0000));
        assert!(Instruction::decode(0x0000_0000).is_nop());
    }
}

use std::fmt::Display;

use enum_map::Enum;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Enum, FromPrimitive)]
#[repr(u8)]
pub enum Register {
    Zero,
    At,
    V0,
    V1,
    A0,
    A1,
    A2,
    A3,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    T8,
    T9,
    K0,
    K1,
    Gp,
    Sp,
    Fp,
    Ra,
    // Not encodable in instructions. HI1/LO1 live in the upper 64 bits.
    Lo,
    Hi,
}

impl From<u32> for Register {
    fn from(value: u32) -> Self {
        Register::from_u32(value & 0b11111).unwrap_or(Register::Zero)
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Register::Zero => "zero",
            Register::At => "at",
            Register::V0 => "v0",
            Register::V1 => "v1",
            Register::A0 => "a0",
            Register::A1 => "a1",
            Register::A2 => "a2",
            Register::A3 => "a3",
            Register::T0 => "t0",
            Register::T1 => "t1",
            Register::T2 => "t2",
            Register::T3 => "t3",
            Register::T4 => "t4",
            Register::T5 => "t5",
            Register::T6 => "t6",
            Register::T7 => "t7",
            Register::S0 => "s0",
            Register::S1 => "s1",
            Register::S2 => "s2",
            Register::S3 => "s3",
            Register::S4 => "s4",
            Register::S5 => "s5",
            Register::S6 => "s6",
            Register::S7 => "s7",
            Register::T8 => "t8",
            Register::T9 => "t9",
            Register::K0 => "k0",
            Register::K1 => "k1",
            Register::Gp => "gp",
            Register::Sp => "sp",
            Register::Fp => "fp",
            Register::Ra => "ra",
            Register::Lo => "lo",
            Register::Hi => "hi",
        };
        write!(f, "{name}")
    }
}

pub trait SetRegister<T> {
    fn set_register(&mut self, value: T);
}

pub trait GetRegister<T> {
    fn get_register(&self) -> T;
}

const UPPER_HALF: u128 = 0xFFFF_FFFF_FFFF_FFFF_0000_0000_0000_0000;

// Word-sized results are sign-extended to 64 bits; bits 64..128 are left alone.
impl SetRegister<u32> for u128 {
    #[inline(always)]
    fn set_register(&mut self, value: u32) {
        self.set_register(value as i32 as i64 as u64);
    }
}

impl SetRegister<i32> for u128 {
    #[inline(always)]
    fn set_register(&mut self, value: i32) {
        self.set_register(value as i64 as u64);
    }
}

impl SetRegister<u64> for u128 {
    #[inline(always)]
    fn set_register(&mut self, value: u64) {
        *self = value as u128 | (*self & UPPER_HALF);
    }
}

impl SetRegister<i64> for u128 {
    #[inline(always)]
    fn set_register(&mut self, value: i64) {
        self.set_register(value as u64);
    }
}

impl SetRegister<u128> for u128 {
    #[inline(always)]
    fn set_register(&mut self, value: u128) {
        *self = value;
    }
}

impl SetRegister<i128> for u128 {
    #[inline(always)]
    fn set_register(&mut self, value: i128) {
        *self = value as u128;
    }
}

macro_rules! impl_get_register {
    ($($ty:ty),*) => {
        $(
            impl GetRegister<$ty> for u128 {
                #[inline(always)]
                fn get_register(&self) -> $ty {
                    *self as $ty
                }
            }
        )*
    };
}

impl_get_register!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_five_bit_fields() {
        assert_eq!(Register::from(8), Register::T0);
        assert_eq!(Register::from(31), Register::Ra);
        assert_eq!(Register::from(32), Register::Zero);
        assert_eq!(Register::Sp.to_string(), "sp");
    }

    #[test]
    fn word_writes_sign_extend_and_keep_upper_half() {
        let mut value: u128 = 0xAAAA_AAAA_AAAA_AAAA_0000_0000_0000_0000;
        value.set_register(-2i32);
        let low: i64 = value.get_register();
        assert_eq!(low, -2);
        assert_eq!(value >> 64, 0xAAAA_AAAA_AAAA_AAAA);
    }

    #[test]
    fn quadword_write_round_trips_low_word() {
        let mut value: u128 = 0;
        value.set_register(0x0123_4567_89AB_CDEF_FEDC_BA98_8765_4321u128);
        let low: u32 = value.get_register();
        assert_eq!(low, 0x8765_4321);
        let byte: i8 = value.get_register();
        assert_eq!(byte, 0x21);
    }
}

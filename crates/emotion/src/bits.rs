use std::ops::{Add, BitAnd, BitOr, Bound, Not, RangeBounds, Shl, Shr, Sub};

/// Field access on packed hardware registers.
pub trait Bits<Index = Self>
where
    Self: Copy,
{
    fn mask(range: impl RangeBounds<Index>) -> Self;
    fn bits(self, range: impl RangeBounds<Index>) -> Self;
    fn bit(self, index: Index) -> bool;
    fn set_bits(&mut self, range: impl RangeBounds<Index>, value: Self);
    fn set_bit(&mut self, index: Index, value: bool);
}

fn bounds<Index>(range: &impl RangeBounds<Index>, width: Index) -> (Index, Index)
where
    Index: From<u8> + Add<Output = Index> + Copy,
{
    let start = match range.start_bound() {
        Bound::Included(&start) => start,
        Bound::Excluded(&start) => start + Index::from(1),
        Bound::Unbounded => Index::from(0),
    };
    let end = match range.end_bound() {
        Bound::Included(&end) => end + Index::from(1),
        Bound::Excluded(&end) => end,
        Bound::Unbounded => width,
    };
    (start, end)
}

impl<T, Index> Bits<Index> for T
where
    T: BitAnd<Output = T>,
    T: BitOr<Output = T>,
    T: Copy,
    T: Eq,
    T: From<u8>,
    T: Not<Output = T>,
    T: Shl<Index, Output = T>,
    T: Shr<Index, Output = T>,
    Index: From<u8>,
    Index: Add<Output = Index>,
    Index: Sub<Output = Index>,
    Index: Copy,
{
    fn mask(range: impl RangeBounds<Index>) -> T {
        let width = Index::from(8 * std::mem::size_of::<T>() as u8);
        let (start, end) = bounds(&range, width);
        // Shifting the all-ones pattern down keeps full-width masks from overflowing.
        (!T::from(0) >> (width - (end - start))) << start
    }

    fn bits(self, range: impl RangeBounds<Index>) -> Self {
        let width = Index::from(8 * std::mem::size_of::<T>() as u8);
        let (start, end) = bounds(&range, width);
        (self >> start) & (!T::from(0) >> (width - (end - start)))
    }

    fn bit(self, index: Index) -> bool {
        self & (Self::from(1) << index) != Self::from(0)
    }

    fn set_bits(&mut self, range: impl RangeBounds<Index>, value: T) {
        let (start, _) = bounds(&range, Index::from(0));
        let mask = Self::mask(range);
        *self = *self & !mask | (value << start) & mask;
    }

    fn set_bit(&mut self, index: Index, value: bool) {
        let mask = Self::from(1) << index;
        *self = *self & !mask | (if value { mask } else { Self::from(0) });
    }
}

pub trait SignExtend<T> {
    fn sign_extend(self) -> T;
}

impl<T> SignExtend<T> for u8
where
    i8: SignExtend<T>,
{
    fn sign_extend(self) -> T {
        (self as i8).sign_extend()
    }
}

impl<T> SignExtend<T> for u16
where
    i16: SignExtend<T>,
{
    fn sign_extend(self) -> T {
        (self as i16).sign_extend()
    }
}

impl<T> SignExtend<T> for u32
where
    i32: SignExtend<T>,
{
    fn sign_extend(self) -> T {
        (self as i32).sign_extend()
    }
}

impl SignExtend<u64> for i8 {
    fn sign_extend(self) -> u64 {
        self as i64 as u64
    }
}

impl SignExtend<u32> for i16 {
    fn sign_extend(self) -> u32 {
        self as i32 as u32
    }
}

impl SignExtend<u64> for i16 {
    fn sign_extend(self) -> u64 {
        self as i64 as u64
    }
}

impl SignExtend<u64> for i32 {
    fn sign_extend(self) -> u64 {
        self as i64 as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_instruction_fields() {
        let word: u32 = 0x3C08_1234; // lui t0, 0x1234
        assert_eq!(word.bits(26..32), 0x0F);
        assert_eq!(word.bits(16..21), 8);
        assert_eq!(word.bits(0..16), 0x1234);
        assert!(word.bit(29));
        assert!(!word.bit(31));
    }

    #[test]
    fn full_width_mask_does_not_overflow() {
        assert_eq!(u64::mask(0..64), u64::MAX);
        assert_eq!(u32::mask(8..32), 0xFFFF_FF00);
        assert_eq!(u128::mask(64u8..128), (u64::MAX as u128) << 64);
    }

    #[test]
    fn set_bits_only_touches_the_field() {
        let mut status: u32 = 0xFFFF_FFFF;
        status.set_bits(3..5, 0b10);
        assert_eq!(status, 0xFFFF_FFF7);
        status.set_bit(0, false);
        assert_eq!(status, 0xFFFF_FFF6);
        status.set_bit(0, true);
        assert_eq!(status.bits(3..5), 0b10);
    }

    #[test]
    fn sign_extension() {
        let byte: u64 = 0x80u8.sign_extend();
        assert_eq!(byte, 0xFFFF_FFFF_FFFF_FF80);
        let half: u32 = 0xFFFEu16.sign_extend();
        assert_eq!(half, 0xFFFF_FFFE);
        let word: u64 = 0x7FFF_FFFFu32.sign_extend();
        assert_eq!(word, 0x7FFF_FFFF);
    }
}

/// Little-endian conversion for the access widths the bus understands.
pub trait Bytes: Copy + Default {
    type Bytes: AsRef<[u8]>;
    const WIDTH: usize;

    fn from_bytes(bytes: &[u8]) -> Self;
    fn to_bytes(self) -> Self::Bytes;
}

macro_rules! impl_bytes {
    ($($ty:ty),*) => {
        $(
            impl Bytes for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn from_bytes(bytes: &[u8]) -> $ty {
                    let mut raw = [0; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                    <$ty>::from_le_bytes(raw)
                }

                fn to_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_bytes!(u8, u16, u32, u64, u128);

/// Reinterpret a value of one width as another, zero-extending or truncating.
pub fn convert<Source: Bytes, Target: Bytes>(value: Source) -> Target {
    let mut raw = [0u8; 16];
    raw[..Source::WIDTH].copy_from_slice(value.to_bytes().as_ref());
    Target::from_bytes(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_layout() {
        assert_eq!(0x1234_5678u32.to_bytes(), [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(u16::from_bytes(&[0xCD, 0xAB, 0xFF]), 0xABCD);
    }

    #[test]
    fn convert_truncates_and_extends() {
        assert_eq!(convert::<u64, u32>(0xDEAD_BEEF_0000_0001), 1);
        assert_eq!(convert::<u16, u64>(0xFFFF), 0xFFFF);
        assert_eq!(convert::<u32, u128>(0x8000_0000), 0x8000_0000);
    }
}

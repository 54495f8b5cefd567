/// A value with a fixed-size little-endian wire representation.
///
/// One implementation exists per primitive the wire format supports. `SIZE`
/// and `ALIGN` drive padding decisions in the builder; `read_le`/`write_le`
/// are the two directions of the codec. `read_le` expects a slice of exactly
/// `SIZE` bytes, bounds checks happen at the call site.
pub trait Scalar: Copy + PartialEq {
    const SIZE: usize;
    const ALIGN: usize;

    fn write_le(self, dst: &mut [u8]);
    fn read_le(src: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();
                const ALIGN: usize = std::mem::size_of::<$ty>();

                fn write_le(self, dst: &mut [u8]) {
                    dst.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(src: &[u8]) -> $ty {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    bytes.copy_from_slice(src);
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Scalar for bool {
    const SIZE: usize = 1;
    const ALIGN: usize = 1;

    fn write_le(self, dst: &mut [u8]) {
        dst[0] = if self { 1 } else { 0 };
    }

    fn read_le(src: &[u8]) -> bool {
        src[0] != 0
    }
}

#[test]
fn scalar_round_trip() {
    fn round_trip<T: Scalar + std::fmt::Debug>(value: T) {
        let mut bytes = [0u8; 8];
        value.write_le(&mut bytes[..T::SIZE]);
        assert_eq!(T::read_le(&bytes[..T::SIZE]), value);
    }

    round_trip(0xABu8);
    round_trip(-1i8);
    round_trip(0xAABBu16);
    round_trip(i16::MIN);
    round_trip(0xAABBCCDDu32);
    round_trip(i32::MAX);
    round_trip(u64::MAX);
    round_trip(i64::MIN);
    round_trip(1234.56f32);
    round_trip(2873242.82782f64);
    round_trip(true);
    round_trip(false);
}

#[test]
fn scalar_little_endian_layout() {
    let mut bytes = [0u8; 4];
    0x11223344u32.write_le(&mut bytes);
    assert_eq!(bytes, [0x44, 0x33, 0x22, 0x11]);

    let mut bytes = [0u8; 2];
    0x0102u16.write_le(&mut bytes);
    assert_eq!(bytes, [0x02, 0x01]);
}

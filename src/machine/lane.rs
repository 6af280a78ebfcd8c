//! Scalar types the machine can sort

use std::cmp::Ordering;
use std::fmt::Debug;

use num_traits::Bounded;
use rand::Rng;

use crate::types::ElementType;

/// A scalar with a generated routine family
pub trait SortLane: Copy + PartialOrd + Bounded + Debug + Send + Sync + 'static {
    const ELEMENT: ElementType;

    /// Lane bit pattern, zero-extended to 64 bits
    fn to_bits(self) -> u64;

    fn from_bits(bits: u64) -> Self;

    /// A random value; floats stay finite
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self;

    /// Order used by the reference sort
    fn order(&self, other: &Self) -> Ordering;

    /// Value equality as the vector min/max see it
    fn same(&self, other: &Self) -> bool {
        self.order(other) == Ordering::Equal || self == other
    }
}

macro_rules! int_lane {
    ($ty:ty, $elem:ident, $bits:ty) => {
        impl SortLane for $ty {
            const ELEMENT: ElementType = ElementType::$elem;

            fn to_bits(self) -> u64 {
                self as $bits as u64
            }

            fn from_bits(bits: u64) -> Self {
                bits as $bits as $ty
            }

            fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
                rng.gen()
            }

            fn order(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }
        }
    };
}

int_lane!(i32, I32, u32);
int_lane!(u32, U32, u32);
int_lane!(i64, I64, u64);
int_lane!(u64, U64, u64);

macro_rules! float_lane {
    ($ty:ty, $elem:ident, $bits:ty) => {
        impl SortLane for $ty {
            const ELEMENT: ElementType = ElementType::$elem;

            fn to_bits(self) -> u64 {
                <$ty>::to_bits(self) as u64
            }

            fn from_bits(bits: u64) -> Self {
                <$ty>::from_bits(bits as $bits)
            }

            fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
                rng.gen_range(-1.0e6..1.0e6)
            }

            fn order(&self, other: &Self) -> Ordering {
                self.partial_cmp(other).unwrap_or_else(|| self.total_cmp(other))
            }
        }
    };
}

float_lane!(f32, F32, u32);
float_lane!(f64, F64, u64);

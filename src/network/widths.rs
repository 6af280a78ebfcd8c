//! Type-safe network widths and the split the compounding engine uses
//!
//! A width of N vectors is always built from two strictly smaller widths,
//! the first of which is a power of two. Keeping the first half at a
//! power-of-two width keeps every merge it feeds able to accept an
//! arbitrary bitonic input.

use crate::error::{GenError, Result};

/// A power of two value, guaranteed at the type level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerOfTwo {
    value: usize,
    log2_value: u32,
}

impl PowerOfTwo {
    /// Create a new PowerOfTwo from a value
    /// Returns None if the value is not a power of two
    pub fn new(value: usize) -> Option<Self> {
        if value.is_power_of_two() {
            Some(PowerOfTwo {
                value,
                log2_value: value.trailing_zeros(),
            })
        } else {
            None
        }
    }

    /// Create from a log2 value (e.g., 3 creates 8)
    pub fn from_log2(log2_value: u32) -> Self {
        PowerOfTwo {
            value: 1 << log2_value,
            log2_value,
        }
    }

    /// Largest power of two strictly below `n`; None for `n < 2`
    pub fn below(n: usize) -> Option<Self> {
        if n < 2 {
            return None;
        }
        let log2_value = usize::BITS - 1 - (n - 1).leading_zeros();
        Some(Self::from_log2(log2_value))
    }

    pub fn value(&self) -> usize {
        self.value
    }

    pub fn log2(&self) -> u32 {
        self.log2_value
    }
}

/// Number of vectors a routine handles, checked against the configured maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkWidth(usize);

impl NetworkWidth {
    pub fn new(width: usize, max: usize) -> Result<Self> {
        if width == 0 || width > max {
            Err(GenError::WidthOutOfRange { width, max })
        } else {
            Ok(NetworkWidth(width))
        }
    }

    pub fn get(&self) -> usize {
        self.0
    }

    pub fn is_power_of_two(&self) -> bool {
        PowerOfTwo::new(self.0).is_some()
    }

    /// The two sub-widths a compound routine of this width is built from
    pub fn split(&self) -> Option<Split> {
        let w1 = PowerOfTwo::below(self.0)?;
        Some(Split {
            first: w1,
            second: self.0 - w1.value(),
        })
    }
}

/// `first + second` vectors, with `1 <= second <= first`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub first: PowerOfTwo,
    pub second: usize,
}

impl Split {
    pub fn w1(&self) -> usize {
        self.first.value()
    }

    pub fn w2(&self) -> usize {
        self.second
    }

    pub fn total(&self) -> usize {
        self.first.value() + self.second
    }

    /// 1-based index of the vector a second-half vector `r` is exchanged with
    /// when two oppositely sorted halves are flipped together
    pub fn mirror(&self, r: usize) -> usize {
        let w1 = self.first.value();
        w1 + 1 - (r - w1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_of_two() {
        assert!(PowerOfTwo::new(0).is_none());
        assert!(PowerOfTwo::new(3).is_none());
        assert!(PowerOfTwo::new(5).is_none());

        let p4 = PowerOfTwo::new(4).unwrap();
        assert_eq!(p4.value(), 4);
        assert_eq!(p4.log2(), 2);

        let p16 = PowerOfTwo::from_log2(4);
        assert_eq!(p16.value(), 16);
        assert_eq!(p16.log2(), 4);
    }

    #[test]
    fn test_power_of_two_below() {
        assert!(PowerOfTwo::below(1).is_none());
        assert_eq!(PowerOfTwo::below(2).unwrap().value(), 1);
        assert_eq!(PowerOfTwo::below(5).unwrap().value(), 4);
        assert_eq!(PowerOfTwo::below(8).unwrap().value(), 4);
        assert_eq!(PowerOfTwo::below(9).unwrap().value(), 8);
        assert_eq!(PowerOfTwo::below(16).unwrap().value(), 8);
    }

    #[test]
    fn test_split_bounds() {
        for n in 2..=16 {
            let split = NetworkWidth::new(n, 16).unwrap().split().unwrap();
            assert_eq!(split.total(), n);
            assert!(split.w2() >= 1);
            assert!(split.w2() <= split.w1());
            assert!(split.w1() < n);
        }
        assert!(NetworkWidth::new(1, 16).unwrap().split().is_none());
    }

    #[test]
    fn test_mirror_pairs() {
        // N=5: w1=4, vector 5 is flipped against vector 4
        let split = NetworkWidth::new(5, 16).unwrap().split().unwrap();
        assert_eq!(split.mirror(5), 4);
        // N=16: vectors 9..=16 pair with 8..=1
        let split = NetworkWidth::new(16, 16).unwrap().split().unwrap();
        let mirrors: Vec<_> = (9..=16).map(|r| split.mirror(r)).collect();
        assert_eq!(mirrors, vec![8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_width_range() {
        assert!(NetworkWidth::new(0, 16).is_err());
        assert!(NetworkWidth::new(17, 16).is_err());
        assert!(NetworkWidth::new(16, 16).unwrap().is_power_of_two());
        assert!(!NetworkWidth::new(12, 16).unwrap().is_power_of_two());
    }
}

//! Lane-exact models of the AVX2 intrinsics the generated routines use

use crate::types::ElementType;

/// A 256-bit register as eight 32-bit lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Ymm(pub [u32; 8]);

impl Ymm {
    pub fn splat32(value: u32) -> Self {
        Ymm([value; 8])
    }

    pub fn splat64(value: u64) -> Self {
        Self::from_u64([value; 4])
    }

    pub fn from_u64(lanes: [u64; 4]) -> Self {
        let mut out = [0u32; 8];
        for (i, lane) in lanes.iter().enumerate() {
            out[2 * i] = *lane as u32;
            out[2 * i + 1] = (*lane >> 32) as u32;
        }
        Ymm(out)
    }

    pub fn to_u64(&self) -> [u64; 4] {
        let mut out = [0u64; 4];
        for (i, lane) in out.iter_mut().enumerate() {
            *lane = u64::from(self.0[2 * i]) | (u64::from(self.0[2 * i + 1]) << 32);
        }
        out
    }

    /// Lanes of `bytes` width (4 or 8) widened to u64
    pub fn lanes(&self, bytes: usize) -> Vec<u64> {
        if bytes == 8 {
            self.to_u64().to_vec()
        } else {
            self.0.iter().map(|&l| u64::from(l)).collect()
        }
    }

    /// Register from lanes of `bytes` width; missing lanes are zero
    pub fn from_lanes(bytes: usize, lanes: &[u64]) -> Self {
        if bytes == 8 {
            let mut out = [0u64; 4];
            for (o, l) in out.iter_mut().zip(lanes) {
                *o = *l;
            }
            Self::from_u64(out)
        } else {
            let mut out = [0u32; 8];
            for (o, l) in out.iter_mut().zip(lanes) {
                *o = *l as u32;
            }
            Ymm(out)
        }
    }

    /// Register holding `element`'s bit pattern in every lane
    pub fn splat(element: ElementType, bits: u64) -> Self {
        if element.byte_width() == 8 {
            Self::splat64(bits)
        } else {
            Self::splat32(bits as u32)
        }
    }
}

fn map2_32(a: Ymm, b: Ymm, f: impl Fn(u32, u32) -> u32) -> Ymm {
    let mut out = [0u32; 8];
    for i in 0..8 {
        out[i] = f(a.0[i], b.0[i]);
    }
    Ymm(out)
}

fn map2_64(a: Ymm, b: Ymm, f: impl Fn(u64, u64) -> u64) -> Ymm {
    let (a, b) = (a.to_u64(), b.to_u64());
    let mut out = [0u64; 4];
    for i in 0..4 {
        out[i] = f(a[i], b[i]);
    }
    Ymm::from_u64(out)
}

/// `_mm256_shuffle_epi32`: the same 4-lane pattern in each 128-bit half
pub fn shuffle_epi32(a: Ymm, imm: u8) -> Ymm {
    let mut out = [0u32; 8];
    for half in 0..2 {
        for i in 0..4 {
            let src = usize::from((imm >> (2 * i)) & 3);
            out[half * 4 + i] = a.0[half * 4 + src];
        }
    }
    Ymm(out)
}

/// `_mm256_shuffle_pd`: even lanes from `a`, odd lanes from `b`, within each half
pub fn shuffle_pd(a: Ymm, b: Ymm, imm: u8) -> Ymm {
    let (a, b) = (a.to_u64(), b.to_u64());
    let bit = |i: u8| usize::from((imm >> i) & 1);
    Ymm::from_u64([a[bit(0)], b[bit(1)], a[2 + bit(2)], b[2 + bit(3)]])
}

/// `_mm256_permute4x64_pd`: any 64-bit lane from anywhere
pub fn permute4x64_pd(a: Ymm, imm: u8) -> Ymm {
    let a = a.to_u64();
    let mut out = [0u64; 4];
    for (i, o) in out.iter_mut().enumerate() {
        *o = a[usize::from((imm >> (2 * i)) & 3)];
    }
    Ymm::from_u64(out)
}

/// `_mm256_blend_epi32`: lane `i` from `b` when bit `i` of `imm` is set
pub fn blend_epi32(a: Ymm, b: Ymm, imm: u8) -> Ymm {
    let mut out = a.0;
    for (i, o) in out.iter_mut().enumerate() {
        if (imm >> i) & 1 == 1 {
            *o = b.0[i];
        }
    }
    Ymm(out)
}

pub fn blend_pd(a: Ymm, b: Ymm, imm: u8) -> Ymm {
    let (mut out, b) = (a.to_u64(), b.to_u64());
    for (i, o) in out.iter_mut().enumerate() {
        if (imm >> i) & 1 == 1 {
            *o = b[i];
        }
    }
    Ymm::from_u64(out)
}

/// `_mm256_blendv_pd`: lane from `b` where the mask lane's top bit is set
pub fn blendv_pd(a: Ymm, b: Ymm, mask: Ymm) -> Ymm {
    let (mut out, b, mask) = (a.to_u64(), b.to_u64(), mask.to_u64());
    for i in 0..4 {
        if mask[i] >> 63 == 1 {
            out[i] = b[i];
        }
    }
    Ymm::from_u64(out)
}

/// Lane-wise minimum with x86 semantics: the second operand wins ties and NaNs
pub fn min(element: ElementType, a: Ymm, b: Ymm) -> Ymm {
    match element {
        ElementType::I32 => map2_32(a, b, |x, y| (x as i32).min(y as i32) as u32),
        ElementType::U32 => map2_32(a, b, |x, y| x.min(y)),
        ElementType::F32 => map2_32(a, b, |x, y| {
            if f32::from_bits(x) < f32::from_bits(y) {
                x
            } else {
                y
            }
        }),
        ElementType::F64 => map2_64(a, b, |x, y| {
            if f64::from_bits(x) < f64::from_bits(y) {
                x
            } else {
                y
            }
        }),
        ElementType::I64 => map2_64(a, b, |x, y| (x as i64).min(y as i64) as u64),
        ElementType::U64 => map2_64(a, b, |x, y| x.min(y)),
    }
}

/// Lane-wise maximum with x86 semantics: the second operand wins ties and NaNs
pub fn max(element: ElementType, a: Ymm, b: Ymm) -> Ymm {
    match element {
        ElementType::I32 => map2_32(a, b, |x, y| (x as i32).max(y as i32) as u32),
        ElementType::U32 => map2_32(a, b, |x, y| x.max(y)),
        ElementType::F32 => map2_32(a, b, |x, y| {
            if f32::from_bits(x) > f32::from_bits(y) {
                x
            } else {
                y
            }
        }),
        ElementType::F64 => map2_64(a, b, |x, y| {
            if f64::from_bits(x) > f64::from_bits(y) {
                x
            } else {
                y
            }
        }),
        ElementType::I64 => map2_64(a, b, |x, y| (x as i64).max(y as i64) as u64),
        ElementType::U64 => map2_64(a, b, |x, y| x.max(y)),
    }
}

/// `_mm256_cmpgt_epi64`: all ones where `a > b` as signed 64-bit integers
pub fn cmpgt_epi64(a: Ymm, b: Ymm) -> Ymm {
    map2_64(a, b, |x, y| if (x as i64) > (y as i64) { u64::MAX } else { 0 })
}

pub fn xor(a: Ymm, b: Ymm) -> Ymm {
    map2_32(a, b, |x, y| x ^ y)
}

pub fn or(a: Ymm, b: Ymm) -> Ymm {
    map2_32(a, b, |x, y| x | y)
}

/// `!a & b`
pub fn andnot(a: Ymm, b: Ymm) -> Ymm {
    map2_32(a, b, |x, y| !x & y)
}

/// Whether lane `i` of a mask of `bytes`-wide lanes has its top bit set
pub fn mask_lane_set(mask: Ymm, bytes: usize, i: usize) -> bool {
    if bytes == 8 {
        mask.to_u64()[i] >> 63 == 1
    } else {
        mask.0[i] >> 31 == 1
    }
}

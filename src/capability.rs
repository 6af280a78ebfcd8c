//! Hardware vector primitives for one element type
//!
//! [`Capabilities`] fixes the element type and register width and hands out
//! IR fragments for every primitive the generators need. Lane-pattern
//! operations are expressed on a canonical register class (packed 32-bit
//! integers for 8 lanes, packed doubles for 4 lanes) and wrapped in casts
//! whenever the element's own register class differs.

use crate::config::TargetIsa;
use crate::error::{GenError, Result};
use crate::ir::{Expr, Reg, Stmt, Var};
use crate::types::{Direction, ElementType, LaneClass, PrimitiveOp};

/// Immediates of the lane patterns, per lane class
mod imm {
    pub const EPI32_X1: u8 = 0xB1;
    pub const EPI32_X2: u8 = 0x4E;
    pub const EPI32_XR: u8 = 0x1B;
    pub const PD_X1: u8 = 0x5;
    pub const PD_X2: u8 = 0x4E;
    pub const PD_XR: u8 = 0x1B;
    pub const LANES_HALF_SWAP: u8 = 0x4E;

    pub const EPI32_B1: u8 = 0xAA;
    pub const EPI32_B2: u8 = 0xCC;
    pub const EPI32_B4: u8 = 0xF0;
    pub const PD_B1: u8 = 0xA;
    pub const PD_B2: u8 = 0xC;
}

/// Top bit of a 64-bit lane; XOR-ing with it maps unsigned order onto signed order
pub const SIGN_BIT_64: u64 = 1 << 63;

/// The min and max of a compare-exchange, plus the compare mask 64-bit
/// integers need computed first
#[derive(Debug, Clone, PartialEq)]
pub struct CompareExchange {
    pub compare: Option<Stmt>,
    pub min: Expr,
    pub max: Expr,
}

/// Primitive operations available for one element type on one ISA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    element: ElementType,
    isa: TargetIsa,
    class: LaneClass,
}

impl Capabilities {
    pub fn new(element: ElementType, isa: TargetIsa) -> Result<Self> {
        let register_bytes = isa.vector_width_bytes();
        let lanes = element.lanes_in(register_bytes);
        let class = LaneClass::from_lanes(lanes).ok_or(GenError::UnsupportedLaneCount {
            element,
            register_bytes,
            lanes,
        })?;
        Ok(Self {
            element,
            isa,
            class,
        })
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    pub fn isa(&self) -> TargetIsa {
        self.isa
    }

    pub fn class(&self) -> LaneClass {
        self.class
    }

    /// Number of elements per vector register
    pub fn lanes(&self) -> usize {
        self.class.lanes()
    }

    /// Register class vectors of this element live in
    pub fn reg(&self) -> Reg {
        self.element.native_reg()
    }

    /// Whether `op` exists for this element type and lane count
    pub fn supports(&self, op: PrimitiveOp) -> bool {
        match op {
            PrimitiveOp::BlendB4 | PrimitiveOp::Reverse | PrimitiveOp::Cross => {
                self.class == LaneClass::Narrow
            }
            PrimitiveOp::Compare => self.element.is_wide_integer(),
            _ => true,
        }
    }

    fn require(&self, op: PrimitiveOp) -> Result<()> {
        if self.supports(op) {
            Ok(())
        } else {
            Err(GenError::InvalidOperation {
                op,
                element: self.element,
                lanes: self.lanes(),
            })
        }
    }

    fn invalid(&self, op: PrimitiveOp) -> GenError {
        GenError::InvalidOperation {
            op,
            element: self.element,
            lanes: self.lanes(),
        }
    }

    /// One of the three in-register shuffle patterns
    pub fn shuffle(&self, op: PrimitiveOp, v: Expr) -> Result<Expr> {
        self.require(op)?;
        let native = self.reg();
        let shuffled = match self.class {
            LaneClass::Narrow => {
                let imm = match op {
                    PrimitiveOp::ShuffleX1 => imm::EPI32_X1,
                    PrimitiveOp::ShuffleX2 => imm::EPI32_X2,
                    PrimitiveOp::ShuffleXR => imm::EPI32_XR,
                    _ => return Err(self.invalid(op)),
                };
                Expr::ShuffleEpi32 {
                    arg: Box::new(v.cast(Reg::Si256)),
                    imm,
                }
            }
            LaneClass::Wide => {
                let v = v.cast(Reg::Pd);
                match op {
                    PrimitiveOp::ShuffleX1 => Expr::ShufflePd {
                        a: Box::new(v.clone()),
                        b: Box::new(v),
                        imm: imm::PD_X1,
                    },
                    PrimitiveOp::ShuffleX2 => Expr::Permute4x64Pd {
                        arg: Box::new(v),
                        imm: imm::PD_X2,
                    },
                    PrimitiveOp::ShuffleXR => Expr::Permute4x64Pd {
                        arg: Box::new(v),
                        imm: imm::PD_XR,
                    },
                    _ => return Err(self.invalid(op)),
                }
            }
        };
        Ok(shuffled.cast(native))
    }

    /// Full lane reversal of an 8-lane register
    pub fn reverse(&self, v: Expr) -> Result<Expr> {
        self.require(PrimitiveOp::Reverse)?;
        let within_halves = Expr::ShuffleEpi32 {
            arg: Box::new(v.cast(Reg::Si256)),
            imm: imm::EPI32_XR,
        };
        let reversed = Expr::Permute4x64Pd {
            arg: Box::new(within_halves.cast(Reg::Pd)),
            imm: imm::LANES_HALF_SWAP,
        };
        Ok(reversed.cast(self.reg()))
    }

    /// Swap of the two 128-bit halves of an 8-lane register
    pub fn cross(&self, v: Expr) -> Result<Expr> {
        self.require(PrimitiveOp::Cross)?;
        let crossed = Expr::Permute4x64Pd {
            arg: Box::new(v.cast(Reg::Pd)),
            imm: imm::LANES_HALF_SWAP,
        };
        Ok(crossed.cast(self.reg()))
    }

    /// Any lane permutation used by a compare-exchange stage
    pub fn permute(&self, op: PrimitiveOp, v: Expr) -> Result<Expr> {
        match op {
            PrimitiveOp::Reverse => self.reverse(v),
            PrimitiveOp::Cross => self.cross(v),
            _ => self.shuffle(op, v),
        }
    }

    /// Picks `max` into the pattern lanes for ascending and `min` for descending
    pub fn blend(&self, op: PrimitiveOp, min: Expr, max: Expr, direction: Direction) -> Result<Expr> {
        self.require(op)?;
        let (a, b) = match direction {
            Direction::Ascending => (min, max),
            Direction::Descending => (max, min),
        };
        let blended = match self.class {
            LaneClass::Narrow => {
                let imm = match op {
                    PrimitiveOp::BlendB1 => imm::EPI32_B1,
                    PrimitiveOp::BlendB2 => imm::EPI32_B2,
                    PrimitiveOp::BlendB4 => imm::EPI32_B4,
                    _ => return Err(self.invalid(op)),
                };
                Expr::BlendEpi32 {
                    a: Box::new(a.cast(Reg::Si256)),
                    b: Box::new(b.cast(Reg::Si256)),
                    imm,
                }
            }
            LaneClass::Wide => {
                let imm = match op {
                    PrimitiveOp::BlendB1 => imm::PD_B1,
                    PrimitiveOp::BlendB2 => imm::PD_B2,
                    _ => return Err(self.invalid(op)),
                };
                Expr::BlendPd {
                    a: Box::new(a.cast(Reg::Pd)),
                    b: Box::new(b.cast(Reg::Pd)),
                    imm,
                }
            }
        };
        Ok(blended.cast(self.reg()))
    }

    /// Lane mask of `a > b` for 64-bit integers
    pub fn compare(&self, a: Expr, b: Expr) -> Result<Expr> {
        self.require(PrimitiveOp::Compare)?;
        let (a, b) = if self.element.is_signed() {
            (a, b)
        } else {
            (self.flip_sign(a), self.flip_sign(b))
        };
        Ok(Expr::CmpGtEpi64 {
            a: Box::new(a),
            b: Box::new(b),
        })
    }

    fn flip_sign(&self, v: Expr) -> Expr {
        Expr::Xor {
            a: Box::new(v),
            b: Box::new(Expr::Splat {
                element: self.element,
                bits: SIGN_BIT_64,
            }),
        }
    }

    /// Lane-wise minimum; 64-bit integers select through the `cmp` mask
    pub fn min(&self, a: Expr, b: Expr, cmp: Option<&Var>) -> Result<Expr> {
        self.select(PrimitiveOp::Min, a, b, cmp)
    }

    /// Lane-wise maximum; 64-bit integers select through the `cmp` mask
    pub fn max(&self, a: Expr, b: Expr, cmp: Option<&Var>) -> Result<Expr> {
        self.select(PrimitiveOp::Max, a, b, cmp)
    }

    fn select(&self, op: PrimitiveOp, a: Expr, b: Expr, cmp: Option<&Var>) -> Result<Expr> {
        if !self.element.is_wide_integer() {
            let (a, b) = (Box::new(a), Box::new(b));
            let element = self.element;
            return Ok(match op {
                PrimitiveOp::Min => Expr::Min { element, a, b },
                _ => Expr::Max { element, a, b },
            });
        }
        let cmp = cmp.ok_or(self.invalid(PrimitiveOp::Compare))?;
        // blendv takes b where a > b: that is the min; swapping the operands gives the max
        let (a, b) = match op {
            PrimitiveOp::Min => (a, b),
            _ => (b, a),
        };
        let selected = Expr::BlendvPd {
            a: Box::new(a.cast(Reg::Pd)),
            b: Box::new(b.cast(Reg::Pd)),
            mask: Box::new(cmp.expr().cast(Reg::Pd)),
        };
        Ok(selected.cast(self.reg()))
    }

    /// Min and max of `a` and `b`, with the compare into `cmp` when needed
    pub fn compare_exchange(&self, a: Expr, b: Expr, cmp: &Var) -> Result<CompareExchange> {
        if self.element.is_wide_integer() {
            let compare = Stmt::assign(cmp, self.compare(a.clone(), b.clone())?);
            Ok(CompareExchange {
                compare: Some(compare),
                min: self.min(a.clone(), b.clone(), Some(cmp))?,
                max: self.max(a, b, Some(cmp))?,
            })
        } else {
            Ok(CompareExchange {
                compare: None,
                min: self.min(a.clone(), b.clone(), None)?,
                max: self.max(a, b, None)?,
            })
        }
    }

    /// Unaligned load of the `vector`-th register (element offset `vector * lanes`)
    pub fn load(&self, vector: usize) -> Expr {
        Expr::Load {
            element: self.element,
            vector,
        }
    }

    /// Load of the lanes selected by `mask`; the other lanes read as the fill value
    pub fn masked_load(&self, vector: usize, mask: &Var) -> Result<Expr> {
        let native = self.reg();
        let loaded = Expr::MaskLoad {
            element: self.element,
            vector,
            mask: Box::new(mask.expr()),
        };
        let fill = Expr::AndNot {
            reg: native,
            a: Box::new(mask.expr().cast(native)),
            b: Box::new(Expr::Splat {
                element: self.element,
                bits: self.element.fill_bits(),
            }),
        };
        let expr = Expr::Or {
            reg: native,
            a: Box::new(loaded),
            b: Box::new(fill),
        };
        expr.validate()?;
        Ok(expr)
    }

    pub fn store(&self, vector: usize, value: &Var) -> Stmt {
        Stmt::Store {
            element: self.element,
            vector,
            value: value.clone(),
        }
    }

    pub fn masked_store(&self, vector: usize, mask: &Var, value: &Var) -> Stmt {
        Stmt::MaskStore {
            element: self.element,
            vector,
            mask: mask.clone(),
            value: value.clone(),
        }
    }

    /// Per-lane validity mask for the entry's `remainder`
    pub fn mask(&self) -> Expr {
        Expr::LaneMask {
            element: self.element,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(element: ElementType) -> Capabilities {
        Capabilities::new(element, TargetIsa::Avx2).unwrap()
    }

    #[test]
    fn test_lane_classes() {
        assert_eq!(caps(ElementType::I32).lanes(), 8);
        assert_eq!(caps(ElementType::F32).lanes(), 8);
        assert_eq!(caps(ElementType::U64).lanes(), 4);
        assert_eq!(caps(ElementType::F64).class(), LaneClass::Wide);
    }

    #[test]
    fn test_wide_class_rejects_narrow_patterns() {
        let c = caps(ElementType::I64);
        let v = Var::local("v", c.reg());
        for op in [PrimitiveOp::Reverse, PrimitiveOp::Cross] {
            assert!(matches!(
                c.permute(op, v.expr()),
                Err(GenError::InvalidOperation { lanes: 4, .. })
            ));
        }
        assert!(c
            .blend(PrimitiveOp::BlendB4, v.expr(), v.expr(), Direction::Ascending)
            .is_err());
    }

    #[test]
    fn test_compare_only_for_64_bit_integers() {
        for element in ElementType::ALL {
            let c = caps(element);
            let v = Var::local("v", c.reg());
            let result = c.compare(v.expr(), v.expr());
            assert_eq!(result.is_ok(), element.is_wide_integer(), "{element}");
            assert_eq!(c.supports(PrimitiveOp::Compare), element.is_wide_integer());
        }
    }

    #[test]
    fn test_no_cast_when_native_matches_canonical() {
        let c = caps(ElementType::I32);
        let v = Var::local("v", Reg::Si256);
        let expr = c.shuffle(PrimitiveOp::ShuffleX1, v.expr()).unwrap();
        assert!(matches!(expr, Expr::ShuffleEpi32 { .. }));

        let c = caps(ElementType::F32);
        let v = Var::local("v", Reg::Ps);
        let expr = c.shuffle(PrimitiveOp::ShuffleX1, v.expr()).unwrap();
        assert!(matches!(expr, Expr::Cast { to: Reg::Ps, .. }));
        assert_eq!(expr.validate().unwrap(), Reg::Ps);
    }

    #[test]
    fn test_wide_integer_min_needs_mask() {
        let c = caps(ElementType::U64);
        let v = Var::local("v", Reg::Si256);
        assert!(c.min(v.expr(), v.expr(), None).is_err());
        let cmp = Var::local("cmp", Reg::Si256);
        let cx = c.compare_exchange(v.expr(), v.expr(), &cmp).unwrap();
        assert!(cx.compare.is_some());
        assert_eq!(cx.min.validate().unwrap(), Reg::Si256);
        assert_eq!(cx.max.validate().unwrap(), Reg::Si256);
    }

    #[test]
    fn test_masked_load_type_checks() {
        for element in ElementType::ALL {
            let c = caps(element);
            let mask = Var::local("mask", Reg::Si256);
            let expr = c.masked_load(0, &mask).unwrap();
            assert_eq!(expr.reg(), element.native_reg());
        }
    }
}

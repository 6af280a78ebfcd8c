//! Element types, directions and routine identities
//!
//! Everything the generators are parameterized by lives here: the scalar
//! element being sorted, the lane class it implies for a register width, the
//! sort direction, and the key that names one generated routine.

use std::fmt;
use std::str::FromStr;

use crate::error::GenError;
use crate::ir::Reg;

/// Scalar element kinds the networks can be generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ElementType {
    /// Every supported element type, in generation order
    pub const ALL: [ElementType; 6] = [
        ElementType::I32,
        ElementType::U32,
        ElementType::I64,
        ElementType::U64,
        ElementType::F32,
        ElementType::F64,
    ];

    /// Size of one element in bytes
    pub fn byte_width(&self) -> usize {
        match self {
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::U64 | ElementType::F64 => 8,
        }
    }

    pub fn is_signed(&self) -> bool {
        !matches!(self, ElementType::U32 | ElementType::U64)
    }

    /// 64-bit integers have no native AVX2 min/max and go through a compare mask
    pub fn is_wide_integer(&self) -> bool {
        matches!(self, ElementType::I64 | ElementType::U64)
    }

    /// The Rust scalar type name
    pub fn rust_name(&self) -> &'static str {
        match self {
            ElementType::I32 => "i32",
            ElementType::U32 => "u32",
            ElementType::I64 => "i64",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        }
    }

    /// The register class values of this type naturally live in
    pub fn native_reg(&self) -> Reg {
        match self {
            ElementType::F32 => Reg::Ps,
            ElementType::F64 => Reg::Pd,
            _ => Reg::Si256,
        }
    }

    /// Bit pattern of the largest value in this type's sort order.
    ///
    /// Masked-off lanes are filled with it so they sort behind every valid lane.
    pub fn fill_bits(&self) -> u64 {
        match self {
            ElementType::I32 => i32::MAX as u32 as u64,
            ElementType::U32 => u32::MAX as u64,
            ElementType::I64 => i64::MAX as u64,
            ElementType::U64 => u64::MAX,
            ElementType::F32 => f32::INFINITY.to_bits() as u64,
            ElementType::F64 => f64::INFINITY.to_bits(),
        }
    }

    /// Number of lanes this type occupies in a register of `register_bytes`
    pub fn lanes_in(&self, register_bytes: usize) -> usize {
        register_bytes / self.byte_width()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rust_name())
    }
}

impl FromStr for ElementType {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "i32" | "int" | "int32" => Ok(ElementType::I32),
            "u32" | "uint" | "uint32" => Ok(ElementType::U32),
            "i64" | "long" | "int64" => Ok(ElementType::I64),
            "u64" | "ulong" | "uint64" => Ok(ElementType::U64),
            "f32" | "float" | "single" => Ok(ElementType::F32),
            "f64" | "double" => Ok(ElementType::F64),
            _ => Err(GenError::UnknownElementType(s.to_string())),
        }
    }
}

/// Lane-count class of a register for a given element width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneClass {
    /// 8 lanes of 32-bit elements
    Narrow,
    /// 4 lanes of 64-bit elements
    Wide,
}

impl LaneClass {
    pub fn from_lanes(lanes: usize) -> Option<Self> {
        match lanes {
            8 => Some(LaneClass::Narrow),
            4 => Some(LaneClass::Wide),
            _ => None,
        }
    }

    pub fn lanes(&self) -> usize {
        match self {
            LaneClass::Narrow => 8,
            LaneClass::Wide => 4,
        }
    }
}

/// Sort direction of a routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Ascending, Direction::Descending];

    pub fn reversed(&self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Direction::Ascending => "ascending",
            Direction::Descending => "descending",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// What a generated routine does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoutineKind {
    /// Sorts `width` registers
    Sort,
    /// Merges two halves already prepared by a sort
    Merge,
    /// Boundary-safe memory entry: load, sort ascending, store with a masked tail
    Entry,
}

/// Identity of one generated routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutineKey {
    pub element: ElementType,
    pub width: usize,
    pub direction: Direction,
    pub kind: RoutineKind,
}

impl RoutineKey {
    pub fn sort(element: ElementType, width: usize, direction: Direction) -> Self {
        Self {
            element,
            width,
            direction,
            kind: RoutineKind::Sort,
        }
    }

    pub fn merge(element: ElementType, width: usize, direction: Direction) -> Self {
        Self {
            element,
            width,
            direction,
            kind: RoutineKind::Merge,
        }
    }

    /// Entries always sort ascending
    pub fn entry(element: ElementType, width: usize) -> Self {
        Self {
            element,
            width,
            direction: Direction::Ascending,
            kind: RoutineKind::Entry,
        }
    }

    /// Function name of the routine in emitted source
    pub fn symbol(&self) -> String {
        match self.kind {
            RoutineKind::Sort => format!("sort_{:02}v_{}", self.width, self.direction),
            RoutineKind::Merge => format!("sort_{:02}v_merge_{}", self.width, self.direction),
            RoutineKind::Entry => format!("sort_{:02}v_entry", self.width),
        }
    }
}

impl fmt::Display for RoutineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.element, self.symbol())
    }
}

/// Hardware vector primitives the generators are written against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveOp {
    Load,
    MaskedLoad,
    Store,
    MaskedStore,
    ShuffleX1,
    ShuffleX2,
    ShuffleXR,
    BlendB1,
    BlendB2,
    BlendB4,
    Reverse,
    Cross,
    Min,
    Max,
    Compare,
}

impl PrimitiveOp {
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveOp::Load => "LOAD",
            PrimitiveOp::MaskedLoad => "MASKED_LOAD",
            PrimitiveOp::Store => "STORE",
            PrimitiveOp::MaskedStore => "MASKED_STORE",
            PrimitiveOp::ShuffleX1 => "SHUFFLE_X1",
            PrimitiveOp::ShuffleX2 => "SHUFFLE_X2",
            PrimitiveOp::ShuffleXR => "SHUFFLE_XR",
            PrimitiveOp::BlendB1 => "BLEND_B1",
            PrimitiveOp::BlendB2 => "BLEND_B2",
            PrimitiveOp::BlendB4 => "BLEND_B4",
            PrimitiveOp::Reverse => "REVERSE",
            PrimitiveOp::Cross => "CROSS",
            PrimitiveOp::Min => "MIN",
            PrimitiveOp::Max => "MAX",
            PrimitiveOp::Compare => "COMPARE",
        }
    }
}

impl fmt::Display for PrimitiveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_counts_for_avx2() {
        for element in ElementType::ALL {
            let lanes = element.lanes_in(32);
            let class = LaneClass::from_lanes(lanes).unwrap();
            if element.byte_width() == 4 {
                assert_eq!(class, LaneClass::Narrow);
            } else {
                assert_eq!(class, LaneClass::Wide);
            }
        }
        assert!(LaneClass::from_lanes(2).is_none());
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("int".parse::<ElementType>().unwrap(), ElementType::I32);
        assert_eq!("ULONG".parse::<ElementType>().unwrap(), ElementType::U64);
        assert_eq!(" double ".parse::<ElementType>().unwrap(), ElementType::F64);
        assert!(matches!(
            "i128".parse::<ElementType>(),
            Err(GenError::UnknownElementType(_))
        ));
    }

    #[test]
    fn test_fill_bits_sort_last() {
        assert_eq!(ElementType::I32.fill_bits() as u32 as i32, i32::MAX);
        assert_eq!(ElementType::U64.fill_bits(), u64::MAX);
        assert!(f32::from_bits(ElementType::F32.fill_bits() as u32).is_infinite());
        assert!(f64::from_bits(ElementType::F64.fill_bits()) > f64::MAX);
    }

    #[test]
    fn test_symbols() {
        assert_eq!(
            RoutineKey::sort(ElementType::I32, 4, Direction::Ascending).symbol(),
            "sort_04v_ascending"
        );
        assert_eq!(
            RoutineKey::merge(ElementType::F64, 12, Direction::Descending).symbol(),
            "sort_12v_merge_descending"
        );
        assert_eq!(RoutineKey::entry(ElementType::U32, 3).symbol(), "sort_03v_entry");
    }
}

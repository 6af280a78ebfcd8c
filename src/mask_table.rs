//! Per-remainder lane masks for the entry routines
//!
//! Row `r` of the table for L lanes holds L bytes: `0xFF` for the first `r`
//! lanes and `0x00` for the rest, except row 0 which marks every lane valid
//! (a remainder of zero means the last vector is full). Entries read a row
//! with a 16-byte load and sign-extend the first L bytes, so the table is
//! followed by `0xCC` guard rows that keep that load inside the table.

use crate::error::{GenError, Result};
use crate::types::LaneClass;

const VALID: u8 = 0xFF;
const INVALID: u8 = 0x00;
const GUARD: u8 = 0xCC;

/// Bytes read by the `_mm_loadu_si128` that fetches a row
pub const LOAD_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskTable {
    lanes: usize,
    bytes: Vec<u8>,
}

impl MaskTable {
    pub fn new(class: LaneClass) -> Self {
        let lanes = class.lanes();
        let mut bytes = Vec::with_capacity(lanes * (lanes + Self::guard_rows_for(lanes)));
        for row in 0..lanes {
            let valid = if row == 0 { lanes } else { row };
            bytes.extend((0..lanes).map(|lane| if lane < valid { VALID } else { INVALID }));
        }
        bytes.resize(bytes.len() + lanes * Self::guard_rows_for(lanes), GUARD);
        Self { lanes, bytes }
    }

    fn guard_rows_for(lanes: usize) -> usize {
        (LOAD_BYTES - lanes).div_ceil(lanes)
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    pub fn guard_rows(&self) -> usize {
        Self::guard_rows_for(self.lanes)
    }

    /// The whole table, guard rows included
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Name of the table in emitted source
    pub fn symbol(&self) -> String {
        format!("MASK_TABLE_{}", self.lanes)
    }

    /// The L bytes of row `remainder`
    pub fn row(&self, remainder: usize) -> Result<&[u8]> {
        let start = remainder * self.lanes;
        self.window(start, self.lanes)
    }

    /// The 16 bytes the entry loads for `remainder`, guard bytes included
    pub fn load_window(&self, remainder: usize) -> Result<&[u8]> {
        self.window(remainder * self.lanes, LOAD_BYTES)
    }

    fn window(&self, start: usize, len: usize) -> Result<&[u8]> {
        self.bytes
            .get(start..start + len)
            .ok_or(GenError::MemoryFault {
                start,
                end: start + len,
                len: self.bytes.len(),
            })
    }

    /// Sign-extended lane values for `remainder`, as `cvtepi8` produces them
    pub fn lane_mask(&self, remainder: usize) -> Result<Vec<i64>> {
        let window = self.load_window(remainder)?;
        Ok(window[..self.lanes]
            .iter()
            .map(|&b| i64::from(b as i8))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shapes() {
        let narrow = MaskTable::new(LaneClass::Narrow);
        assert_eq!(narrow.guard_rows(), 1);
        assert_eq!(narrow.bytes().len(), 8 * 9);
        let wide = MaskTable::new(LaneClass::Wide);
        assert_eq!(wide.guard_rows(), 3);
        assert_eq!(wide.bytes().len(), 4 * 7);
        assert_eq!(narrow.symbol(), "MASK_TABLE_8");
    }

    #[test]
    fn test_rows() {
        let table = MaskTable::new(LaneClass::Narrow);
        assert_eq!(table.row(0).unwrap(), &[0xFF; 8]);
        assert_eq!(table.row(3).unwrap(), &[0xFF, 0xFF, 0xFF, 0, 0, 0, 0, 0]);
        assert_eq!(table.lane_mask(1).unwrap(), vec![-1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_last_row_load_stays_in_table() {
        for class in [LaneClass::Narrow, LaneClass::Wide] {
            let table = MaskTable::new(class);
            let last = table.lanes() - 1;
            let window = table.load_window(last).unwrap();
            assert!(window[table.lanes()..].iter().all(|&b| b == 0xCC));
            assert!(table.load_window(last + 1).is_err());
        }
    }
}

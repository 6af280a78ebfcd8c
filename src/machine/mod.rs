//! Software execution of generated routines
//!
//! The machine walks the same IR the emitter renders and applies the lane
//! models in [`ops`]. Memory is the caller's slice: every load and store is
//! bounds-checked per accessed lane, so a routine that would touch memory
//! outside the buffer fails with [`GenError::MemoryFault`] instead.

pub mod lane;
pub mod ops;

use std::collections::HashMap;

use crate::error::{GenError, Result};
use crate::ir::{Expr, Routine, Stmt, Var};
use crate::mask_table::MaskTable;
use crate::network::NetworkFamily;
use crate::types::{Direction, ElementType, PrimitiveOp, RoutineKey};

pub use lane::SortLane;
pub use ops::Ymm;

/// Element memory seen by an entry routine, as lane bit patterns
struct Memory<'m> {
    cells: &'m mut [u64],
    remainder: usize,
}

/// Register bindings of one routine activation
struct Frame<'m> {
    regs: HashMap<String, Ymm>,
    memory: Option<Memory<'m>>,
}

impl Frame<'_> {
    fn read(&self, var: &Var) -> Result<Ymm> {
        self.regs
            .get(&var.name)
            .copied()
            .ok_or_else(|| GenError::UnboundRegister(var.name.clone()))
    }

    fn memory(&self) -> Result<&Memory<'_>> {
        self.memory
            .as_ref()
            .ok_or_else(|| GenError::UnboundRegister("ptr".to_string()))
    }
}

/// Executes the routines of one family
#[derive(Debug)]
pub struct Machine<'a> {
    family: &'a NetworkFamily,
    masks: MaskTable,
}

impl<'a> Machine<'a> {
    pub fn new(family: &'a NetworkFamily) -> Self {
        Self {
            family,
            masks: MaskTable::new(family.caps.class()),
        }
    }

    pub fn family(&self) -> &NetworkFamily {
        self.family
    }

    fn element(&self) -> ElementType {
        self.family.element
    }

    fn lanes(&self) -> usize {
        self.family.lanes()
    }

    fn lane_bytes(&self) -> usize {
        self.element().byte_width()
    }

    fn check_element<T: SortLane>(&self) -> Result<()> {
        if T::ELEMENT == self.element() {
            Ok(())
        } else {
            Err(GenError::ElementMismatch {
                expected: self.element(),
                found: T::ELEMENT,
            })
        }
    }

    /// Runs a sort or merge routine on `regs`, one register per vector parameter
    pub fn run_network(&self, key: &RoutineKey, regs: &mut [Ymm]) -> Result<()> {
        let routine = self.family.routine(key)?;
        if routine.params.len() != regs.len() {
            return Err(GenError::ArityMismatch {
                routine: key.symbol(),
                expected: routine.params.len(),
                found: regs.len(),
            });
        }
        let mut frame = Frame {
            regs: routine
                .params
                .iter()
                .zip(regs.iter())
                .map(|(p, r)| (p.name.clone(), *r))
                .collect(),
            memory: None,
        };
        self.execute(routine, &mut frame)?;
        for (param, reg) in routine.params.iter().zip(regs.iter_mut()) {
            *reg = frame.read(param)?;
        }
        Ok(())
    }

    fn pack<T: SortLane>(&self, values: &[T]) -> Vec<Ymm> {
        let bits: Vec<u64> = values.iter().map(|v| v.to_bits()).collect();
        bits.chunks(self.lanes())
            .map(|chunk| Ymm::from_lanes(self.lane_bytes(), chunk))
            .collect()
    }

    fn unpack<T: SortLane>(&self, regs: &[Ymm], values: &mut [T]) {
        let lanes = regs.iter().flat_map(|r| r.lanes(self.lane_bytes()));
        for (value, bits) in values.iter_mut().zip(lanes) {
            *value = T::from_bits(bits);
        }
    }

    fn run_on_values<T: SortLane>(&self, key: RoutineKey, values: &mut [T]) -> Result<()> {
        self.check_element::<T>()?;
        if values.len() != key.width * self.lanes() {
            return Err(GenError::LengthOutOfRange {
                length: values.len(),
                vectors: key.width,
                max: self.family.max_vectors(),
            });
        }
        let mut regs = self.pack(values);
        self.run_network(&key, &mut regs)?;
        self.unpack(&regs, values);
        Ok(())
    }

    /// Loads `width * lanes` values into registers, runs `sort(width, direction)`
    /// and stores them back
    pub fn sort_vectors<T: SortLane>(
        &self,
        width: usize,
        direction: Direction,
        values: &mut [T],
    ) -> Result<()> {
        self.run_on_values(RoutineKey::sort(self.element(), width, direction), values)
    }

    /// Like [`Machine::sort_vectors`] for `merge(width, direction)`
    pub fn merge_vectors<T: SortLane>(
        &self,
        width: usize,
        direction: Direction,
        values: &mut [T],
    ) -> Result<()> {
        self.run_on_values(RoutineKey::merge(self.element(), width, direction), values)
    }

    /// Runs `sort_<width>v_entry(ptr, remainder)` with `ptr` at the start of `memory`
    pub fn run_entry<T: SortLane>(
        &self,
        width: usize,
        memory: &mut [T],
        remainder: usize,
    ) -> Result<()> {
        self.check_element::<T>()?;
        let key = RoutineKey::entry(self.element(), width);
        let routine = self.family.routine(&key)?;
        let mut cells: Vec<u64> = memory.iter().map(|v| v.to_bits()).collect();
        let mut frame = Frame {
            regs: HashMap::new(),
            memory: Some(Memory {
                cells: &mut cells,
                remainder,
            }),
        };
        self.execute(routine, &mut frame)?;
        for (value, bits) in memory.iter_mut().zip(cells) {
            *value = T::from_bits(bits);
        }
        Ok(())
    }

    /// Runs the dispatcher: sorts the first `length` elements of `memory` ascending
    pub fn dispatch<T: SortLane>(&self, memory: &mut [T], length: usize) -> Result<()> {
        let (entry, remainder) = self.family.dispatcher.select(length)?;
        tracing::trace!(element = %self.element(), length, entry = %entry, "machine_dispatch");
        self.run_entry(entry.width, memory, remainder)
    }

    /// Sorts all of `values` ascending through the dispatcher
    pub fn sort<T: SortLane>(&self, values: &mut [T]) -> Result<()> {
        let length = values.len();
        self.dispatch(values, length)
    }

    fn execute(&self, routine: &Routine, frame: &mut Frame<'_>) -> Result<()> {
        tracing::trace!(routine = %routine.key, "machine_call");
        for stmt in &routine.body {
            match stmt {
                Stmt::Assign { dst, value } => {
                    let value = self.eval(value, frame)?;
                    frame.regs.insert(dst.name.clone(), value);
                }
                Stmt::Call { callee, args } => {
                    let mut regs = args
                        .iter()
                        .map(|a| frame.read(a))
                        .collect::<Result<Vec<_>>>()?;
                    self.run_network(callee, &mut regs)?;
                    for (arg, reg) in args.iter().zip(regs) {
                        frame.regs.insert(arg.name.clone(), reg);
                    }
                }
                Stmt::Store { vector, value, .. } => {
                    let value = frame.read(value)?;
                    self.store(frame, *vector, value, None)?;
                }
                Stmt::MaskStore {
                    vector,
                    mask,
                    value,
                    ..
                } => {
                    let (value, mask) = (frame.read(value)?, frame.read(mask)?);
                    self.store(frame, *vector, value, Some(mask))?;
                }
            }
        }
        Ok(())
    }

    fn eval(&self, expr: &Expr, frame: &Frame<'_>) -> Result<Ymm> {
        let e = |x: &Expr| self.eval(x, frame);
        Ok(match expr {
            Expr::Var(v) => frame.read(v)?,
            Expr::Cast { arg, .. } => e(arg)?,
            Expr::ShuffleEpi32 { arg, imm } => ops::shuffle_epi32(e(arg)?, *imm),
            Expr::ShufflePd { a, b, imm } => ops::shuffle_pd(e(a)?, e(b)?, *imm),
            Expr::Permute4x64Pd { arg, imm } => ops::permute4x64_pd(e(arg)?, *imm),
            Expr::BlendEpi32 { a, b, imm } => ops::blend_epi32(e(a)?, e(b)?, *imm),
            Expr::BlendPd { a, b, imm } => ops::blend_pd(e(a)?, e(b)?, *imm),
            Expr::BlendvPd { a, b, mask } => ops::blendv_pd(e(a)?, e(b)?, e(mask)?),
            Expr::Min { element, a, b } | Expr::Max { element, a, b } => {
                if element.is_wide_integer() {
                    let op = match expr {
                        Expr::Min { .. } => PrimitiveOp::Min,
                        _ => PrimitiveOp::Max,
                    };
                    return Err(GenError::InvalidOperation {
                        op,
                        element: *element,
                        lanes: self.lanes(),
                    });
                }
                match expr {
                    Expr::Min { .. } => ops::min(*element, e(a)?, e(b)?),
                    _ => ops::max(*element, e(a)?, e(b)?),
                }
            }
            Expr::CmpGtEpi64 { a, b } => ops::cmpgt_epi64(e(a)?, e(b)?),
            Expr::Xor { a, b } => ops::xor(e(a)?, e(b)?),
            Expr::Or { a, b, .. } => ops::or(e(a)?, e(b)?),
            Expr::AndNot { a, b, .. } => ops::andnot(e(a)?, e(b)?),
            Expr::Splat { element, bits } => Ymm::splat(*element, *bits),
            Expr::Load { vector, .. } => self.load(frame, *vector, None)?,
            Expr::MaskLoad { vector, mask, .. } => self.load(frame, *vector, Some(e(mask)?))?,
            Expr::LaneMask { .. } => {
                let remainder = frame.memory()?.remainder;
                let lanes: Vec<u64> = self
                    .masks
                    .lane_mask(remainder)?
                    .into_iter()
                    .map(|l| l as u64)
                    .collect();
                Ymm::from_lanes(self.lane_bytes(), &lanes)
            }
        })
    }

    fn fault(&self, vector: usize, len: usize) -> GenError {
        let start = vector * self.lanes();
        GenError::MemoryFault {
            start,
            end: start + self.lanes(),
            len,
        }
    }

    fn load(&self, frame: &Frame<'_>, vector: usize, mask: Option<Ymm>) -> Result<Ymm> {
        let memory = frame.memory()?;
        let (lanes, bytes) = (self.lanes(), self.lane_bytes());
        let mut out = vec![0u64; lanes];
        for (i, lane) in out.iter_mut().enumerate() {
            if mask.is_some_and(|m| !ops::mask_lane_set(m, bytes, i)) {
                continue;
            }
            *lane = *memory
                .cells
                .get(vector * lanes + i)
                .ok_or_else(|| self.fault(vector, memory.cells.len()))?;
        }
        Ok(Ymm::from_lanes(bytes, &out))
    }

    fn store(&self, frame: &mut Frame<'_>, vector: usize, value: Ymm, mask: Option<Ymm>) -> Result<()> {
        let (lanes, bytes) = (self.lanes(), self.lane_bytes());
        let fault = |len| self.fault(vector, len);
        let memory = frame
            .memory
            .as_mut()
            .ok_or_else(|| GenError::UnboundRegister("ptr".to_string()))?;
        let len = memory.cells.len();
        // a full store faults before writing anything, as a real one would
        if mask.is_none() && vector * lanes + lanes > len {
            return Err(fault(len));
        }
        for (i, bits) in value.lanes(bytes).into_iter().enumerate() {
            if mask.is_some_and(|m| !ops::mask_lane_set(m, bytes, i)) {
                continue;
            }
            let cell = memory.cells.get_mut(vector * lanes + i).ok_or_else(|| fault(len))?;
            *cell = bits;
        }
        Ok(())
    }
}

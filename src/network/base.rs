//! Single-vector sort and merge networks
//!
//! Each stage permutes the register against itself, takes the lane-wise min
//! and max of the two, and blends them back so the pattern lanes get the
//! value the direction asks for.

use crate::capability::Capabilities;
use crate::error::Result;
use crate::ir::{Reg, Routine, Stmt, Var};
use crate::types::{Direction, LaneClass, PrimitiveOp, RoutineKey};

use PrimitiveOp::{BlendB1, BlendB2, BlendB4, Cross, Reverse, ShuffleX1, ShuffleX2, ShuffleXR};

/// (permutation, blend) per stage of the 8-lane sort
const NARROW_SORT: [(PrimitiveOp, PrimitiveOp); 6] = [
    (ShuffleX1, BlendB1),
    (ShuffleXR, BlendB2),
    (ShuffleX1, BlendB1),
    (Reverse, BlendB4),
    (ShuffleX2, BlendB2),
    (ShuffleX1, BlendB1),
];

const WIDE_SORT: [(PrimitiveOp, PrimitiveOp); 3] = [
    (ShuffleX1, BlendB1),
    (ShuffleXR, BlendB2),
    (ShuffleX1, BlendB1),
];

const NARROW_MERGE: [(PrimitiveOp, PrimitiveOp); 3] =
    [(Cross, BlendB4), (ShuffleX2, BlendB2), (ShuffleX1, BlendB1)];

const WIDE_MERGE: [(PrimitiveOp, PrimitiveOp); 2] = [(ShuffleX2, BlendB2), (ShuffleX1, BlendB1)];

/// Stages of the single-vector sort for this lane class
pub fn sort_stages(class: LaneClass) -> &'static [(PrimitiveOp, PrimitiveOp)] {
    match class {
        LaneClass::Narrow => &NARROW_SORT,
        LaneClass::Wide => &WIDE_SORT,
    }
}

/// Stages of the single-vector merge for this lane class
pub fn merge_stages(class: LaneClass) -> &'static [(PrimitiveOp, PrimitiveOp)] {
    match class {
        LaneClass::Narrow => &NARROW_MERGE,
        LaneClass::Wide => &WIDE_MERGE,
    }
}

/// `sort_01v_<direction>`: sorts the lanes of one register
pub fn sort(caps: &Capabilities, direction: Direction) -> Result<Routine> {
    let key = RoutineKey::sort(caps.element(), 1, direction);
    build(caps, key, sort_stages(caps.class()))
}

/// `sort_01v_merge_<direction>`: sorts one register holding a bitonic sequence
pub fn merge(caps: &Capabilities, direction: Direction) -> Result<Routine> {
    let key = RoutineKey::merge(caps.element(), 1, direction);
    build(caps, key, merge_stages(caps.class()))
}

fn build(
    caps: &Capabilities,
    key: RoutineKey,
    stages: &[(PrimitiveOp, PrimitiveOp)],
) -> Result<Routine> {
    let reg = caps.reg();
    let d01 = Var::vector_param(1, reg);
    let s = Var::local("s", reg);
    let min = Var::local("min", reg);
    let max = Var::local("max", reg);
    let cmp = Var::local("cmp", Reg::Si256);

    let mut body = Vec::with_capacity(stages.len() * 5);
    for &(permutation, blend) in stages {
        body.push(Stmt::assign(&s, caps.permute(permutation, d01.expr())?));
        let exchange = caps.compare_exchange(s.expr(), d01.expr(), &cmp)?;
        body.extend(exchange.compare);
        body.push(Stmt::assign(&min, exchange.min));
        body.push(Stmt::assign(&max, exchange.max));
        body.push(Stmt::assign(
            &d01,
            caps.blend(blend, min.expr(), max.expr(), key.direction)?,
        ));
    }

    Ok(Routine {
        key,
        params: vec![d01],
        body,
        inline: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetIsa;
    use crate::types::ElementType;

    #[test]
    fn test_stage_counts() {
        for element in ElementType::ALL {
            let caps = Capabilities::new(element, TargetIsa::Avx2).unwrap();
            let per_stage = if element.is_wide_integer() { 5 } else { 4 };
            let sorter = sort(&caps, Direction::Ascending).unwrap();
            let merger = merge(&caps, Direction::Descending).unwrap();
            let (n_sort, n_merge) = if caps.lanes() == 8 { (6, 3) } else { (3, 2) };
            assert_eq!(sorter.body.len(), n_sort * per_stage, "{element}");
            assert_eq!(merger.body.len(), n_merge * per_stage, "{element}");
            assert!(sorter.validate().is_ok());
            assert!(merger.validate().is_ok());
        }
    }

    #[test]
    fn test_base_routines_are_inline_and_call_nothing() {
        let caps = Capabilities::new(ElementType::F32, TargetIsa::Avx2).unwrap();
        let routine = sort(&caps, Direction::Descending).unwrap();
        assert!(routine.inline);
        assert_eq!(routine.callees().count(), 0);
        assert_eq!(routine.key.symbol(), "sort_01v_descending");
    }
}

//! Sort and merge routines over several registers
//!
//! A width N is split into a power-of-two first half of `w1` vectors and a
//! second half of `w2 = N - w1`. The sort orders the halves in opposite
//! directions, flips them together with one compare-exchange per second-half
//! vector, and merges both halves. The merge compare-exchanges vector `r`
//! with `w1 + r` and recurses into both halves.

use crate::capability::Capabilities;
use crate::error::{GenError, Result};
use crate::ir::{Reg, Routine, Stmt, Var};
use crate::network::widths::{NetworkWidth, Split};
use crate::types::{Direction, RoutineKey};

/// Compound routines exist from width 2 up
fn split_of(width: NetworkWidth) -> Result<Split> {
    width.split().ok_or(GenError::NotCompound(width.get()))
}

fn vector_params(caps: &Capabilities, width: usize) -> Vec<Var> {
    (1..=width)
        .map(|i| Var::vector_param(i, caps.reg()))
        .collect()
}

/// `sort_<N>v_<direction>` for N >= 2
pub fn sort(
    caps: &Capabilities,
    width: NetworkWidth,
    direction: Direction,
    inline: bool,
) -> Result<Routine> {
    let key = RoutineKey::sort(caps.element(), width.get(), direction);
    let split = split_of(width)?;
    let (w1, n) = (split.w1(), split.total());
    let params = vector_params(caps, n);
    let tmp = Var::local("tmp", caps.reg());
    let cmp = Var::local("cmp", Reg::Si256);

    let mut body = vec![
        Stmt::Call {
            callee: RoutineKey::sort(caps.element(), w1, direction),
            args: params[..w1].to_vec(),
        },
        Stmt::Call {
            callee: RoutineKey::sort(caps.element(), split.w2(), direction.reversed()),
            args: params[w1..].to_vec(),
        },
    ];

    for r in w1 + 1..=n {
        let (dr, dx) = (&params[r - 1], &params[split.mirror(r) - 1]);
        body.push(Stmt::assign(&tmp, dr.expr()));
        let exchange = caps.compare_exchange(dx.expr(), tmp.expr(), &cmp)?;
        body.extend(exchange.compare);
        body.push(Stmt::assign(dr, exchange.max));
        body.push(Stmt::assign(dx, exchange.min));
    }

    body.push(Stmt::Call {
        callee: RoutineKey::merge(caps.element(), w1, direction),
        args: params[..w1].to_vec(),
    });
    body.push(Stmt::Call {
        callee: RoutineKey::merge(caps.element(), split.w2(), direction),
        args: params[w1..].to_vec(),
    });

    Ok(Routine {
        key,
        params,
        body,
        inline,
    })
}

/// `sort_<N>v_merge_<direction>` for N >= 2
pub fn merge(
    caps: &Capabilities,
    width: NetworkWidth,
    direction: Direction,
    inline: bool,
) -> Result<Routine> {
    let key = RoutineKey::merge(caps.element(), width.get(), direction);
    let split = split_of(width)?;
    let w1 = split.w1();
    let params = vector_params(caps, split.total());
    let tmp = Var::local("tmp", caps.reg());
    let cmp = Var::local("cmp", Reg::Si256);

    let mut body = Vec::new();
    for r in 1..=split.w2() {
        let (lo, hi) = (&params[r - 1], &params[w1 + r - 1]);
        body.push(Stmt::assign(&tmp, lo.expr()));
        let exchange = caps.compare_exchange(tmp.expr(), hi.expr(), &cmp)?;
        body.extend(exchange.compare);
        body.push(Stmt::assign(lo, exchange.min));
        body.push(Stmt::assign(hi, exchange.max));
    }

    body.push(Stmt::Call {
        callee: RoutineKey::merge(caps.element(), w1, direction),
        args: params[..w1].to_vec(),
    });
    body.push(Stmt::Call {
        callee: RoutineKey::merge(caps.element(), split.w2(), direction),
        args: params[w1..].to_vec(),
    });

    Ok(Routine {
        key,
        params,
        body,
        inline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetIsa;
    use crate::types::{ElementType, RoutineKind};

    #[test]
    fn test_sort_calls_strictly_smaller_widths() {
        let caps = Capabilities::new(ElementType::I32, TargetIsa::Avx2).unwrap();
        for n in 2..=16 {
            let width = NetworkWidth::new(n, 16).unwrap();
            let routine = sort(&caps, width, Direction::Ascending, true).unwrap();
            let callees: Vec<_> = routine.callees().collect();
            assert_eq!(callees.len(), 4);
            assert!(callees.iter().all(|k| k.width < n));
            assert_eq!(callees[0].direction, Direction::Ascending);
            assert_eq!(callees[1].direction, Direction::Descending);
            assert_eq!(callees[2].kind, RoutineKind::Merge);
            assert!(routine.validate().is_ok());
        }
    }

    #[test]
    fn test_flip_touches_mirror_pairs() {
        let caps = Capabilities::new(ElementType::F64, TargetIsa::Avx2).unwrap();
        let width = NetworkWidth::new(3, 16).unwrap();
        let routine = sort(&caps, width, Direction::Descending, true).unwrap();
        // w1 = 2, w2 = 1: vector 3 flips against vector 2
        let assigned: Vec<_> = routine
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Assign { dst, .. } => Some(dst.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(assigned, vec!["tmp", "d03", "d02"]);
    }

    #[test]
    fn test_merge_pairs_across_halves() {
        let caps = Capabilities::new(ElementType::U64, TargetIsa::Avx2).unwrap();
        let width = NetworkWidth::new(6, 16).unwrap();
        let routine = merge(&caps, width, Direction::Ascending, false).unwrap();
        // w1 = 4, w2 = 2: (1,5) and (2,6), each tmp + cmp + min + max
        assert_eq!(routine.body.len(), 2 * 4 + 2);
        let callees: Vec<_> = routine.callees().map(|k| k.width).collect();
        assert_eq!(callees, vec![4, 2]);
    }
}

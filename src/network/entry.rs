//! Boundary-safe memory entry routines
//!
//! `sort_<N>v_entry(ptr, remainder)` loads N registers from `ptr`, the last
//! one through the lane mask for `remainder`, sorts them ascending and stores
//! them back. Lanes past the end of the input are padded with the fill value
//! on load and never written on store.

use crate::capability::Capabilities;
use crate::error::Result;
use crate::ir::{Reg, Routine, Stmt, Var};
use crate::network::widths::NetworkWidth;
use crate::types::{Direction, RoutineKey};

pub fn entry(caps: &Capabilities, width: NetworkWidth) -> Result<Routine> {
    let n = width.get();
    let key = RoutineKey::entry(caps.element(), n);
    let mask = Var::local("mask", Reg::Si256);
    let vectors: Vec<Var> = (1..=n)
        .map(|i| Var::vector_local(i, caps.reg()))
        .collect();

    let mut body = Vec::with_capacity(2 * n + 2);
    body.push(Stmt::assign(&mask, caps.mask()));
    for (k, v) in vectors[..n - 1].iter().enumerate() {
        body.push(Stmt::assign(v, caps.load(k)));
    }
    body.push(Stmt::assign(&vectors[n - 1], caps.masked_load(n - 1, &mask)?));

    body.push(Stmt::Call {
        callee: RoutineKey::sort(caps.element(), n, Direction::Ascending),
        args: vectors.clone(),
    });

    for (k, v) in vectors[..n - 1].iter().enumerate() {
        body.push(caps.store(k, v));
    }
    body.push(caps.masked_store(n - 1, &mask, &vectors[n - 1]));

    Ok(Routine {
        key,
        params: Vec::new(),
        body,
        inline: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetIsa;
    use crate::types::ElementType;

    #[test]
    fn test_entry_shape() {
        let caps = Capabilities::new(ElementType::I32, TargetIsa::Avx2).unwrap();
        let routine = entry(&caps, NetworkWidth::new(3, 16).unwrap()).unwrap();
        assert!(!routine.inline);
        assert!(routine.params.is_empty());
        let callees: Vec<_> = routine.callees().copied().collect();
        assert_eq!(
            callees,
            vec![RoutineKey::sort(ElementType::I32, 3, Direction::Ascending)]
        );
        assert!(matches!(routine.body.last(), Some(Stmt::MaskStore { vector: 2, .. })));
        // every vector local is handed to the sort by &mut
        let mutable: Vec<_> = routine
            .locals()
            .into_iter()
            .filter(|(_, m)| *m)
            .map(|(v, _)| v.name)
            .collect();
        assert_eq!(mutable, vec!["d01", "d02", "d03"]);
        assert!(routine.validate().is_ok());
    }

    #[test]
    fn test_single_vector_entry_only_masks() {
        let caps = Capabilities::new(ElementType::F64, TargetIsa::Avx2).unwrap();
        let routine = entry(&caps, NetworkWidth::new(1, 16).unwrap()).unwrap();
        assert!(!routine
            .body
            .iter()
            .any(|stmt| matches!(stmt, Stmt::Store { .. })));
        assert_eq!(routine.body.len(), 4);
    }
}

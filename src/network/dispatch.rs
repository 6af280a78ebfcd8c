//! The public `sort(ptr, length)` entry point

use crate::capability::Capabilities;
use crate::ir::Dispatcher;
use crate::types::RoutineKey;

/// Dispatcher over entries `1..=max_vectors`
pub fn dispatcher(caps: &Capabilities, max_vectors: usize) -> Dispatcher {
    Dispatcher {
        element: caps.element(),
        lanes: caps.lanes(),
        entries: (1..=max_vectors)
            .map(|width| RoutineKey::entry(caps.element(), width))
            .collect(),
    }
}

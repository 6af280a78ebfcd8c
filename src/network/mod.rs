//! Network generation for one element type
//!
//! [`generate`] fills a [`RoutineTable`] bottom-up: the single-vector base
//! cases first, then every compound width in increasing order, then one
//! entry per width, and finally the dispatcher. The table rejects any
//! routine that calls something not yet generated, so the emitted source
//! never contains a forward reference.

pub mod base;
pub mod compound;
pub mod dispatch;
pub mod entry;
pub mod widths;

use std::collections::HashMap;

use crate::capability::Capabilities;
use crate::config::GeneratorConfig;
use crate::error::{GenError, Result};
use crate::ir::{Dispatcher, Routine};
use crate::types::{Direction, ElementType, RoutineKey};

pub use widths::{NetworkWidth, PowerOfTwo, Split};

/// Generated routines in insertion order, indexed by key
#[derive(Debug, Clone, Default)]
pub struct RoutineTable {
    routines: Vec<Routine>,
    index: HashMap<RoutineKey, usize>,
}

impl RoutineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a routine after checking it is new and that everything it calls exists
    pub fn insert(&mut self, routine: Routine) -> Result<()> {
        if self.index.contains_key(&routine.key) {
            return Err(GenError::DuplicateRoutine(routine.key.to_string()));
        }
        routine.validate()?;
        if let Some(missing) = routine.callees().find(|k| !self.index.contains_key(k)) {
            return Err(GenError::MissingDependency {
                routine: routine.key.to_string(),
                callee: missing.to_string(),
            });
        }
        tracing::debug!(
            routine = %routine.key,
            statements = routine.body.len(),
            inline = routine.inline,
            "routine_generated"
        );
        self.index.insert(routine.key, self.routines.len());
        self.routines.push(routine);
        Ok(())
    }

    pub fn get(&self, key: &RoutineKey) -> Option<&Routine> {
        self.index.get(key).map(|&i| &self.routines[i])
    }

    pub fn contains(&self, key: &RoutineKey) -> bool {
        self.index.contains_key(key)
    }

    /// Routines in the order they were generated
    pub fn iter(&self) -> impl Iterator<Item = &Routine> + '_ {
        self.routines.iter()
    }

    /// Position of `key` in generation order
    pub fn position(&self, key: &RoutineKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }
}

/// Every routine generated for one element type
#[derive(Debug, Clone)]
pub struct NetworkFamily {
    pub element: ElementType,
    pub caps: Capabilities,
    pub table: RoutineTable,
    pub dispatcher: Dispatcher,
    pub config: GeneratorConfig,
}

impl NetworkFamily {
    pub fn lanes(&self) -> usize {
        self.caps.lanes()
    }

    pub fn max_vectors(&self) -> usize {
        self.config.max_bitonic_vectors
    }

    /// Looks up a routine that must exist in the family
    pub fn routine(&self, key: &RoutineKey) -> Result<&Routine> {
        self.table.get(key).ok_or_else(|| GenError::MissingDependency {
            routine: format!("{}::sort", self.element),
            callee: key.to_string(),
        })
    }

    /// Routine symbols in emission order, the dispatcher last
    pub fn symbols(&self) -> Vec<String> {
        self.table
            .iter()
            .map(|r| r.key.symbol())
            .chain(std::iter::once("sort".to_string()))
            .collect()
    }
}

/// Generates every routine for `element`
pub fn generate(element: ElementType, config: &GeneratorConfig) -> Result<NetworkFamily> {
    config.validate()?;
    let caps = Capabilities::new(element, config.isa)?;
    let max = config.max_bitonic_vectors;
    let mut table = RoutineTable::new();

    table.insert(base::sort(&caps, Direction::Ascending)?)?;
    table.insert(base::sort(&caps, Direction::Descending)?)?;
    table.insert(base::merge(&caps, Direction::Ascending)?)?;
    table.insert(base::merge(&caps, Direction::Descending)?)?;

    for n in 2..=max {
        let width = NetworkWidth::new(n, max)?;
        let inline = n <= config.inline_max_vectors;
        for direction in Direction::ALL {
            table.insert(compound::sort(&caps, width, direction, inline)?)?;
        }
        for direction in Direction::ALL {
            table.insert(compound::merge(&caps, width, direction, inline)?)?;
        }
    }

    for n in 1..=max {
        table.insert(entry::entry(&caps, NetworkWidth::new(n, max)?)?)?;
    }

    let dispatcher = dispatch::dispatcher(&caps, max);
    if let Some(missing) = dispatcher.entries.iter().find(|k| !table.contains(k)) {
        return Err(GenError::MissingDependency {
            routine: format!("{element}::sort"),
            callee: missing.to_string(),
        });
    }

    tracing::info!(
        element = %element,
        lanes = caps.lanes(),
        routines = table.len() + 1,
        max_vectors = max,
        "family_generated"
    );

    Ok(NetworkFamily {
        element,
        caps,
        table,
        dispatcher,
        config: config.clone(),
    })
}

/// Generates one family per element type, in the given order
pub fn generate_all(elements: &[ElementType], config: &GeneratorConfig) -> Result<Vec<NetworkFamily>> {
    elements.iter().map(|&e| generate(e, config)).collect()
}

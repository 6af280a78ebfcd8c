//! # vxsort-gen: branchless AVX2 bitonic sorting networks
//!
//! This crate generates, for each scalar element type, a family of routines
//! that sort a small in-memory array entirely inside 256-bit vector
//! registers, without data-dependent branches.
//!
//! ## Overview
//!
//! - **Capabilities**: the primitive vector operations for one element type
//!   (shuffles, blends, min/max, masked loads and stores).
//! - **Base cases**: single-register sort and merge networks.
//! - **Compounding**: sort and merge routines over N registers, each built from
//!   two strictly smaller widths.
//! - **Entries**: boundary-safe routines that mask the tail register so they
//!   never read or write past the input.
//! - **Dispatcher**: `sort(ptr, length)`, selecting an entry by vector count.
//!
//! Routines are held as a small typed IR. The [`emit`] module renders it as
//! `core::arch::x86_64` source, and the [`machine`] module executes it lane
//! by lane so every family can be verified on any host.
//!
//! ## Usage
//!
//! ```
//! use vxsort_gen::{generate, ElementType, GeneratorConfig, Machine};
//!
//! let family = generate(ElementType::I32, &GeneratorConfig::with_max_vectors(2)).unwrap();
//! let machine = Machine::new(&family);
//!
//! let mut values = [5, 3, 8, 1, 9, 2, 7, 4, 6, 0, 11];
//! machine.sort(&mut values).unwrap();
//! assert_eq!(values, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 11]);
//! ```
//!
//! Rendering source:
//!
//! ```
//! use vxsort_gen::{generate_all, render_source, ElementType, GeneratorConfig};
//!
//! let config = GeneratorConfig::with_max_vectors(4);
//! let families = generate_all(&[ElementType::F32, ElementType::U64], &config).unwrap();
//! let mut source = String::new();
//! render_source(&families, &mut source).unwrap();
//! assert!(source.contains("pub mod avx2_f32 {"));
//! ```

pub mod capability;
pub mod config;
pub mod emit;
pub mod error;
pub mod ir;
pub mod logging;
pub mod machine;
pub mod mask_table;
pub mod network;
pub mod types;
pub mod verify;

// Re-export primary components
pub use capability::Capabilities;
pub use config::{GeneratorConfig, TargetIsa, VerifyConfig};
pub use emit::{render_source, CodeSink, RustFile, WriterSink};
pub use error::{GenError, Result};
pub use machine::{Machine, SortLane, Ymm};
pub use network::{generate, generate_all, NetworkFamily, RoutineTable};
pub use types::{Direction, ElementType, LaneClass, PrimitiveOp, RoutineKey, RoutineKind};
pub use verify::{verify_any, verify_family, VerifyReport};

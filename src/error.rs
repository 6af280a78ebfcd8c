//! Error types for network generation and verification

use thiserror::Error;

use crate::ir::Reg;
use crate::types::{ElementType, PrimitiveOp};

#[derive(Debug, Error)]
pub enum GenError {
    #[error("{op} is not defined for {element} with {lanes} lanes")]
    InvalidOperation {
        op: PrimitiveOp,
        element: ElementType,
        lanes: usize,
    },

    #[error("{element} packs {lanes} lanes into a {register_bytes}-byte register; only 4 or 8 lanes are supported")]
    UnsupportedLaneCount {
        element: ElementType,
        register_bytes: usize,
        lanes: usize,
    },

    #[error("network width {width} is outside 1..={max}")]
    WidthOutOfRange { width: usize, max: usize },

    #[error("width {0} is a single-vector base case and has no compound split")]
    NotCompound(usize),

    #[error("routine {0} was generated twice")]
    DuplicateRoutine(String),

    #[error("routine {routine} calls {callee} before it was generated")]
    MissingDependency { routine: String, callee: String },

    #[error("routine {routine} takes {expected} vector argument(s), {found} supplied")]
    ArityMismatch {
        routine: String,
        expected: usize,
        found: usize,
    },

    #[error("register class mismatch in {context}: expected {expected}, found {found}")]
    RegisterMismatch {
        context: &'static str,
        expected: Reg,
        found: Reg,
    },

    #[error("length {length} needs {vectors} vectors; generated routines cover 1..={max}")]
    LengthOutOfRange {
        length: usize,
        vectors: usize,
        max: usize,
    },

    #[error("access to elements {start}..{end} is outside a buffer of {len} elements")]
    MemoryFault { start: usize, end: usize, len: usize },

    #[error("register `{0}` read before it was written")]
    UnboundRegister(String),

    #[error("routine family sorts {expected}, but {found} lanes were supplied")]
    ElementMismatch {
        expected: ElementType,
        found: ElementType,
    },

    #[error("unknown element type `{0}`")]
    UnknownElementType(String),

    #[error("verification failed for {element} at length {length}: {detail}")]
    VerificationFailed {
        element: ElementType,
        length: usize,
        detail: String,
    },

    #[error("failed to build verification thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, GenError>;

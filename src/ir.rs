//! Intermediate representation of generated routines
//!
//! Routines are built as small typed expression trees over 256-bit register
//! classes. The same tree is rendered to Rust source by [`crate::emit`] and
//! executed lane by lane by [`crate::machine`], so what gets tested is
//! exactly what gets emitted.

use std::fmt;

use crate::error::{GenError, Result};
use crate::types::{ElementType, RoutineKey, RoutineKind};

/// Register class of a 256-bit value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    /// Packed integers (`__m256i`)
    Si256,
    /// Packed single precision (`__m256`)
    Ps,
    /// Packed double precision (`__m256d`)
    Pd,
}

impl Reg {
    pub fn rust_type(&self) -> &'static str {
        match self {
            Reg::Si256 => "__m256i",
            Reg::Ps => "__m256",
            Reg::Pd => "__m256d",
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rust_type())
    }
}

/// Whether a register is a routine parameter (passed by `&mut`) or a local
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Param,
    Local,
}

/// A named register
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub name: String,
    pub reg: Reg,
    pub scope: Scope,
}

impl Var {
    pub fn param(name: impl Into<String>, reg: Reg) -> Self {
        Self {
            name: name.into(),
            reg,
            scope: Scope::Param,
        }
    }

    pub fn local(name: impl Into<String>, reg: Reg) -> Self {
        Self {
            name: name.into(),
            reg,
            scope: Scope::Local,
        }
    }

    /// The `index`-th (1-based) vector parameter of a sort or merge routine
    pub fn vector_param(index: usize, reg: Reg) -> Self {
        Self::param(vector_name(index), reg)
    }

    /// The `index`-th (1-based) vector held in an entry routine's locals
    pub fn vector_local(index: usize, reg: Reg) -> Self {
        Self::local(vector_name(index), reg)
    }

    pub fn expr(&self) -> Expr {
        Expr::Var(self.clone())
    }
}

/// Name of the `index`-th (1-based) vector register: `d01`, `d02`, ...
pub fn vector_name(index: usize) -> String {
    format!("d{index:02}")
}

/// A register-valued expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(Var),
    /// Bit-preserving reinterpretation into another register class
    Cast { to: Reg, arg: Box<Expr> },
    ShuffleEpi32 { arg: Box<Expr>, imm: u8 },
    ShufflePd { a: Box<Expr>, b: Box<Expr>, imm: u8 },
    Permute4x64Pd { arg: Box<Expr>, imm: u8 },
    BlendEpi32 { a: Box<Expr>, b: Box<Expr>, imm: u8 },
    BlendPd { a: Box<Expr>, b: Box<Expr>, imm: u8 },
    /// Lane from `b` where the top bit of the `mask` lane is set, else from `a`
    BlendvPd { a: Box<Expr>, b: Box<Expr>, mask: Box<Expr> },
    Min { element: ElementType, a: Box<Expr>, b: Box<Expr> },
    Max { element: ElementType, a: Box<Expr>, b: Box<Expr> },
    CmpGtEpi64 { a: Box<Expr>, b: Box<Expr> },
    Xor { a: Box<Expr>, b: Box<Expr> },
    Or { reg: Reg, a: Box<Expr>, b: Box<Expr> },
    /// `!a & b`
    AndNot { reg: Reg, a: Box<Expr>, b: Box<Expr> },
    /// Broadcast of one element bit pattern to every lane
    Splat { element: ElementType, bits: u64 },
    /// Unaligned load of the `vector`-th (0-based) register from `ptr`
    Load { element: ElementType, vector: usize },
    /// Load of the lanes selected by `mask`, zero elsewhere
    MaskLoad { element: ElementType, vector: usize, mask: Box<Expr> },
    /// Lane mask for the entry's `remainder`, read from the mask table
    LaneMask { element: ElementType },
}

impl Expr {
    /// Register class of the value this expression produces
    pub fn reg(&self) -> Reg {
        match self {
            Expr::Var(v) => v.reg,
            Expr::Cast { to, .. } => *to,
            Expr::ShuffleEpi32 { .. } | Expr::BlendEpi32 { .. } => Reg::Si256,
            Expr::ShufflePd { .. } | Expr::Permute4x64Pd { .. } => Reg::Pd,
            Expr::BlendPd { .. } | Expr::BlendvPd { .. } => Reg::Pd,
            Expr::Min { element, .. } | Expr::Max { element, .. } => element.native_reg(),
            Expr::CmpGtEpi64 { .. } | Expr::Xor { .. } => Reg::Si256,
            Expr::Or { reg, .. } | Expr::AndNot { reg, .. } => *reg,
            Expr::Splat { element, .. } => element.native_reg(),
            Expr::Load { element, .. } | Expr::MaskLoad { element, .. } => element.native_reg(),
            Expr::LaneMask { .. } => Reg::Si256,
        }
    }

    /// Reinterprets into `to`, or returns `self` untouched when already there
    pub fn cast(self, to: Reg) -> Expr {
        if self.reg() == to {
            self
        } else {
            Expr::Cast {
                to,
                arg: Box::new(self),
            }
        }
    }

    /// Checks operand register classes through the whole tree
    pub fn validate(&self) -> Result<Reg> {
        match self {
            Expr::Var(v) => Ok(v.reg),
            Expr::Cast { to, arg } => {
                arg.validate()?;
                Ok(*to)
            }
            Expr::ShuffleEpi32 { arg, .. } => {
                expect(arg, Reg::Si256, "shuffle_epi32")?;
                Ok(Reg::Si256)
            }
            Expr::ShufflePd { a, b, .. } => {
                expect(a, Reg::Pd, "shuffle_pd")?;
                expect(b, Reg::Pd, "shuffle_pd")?;
                Ok(Reg::Pd)
            }
            Expr::Permute4x64Pd { arg, .. } => {
                expect(arg, Reg::Pd, "permute4x64_pd")?;
                Ok(Reg::Pd)
            }
            Expr::BlendEpi32 { a, b, .. } => {
                expect(a, Reg::Si256, "blend_epi32")?;
                expect(b, Reg::Si256, "blend_epi32")?;
                Ok(Reg::Si256)
            }
            Expr::BlendPd { a, b, .. } => {
                expect(a, Reg::Pd, "blend_pd")?;
                expect(b, Reg::Pd, "blend_pd")?;
                Ok(Reg::Pd)
            }
            Expr::BlendvPd { a, b, mask } => {
                expect(a, Reg::Pd, "blendv_pd")?;
                expect(b, Reg::Pd, "blendv_pd")?;
                expect(mask, Reg::Pd, "blendv_pd")?;
                Ok(Reg::Pd)
            }
            Expr::Min { element, a, b } | Expr::Max { element, a, b } => {
                expect(a, element.native_reg(), "min/max")?;
                expect(b, element.native_reg(), "min/max")?;
                Ok(element.native_reg())
            }
            Expr::CmpGtEpi64 { a, b } => {
                expect(a, Reg::Si256, "cmpgt_epi64")?;
                expect(b, Reg::Si256, "cmpgt_epi64")?;
                Ok(Reg::Si256)
            }
            Expr::Xor { a, b } => {
                expect(a, Reg::Si256, "xor_si256")?;
                expect(b, Reg::Si256, "xor_si256")?;
                Ok(Reg::Si256)
            }
            Expr::Or { reg, a, b } | Expr::AndNot { reg, a, b } => {
                expect(a, *reg, "or/andnot")?;
                expect(b, *reg, "or/andnot")?;
                Ok(*reg)
            }
            Expr::MaskLoad { element, mask, .. } => {
                expect(mask, Reg::Si256, "maskload")?;
                Ok(element.native_reg())
            }
            Expr::Splat { .. } | Expr::Load { .. } | Expr::LaneMask { .. } => Ok(self.reg()),
        }
    }
}

fn expect(expr: &Expr, expected: Reg, context: &'static str) -> Result<()> {
    let found = expr.validate()?;
    if found == expected {
        Ok(())
    } else {
        Err(GenError::RegisterMismatch {
            context,
            expected,
            found,
        })
    }
}

/// One statement of a routine body
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { dst: Var, value: Expr },
    /// Call of a previously generated sort or merge routine on `args`
    Call { callee: RoutineKey, args: Vec<Var> },
    Store { element: ElementType, vector: usize, value: Var },
    MaskStore { element: ElementType, vector: usize, mask: Var, value: Var },
}

impl Stmt {
    pub fn assign(dst: &Var, value: Expr) -> Self {
        Stmt::Assign {
            dst: dst.clone(),
            value,
        }
    }
}

/// A generated routine
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    pub key: RoutineKey,
    /// Vector parameters of sort and merge routines; empty for entries
    pub params: Vec<Var>,
    pub body: Vec<Stmt>,
    pub inline: bool,
}

impl Routine {
    /// Routines called from this body, in call order
    pub fn callees(&self) -> impl Iterator<Item = &RoutineKey> + '_ {
        self.body.iter().filter_map(|stmt| match stmt {
            Stmt::Call { callee, .. } => Some(callee),
            _ => None,
        })
    }

    /// Locals in first-assignment order, each with whether it is written again
    /// later (reassigned, or passed by `&mut` to a call)
    pub fn locals(&self) -> Vec<(Var, bool)> {
        let mut locals: Vec<(Var, bool)> = Vec::new();
        for stmt in &self.body {
            let written: Vec<&Var> = match stmt {
                Stmt::Assign { dst, .. } => vec![dst],
                Stmt::Call { args, .. } => args.iter().collect(),
                _ => continue,
            };
            for var in written.into_iter().filter(|v| v.scope == Scope::Local) {
                match locals.iter_mut().find(|(v, _)| v == var) {
                    Some((_, mutable)) => *mutable = true,
                    None => locals.push((var.clone(), false)),
                }
            }
        }
        locals
    }

    /// Type-checks every statement and the shape of every call
    pub fn validate(&self) -> Result<()> {
        for stmt in &self.body {
            match stmt {
                Stmt::Assign { dst, value } => expect(value, dst.reg, "assignment")?,
                Stmt::Call { callee, args } => {
                    // entries read memory and are only reachable from the dispatcher
                    if callee.kind == RoutineKind::Entry {
                        return Err(GenError::MissingDependency {
                            routine: self.key.symbol(),
                            callee: callee.symbol(),
                        });
                    }
                    if args.len() != callee.width {
                        return Err(GenError::ArityMismatch {
                            routine: callee.symbol(),
                            expected: callee.width,
                            found: args.len(),
                        });
                    }
                }
                Stmt::Store { element, value, .. } => {
                    expect(&value.expr(), element.native_reg(), "store")?
                }
                Stmt::MaskStore {
                    element,
                    mask,
                    value,
                    ..
                } => {
                    expect(&mask.expr(), Reg::Si256, "maskstore")?;
                    expect(&value.expr(), element.native_reg(), "maskstore")?;
                }
            }
        }
        Ok(())
    }
}

/// The public entry point selecting an entry routine by vector count
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatcher {
    pub element: ElementType,
    pub lanes: usize,
    /// `entries[v - 1]` handles inputs spanning `v` vectors
    pub entries: Vec<RoutineKey>,
}

impl Dispatcher {
    pub fn max_vectors(&self) -> usize {
        self.entries.len()
    }

    /// Largest length the dispatcher accepts
    pub fn max_length(&self) -> usize {
        self.entries.len() * self.lanes
    }

    /// Vector count and tail remainder for `length` elements
    pub fn vectors_for(&self, length: usize) -> (usize, usize) {
        let full = length / self.lanes;
        let remainder = length - full * self.lanes;
        (full + usize::from(remainder > 0), remainder)
    }

    /// The entry routine for `length` elements and the remainder it is called with
    pub fn select(&self, length: usize) -> Result<(RoutineKey, usize)> {
        let (vectors, remainder) = self.vectors_for(length);
        if vectors == 0 || vectors > self.entries.len() {
            return Err(GenError::LengthOutOfRange {
                length,
                vectors,
                max: self.entries.len(),
            });
        }
        Ok((self.entries[vectors - 1], remainder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    #[test]
    fn test_cast_is_identity_within_class() {
        let v = Var::local("s", Reg::Si256);
        assert_eq!(v.expr().cast(Reg::Si256), v.expr());
        assert_eq!(v.expr().cast(Reg::Pd).reg(), Reg::Pd);
    }

    #[test]
    fn test_validate_rejects_mixed_classes() {
        let a = Var::local("a", Reg::Ps);
        let expr = Expr::ShuffleEpi32 {
            arg: Box::new(a.expr()),
            imm: 0xB1,
        };
        assert!(matches!(
            expr.validate(),
            Err(GenError::RegisterMismatch {
                expected: Reg::Si256,
                found: Reg::Ps,
                ..
            })
        ));
        let fixed = Expr::ShuffleEpi32 {
            arg: Box::new(a.expr().cast(Reg::Si256)),
            imm: 0xB1,
        };
        assert_eq!(fixed.validate().unwrap(), Reg::Si256);
    }

    #[test]
    fn test_validate_checks_call_arity() {
        let d01 = Var::vector_param(1, Reg::Si256);
        let callee = RoutineKey::sort(ElementType::I32, 2, Direction::Ascending);
        let routine = Routine {
            key: RoutineKey::sort(ElementType::I32, 3, Direction::Ascending),
            params: vec![d01.clone()],
            body: vec![Stmt::Call {
                callee,
                args: vec![d01],
            }],
            inline: true,
        };
        assert!(matches!(
            routine.validate(),
            Err(GenError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_dispatcher_selection() {
        let dispatcher = Dispatcher {
            element: ElementType::I32,
            lanes: 8,
            entries: (1..=16).map(|w| RoutineKey::entry(ElementType::I32, w)).collect(),
        };
        assert_eq!(dispatcher.vectors_for(11), (2, 3));
        assert_eq!(dispatcher.vectors_for(16), (2, 0));
        let (key, remainder) = dispatcher.select(11).unwrap();
        assert_eq!(key.width, 2);
        assert_eq!(remainder, 3);
        assert_eq!(dispatcher.select(128).unwrap().0.width, 16);
        assert!(matches!(
            dispatcher.select(0),
            Err(GenError::LengthOutOfRange { vectors: 0, .. })
        ));
        assert!(matches!(
            dispatcher.select(129),
            Err(GenError::LengthOutOfRange { vectors: 17, .. })
        ));
    }
}

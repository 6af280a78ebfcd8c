//! IR to `core::arch::x86_64` Rust source

use crate::capability::SIGN_BIT_64;
use crate::config::TargetIsa;
use crate::emit::{CodeSink, RustFile};
use crate::error::{GenError, Result};
use crate::ir::{Dispatcher, Expr, Reg, Routine, Scope, Stmt, Var};
use crate::mask_table::MaskTable;
use crate::network::NetworkFamily;
use crate::types::{ElementType, LaneClass, PrimitiveOp, RoutineKind};

/// Intrinsic suffix for bitwise ops in a register class
fn bitwise_suffix(reg: Reg) -> &'static str {
    match reg {
        Reg::Si256 => "si256",
        Reg::Ps => "ps",
        Reg::Pd => "pd",
    }
}

fn cast_name(from: Reg, to: Reg) -> &'static str {
    match (from, to) {
        (Reg::Si256, Reg::Ps) => "_mm256_castsi256_ps",
        (Reg::Si256, Reg::Pd) => "_mm256_castsi256_pd",
        (Reg::Ps, Reg::Si256) => "_mm256_castps_si256",
        (Reg::Pd, Reg::Si256) => "_mm256_castpd_si256",
        (Reg::Ps, Reg::Pd) => "_mm256_castps_pd",
        (Reg::Pd, Reg::Ps) => "_mm256_castpd_ps",
        _ => "",
    }
}

/// Element pointer for the `vector`-th register
fn ptr_at(vector: usize, lanes: usize) -> String {
    match vector * lanes {
        0 => "ptr".to_string(),
        offset => format!("ptr.add({offset})"),
    }
}

fn splat_literal(element: ElementType, bits: u64) -> String {
    match element {
        ElementType::I32 if bits == i32::MAX as u64 => "i32::MAX".to_string(),
        ElementType::U32 if bits == u32::MAX as u64 => "u32::MAX as i32".to_string(),
        ElementType::I32 | ElementType::U32 => (bits as u32 as i32).to_string(),
        ElementType::I64 | ElementType::U64 if bits == SIGN_BIT_64 => "i64::MIN".to_string(),
        ElementType::I64 if bits == i64::MAX as u64 => "i64::MAX".to_string(),
        ElementType::U64 if bits == u64::MAX => "u64::MAX as i64".to_string(),
        ElementType::I64 | ElementType::U64 => (bits as i64).to_string(),
        ElementType::F32 if f32::from_bits(bits as u32) == f32::INFINITY => {
            "f32::INFINITY".to_string()
        }
        ElementType::F32 => format!("f32::from_bits({:#010x})", bits as u32),
        ElementType::F64 if f64::from_bits(bits) == f64::INFINITY => "f64::INFINITY".to_string(),
        ElementType::F64 => format!("f64::from_bits({bits:#018x})"),
    }
}

fn min_max_name(op: PrimitiveOp, element: ElementType) -> Result<String> {
    let suffix = match element {
        ElementType::I32 => "epi32",
        ElementType::U32 => "epu32",
        ElementType::F32 => "ps",
        ElementType::F64 => "pd",
        ElementType::I64 | ElementType::U64 => {
            return Err(GenError::InvalidOperation {
                op,
                element,
                lanes: 4,
            })
        }
    };
    let name = if op == PrimitiveOp::Min { "min" } else { "max" };
    Ok(format!("_mm256_{name}_{suffix}"))
}

/// Suffix of maskload/maskstore and the pointer cast they need
fn mask_mem(element: ElementType) -> (&'static str, &'static str) {
    match element {
        ElementType::I32 => ("epi32", ""),
        ElementType::U32 => ("epi32", " as *mut i32"),
        ElementType::I64 => ("epi64", ""),
        ElementType::U64 => ("epi64", " as *mut i64"),
        ElementType::F32 => ("ps", ""),
        ElementType::F64 => ("pd", ""),
    }
}

fn render_var(var: &Var) -> String {
    match var.scope {
        Scope::Param => format!("*{}", var.name),
        Scope::Local => var.name.clone(),
    }
}

/// Renders one expression for registers of `lanes` lanes
pub fn render_expr(expr: &Expr, lanes: usize) -> Result<String> {
    let r = |e: &Expr| render_expr(e, lanes);
    Ok(match expr {
        Expr::Var(v) => render_var(v),
        Expr::Cast { to, arg } => {
            let from = arg.reg();
            if from == *to {
                r(arg)?
            } else {
                format!("{}({})", cast_name(from, *to), r(arg)?)
            }
        }
        Expr::ShuffleEpi32 { arg, imm } => format!("_mm256_shuffle_epi32({}, {imm:#04X})", r(arg)?),
        Expr::ShufflePd { a, b, imm } => {
            format!("_mm256_shuffle_pd({}, {}, {imm:#X})", r(a)?, r(b)?)
        }
        Expr::Permute4x64Pd { arg, imm } => {
            format!("_mm256_permute4x64_pd({}, {imm:#04X})", r(arg)?)
        }
        Expr::BlendEpi32 { a, b, imm } => {
            format!("_mm256_blend_epi32({}, {}, {imm:#04X})", r(a)?, r(b)?)
        }
        Expr::BlendPd { a, b, imm } => format!("_mm256_blend_pd({}, {}, {imm:#X})", r(a)?, r(b)?),
        Expr::BlendvPd { a, b, mask } => {
            format!("_mm256_blendv_pd({}, {}, {})", r(a)?, r(b)?, r(mask)?)
        }
        Expr::Min { element, a, b } => {
            format!("{}({}, {})", min_max_name(PrimitiveOp::Min, *element)?, r(a)?, r(b)?)
        }
        Expr::Max { element, a, b } => {
            format!("{}({}, {})", min_max_name(PrimitiveOp::Max, *element)?, r(a)?, r(b)?)
        }
        Expr::CmpGtEpi64 { a, b } => format!("_mm256_cmpgt_epi64({}, {})", r(a)?, r(b)?),
        Expr::Xor { a, b } => format!("_mm256_xor_si256({}, {})", r(a)?, r(b)?),
        Expr::Or { reg, a, b } => {
            format!("_mm256_or_{}({}, {})", bitwise_suffix(*reg), r(a)?, r(b)?)
        }
        Expr::AndNot { reg, a, b } => {
            format!("_mm256_andnot_{}({}, {})", bitwise_suffix(*reg), r(a)?, r(b)?)
        }
        Expr::Splat { element, bits } => {
            let set1 = match element {
                ElementType::I32 | ElementType::U32 => "_mm256_set1_epi32",
                ElementType::I64 | ElementType::U64 => "_mm256_set1_epi64x",
                ElementType::F32 => "_mm256_set1_ps",
                ElementType::F64 => "_mm256_set1_pd",
            };
            format!("{set1}({})", splat_literal(*element, *bits))
        }
        Expr::Load { element, vector } => {
            let at = ptr_at(*vector, lanes);
            match element {
                ElementType::F32 => format!("_mm256_loadu_ps({at})"),
                ElementType::F64 => format!("_mm256_loadu_pd({at})"),
                _ => format!("_mm256_loadu_si256({at} as *const __m256i)"),
            }
        }
        Expr::MaskLoad {
            element,
            vector,
            mask,
        } => {
            let (suffix, cast) = mask_mem(*element);
            let cast = cast.replace("*mut", "*const");
            format!(
                "_mm256_maskload_{suffix}({}{cast}, {})",
                ptr_at(*vector, lanes),
                r(mask)?
            )
        }
        Expr::LaneMask { element } => {
            let class = LaneClass::from_lanes(lanes).ok_or(GenError::UnsupportedLaneCount {
                element: *element,
                register_bytes: lanes * element.byte_width(),
                lanes,
            })?;
            let widen = match class {
                LaneClass::Narrow => "_mm256_cvtepi8_epi32",
                LaneClass::Wide => "_mm256_cvtepi8_epi64",
            };
            format!(
                "{widen}(_mm_loadu_si128(super::{}.as_ptr().add(remainder * {lanes}) as *const __m128i))",
                MaskTable::new(class).symbol()
            )
        }
    })
}

fn render_stmt(
    f: &mut RustFile,
    stmt: &Stmt,
    lanes: usize,
    declared: &mut Vec<String>,
    mutable: &[(Var, bool)],
) -> Result<()> {
    match stmt {
        Stmt::Assign { dst, value } => {
            let value = render_expr(value, lanes)?;
            match dst.scope {
                Scope::Param => f.line(&format!("*{} = {value};", dst.name)),
                Scope::Local if declared.contains(&dst.name) => {
                    f.line(&format!("{} = {value};", dst.name))
                }
                Scope::Local => {
                    let is_mut = mutable.iter().any(|(v, m)| *m && v == dst);
                    let binding = if is_mut { "let mut" } else { "let" };
                    f.line(&format!("{binding} {} = {value};", dst.name));
                    declared.push(dst.name.clone());
                }
            }
        }
        Stmt::Call { callee, args } => {
            let args: Vec<String> = args
                .iter()
                .map(|a| match a.scope {
                    Scope::Param => a.name.clone(),
                    Scope::Local => format!("&mut {}", a.name),
                })
                .collect();
            f.line(&format!("{}({});", callee.symbol(), args.join(", ")));
        }
        Stmt::Store {
            element,
            vector,
            value,
        } => {
            let at = ptr_at(*vector, lanes);
            let line = match element {
                ElementType::F32 => format!("_mm256_storeu_ps({at}, {});", value.name),
                ElementType::F64 => format!("_mm256_storeu_pd({at}, {});", value.name),
                _ => format!("_mm256_storeu_si256({at} as *mut __m256i, {});", value.name),
            };
            f.line(&line);
        }
        Stmt::MaskStore {
            element,
            vector,
            mask,
            value,
        } => {
            let (suffix, cast) = mask_mem(*element);
            f.line(&format!(
                "_mm256_maskstore_{suffix}({}{cast}, {}, {});",
                ptr_at(*vector, lanes),
                mask.name,
                value.name
            ));
        }
    }
    Ok(())
}

/// `#[target_feature]` attribute every emitted routine carries
fn target_feature(isa: TargetIsa) -> String {
    format!("#[target_feature(enable = \"{}\")]", isa.target_feature())
}

/// Renders one routine at the current depth of `f`
pub fn render_routine(f: &mut RustFile, routine: &Routine, lanes: usize, isa: TargetIsa) -> Result<()> {
    let element = routine.key.element;
    let signature = match routine.key.kind {
        RoutineKind::Sort | RoutineKind::Merge => routine
            .params
            .iter()
            .map(|p| format!("{}: &mut {}", p.name, p.reg))
            .collect::<Vec<_>>()
            .join(", "),
        RoutineKind::Entry => {
            f.doc_comment(&format!(
                "Sorts up to {} elements at `ptr`; the last register holds `remainder` elements (0 = full).",
                routine.key.width * lanes
            ));
            format!("ptr: *mut {}, remainder: usize", element.rust_name())
        }
    };
    f.line(if routine.inline {
        "#[inline]"
    } else {
        "#[inline(never)]"
    });
    f.line(&target_feature(isa));
    f.open(&format!("pub unsafe fn {}({signature}) {{", routine.key.symbol()));
    let mutable = routine.locals();
    let mut declared = Vec::with_capacity(mutable.len());
    for stmt in &routine.body {
        render_stmt(f, stmt, lanes, &mut declared, &mutable)?;
    }
    f.close("}");
    Ok(())
}

/// Renders the `sort(ptr, length)` entry point
pub fn render_dispatcher(f: &mut RustFile, dispatcher: &Dispatcher, isa: TargetIsa) -> Result<()> {
    let lanes = dispatcher.lanes;
    let ty = dispatcher.element.rust_name();
    f.doc_comment(&format!(
        "Sorts the `length` {ty} values at `ptr` in ascending order.\n\
         \n\
         # Safety\n\
         \n\
         The CPU must support AVX2, `ptr` must be valid for reads and writes of\n\
         `length` elements, and `length` must be in `1..={}`.",
        dispatcher.max_length()
    ));
    f.line("#[inline]");
    f.line(&target_feature(isa));
    f.open(&format!("pub unsafe fn sort(ptr: *mut {ty}, length: usize) {{"));
    f.line(&format!("let full = length / {lanes};"));
    f.line(&format!("let remainder = length - full * {lanes};"));
    f.line("let v = full + usize::from(remainder > 0);");
    f.open("match v {");
    for (i, entry) in dispatcher.entries.iter().enumerate() {
        f.line(&format!("{} => {}(ptr, remainder),", i + 1, entry.symbol()));
    }
    f.line(&format!(
        "_ => unreachable!(\"sort: {{length}} elements need {{v}} vectors, at most {} are generated\"),",
        dispatcher.max_vectors()
    ));
    f.close("}");
    f.close("}");
    Ok(())
}

/// Renders the `avx2_<ty>` module of one family at the current depth of `f`
pub fn render_family(f: &mut RustFile, family: &NetworkFamily) -> Result<()> {
    let lanes = family.lanes();
    let isa = family.caps.isa();
    f.doc_comment(&format!(
        "Bitonic sorting networks for `{}`, {lanes} lanes per register.",
        family.element
    ));
    f.line("#[cfg(target_arch = \"x86_64\")]");
    f.line("#[allow(unsafe_op_in_unsafe_fn, clippy::too_many_arguments, clippy::missing_safety_doc)]");
    f.open(&format!(
        "pub mod {}_{} {{",
        isa.module_prefix(),
        family.element
    ));
    f.line("use core::arch::x86_64::*;");
    for routine in family.table.iter() {
        f.blank();
        render_routine(f, routine, lanes, isa)?;
    }
    f.blank();
    render_dispatcher(f, &family.dispatcher, isa)?;
    f.close("}");
    tracing::debug!(element = %family.element, routines = family.table.len(), "family_rendered");
    Ok(())
}

/// Renders the mask tables the given lane classes need
pub fn render_mask_tables(f: &mut RustFile, classes: &[LaneClass]) {
    for &class in classes {
        let table = MaskTable::new(class);
        let lanes = table.lanes();
        f.doc_comment(&format!(
            "Lane masks per remainder for {lanes}-lane registers, followed by {} guard row(s).",
            table.guard_rows()
        ));
        f.open(&format!(
            "pub static {}: [u8; {}] = [",
            table.symbol(),
            table.bytes().len()
        ));
        for row in table.bytes().chunks(lanes) {
            let bytes: Vec<String> = row.iter().map(|b| format!("{b:#04X}")).collect();
            f.line(&format!("{},", bytes.join(", ")));
        }
        f.close("];");
        f.blank();
    }
}

/// Writes the complete generated source for `families` to `sink`
pub fn render_source(families: &[NetworkFamily], sink: &mut dyn CodeSink) -> Result<()> {
    let types: Vec<&str> = families.iter().map(|f| f.element.rust_name()).collect();
    let max = families
        .iter()
        .map(|f| f.max_vectors())
        .max()
        .unwrap_or_default();
    let mut f = RustFile::new(&format!(
        "AVX2 bitonic sorting networks.\n\
         \n\
         Generated by vxsort-gen {}. Do not edit by hand.\n\
         \n\
         Element types: {}. Up to {max} registers per sort.",
        env!("CARGO_PKG_VERSION"),
        types.join(", ")
    ));
    f.blank();

    let mut classes: Vec<LaneClass> = Vec::new();
    for family in families {
        let class = family.caps.class();
        if !classes.contains(&class) {
            classes.push(class);
        }
    }
    classes.sort_by_key(|c| std::cmp::Reverse(c.lanes()));
    render_mask_tables(&mut f, &classes);
    sink.append(&f.finish())?;

    for (i, family) in families.iter().enumerate() {
        let mut f = RustFile::fragment(0);
        if i > 0 {
            f.blank();
        }
        render_family(&mut f, family)?;
        sink.append(&f.finish())?;
    }
    Ok(())
}

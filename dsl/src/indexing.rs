//! Strided index resolution.
//!
//! An index expression is a sequence of [`Idx`] entries (built directly or
//! with the [`ix!`](crate::ix) macro) against a ranked memref. [`resolve`]
//! turns it into either a single coordinate (every entry a scalar, one per
//! dimension) or an [`Indexer`]: per-dimension (offset, size, stride)
//! triples split into compile-time-known and runtime parts, plus the output
//! positions at which size-1 axes are inserted.
//!
//! Dynamic slice bounds are accepted only in the affine tile form
//! `i * c .. (i + 1) * c` with a constant `c`; anything else is rejected
//! rather than approximated.

use smallvec::SmallVec;
use snafu::ensure;
use tracing::trace;

use oriel_ir::{Context, Dim, Mixed, OpKind, Shape, Sym, Value};

use crate::error::*;

/// One entry of an index expression.
///
/// Similar to NumPy indexing:
/// - `Coord(5)` / `Val(v)`: select one element along this dimension
/// - `Slice { start, stop, step }`: strided range (like `arr[0:10:2]`)
/// - `Full`: all elements (like `arr[:]`)
/// - `Ellipsis`: all remaining dimensions unchanged
/// - `NewAxis`: insert a size-1 dimension, consuming none
#[derive(Debug, Clone, PartialEq)]
pub enum Idx {
    /// Static scalar position.
    Coord(i64),
    /// Dynamic scalar position.
    Val(Value),
    /// Range with optional bounds and step; omitted bounds default to the
    /// dimension's full extent, an omitted step to 1.
    Slice { start: Option<Sym>, stop: Option<Sym>, step: Option<Sym> },
    /// Full range over this dimension.
    Full,
    /// Expands to enough full ranges to cover the remaining dimensions.
    Ellipsis,
    /// Insert a size-1 dimension at this output position.
    NewAxis,
}

impl Idx {
    pub fn range(start: impl Into<Sym>, stop: impl Into<Sym>) -> Self {
        Idx::Slice { start: Some(start.into()), stop: Some(stop.into()), step: None }
    }

    pub fn range_step(start: impl Into<Sym>, stop: impl Into<Sym>, step: impl Into<Sym>) -> Self {
        Idx::Slice { start: Some(start.into()), stop: Some(stop.into()), step: Some(step.into()) }
    }

    /// Whether this entry consumes one input dimension.
    pub fn consumes_dim(&self) -> bool {
        matches!(self, Idx::Coord(_) | Idx::Val(_) | Idx::Slice { .. } | Idx::Full)
    }

    fn as_scalar(&self) -> Option<Sym> {
        match self {
            Idx::Coord(c) => Some(Sym::Const(*c)),
            Idx::Val(v) => Some(Sym::Dyn(*v)),
            _ => None,
        }
    }
}

impl From<i64> for Idx {
    fn from(c: i64) -> Self {
        Idx::Coord(c)
    }
}

impl From<Value> for Idx {
    fn from(v: Value) -> Self {
        Idx::Val(v)
    }
}

/// Index-entry macro.
///
/// # Syntax
/// - `ix![..]` → `Idx::Full`
/// - `ix![Ellipsis]` → `Idx::Ellipsis`
/// - `ix![NewAxis]` → `Idx::NewAxis`
/// - `ix![i]` → `Idx::Coord` / `Idx::Val`
/// - `ix![start, stop]` → `Idx::Slice`
/// - `ix![start, stop, step]` → stepped `Idx::Slice`
#[macro_export]
macro_rules! ix {
    (..) => {
        $crate::Idx::Full
    };

    (Ellipsis) => {
        $crate::Idx::Ellipsis
    };

    (NewAxis) => {
        $crate::Idx::NewAxis
    };

    ($i:expr) => {
        $crate::Idx::from($i)
    };

    ($start:expr, $stop:expr) => {
        $crate::Idx::range($start, $stop)
    };

    ($start:expr, $stop:expr, $step:expr) => {
        $crate::Idx::range_step($start, $stop, $step)
    };
}

/// Resolved (offset, size, stride) for one dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triple {
    pub offset: Sym,
    pub size: Sym,
    pub stride: Sym,
}

impl Triple {
    fn is_constant(&self) -> bool {
        self.offset.is_const() && self.size.is_const() && self.stride.is_const()
    }
}

/// The canonical resolved form of an index expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Indexer {
    /// One triple per consumed input dimension, in dimension order.
    pub triples: SmallVec<[Triple; 4]>,
    /// Output positions of inserted size-1 axes.
    pub newaxis: SmallVec<[usize; 4]>,
    /// Shape of the indexed buffer.
    pub in_shape: Shape,
}

impl Indexer {
    /// True iff every triple component is compile-time known; a single
    /// fully-static sub-view then suffices.
    pub fn is_constant(&self) -> bool {
        self.triples.iter().all(Triple::is_constant)
    }

    pub fn offsets(&self) -> Mixed {
        self.triples.iter().map(|t| t.offset).collect()
    }

    pub fn sizes(&self) -> Mixed {
        self.triples.iter().map(|t| t.size).collect()
    }

    pub fn strides(&self) -> Mixed {
        self.triples.iter().map(|t| t.stride).collect()
    }

    /// All offsets as constants, if the indexer is constant.
    pub fn static_offsets(&self) -> Option<SmallVec<[i64; 4]>> {
        self.triples.iter().map(|t| t.offset.as_const()).collect()
    }

    pub fn static_sizes(&self) -> Option<SmallVec<[i64; 4]>> {
        self.triples.iter().map(|t| t.size.as_const()).collect()
    }

    pub fn static_strides(&self) -> Option<SmallVec<[i64; 4]>> {
        self.triples.iter().map(|t| t.stride.as_const()).collect()
    }
}

/// Outcome of resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Every entry was a scalar and the expression covers the full rank:
    /// the expression denotes one element.
    Coordinate(SmallVec<[Sym; 4]>),
    /// A strided window, possibly with inserted axes.
    View(Indexer),
}

/// Resolve an index expression against the shape of `source`.
///
/// Emits `memref.dim` operations at the current insertion point for full
/// ranges over dynamic extents; otherwise resolution is pure.
#[track_caller]
pub fn resolve(ctx: &mut Context, source: Value, specs: &[Idx]) -> Result<Resolution> {
    let ty = ctx.value_type(source);
    ensure!(ty.is_memref(), NotAMemRefSnafu { actual: ty.clone() });
    let shape: Shape = match ty.shape() {
        Some(shape) => shape.clone(),
        None => return UnrankedIndexingSnafu.fail(),
    };
    let rank = shape.len();

    // 1. expand the ellipsis (or pad trailing full ranges)
    let ellipses = specs.iter().filter(|s| matches!(s, Idx::Ellipsis)).count();
    ensure!(ellipses <= 1, MultipleEllipsisSnafu);
    let consuming = specs.iter().filter(|s| s.consumes_dim()).count();
    ensure!(consuming <= rank, TooManyIndicesSnafu { rank, got: consuming });
    let missing = rank - consuming;

    let mut expanded: SmallVec<[Idx; 8]> = SmallVec::with_capacity(specs.len() + missing);
    for spec in specs {
        match spec {
            Idx::Ellipsis => expanded.extend(std::iter::repeat_n(Idx::Full, missing)),
            other => expanded.push(other.clone()),
        }
    }
    if ellipses == 0 {
        expanded.extend(std::iter::repeat_n(Idx::Full, missing));
    }

    // 2. record inserted axes by output position
    let newaxis: SmallVec<[usize; 4]> = expanded
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s, Idx::NewAxis))
        .map(|(pos, _)| pos)
        .collect();

    // coordinate fast path: one scalar per dimension, nothing inserted
    if newaxis.is_empty() {
        if let Some(coords) = expanded.iter().map(Idx::as_scalar).collect::<Option<_>>() {
            return Ok(Resolution::Coordinate(coords));
        }
    }

    // 3. one triple per consumed dimension
    let mut triples: SmallVec<[Triple; 4]> = SmallVec::with_capacity(rank);
    let mut axis = 0usize;
    for spec in &expanded {
        let triple = match spec {
            Idx::Ellipsis => unreachable!("ellipsis is expanded before triples are built"),
            Idx::NewAxis => continue,
            Idx::Coord(c) => {
                Triple { offset: Sym::Const(*c), size: Sym::Const(1), stride: Sym::Const(1) }
            }
            Idx::Val(v) => {
                Triple { offset: Sym::Dyn(*v), size: Sym::Const(1), stride: Sym::Const(1) }
            }
            Idx::Full => full_triple(ctx, source, &shape, axis)?,
            Idx::Slice { start, stop, step } => {
                resolve_slice(ctx, source, &shape, axis, *start, *stop, *step)?
            }
        };
        triples.push(triple);
        axis += 1;
    }

    let indexer = Indexer { triples, newaxis, in_shape: shape };
    trace!(
        constant = indexer.is_constant(),
        dims = indexer.triples.len(),
        inserted = indexer.newaxis.len(),
        "resolved indexer"
    );
    Ok(Resolution::View(indexer))
}

/// Triple for a full range over `axis`: offset 0, stride 1, size the
/// extent — a `memref.dim` when the extent is unknown.
fn full_triple(ctx: &mut Context, source: Value, shape: &Shape, axis: usize) -> Result<Triple> {
    let size = match shape[axis] {
        Dim::Fixed(n) => Sym::Const(n as i64),
        Dim::Dynamic => {
            let index = ctx.constant_index(axis as i64);
            Sym::Dyn(ctx.dim(source, index)?)
        }
    };
    Ok(Triple { offset: Sym::Const(0), size, stride: Sym::Const(1) })
}

fn resolve_slice(
    ctx: &mut Context,
    source: Value,
    shape: &Shape,
    axis: usize,
    start: Option<Sym>,
    stop: Option<Sym>,
    step: Option<Sym>,
) -> Result<Triple> {
    let step = match step {
        None => 1,
        Some(Sym::Const(s)) => s,
        Some(Sym::Dyn(v)) => match ctx.const_value(v) {
            Some(s) => s,
            None => {
                return UnsupportedSliceSnafu { detail: "step must be a constant" }.fail();
            }
        },
    };
    ensure!(step >= 1, UnsupportedSliceSnafu { detail: format!("step must be positive, got {step}") });

    // an unbounded slice is a full range
    if start.is_none() && stop.is_none() {
        let mut triple = full_triple(ctx, source, shape, axis)?;
        if step != 1 {
            let extent = match triple.size.as_const() {
                Some(n) => n,
                None => {
                    return UnsupportedSliceSnafu {
                        detail: "stepped slice over a dynamic extent",
                    }
                    .fail();
                }
            };
            triple.size = Sym::Const(ceil_div(extent, step));
            triple.stride = Sym::Const(step);
        }
        return Ok(triple);
    }

    let start = start.unwrap_or(Sym::Const(0));
    let stop = match (stop, shape[axis]) {
        (Some(stop), _) => stop,
        (None, Dim::Fixed(n)) => Sym::Const(n as i64),
        (None, Dim::Dynamic) => {
            return UnsupportedSliceSnafu { detail: "bounded slice over a dynamic extent" }.fail();
        }
    };

    match (start, stop) {
        (Sym::Const(a), Sym::Const(b)) => Ok(Triple {
            offset: Sym::Const(a),
            size: Sym::Const(ceil_div(b - a, step)),
            stride: Sym::Const(step),
        }),
        (Sym::Dyn(s), Sym::Dyn(e)) => {
            // recognized tile pattern: start = i * c, stop = (i + 1) * c;
            // the size is the matched multiplier, a constant step becomes
            // the stride as-is
            let size = match match_tile(ctx, s, e) {
                Some(size) => size,
                None => {
                    return UnsupportedSliceSnafu {
                        detail: format!(
                            "dynamic bounds {s:?}..{e:?} do not match the i*c..(i+1)*c tile pattern"
                        ),
                    }
                    .fail();
                }
            };
            Ok(Triple { offset: Sym::Dyn(s), size: Sym::Const(size), stride: Sym::Const(step) })
        }
        (start, stop) => UnsupportedSliceSnafu {
            detail: format!("mixed static/dynamic bounds {start:?}..{stop:?}"),
        }
        .fail(),
    }
}

/// Structural match for the affine tile pattern. Returns the tile size.
///
/// Accepts exactly `start = muli(i, c)`, `stop = muli(addi(i, 1), c)` with
/// the same `i` on both sides and the same constant multiplier; operand
/// order is literal.
fn match_tile(ctx: &Context, start: Value, stop: Value) -> Option<i64> {
    let &OpKind::MulI(i, start_factor) = &ctx.op(ctx.defining_op(start)?).kind else {
        return None;
    };
    let &OpKind::MulI(next, stop_factor) = &ctx.op(ctx.defining_op(stop)?).kind else {
        return None;
    };
    let &OpKind::AddI(base, one) = &ctx.op(ctx.defining_op(next)?).kind else {
        return None;
    };
    if base != i || ctx.const_value(one) != Some(1) {
        return None;
    }
    let factor = ctx.const_value(stop_factor)?;
    if ctx.const_value(start_factor) != Some(factor) {
        return None;
    }
    Some(factor)
}

fn ceil_div(span: i64, step: i64) -> i64 {
    let span = span.max(0);
    (span + step - 1) / step
}

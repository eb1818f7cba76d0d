//! Memref indexing surface: bracket-style reads and writes.
//!
//! [`MemRef`] wraps a memref-typed value and routes index expressions
//! through the resolver: a full-rank scalar expression becomes a direct
//! load/store, anything else becomes a sub-view (plus a shape expansion
//! when new axes were requested). Writes copy into the resolved sub-view
//! after an exact shape check.

use smallvec::SmallVec;
use snafu::ensure;

use oriel_ir::{Context, Dim, Shape, Sym, Type, Value};

use crate::error::*;
use crate::indexing::{Idx, Resolution, resolve};

/// A memref-typed value with an indexing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRef {
    value: Value,
}

impl MemRef {
    /// Wrap a value; fails if it is not memref-typed.
    pub fn wrap(ctx: &Context, value: Value) -> Result<Self> {
        let ty = ctx.value_type(value);
        ensure!(ty.is_memref(), NotAMemRefSnafu { actual: ty.clone() });
        Ok(Self { value })
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn has_rank(&self, ctx: &Context) -> bool {
        ctx.value_type(self.value).has_rank()
    }

    pub fn shape(&self, ctx: &Context) -> Option<Shape> {
        ctx.value_type(self.value).shape().cloned()
    }

    pub fn dtype(&self, ctx: &Context) -> Type {
        ctx.value_type(self.value).element_type().expect("memref has an element type").clone()
    }

    pub fn has_static_shape(&self, ctx: &Context) -> bool {
        ctx.value_type(self.value).has_static_shape()
    }

    /// Read: a full-rank scalar expression loads one element, anything else
    /// produces a sub-view value (rank-expanded if new axes were given).
    #[track_caller]
    pub fn get(&self, ctx: &mut Context, specs: &[Idx]) -> Result<Value> {
        ensure!(self.has_rank(ctx), UnrankedIndexingSnafu);

        // identity fast paths
        if specs.iter().all(|s| matches!(s, Idx::Full)) {
            return Ok(self.value);
        }
        if let [Idx::Ellipsis] = specs {
            return Ok(self.value);
        }
        if let [Idx::NewAxis] = specs {
            return expand_shape(ctx, self.value, &[0]);
        }

        match resolve(ctx, self.value, specs)? {
            Resolution::Coordinate(coords) => {
                let indices = materialize_indices(ctx, &coords);
                Ok(ctx.load(self.value, &indices)?)
            }
            Resolution::View(indexer) => {
                let sub = ctx.subview(
                    self.value,
                    indexer.offsets(),
                    indexer.sizes(),
                    indexer.strides(),
                )?;
                expand_shape(ctx, sub, &indexer.newaxis)
            }
        }
    }

    /// Write: a full-rank scalar expression stores a scalar element;
    /// anything else copies `source` into the resolved sub-view, whose
    /// shape must equal the source shape exactly.
    #[track_caller]
    pub fn set(&self, ctx: &mut Context, specs: &[Idx], source: Value) -> Result<()> {
        ensure!(self.has_rank(ctx), UnrankedIndexingSnafu);

        match resolve(ctx, self.value, specs)? {
            Resolution::Coordinate(coords) => {
                let src_ty = ctx.value_type(source).clone();
                ensure!(!src_ty.is_memref(), ScalarSourceExpectedSnafu { actual: src_ty });
                let indices = materialize_indices(ctx, &coords);
                ctx.store(source, self.value, &indices)?;
                Ok(())
            }
            Resolution::View(indexer) => {
                let source = if ctx.value_type(source).is_memref() {
                    source
                } else {
                    promote_scalar(ctx, source)?
                };
                let sub = ctx.subview(
                    self.value,
                    indexer.offsets(),
                    indexer.sizes(),
                    indexer.strides(),
                )?;
                let dest = expand_shape(ctx, sub, &indexer.newaxis)?;

                let dest_shape =
                    ctx.value_type(dest).shape().cloned().expect("sub-view is ranked");
                let src_shape = match ctx.value_type(source).shape() {
                    Some(shape) => shape.clone(),
                    None => return UnrankedIndexingSnafu.fail(),
                };
                ensure!(
                    dest_shape == src_shape,
                    ShapeMismatchSnafu { dest: dest_shape, src: src_shape }
                );
                ctx.copy(source, dest)?;
                Ok(())
            }
        }
    }
}

/// Heap-allocate a memref; dynamic sizes become unknown extents with one
/// operand each.
#[track_caller]
pub fn alloc(ctx: &mut Context, sizes: &[Sym], element: Type) -> Result<MemRef> {
    alloc_impl(ctx, sizes, element, false)
}

/// Stack-allocate a memref; sizes as for [`alloc`].
#[track_caller]
pub fn alloca(ctx: &mut Context, sizes: &[Sym], element: Type) -> Result<MemRef> {
    alloc_impl(ctx, sizes, element, true)
}

#[track_caller]
fn alloc_impl(ctx: &mut Context, sizes: &[Sym], element: Type, stack: bool) -> Result<MemRef> {
    let mut dims = Shape::new();
    let mut dynamic: SmallVec<[Value; 4]> = SmallVec::new();
    for size in sizes {
        match size {
            Sym::Const(c) => dims.push(Dim::Fixed(*c as u64)),
            Sym::Dyn(v) => {
                dims.push(Dim::Dynamic);
                dynamic.push(*v);
            }
        }
    }
    let ty = Type::memref(dims, element);
    let value =
        if stack { ctx.alloca(ty, &dynamic)? } else { ctx.alloc(ty, &dynamic)? };
    Ok(MemRef { value })
}

/// Insert size-1 axes at the given output positions.
///
/// Positions are in result coordinates, ascending. Inserted axes join the
/// reassociation group of the next source dimension; trailing inserts join
/// the last group.
#[track_caller]
pub fn expand_shape(ctx: &mut Context, source: Value, newaxis: &[usize]) -> Result<Value> {
    if newaxis.is_empty() {
        return Ok(source);
    }
    let ty = ctx.value_type(source);
    let in_shape = match ty.shape() {
        Some(shape) => shape.clone(),
        None => return UnrankedIndexingSnafu.fail(),
    };
    let in_rank = in_shape.len();
    let out_rank = in_rank + newaxis.len();

    let distinct_in_range = newaxis.windows(2).all(|w| w[0] < w[1])
        && newaxis.last().is_none_or(|&p| p < out_rank);
    ensure!(
        distinct_in_range,
        InvalidAxisPositionsSnafu { positions: newaxis.to_vec(), rank: out_rank }
    );

    // a rank-0 source expands with an empty reassociation
    if in_rank == 0 {
        let ones: Shape = std::iter::repeat_n(Dim::Fixed(1), newaxis.len()).collect();
        return Ok(ctx.expand_shape(source, SmallVec::new(), ones)?);
    }

    let mut result_shape = Shape::with_capacity(out_rank);
    let mut reassociation: SmallVec<[SmallVec<[usize; 2]>; 4]> = SmallVec::new();
    let mut pending: SmallVec<[usize; 2]> = SmallVec::new();
    let mut src = in_shape.iter();
    for pos in 0..out_rank {
        if newaxis.contains(&pos) {
            result_shape.push(Dim::Fixed(1));
            pending.push(pos);
        } else {
            result_shape.push(*src.next().expect("positions partition the result rank"));
            pending.push(pos);
            reassociation.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        // trailing inserted axes
        let last = reassociation.last_mut().expect("rank >= 1");
        last.extend(pending);
    }

    Ok(ctx.expand_shape(source, reassociation, result_shape)?)
}

/// Runtime extent of `axis`.
#[track_caller]
pub fn dim(ctx: &mut Context, source: Value, axis: i64) -> Result<Value> {
    let index = ctx.constant_index(axis);
    Ok(ctx.dim(source, index)?)
}

/// Promote a scalar copy source to a rank-1 buffer holding it.
#[track_caller]
fn promote_scalar(ctx: &mut Context, scalar: Value) -> Result<Value> {
    let ty = ctx.value_type(scalar).clone();
    let buf_ty = Type::memref([Dim::Fixed(1)], ty);
    let buf = ctx.alloca(buf_ty, &[])?;
    let zero = ctx.constant_index(0);
    ctx.store(scalar, buf, &[zero])?;
    Ok(buf)
}

#[track_caller]
fn materialize_indices(ctx: &mut Context, coords: &[Sym]) -> SmallVec<[Value; 4]> {
    coords
        .iter()
        .map(|c| match c {
            Sym::Const(v) => ctx.constant_index(*v),
            Sym::Dyn(v) => *v,
        })
        .collect()
}

use oriel_ir::{Context, OpKind, Sym, Type};
use smallvec::smallvec;
use test_case::test_case;

use crate::error::Error;
use crate::indexing::{Idx, Resolution, resolve};
use crate::ix;
use crate::test::helpers::*;

#[test]
fn full_rank_scalars_resolve_to_a_coordinate() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4, 4], Type::f32());

    let res = resolve(&mut ctx, buf.value(), &[ix![0], ix![2]]).unwrap();
    assert_eq!(res, Resolution::Coordinate(smallvec![Sym::Const(0), Sym::Const(2)]));
}

#[test]
fn dynamic_scalars_stay_dynamic_in_the_coordinate() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4, 4], Type::f32());
    let i = opaque_index(&mut ctx);

    let res = resolve(&mut ctx, buf.value(), &[ix![1], ix![i]]).unwrap();
    assert_eq!(res, Resolution::Coordinate(smallvec![Sym::Const(1), Sym::Dyn(i)]));
}

#[test]
fn partial_index_pads_trailing_full_ranges() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4, 4], Type::f32());

    let Resolution::View(ix) = resolve(&mut ctx, buf.value(), &[ix![1]]).unwrap() else {
        panic!("expected a view");
    };
    assert_eq!(ix.triples.len(), 2);
    assert_eq!(ix.offsets().as_slice(), &[Sym::Const(1), Sym::Const(0)]);
    assert_eq!(ix.sizes().as_slice(), &[Sym::Const(1), Sym::Const(4)]);
    assert_eq!(ix.strides().as_slice(), &[Sym::Const(1), Sym::Const(1)]);
}

#[test]
fn ellipsis_expands_to_the_missing_dimensions() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[2, 3, 4], Type::f32());

    let Resolution::View(ix) =
        resolve(&mut ctx, buf.value(), &[ix![0], ix![Ellipsis]]).unwrap()
    else {
        panic!("expected a view");
    };
    assert_eq!(ix.sizes().as_slice(), &[Sym::Const(1), Sym::Const(3), Sym::Const(4)]);
    assert!(ix.is_constant());
}

#[test]
fn lone_ellipsis_is_a_full_view() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4, 4], Type::f32());

    let Resolution::View(ix) = resolve(&mut ctx, buf.value(), &[ix![Ellipsis]]).unwrap() else {
        panic!("expected a view");
    };
    assert_eq!(ix.static_offsets().unwrap().as_slice(), &[0, 0]);
    assert_eq!(ix.static_sizes().unwrap().as_slice(), &[4, 4]);
    assert_eq!(ix.static_strides().unwrap().as_slice(), &[1, 1]);
}

#[test]
fn more_than_one_ellipsis_is_rejected() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4, 4], Type::f32());

    let err =
        resolve(&mut ctx, buf.value(), &[ix![Ellipsis], ix![Ellipsis]]).unwrap_err();
    assert!(matches!(err, Error::MultipleEllipsis));
}

#[test]
fn excess_consuming_entries_are_rejected() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4], Type::f32());

    let err = resolve(&mut ctx, buf.value(), &[ix![0], ix![1]]).unwrap_err();
    assert!(matches!(err, Error::TooManyIndices { rank: 1, got: 2 }));
}

#[test]
fn newaxis_records_output_positions_without_consuming() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4, 4], Type::f32());

    let specs = [ix![NewAxis], ix![1], ix![NewAxis]];
    let Resolution::View(ix) = resolve(&mut ctx, buf.value(), &specs).unwrap() else {
        panic!("expected a view");
    };
    // expanded form is [NewAxis, 1, NewAxis, Full]
    assert_eq!(ix.newaxis.as_slice(), &[0, 2]);
    assert_eq!(ix.sizes().as_slice(), &[Sym::Const(1), Sym::Const(4)]);
    assert_eq!(ix.offsets().as_slice(), &[Sym::Const(1), Sym::Const(0)]);
}

#[test]
fn full_rank_scalars_with_newaxis_still_form_a_view() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4, 4], Type::f32());

    let specs = [ix![0], ix![1], ix![NewAxis]];
    let res = resolve(&mut ctx, buf.value(), &specs).unwrap();
    assert!(matches!(res, Resolution::View(_)));
}

// =============================================================================
// Slice size arithmetic
// =============================================================================

#[test_case(0, 4, 1, 0, 4; "full_extent")]
#[test_case(1, 3, 1, 1, 2; "interior")]
#[test_case(0, 4, 2, 0, 2; "even_step")]
#[test_case(0, 3, 2, 0, 2; "uneven_step_rounds_up")]
#[test_case(1, 4, 2, 1, 2; "offset_step")]
#[test_case(3, 3, 1, 3, 0; "empty")]
#[test_case(3, 1, 1, 3, 0; "reversed_bounds_clamp_to_empty")]
fn slice_triple(start: i64, stop: i64, step: i64, offset: i64, size: i64) {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4], Type::f32());

    let Resolution::View(ix) =
        resolve(&mut ctx, buf.value(), &[ix![start, stop, step]]).unwrap()
    else {
        panic!("expected a view");
    };
    assert_eq!(ix.triples[0].offset, Sym::Const(offset));
    assert_eq!(ix.triples[0].size, Sym::Const(size));
    assert_eq!(ix.triples[0].stride, Sym::Const(step));
}

#[test]
fn omitted_bounds_default_to_the_full_extent() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[7], Type::f32());

    let spec = Idx::Slice { start: None, stop: None, step: Some(Sym::Const(2)) };
    let Resolution::View(ix) = resolve(&mut ctx, buf.value(), &[spec]).unwrap() else {
        panic!("expected a view");
    };
    assert_eq!(ix.triples[0].size, Sym::Const(4));
    assert_eq!(ix.triples[0].stride, Sym::Const(2));
}

#[test]
fn constant_valued_step_operand_is_folded() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[8], Type::f32());
    let step = ctx.constant_index(2);

    let Resolution::View(ix) =
        resolve(&mut ctx, buf.value(), &[ix![0, 8, step]]).unwrap()
    else {
        panic!("expected a view");
    };
    assert_eq!(ix.triples[0].size, Sym::Const(4));
}

#[test_case(0; "zero_step")]
#[test_case(-1; "negative_step")]
fn non_positive_step_is_rejected(step: i64) {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4], Type::f32());

    let err = resolve(&mut ctx, buf.value(), &[ix![0, 4, step]]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedSlice { .. }));
}

#[test]
fn opaque_step_operand_is_rejected() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[4], Type::f32());
    let step = opaque_index(&mut ctx);

    let err = resolve(&mut ctx, buf.value(), &[ix![0, 4, step]]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedSlice { .. }));
}

// =============================================================================
// Dynamic extents
// =============================================================================

#[test]
fn full_range_over_a_dynamic_extent_emits_a_dim_query() {
    let mut ctx = Context::new();
    let n = opaque_index(&mut ctx);
    let buf = crate::memref::alloc(&mut ctx, &[Sym::Dyn(n)], Type::f32()).unwrap();

    let Resolution::View(ix) = resolve(&mut ctx, buf.value(), &[ix![..]]).unwrap() else {
        panic!("expected a view");
    };
    let size = ix.triples[0].size.as_dyn().expect("dynamic extent");
    let def = ctx.defining_op(size).unwrap();
    assert!(matches!(ctx.op(def).kind, OpKind::Dim { .. }));
}

#[test]
fn bounded_slice_over_a_dynamic_extent_is_rejected() {
    let mut ctx = Context::new();
    let n = opaque_index(&mut ctx);
    let buf = crate::memref::alloc(&mut ctx, &[Sym::Dyn(n)], Type::f32()).unwrap();

    let spec = Idx::Slice { start: Some(Sym::Const(1)), stop: None, step: None };
    let err = resolve(&mut ctx, buf.value(), &[spec]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedSlice { .. }));
}

// =============================================================================
// The tile pattern
// =============================================================================

/// `i * c` and `(i + 1) * c` for the given tile size.
fn tile_bounds(ctx: &mut Context, i: oriel_ir::Value, c: i64) -> (oriel_ir::Value, oriel_ir::Value) {
    let factor = ctx.constant_index(c);
    let one = ctx.constant_index(1);
    let start = ctx.muli(i, factor).unwrap();
    let next = ctx.addi(i, one).unwrap();
    let stop = ctx.muli(next, factor).unwrap();
    (start, stop)
}

#[test]
fn tile_bounds_resolve_to_a_constant_size() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[8], Type::f32());
    let i = opaque_index(&mut ctx);
    let (start, stop) = tile_bounds(&mut ctx, i, 4);

    let Resolution::View(ix) =
        resolve(&mut ctx, buf.value(), &[Idx::range(start, stop)]).unwrap()
    else {
        panic!("expected a view");
    };
    assert_eq!(ix.triples[0].offset, Sym::Dyn(start));
    assert_eq!(ix.triples[0].size, Sym::Const(4));
    assert_eq!(ix.triples[0].stride, Sym::Const(1));
    assert!(!ix.is_constant());
}

#[test]
fn tile_bounds_accept_a_constant_step_as_the_stride() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[8], Type::f32());
    let i = opaque_index(&mut ctx);
    let (start, stop) = tile_bounds(&mut ctx, i, 4);

    let Resolution::View(ix) =
        resolve(&mut ctx, buf.value(), &[ix![start, stop, 2]]).unwrap()
    else {
        panic!("expected a view");
    };
    assert_eq!(ix.triples[0].offset, Sym::Dyn(start));
    assert_eq!(ix.triples[0].size, Sym::Const(4));
    assert_eq!(ix.triples[0].stride, Sym::Const(2));
}

#[test]
fn tile_with_mismatched_factors_is_rejected() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[8], Type::f32());
    let i = opaque_index(&mut ctx);
    let (start, _) = tile_bounds(&mut ctx, i, 4);
    let (_, stop) = tile_bounds(&mut ctx, i, 2);

    let err = resolve(&mut ctx, buf.value(), &[Idx::range(start, stop)]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedSlice { .. }));
}

#[test]
fn tile_with_a_different_induction_value_is_rejected() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[8], Type::f32());
    let i = opaque_index(&mut ctx);
    let j = opaque_index(&mut ctx);
    let (start, _) = tile_bounds(&mut ctx, i, 4);
    let (_, stop) = tile_bounds(&mut ctx, j, 4);

    let err = resolve(&mut ctx, buf.value(), &[Idx::range(start, stop)]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedSlice { .. }));
}

#[test]
fn tile_with_a_non_unit_addend_is_rejected() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[8], Type::f32());
    let i = opaque_index(&mut ctx);
    let factor = ctx.constant_index(4);
    let two = ctx.constant_index(2);
    let start = ctx.muli(i, factor).unwrap();
    let next = ctx.addi(i, two).unwrap();
    let stop = ctx.muli(next, factor).unwrap();

    let err = resolve(&mut ctx, buf.value(), &[Idx::range(start, stop)]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedSlice { .. }));
}

#[test]
fn mixed_static_and_dynamic_bounds_are_rejected() {
    let mut ctx = Context::new();
    let buf = static_buf(&mut ctx, &[8], Type::f32());
    let i = opaque_index(&mut ctx);
    let (start, _) = tile_bounds(&mut ctx, i, 4);

    let err = resolve(&mut ctx, buf.value(), &[Idx::range(start, 8i64)]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedSlice { .. }));
}

// =============================================================================
// Source checks
// =============================================================================

#[test]
fn non_memref_sources_are_rejected() {
    let mut ctx = Context::new();
    let scalar = ctx.constant(1, Type::i32());

    let err = resolve(&mut ctx, scalar, &[ix![0]]).unwrap_err();
    assert!(matches!(err, Error::NotAMemRef { .. }));
}

#[test]
fn unranked_sources_are_rejected() {
    let mut ctx = Context::new();
    let arg = func_arg(&mut ctx, Type::unranked_memref(Type::f32()));

    let err = resolve(&mut ctx, arg, &[ix![0]]).unwrap_err();
    assert!(matches!(err, Error::UnrankedIndexing));
}

use oriel_ir::{Context, OpKind, Type, Visibility};
use smallvec::smallvec;

use crate::env::Binding;
use crate::error::Error;
use crate::func::{CallValues, FuncDef, GenericParam, Param, call_by_name};
use crate::region::FuncBody;

fn add_body() -> FuncBody {
    FuncBody::define(|ctx, args| {
        let sum = ctx.addi(args[0], args[1])?;
        Ok(smallvec![sum])
    })
}

fn identity_body() -> FuncBody {
    FuncBody::define(|_, args| Ok(smallvec![args[0]]))
}

#[test]
fn emit_is_memoized() {
    let mut ctx = Context::new();
    let mut add = FuncDef::builder()
        .name("add")
        .params(vec![Param::of("a", Type::i32()), Param::of("b", Type::i32())])
        .body(add_body())
        .build()
        .unwrap();

    let first = add.emit(&mut ctx).unwrap();
    let second = add.emit(&mut ctx).unwrap();
    assert_eq!(first, second);
    assert_eq!(ctx.func_symbol(first), Some("add"));
    assert_eq!(
        ctx.func_type(first),
        Some(&Type::function(vec![Type::i32(), Type::i32()], vec![Type::i32()]))
    );
}

#[test]
fn emit_force_materializes_a_fresh_operation() {
    let mut ctx = Context::new();
    let mut add = FuncDef::builder()
        .name("add")
        .params(vec![Param::of("a", Type::i32()), Param::of("b", Type::i32())])
        .body(add_body())
        .build()
        .unwrap();

    let first = add.emit(&mut ctx).unwrap();
    let second = add.emit_force(&mut ctx).unwrap();
    assert_ne!(first, second);
    assert_eq!(add.materialized(), Some(second));
}

#[test]
fn declarations_are_private_and_bodyless() {
    let mut ctx = Context::new();
    let mut decl = FuncDef::builder()
        .name("extern_fill")
        .params(vec![Param::of("buf", Type::memref([4.into()], Type::f32()))])
        .body(FuncBody::Declaration)
        .build()
        .unwrap();

    let op = decl.emit(&mut ctx).unwrap();
    assert!(matches!(
        ctx.op(op).kind,
        OpKind::Func { visibility: Visibility::Private, .. }
    ));
    let region = ctx.op(op).regions[0];
    assert!(ctx.region(region).blocks.is_empty());
}

#[test]
fn signature_results_and_explicit_return_types_conflict() {
    let err = FuncDef::builder()
        .name("bad")
        .results(vec![Type::i32()])
        .return_types(vec![Type::i32()])
        .body(identity_body())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::ReturnTypesConflict { .. }));
}

#[test]
fn declarations_require_every_parameter_typed() {
    let err = FuncDef::builder()
        .name("decl")
        .params(vec![Param::untyped("x")])
        .body(FuncBody::Declaration)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::DeclarationNeedsTypes { .. }));
}

#[test]
fn direct_emission_rejects_untyped_parameters() {
    let mut ctx = Context::new();
    let mut f = FuncDef::builder()
        .name("late")
        .params(vec![Param::untyped("x")])
        .body(identity_body())
        .build()
        .unwrap();

    let err = f.emit(&mut ctx).unwrap_err();
    assert!(matches!(err, Error::UnannotatedParam { .. }));
}

#[test]
fn invoke_defers_input_types_to_the_call_site() {
    let mut ctx = Context::new();
    let mut add = FuncDef::builder()
        .name("add")
        .params(vec![Param::untyped("a"), Param::untyped("b")])
        .body(add_body())
        .build()
        .unwrap();

    let x = ctx.constant(1, Type::i64());
    let y = ctx.constant(2, Type::i64());
    let result = add.invoke(&mut ctx, &[x, y]).unwrap();
    assert!(result.one().is_some());

    let op = add.materialized().unwrap();
    assert_eq!(
        ctx.func_type(op),
        Some(&Type::function(vec![Type::i64(), Type::i64()], vec![Type::i64()]))
    );
}

#[test]
fn invoke_reuses_the_materialized_operation() {
    let mut ctx = Context::new();
    let mut add = FuncDef::builder()
        .name("add")
        .params(vec![Param::untyped("a"), Param::untyped("b")])
        .body(add_body())
        .build()
        .unwrap();

    let x = ctx.constant(1, Type::i32());
    let y = ctx.constant(2, Type::i32());
    add.invoke(&mut ctx, &[x, y]).unwrap();
    let op = add.materialized().unwrap();
    add.invoke(&mut ctx, &[x, y]).unwrap();
    assert_eq!(add.materialized(), Some(op));

    let calls = ctx
        .block(ctx.module())
        .ops
        .iter()
        .filter(|&&o| matches!(ctx.op(o).kind, OpKind::Call { .. }))
        .count();
    assert_eq!(calls, 2);
}

#[test]
fn function_type_follows_the_actual_returned_values() {
    let mut ctx = Context::new();
    let mut f = FuncDef::builder()
        .name("mislabeled")
        .params(vec![Param::of("x", Type::f32())])
        .results(vec![Type::i32()])
        .body(identity_body())
        .build()
        .unwrap();

    let op = f.emit(&mut ctx).unwrap();
    assert_eq!(
        ctx.func_type(op),
        Some(&Type::function(vec![Type::f32()], vec![Type::f32()]))
    );
}

#[test]
fn argument_locations_point_at_the_emission_call_site() {
    let mut ctx = Context::new();
    let mut f = FuncDef::builder()
        .name("located")
        .params(vec![Param::of("x", Type::i32())])
        .body(identity_body())
        .build()
        .unwrap();

    let op = f.emit(&mut ctx).unwrap();
    let region = ctx.op(op).regions[0];
    let entry = ctx.region(region).blocks[0];
    let arg = ctx.block_args(entry)[0];
    assert!(ctx.value_loc(arg).file.ends_with("test/unit/func.rs"));
}

// =============================================================================
// Generics
// =============================================================================

fn generic_identity() -> crate::error::Result<FuncDef> {
    FuncDef::builder()
        .name("id")
        .params(vec![Param::var("x", "T")])
        .generics(vec![GenericParam::new("T")])
        .body(identity_body())
        .build()
}

#[test]
fn an_unspecialized_generic_cannot_be_emitted() {
    let mut ctx = Context::new();
    let mut f = generic_identity().unwrap();
    let err = f.emit(&mut ctx).unwrap_err();
    assert!(matches!(err, Error::UnreifiedGeneric { .. }));
}

#[test]
fn specializations_are_independent_descriptors() {
    let mut ctx = Context::new();
    let f = generic_identity().unwrap();

    let mut f_i32 = f.specialize(&[Binding::Ty(Type::i32())]).unwrap();
    let mut f_i64 = f.specialize(&[Binding::Ty(Type::i64())]).unwrap();
    assert_eq!(f_i32.name(), "id__i32");
    assert_eq!(f_i64.name(), "id__i64");

    let op32 = f_i32.emit(&mut ctx).unwrap();
    let op64 = f_i64.emit(&mut ctx).unwrap();
    assert_ne!(op32, op64);
    assert_eq!(
        ctx.func_type(op32),
        Some(&Type::function(vec![Type::i32()], vec![Type::i32()]))
    );
    assert_eq!(
        ctx.func_type(op64),
        Some(&Type::function(vec![Type::i64()], vec![Type::i64()]))
    );
    // the base descriptor is untouched
    assert!(f.is_generic());
    assert_eq!(f.materialized(), None);
}

#[test]
fn specializing_a_non_generic_descriptor_fails() {
    let f = FuncDef::builder()
        .name("plain")
        .params(vec![Param::of("x", Type::i32())])
        .body(identity_body())
        .build()
        .unwrap();
    let err = f.specialize(&[Binding::Ty(Type::i32())]).unwrap_err();
    assert!(matches!(err, Error::NotGeneric { .. }));
}

#[test]
fn binding_count_must_match_the_generic_arity() {
    let f = generic_identity().unwrap();
    let err = f
        .specialize(&[Binding::Ty(Type::i32()), Binding::Ty(Type::i64())])
        .unwrap_err();
    assert!(matches!(err, Error::GenericArity { expected: 1, got: 2, .. }));
}

#[test]
fn a_declared_bound_wins_over_the_supplied_binding() {
    let mut ctx = Context::new();
    let f = FuncDef::builder()
        .name("pinned")
        .params(vec![Param::var("x", "T")])
        .generics(vec![GenericParam::bounded("T", Type::i32())])
        .body(identity_body())
        .build()
        .unwrap();

    let mut s = f.specialize(&[Binding::Ty(Type::i64())]).unwrap();
    assert_eq!(s.name(), "pinned__i32");
    let op = s.emit(&mut ctx).unwrap();
    assert_eq!(
        ctx.func_type(op),
        Some(&Type::function(vec![Type::i32()], vec![Type::i32()]))
    );
}

#[test]
fn constant_bindings_cannot_stand_in_for_types() {
    let mut ctx = Context::new();
    let f = generic_identity().unwrap();
    let mut s = f.specialize(&[Binding::Const(8)]).unwrap();
    assert_eq!(s.name(), "id__8");
    let err = s.emit(&mut ctx).unwrap_err();
    assert!(matches!(err, Error::NonTypeBinding { .. }));
}

// =============================================================================
// Call construction
// =============================================================================

#[test]
fn call_results_are_shaped_by_the_declared_count() {
    let mut ctx = Context::new();

    let none = call_by_name(&mut ctx, "sink", vec![], &[]).unwrap();
    assert!(matches!(none, CallValues::None));

    let one = call_by_name(&mut ctx, "source", vec![Type::i32()], &[]).unwrap();
    assert!(matches!(one, CallValues::One(_)));

    let many =
        call_by_name(&mut ctx, "pair", vec![Type::i32(), Type::i64()], &[]).unwrap();
    assert!(matches!(many, CallValues::Many(ref vs) if vs.len() == 2));
}

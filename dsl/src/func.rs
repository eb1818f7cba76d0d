//! Function descriptors: lazy, memoized function materialization.
//!
//! A [`FuncDef`] is a not-yet-materialized function definition. It
//! materializes into a concrete `func.func` operation on the first
//! [`FuncDef::emit`] or the first [`FuncDef::invoke`], and is memoized
//! afterwards; [`FuncDef::emit_force`] re-materializes unconditionally.
//! Generic descriptors are specialized with [`FuncDef::specialize`], which
//! produces a fresh, independently memoized descriptor per binding vector.

use bon::bon;
use smallvec::SmallVec;
use tracing::debug;

use oriel_ir::{AttrMap, Context, Loc, OpId, Type, Value, Visibility};

use crate::env::{Binding, TypeEnv, TypeExpr};
use crate::error::*;
use crate::region::{FuncBody, populate_func_op};

/// One declared parameter. The type may be absent; untyped parameters are
/// only usable through the deferred-emission path, where call-site argument
/// types stand in for declarations.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeExpr>,
}

impl Param {
    pub fn of(name: impl Into<String>, ty: impl Into<TypeExpr>) -> Self {
        Self { name: name.into(), ty: Some(ty.into()) }
    }

    /// Parameter whose type is a variable resolved against the descriptor's
    /// environment at emission time.
    pub fn var(name: impl Into<String>, type_var: impl Into<String>) -> Self {
        Self { name: name.into(), ty: Some(TypeExpr::Var(type_var.into())) }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self { name: name.into(), ty: None }
    }
}

/// A named generic parameter, optionally carrying a declared bound that
/// takes precedence over specialization arguments.
#[derive(Debug, Clone)]
pub struct GenericParam {
    pub name: String,
    pub bound: Option<Binding>,
}

impl GenericParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), bound: None }
    }

    pub fn bounded(name: impl Into<String>, bound: impl Into<Binding>) -> Self {
        Self { name: name.into(), bound: Some(bound.into()) }
    }
}

/// Results of a constructed call, shaped by the callee's declared result
/// count.
#[derive(Debug, Clone)]
pub enum CallValues {
    None,
    One(Value),
    Many(SmallVec<[Value; 2]>),
}

impl CallValues {
    fn from_results(results: SmallVec<[Value; 2]>) -> Self {
        match results.len() {
            0 => CallValues::None,
            1 => CallValues::One(results[0]),
            _ => CallValues::Many(results),
        }
    }

    /// The single result, if there is exactly one.
    pub fn one(&self) -> Option<Value> {
        match self {
            CallValues::One(v) => Some(*v),
            _ => None,
        }
    }
}

/// A not-yet-materialized function definition.
#[derive(Debug, Clone)]
pub struct FuncDef {
    name: String,
    params: Vec<Param>,
    results: Vec<Type>,
    visibility: Visibility,
    arg_attrs: Option<Vec<AttrMap>>,
    res_attrs: Option<Vec<AttrMap>>,
    attrs: AttrMap,
    generics: Option<Vec<GenericParam>>,
    env: TypeEnv,
    body: FuncBody,
    loc: Loc,
    materialized: Option<OpId>,
}

#[bon]
impl FuncDef {
    /// Build a function descriptor.
    ///
    /// `results` declares result types through the definition's signature;
    /// `return_types` is the explicit override kept for deferred bodies.
    /// Supplying both is a configuration error, as is a declaration body
    /// with any untyped parameter.
    #[builder]
    pub fn new(
        #[builder(into)] name: String,
        #[builder(default)] params: Vec<Param>,
        results: Option<Vec<Type>>,
        return_types: Option<Vec<Type>>,
        #[builder(default = Visibility::Public)] visibility: Visibility,
        arg_attrs: Option<Vec<AttrMap>>,
        res_attrs: Option<Vec<AttrMap>>,
        #[builder(default)] attrs: AttrMap,
        generics: Option<Vec<GenericParam>>,
        #[builder(default)] env: TypeEnv,
        body: FuncBody,
        #[builder(default = Loc::unknown())] loc: Loc,
    ) -> Result<Self> {
        if results.is_some() && return_types.is_some() {
            return ReturnTypesConflictSnafu { name }.fail();
        }
        let results = results.or(return_types).unwrap_or_default();
        if body.is_declaration() && params.iter().any(|p| p.ty.is_none()) {
            return DeclarationNeedsTypesSnafu { name }.fail();
        }
        Ok(Self {
            name,
            params,
            results,
            visibility,
            arg_attrs,
            res_attrs,
            attrs,
            generics,
            env,
            body,
            loc,
            materialized: None,
        })
    }
}

impl FuncDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_generic(&self) -> bool {
        self.generics.is_some()
    }

    /// The materialized operation, if any.
    pub fn materialized(&self) -> Option<OpId> {
        self.materialized
    }

    /// Materialize the function, memoized: a second call returns the same
    /// operation.
    #[track_caller]
    pub fn emit(&mut self, ctx: &mut Context) -> Result<OpId> {
        self.emit_inner(ctx, None, false)
    }

    /// Re-materialize unconditionally, replacing the memoized operation.
    #[track_caller]
    pub fn emit_force(&mut self, ctx: &mut Context) -> Result<OpId> {
        self.emit_inner(ctx, None, true)
    }

    /// Deferred-emission path: call-site argument types stand in for the
    /// declared input types. Memoized like [`FuncDef::emit`].
    #[track_caller]
    pub fn emit_for_args(&mut self, ctx: &mut Context, arg_types: Vec<Type>) -> Result<OpId> {
        self.emit_inner(ctx, Some(arg_types), false)
    }

    #[track_caller]
    fn emit_inner(
        &mut self,
        ctx: &mut Context,
        call_arg_types: Option<Vec<Type>>,
        force: bool,
    ) -> Result<OpId> {
        // an unset location falls back to the emission call site; bon's
        // finishing function cannot observe the builder's caller
        let loc = if self.loc.is_unknown() { Loc::caller() } else { self.loc };
        if let Some(op) = self.materialized {
            if !force {
                return Ok(op);
            }
        }

        let input_types = match call_arg_types {
            Some(types) => types,
            None => self.declared_input_types()?,
        };

        let fn_ty = Type::function(input_types.clone(), self.results.clone());
        let op = ctx.func_op(
            self.name.clone(),
            fn_ty,
            self.visibility,
            self.arg_attrs.clone(),
            self.res_attrs.clone(),
            self.attrs.clone(),
        )?;
        self.materialized = Some(op);

        let arg_locs = vec![loc; input_types.len()];
        let body = self.body.clone();
        populate_func_op(ctx, op, &input_types, &arg_locs, &body)?;
        debug!(
            func.name = %self.name,
            inputs = input_types.len(),
            declaration = body.is_declaration(),
            "materialized function"
        );
        Ok(op)
    }

    /// Resolve declared parameter types against the environment. Only valid
    /// for non-generic descriptors; a generic descriptor must be
    /// specialized (or called with arguments) first.
    fn declared_input_types(&self) -> Result<Vec<Type>> {
        if let Some(generics) = &self.generics {
            let name = generics.first().map(|g| g.name.clone()).unwrap_or_default();
            return UnreifiedGenericSnafu { name }.fail();
        }
        self.params
            .iter()
            .map(|p| match &p.ty {
                Some(expr) => expr.resolve(&self.env),
                None => UnannotatedParamSnafu {
                    name: self.name.clone(),
                    param: p.name.clone(),
                }
                .fail(),
            })
            .collect()
    }

    /// Specialize a generic descriptor with one binding per generic
    /// parameter. Produces a fresh, unmaterialized descriptor whose
    /// environment has the generic names pre-bound and whose symbol is
    /// suffixed with the binding vector; the original descriptor is left
    /// untouched.
    pub fn specialize(&self, bindings: &[Binding]) -> Result<FuncDef> {
        let Some(generics) = &self.generics else {
            return NotGenericSnafu { name: self.name.clone() }.fail();
        };
        if generics.len() != bindings.len() {
            return GenericAritySnafu {
                name: self.name.clone(),
                expected: generics.len(),
                got: bindings.len(),
            }
            .fail();
        }

        let mut env = self.env.clone();
        let mut suffix = String::new();
        for (generic, binding) in generics.iter().zip(bindings) {
            // a declared bound wins over the supplied binding
            let reified = generic.bound.clone().unwrap_or_else(|| binding.clone());
            suffix.push('_');
            suffix.push_str(&reified.suffix());
            env.insert(generic.name.clone(), reified);
        }

        Ok(FuncDef {
            name: format!("{}_{suffix}", self.name),
            params: self.params.clone(),
            results: self.results.clone(),
            visibility: self.visibility,
            arg_attrs: self.arg_attrs.clone(),
            res_attrs: self.res_attrs.clone(),
            attrs: self.attrs.clone(),
            generics: None,
            env,
            body: self.body.clone(),
            loc: self.loc,
            materialized: None,
        })
    }

    /// Build a call to this function, materializing it first if needed (the
    /// deferred path uses the argument value types as input types).
    #[track_caller]
    pub fn invoke(&mut self, ctx: &mut Context, args: &[Value]) -> Result<CallValues> {
        let op = match self.materialized {
            Some(op) => op,
            None => {
                let types = args.iter().map(|v| ctx.value_type(*v).clone()).collect();
                self.emit_inner(ctx, Some(types), false)?
            }
        };
        call(ctx, op, args)
    }
}

/// Build a call to an already-materialized function operation. Results are
/// unwrapped according to the callee's declared result count.
#[track_caller]
pub fn call(ctx: &mut Context, callee: OpId, args: &[Value]) -> Result<CallValues> {
    let symbol = match ctx.func_symbol(callee) {
        Some(symbol) => symbol.to_owned(),
        None => return InvalidCalleeSnafu.fail(),
    };
    let result_types = match ctx.func_type(callee) {
        Some(Type::Function { results, .. }) => results.clone(),
        _ => Vec::new(),
    };
    let results = ctx.call_op(symbol, result_types, args);
    Ok(CallValues::from_results(results))
}

/// Build a call to a function by symbol name, with explicitly declared
/// result types.
#[track_caller]
pub fn call_by_name(
    ctx: &mut Context,
    callee: &str,
    result_types: Vec<Type>,
    args: &[Value],
) -> Result<CallValues> {
    let results = ctx.call_op(callee, result_types, args);
    Ok(CallValues::from_results(results))
}

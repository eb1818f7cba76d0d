//! Region population for single-region operations.
//!
//! Given an operation owning one empty region, [`build_region`] appends the
//! entry block, scopes the insertion point to it, runs the body with the
//! block arguments, and appends a terminator carrying whatever the body
//! returned. The insertion cursor is restored on every exit path; a body
//! error leaves the caller's cursor untouched.

use std::rc::Rc;

use smallvec::SmallVec;

use oriel_ir::{Attr, Context, Loc, OpId, Type, Value, Visibility};

use crate::error::Result;

/// A function body: emits operations and returns the values to terminate
/// the region with (none, one, or many).
pub type BodyFn = Rc<dyn Fn(&mut Context, &[Value]) -> Result<SmallVec<[Value; 2]>>>;

/// Body of a function descriptor.
#[derive(Clone)]
pub enum FuncBody {
    /// No body: the declaration path. No block is appended, no terminator
    /// inserted, and the operation is forced private.
    Declaration,
    /// Definition path with an inline body procedure.
    Define(BodyFn),
}

impl FuncBody {
    pub fn define(
        f: impl Fn(&mut Context, &[Value]) -> Result<SmallVec<[Value; 2]>> + 'static,
    ) -> Self {
        FuncBody::Define(Rc::new(f))
    }

    pub fn is_declaration(&self) -> bool {
        matches!(self, FuncBody::Declaration)
    }
}

impl std::fmt::Debug for FuncBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuncBody::Declaration => f.write_str("Declaration"),
            FuncBody::Define(_) => f.write_str("Define(..)"),
        }
    }
}

/// Populate the single region of `op`: append an entry block with the given
/// argument types and locations, run `body` inside it, then append the
/// terminator built by `terminator` from the body's returned values.
///
/// Returns the types of the values the body actually returned.
pub fn build_region<T>(
    ctx: &mut Context,
    op: OpId,
    args: &[(Type, Loc)],
    terminator: T,
    body: &BodyFn,
) -> Result<SmallVec<[Type; 2]>>
where
    T: FnOnce(&mut Context, &[Value]) -> oriel_ir::Result<OpId>,
{
    let region = ctx.op(op).regions[0];
    let entry = ctx.append_block(region, args);
    let block_args: SmallVec<[Value; 4]> = SmallVec::from_slice(ctx.block_args(entry));

    let mut scope = ctx.scoped_insertion(entry);
    let results = body(&mut *scope, &block_args)?;
    let actual: SmallVec<[Type; 2]> =
        results.iter().map(|v| scope.value_type(*v).clone()).collect();
    terminator(&mut *scope, &results)?;
    drop(scope);

    Ok(actual)
}

/// Populate a function operation along the declaration or definition path.
///
/// Declarations get private visibility and an empty region. Definitions get
/// an entry block, a `func.return` terminator, and a `function_type`
/// recomputed from the argument types and the *actual* returned value
/// types, so a body that returns something other than the declared results
/// corrects the declaration instead of being rejected.
pub(crate) fn populate_func_op(
    ctx: &mut Context,
    op: OpId,
    arg_types: &[Type],
    arg_locs: &[Loc],
    body: &FuncBody,
) -> Result<()> {
    match body {
        FuncBody::Declaration => {
            ctx.set_visibility(op, Visibility::Private);
            Ok(())
        }
        FuncBody::Define(f) => {
            let args: Vec<(Type, Loc)> =
                arg_types.iter().cloned().zip(arg_locs.iter().copied()).collect();
            let results = build_region(ctx, op, &args, |c, values| c.return_op(values), f)?;
            let fn_ty = Type::function(arg_types.to_vec(), results.into_vec());
            ctx.set_attr(op, "function_type", Attr::Type(fn_ty));
            Ok(())
        }
    }
}

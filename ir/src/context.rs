//! Arena context and insertion-point threading.
//!
//! A [`Context`] owns every operation, region, block and value of the IR
//! being built, addressed by copyable id handles. The insertion point is a
//! stack of block ids held by the context and threaded explicitly through
//! every constructor call; [`Context::scoped_insertion`] returns an RAII
//! guard that restores the previous cursor on every exit path, including
//! unwinding.

use smallvec::SmallVec;

use crate::loc::Loc;
use crate::op::{Attr, BlockData, OpKind, Operation, RegionData, Visibility};
use crate::types::Type;

/// Handle to an operation in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpId(pub(crate) u32);

/// Handle to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(pub(crate) u32);

/// Handle to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub(crate) u32);

/// Handle to an SSA value: a block argument or an operation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(pub(crate) u32);

/// Where a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDef {
    BlockArg { block: BlockId, index: usize },
    OpResult { op: OpId, index: usize },
}

#[derive(Debug, Clone)]
pub(crate) struct ValueData {
    pub(crate) ty: Type,
    pub(crate) def: ValueDef,
    pub(crate) loc: Loc,
}

/// Owner of all IR being constructed, plus the insertion cursor.
#[derive(Debug)]
pub struct Context {
    pub(crate) ops: Vec<Operation>,
    pub(crate) regions: Vec<RegionData>,
    pub(crate) blocks: Vec<BlockData>,
    pub(crate) values: Vec<ValueData>,
    module: BlockId,
    insertion: Vec<BlockId>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context with an empty module body as the initial insertion
    /// point.
    pub fn new() -> Self {
        let mut ctx = Self {
            ops: Vec::new(),
            regions: Vec::new(),
            blocks: Vec::new(),
            values: Vec::new(),
            module: BlockId(0),
            insertion: Vec::new(),
        };
        let module = ctx.new_block();
        ctx.module = module;
        ctx.insertion.push(module);
        ctx
    }

    /// The module body block.
    pub fn module(&self) -> BlockId {
        self.module
    }

    // =========================================================================
    // Arena accessors
    // =========================================================================

    pub fn op(&self, id: OpId) -> &Operation {
        &self.ops[id.0 as usize]
    }

    pub fn region(&self, id: RegionId) -> &RegionData {
        &self.regions[id.0 as usize]
    }

    pub fn block(&self, id: BlockId) -> &BlockData {
        &self.blocks[id.0 as usize]
    }

    /// Arguments of a block.
    pub fn block_args(&self, id: BlockId) -> &[Value] {
        &self.blocks[id.0 as usize].args
    }

    /// Type of a value.
    pub fn value_type(&self, v: Value) -> &Type {
        &self.values[v.0 as usize].ty
    }

    /// Source location attached to a value.
    pub fn value_loc(&self, v: Value) -> Loc {
        self.values[v.0 as usize].loc
    }

    /// Definition site of a value.
    pub fn value_def(&self, v: Value) -> ValueDef {
        self.values[v.0 as usize].def
    }

    /// The operation producing a value, if it is an op result.
    pub fn defining_op(&self, v: Value) -> Option<OpId> {
        match self.value_def(v) {
            ValueDef::OpResult { op, .. } => Some(op),
            ValueDef::BlockArg { .. } => None,
        }
    }

    /// Fold a value to its integer constant, if it is one.
    pub fn const_value(&self, v: Value) -> Option<i64> {
        let op = self.defining_op(v)?;
        match &self.op(op).kind {
            OpKind::Constant { value, .. } => Some(*value),
            _ => None,
        }
    }

    // =========================================================================
    // Attributes and visibility
    // =========================================================================

    pub fn attr(&self, op: OpId, name: &str) -> Option<&Attr> {
        self.op(op).attrs.get(name)
    }

    pub fn set_attr(&mut self, op: OpId, name: impl Into<String>, attr: Attr) {
        self.ops[op.0 as usize].attrs.insert(name.into(), attr);
    }

    /// Set the visibility of a function operation. No-op for other kinds.
    pub fn set_visibility(&mut self, op: OpId, visibility: Visibility) {
        if let OpKind::Func { visibility: v, .. } = &mut self.ops[op.0 as usize].kind {
            *v = visibility;
        }
    }

    // =========================================================================
    // Insertion point
    // =========================================================================

    /// The block new operations are appended to.
    pub fn current_block(&self) -> BlockId {
        *self.insertion.last().expect("insertion stack never empty")
    }

    /// Depth of the insertion stack (module body counts as one).
    pub fn insertion_depth(&self) -> usize {
        self.insertion.len()
    }

    pub fn push_insertion(&mut self, block: BlockId) {
        self.insertion.push(block);
    }

    /// Pop the top insertion point. The module body entry is never popped.
    pub fn pop_insertion(&mut self) -> Option<BlockId> {
        if self.insertion.len() > 1 { self.insertion.pop() } else { None }
    }

    /// Enter a block for the lifetime of the returned guard; the previous
    /// insertion point is restored when the guard drops, unwinding included.
    pub fn scoped_insertion(&mut self, block: BlockId) -> InsertionGuard<'_> {
        self.insertion.push(block);
        InsertionGuard { ctx: self }
    }

    // =========================================================================
    // Construction primitives
    // =========================================================================

    fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BlockData::default());
        id
    }

    fn new_region(&mut self) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(RegionData::default());
        id
    }

    pub(crate) fn new_value(&mut self, ty: Type, def: ValueDef, loc: Loc) -> Value {
        let id = Value(self.values.len() as u32);
        self.values.push(ValueData { ty, def, loc });
        id
    }

    /// Append a block with typed, located arguments to a region.
    pub fn append_block(&mut self, region: RegionId, args: &[(Type, Loc)]) -> BlockId {
        let block = self.new_block();
        let arg_values: SmallVec<[Value; 4]> = args
            .iter()
            .enumerate()
            .map(|(index, (ty, loc))| {
                self.new_value(ty.clone(), ValueDef::BlockArg { block, index }, *loc)
            })
            .collect();
        self.blocks[block.0 as usize].args = arg_values;
        self.regions[region.0 as usize].blocks.push(block);
        block
    }

    /// Append an operation at the current insertion point, creating its
    /// result values and empty regions.
    pub(crate) fn push_op(
        &mut self,
        kind: OpKind,
        result_types: impl IntoIterator<Item = Type>,
        num_regions: usize,
        loc: Loc,
    ) -> OpId {
        let op = OpId(self.ops.len() as u32);
        let results: SmallVec<[Value; 2]> = result_types
            .into_iter()
            .enumerate()
            .map(|(index, ty)| self.new_value(ty, ValueDef::OpResult { op, index }, loc))
            .collect();
        let regions: SmallVec<[RegionId; 1]> = (0..num_regions).map(|_| self.new_region()).collect();
        self.ops.push(Operation { kind, results, regions, attrs: Default::default(), loc });
        let block = self.current_block();
        self.blocks[block.0 as usize].ops.push(op);
        op
    }
}

/// RAII scope for a nested insertion point.
///
/// Dereferences to [`Context`], so constructors can be called on the guard
/// directly inside the scope.
#[derive(Debug)]
pub struct InsertionGuard<'c> {
    ctx: &'c mut Context,
}

impl Drop for InsertionGuard<'_> {
    fn drop(&mut self) {
        self.ctx.pop_insertion();
    }
}

impl std::ops::Deref for InsertionGuard<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx
    }
}

impl std::ops::DerefMut for InsertionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx
    }
}

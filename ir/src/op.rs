//! Operation kinds, attributes, and static-or-dynamic scalars.
//!
//! Each operation encodes its operand structure directly in the [`OpKind`]
//! variant, so arity and operand roles are checked by construction rather
//! than by a verifier pass.

use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;

use crate::context::{BlockId, OpId, RegionId, Value};
use crate::loc::Loc;
use crate::types::Type;

/// A scalar that is either a compile-time constant or a runtime value.
///
/// Subview offsets, sizes and strides are sequences of these; the resolved
/// indexer in the builder layer is built from the same split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sym {
    Const(i64),
    Dyn(Value),
}

impl Sym {
    pub fn is_const(&self) -> bool {
        matches!(self, Sym::Const(_))
    }

    pub fn as_const(&self) -> Option<i64> {
        match self {
            Sym::Const(v) => Some(*v),
            Sym::Dyn(_) => None,
        }
    }

    pub fn as_dyn(&self) -> Option<Value> {
        match self {
            Sym::Const(_) => None,
            Sym::Dyn(v) => Some(*v),
        }
    }
}

impl From<i64> for Sym {
    fn from(v: i64) -> Self {
        Sym::Const(v)
    }
}

impl From<Value> for Sym {
    fn from(v: Value) -> Self {
        Sym::Dyn(v)
    }
}

/// Mixed static/dynamic scalar list, in dimension order.
pub type Mixed = SmallVec<[Sym; 4]>;

/// Attribute values attachable to operations by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Unit,
    Int(i64),
    Str(String),
    Type(Type),
}

/// Named attribute map with deterministic iteration order.
pub type AttrMap = BTreeMap<String, Attr>;

/// Symbol visibility of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Operation kind with typed operands.
///
/// The set is the minimal surface needed by the builder layer: integer
/// arithmetic for index expressions, memref allocation/access/view ops,
/// and function definition/return/call.
#[derive(Debug, Clone)]
pub enum OpKind {
    /// Integer-valued constant of the given type (covers index constants).
    Constant { value: i64, ty: Type },
    AddI(Value, Value),
    MulI(Value, Value),

    /// Heap allocation; one operand per dynamic extent, in dimension order.
    Alloc { dynamic_sizes: SmallVec<[Value; 4]> },
    /// Stack allocation; operands as for `Alloc`.
    Alloca { dynamic_sizes: SmallVec<[Value; 4]> },
    Load { source: Value, indices: SmallVec<[Value; 4]> },
    Store { value: Value, dest: Value, indices: SmallVec<[Value; 4]> },
    /// Strided window into an existing memref, no data copied.
    Subview { source: Value, offsets: Mixed, sizes: Mixed, strides: Mixed },
    Copy { source: Value, dest: Value },
    /// Rank expansion; one reassociation group per source dimension.
    ExpandShape { source: Value, reassociation: SmallVec<[SmallVec<[usize; 2]>; 4]> },
    /// Runtime extent of one dimension.
    Dim { source: Value, index: Value },

    /// Function definition or declaration; owns exactly one region.
    Func {
        name: String,
        visibility: Visibility,
        arg_attrs: Option<Vec<AttrMap>>,
        res_attrs: Option<Vec<AttrMap>>,
    },
    Return { values: SmallVec<[Value; 2]> },
    Call { callee: String, args: SmallVec<[Value; 4]> },
}

impl OpKind {
    /// Dialect-qualified operation name.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Constant { .. } => "arith.constant",
            OpKind::AddI(..) => "arith.addi",
            OpKind::MulI(..) => "arith.muli",
            OpKind::Alloc { .. } => "memref.alloc",
            OpKind::Alloca { .. } => "memref.alloca",
            OpKind::Load { .. } => "memref.load",
            OpKind::Store { .. } => "memref.store",
            OpKind::Subview { .. } => "memref.subview",
            OpKind::Copy { .. } => "memref.copy",
            OpKind::ExpandShape { .. } => "memref.expand_shape",
            OpKind::Dim { .. } => "memref.dim",
            OpKind::Func { .. } => "func.func",
            OpKind::Return { .. } => "func.return",
            OpKind::Call { .. } => "func.call",
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, OpKind::Return { .. })
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One operation in the arena.
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OpKind,
    pub results: SmallVec<[Value; 2]>,
    pub regions: SmallVec<[RegionId; 1]>,
    pub attrs: AttrMap,
    pub loc: Loc,
}

/// A region: ordered blocks owned by one operation.
#[derive(Debug, Clone, Default)]
pub struct RegionData {
    pub blocks: SmallVec<[BlockId; 1]>,
}

/// A block: typed arguments and ordered operations.
#[derive(Debug, Clone, Default)]
pub struct BlockData {
    pub args: SmallVec<[Value; 4]>,
    pub ops: Vec<OpId>,
}

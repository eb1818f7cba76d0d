//! Typed operation constructors.
//!
//! One method per operation, all appending at the current insertion point
//! and all `#[track_caller]` so the recorded location is the user call
//! site. Operand validation happens here; there is no separate verifier.

use smallvec::SmallVec;

use crate::context::{Context, OpId, Value};
use crate::error::*;
use crate::loc::Loc;
use crate::op::{Attr, AttrMap, Mixed, OpKind, Sym, Visibility};
use crate::types::{Dim, Shape, Type};
use snafu::{OptionExt, ensure};

impl Context {
    // =========================================================================
    // arith
    // =========================================================================

    /// Integer constant of the given type.
    #[track_caller]
    pub fn constant(&mut self, value: i64, ty: Type) -> Value {
        let loc = Loc::caller();
        let op = self.push_op(OpKind::Constant { value, ty: ty.clone() }, [ty], 0, loc);
        self.op(op).results[0]
    }

    /// Index-typed constant.
    #[track_caller]
    pub fn constant_index(&mut self, value: i64) -> Value {
        let loc = Loc::caller();
        let op = self.push_op(OpKind::Constant { value, ty: Type::Index }, [Type::Index], 0, loc);
        self.op(op).results[0]
    }

    #[track_caller]
    pub fn addi(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        let loc = Loc::caller();
        let ty = self.check_int_pair(lhs, rhs)?;
        let op = self.push_op(OpKind::AddI(lhs, rhs), [ty], 0, loc);
        Ok(self.op(op).results[0])
    }

    #[track_caller]
    pub fn muli(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        let loc = Loc::caller();
        let ty = self.check_int_pair(lhs, rhs)?;
        let op = self.push_op(OpKind::MulI(lhs, rhs), [ty], 0, loc);
        Ok(self.op(op).results[0])
    }

    fn check_int_pair(&self, lhs: Value, rhs: Value) -> Result<Type> {
        let lt = self.value_type(lhs).clone();
        let rt = self.value_type(rhs).clone();
        ensure!(
            matches!(lt, Type::Integer { .. } | Type::Index),
            NotAnIntegerSnafu { actual: lt.clone() }
        );
        ensure!(lt == rt, OperandTypeMismatchSnafu { lhs: lt, rhs: rt });
        Ok(lt)
    }

    // =========================================================================
    // memref
    // =========================================================================

    /// Heap-allocate a memref of the given type. `dynamic_sizes` supplies
    /// one index-typed operand per `Dim::Dynamic` extent, in order.
    #[track_caller]
    pub fn alloc(&mut self, ty: Type, dynamic_sizes: &[Value]) -> Result<Value> {
        let loc = Loc::caller();
        self.check_alloc(&ty, dynamic_sizes)?;
        let kind = OpKind::Alloc { dynamic_sizes: SmallVec::from_slice(dynamic_sizes) };
        let op = self.push_op(kind, [ty], 0, loc);
        Ok(self.op(op).results[0])
    }

    /// Stack-allocate a memref; operands as for [`Context::alloc`].
    #[track_caller]
    pub fn alloca(&mut self, ty: Type, dynamic_sizes: &[Value]) -> Result<Value> {
        let loc = Loc::caller();
        self.check_alloc(&ty, dynamic_sizes)?;
        let kind = OpKind::Alloca { dynamic_sizes: SmallVec::from_slice(dynamic_sizes) };
        let op = self.push_op(kind, [ty], 0, loc);
        Ok(self.op(op).results[0])
    }

    fn check_alloc(&self, ty: &Type, dynamic_sizes: &[Value]) -> Result<()> {
        let shape = ty.shape().with_context(|| UnrankedMemRefSnafu { actual: ty.clone() })?;
        let dynamic = shape.iter().filter(|d| !d.is_fixed()).count();
        ensure!(
            dynamic == dynamic_sizes.len(),
            DynamicSizeAritySnafu { expected: dynamic, got: dynamic_sizes.len() }
        );
        for &size in dynamic_sizes {
            let ty = self.value_type(size);
            ensure!(ty.is_index(), IndexTypeMismatchSnafu { actual: ty.clone() });
        }
        Ok(())
    }

    /// Load one element. Indices must be index-typed and match the rank.
    #[track_caller]
    pub fn load(&mut self, source: Value, indices: &[Value]) -> Result<Value> {
        let loc = Loc::caller();
        let (shape, element) = self.ranked_memref(source)?;
        ensure!(
            shape.len() == indices.len(),
            RankMismatchSnafu { rank: shape.len(), got: indices.len() }
        );
        self.check_indices(indices)?;
        let kind = OpKind::Load { source, indices: SmallVec::from_slice(indices) };
        let op = self.push_op(kind, [element], 0, loc);
        Ok(self.op(op).results[0])
    }

    /// Store one element. The value type must equal the element type.
    #[track_caller]
    pub fn store(&mut self, value: Value, dest: Value, indices: &[Value]) -> Result<OpId> {
        let loc = Loc::caller();
        let (shape, element) = self.ranked_memref(dest)?;
        ensure!(
            shape.len() == indices.len(),
            RankMismatchSnafu { rank: shape.len(), got: indices.len() }
        );
        self.check_indices(indices)?;
        let actual = self.value_type(value).clone();
        ensure!(actual == element, ElementTypeMismatchSnafu { expected: element, actual });
        let kind = OpKind::Store { value, dest, indices: SmallVec::from_slice(indices) };
        Ok(self.push_op(kind, [], 0, loc))
    }

    /// Strided sub-view. The result shape is derived from `sizes`: constant
    /// sizes become fixed extents, dynamic sizes become unknown extents.
    #[track_caller]
    pub fn subview(
        &mut self,
        source: Value,
        offsets: Mixed,
        sizes: Mixed,
        strides: Mixed,
    ) -> Result<Value> {
        let loc = Loc::caller();
        let (shape, element) = self.ranked_memref(source)?;
        let rank = shape.len();
        for list in [&offsets, &sizes, &strides] {
            ensure!(list.len() == rank, DescriptorAritySnafu { rank, got: list.len() });
        }
        for sym in offsets.iter().chain(&sizes).chain(&strides) {
            if let Sym::Dyn(v) = sym {
                let ty = self.value_type(*v);
                ensure!(ty.is_index(), IndexTypeMismatchSnafu { actual: ty.clone() });
            }
        }
        let result_shape: Shape = sizes
            .iter()
            .map(|s| match s.as_const() {
                Some(v) => Dim::Fixed(v as u64),
                None => Dim::Dynamic,
            })
            .collect();
        let result_ty = Type::memref(result_shape, element);
        let kind = OpKind::Subview { source, offsets, sizes, strides };
        let op = self.push_op(kind, [result_ty], 0, loc);
        Ok(self.op(op).results[0])
    }

    /// Copy the contents of one memref into another of identical shape.
    #[track_caller]
    pub fn copy(&mut self, source: Value, dest: Value) -> Result<OpId> {
        let loc = Loc::caller();
        let (src_shape, src_element) = self.ranked_memref(source)?;
        let (dst_shape, dst_element) = self.ranked_memref(dest)?;
        ensure!(
            src_element == dst_element,
            ElementTypeMismatchSnafu { expected: dst_element, actual: src_element }
        );
        ensure!(
            src_shape.len() == dst_shape.len(),
            RankMismatchSnafu { rank: dst_shape.len(), got: src_shape.len() }
        );
        Ok(self.push_op(OpKind::Copy { source, dest }, [], 0, loc))
    }

    /// Expand the rank of a memref. `reassociation` holds one group of
    /// result dimensions per source dimension; `result_shape` is the
    /// expanded shape.
    #[track_caller]
    pub fn expand_shape(
        &mut self,
        source: Value,
        reassociation: SmallVec<[SmallVec<[usize; 2]>; 4]>,
        result_shape: Shape,
    ) -> Result<Value> {
        let loc = Loc::caller();
        let (shape, element) = self.ranked_memref(source)?;
        let covered: usize = reassociation.iter().map(|g| g.len()).sum();
        // a rank-0 source takes an empty reassociation and expands to unit
        // dims only
        let valid = if shape.is_empty() {
            reassociation.is_empty() && result_shape.iter().all(|d| d.as_fixed() == Some(1))
        } else {
            reassociation.len() == shape.len() && covered == result_shape.len()
        };
        ensure!(
            valid,
            InvalidReassociationSnafu {
                groups: reassociation.len(),
                rank: shape.len(),
                covered,
                result_rank: result_shape.len(),
            }
        );
        let result_ty = Type::memref(result_shape, element);
        let op = self.push_op(OpKind::ExpandShape { source, reassociation }, [result_ty], 0, loc);
        Ok(self.op(op).results[0])
    }

    /// Runtime extent of dimension `index` of a memref.
    #[track_caller]
    pub fn dim(&mut self, source: Value, index: Value) -> Result<Value> {
        let loc = Loc::caller();
        let ty = self.value_type(source).clone();
        ensure!(ty.is_memref(), NotAMemRefSnafu { actual: ty });
        let index_ty = self.value_type(index);
        ensure!(index_ty.is_index(), IndexTypeMismatchSnafu { actual: index_ty.clone() });
        let op = self.push_op(OpKind::Dim { source, index }, [Type::Index], 0, loc);
        Ok(self.op(op).results[0])
    }

    fn ranked_memref(&self, v: Value) -> Result<(Shape, Type)> {
        let ty = self.value_type(v);
        ensure!(ty.is_memref(), NotAMemRefSnafu { actual: ty.clone() });
        let shape = ty.shape().with_context(|| UnrankedMemRefSnafu { actual: ty.clone() })?;
        let element = ty.element_type().expect("memref has an element type");
        Ok((shape.clone(), element.clone()))
    }

    fn check_indices(&self, indices: &[Value]) -> Result<()> {
        for &idx in indices {
            let ty = self.value_type(idx);
            ensure!(ty.is_index(), IndexTypeMismatchSnafu { actual: ty.clone() });
        }
        Ok(())
    }

    // =========================================================================
    // func
    // =========================================================================

    /// Create a function operation with one empty region at the current
    /// insertion point. `ty` must be a function type; it is stored as the
    /// `function_type` attribute.
    #[track_caller]
    pub fn func_op(
        &mut self,
        name: impl Into<String>,
        ty: Type,
        visibility: Visibility,
        arg_attrs: Option<Vec<AttrMap>>,
        res_attrs: Option<Vec<AttrMap>>,
        attrs: AttrMap,
    ) -> Result<OpId> {
        let loc = Loc::caller();
        ensure!(matches!(ty, Type::Function { .. }), NotAFunctionTypeSnafu { actual: ty });
        let kind = OpKind::Func { name: name.into(), visibility, arg_attrs, res_attrs };
        let op = self.push_op(kind, [], 1, loc);
        self.ops[op.0 as usize].attrs = attrs;
        self.set_attr(op, "function_type", Attr::Type(ty));
        Ok(op)
    }

    /// Symbol name of a function operation.
    pub fn func_symbol(&self, op: OpId) -> Option<&str> {
        match &self.op(op).kind {
            OpKind::Func { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Declared function type of a function operation.
    pub fn func_type(&self, op: OpId) -> Option<&Type> {
        match self.attr(op, "function_type") {
            Some(Attr::Type(ty @ Type::Function { .. })) => Some(ty),
            _ => None,
        }
    }

    /// Append a `func.return` carrying `values` to the current block.
    #[track_caller]
    pub fn return_op(&mut self, values: &[Value]) -> Result<OpId> {
        let loc = Loc::caller();
        let block = self.current_block();
        let terminated = self
            .block(block)
            .ops
            .last()
            .is_some_and(|&last| self.op(last).kind.is_terminator());
        ensure!(!terminated, BlockTerminatedSnafu);
        let kind = OpKind::Return { values: SmallVec::from_slice(values) };
        Ok(self.push_op(kind, [], 0, loc))
    }

    /// Build a call to `callee` with the given declared result types.
    /// Returns the call's result values.
    #[track_caller]
    pub fn call_op(
        &mut self,
        callee: impl Into<String>,
        result_types: Vec<Type>,
        args: &[Value],
    ) -> SmallVec<[Value; 2]> {
        let loc = Loc::caller();
        let kind = OpKind::Call { callee: callee.into(), args: SmallVec::from_slice(args) };
        let op = self.push_op(kind, result_types, 0, loc);
        self.op(op).results.clone()
    }
}

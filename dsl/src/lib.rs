//! Function-definition and memref-indexing layer over the `oriel-ir` core.
//!
//! Three pieces:
//! - [`build_region`] / [`FuncDef`]: declarative construction of function
//!   bodies, with memoized materialization, call-site-typed deferred
//!   emission, and type-environment specialization of generic definitions.
//! - [`resolve`] / [`Idx`]: strided index resolution turning NumPy-style
//!   index expressions into coordinates or (offset, size, stride) views.
//! - [`MemRef`]: bracket-style reads and writes built on the resolver.

pub mod env;
pub mod error;
pub mod func;
pub mod indexing;
pub mod memref;
pub mod region;


pub use env::{Binding, TypeEnv, TypeExpr};
pub use error::{Error, Result};
pub use func::{CallValues, FuncDef, GenericParam, Param, call, call_by_name};
pub use indexing::{Idx, Indexer, Resolution, Triple, resolve};
pub use memref::{MemRef, alloc, alloca, dim, expand_shape};
pub use region::{BodyFn, FuncBody, build_region};

pub use oriel_ir::{Context, Dim, Loc, Shape, Sym, Type, Value, Visibility};

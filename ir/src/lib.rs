//! Minimal region-based IR substrate.
//!
//! This crate is the structural layer underneath the builder sugar in
//! `oriel-dsl`: a small arena-backed IR of operations, regions, blocks and
//! values, a type system with possibly-unknown shape extents, and an
//! insertion cursor with scoped push/pop semantics.
//!
//! # Module Organization
//!
//! - [`types`] - Type system: scalar types, shaped memref types, shapes
//! - [`op`] - Operation kinds, attributes, static-or-dynamic scalars
//! - [`context`] - Arena context, insertion stack, value queries
//! - [`ops`] - Typed operation constructors on [`Context`]
//! - [`loc`] - Caller-derived source locations
//! - [`error`] - Error types and result handling
//!
//! There is deliberately no verifier, no pass machinery and no printer
//! beyond `Debug`/`Display`: construction-time checks in [`ops`] are the
//! only validation this layer performs.

pub mod context;
pub mod error;
pub mod loc;
pub mod op;
pub mod ops;
pub mod types;


pub use context::{BlockId, Context, InsertionGuard, OpId, RegionId, Value};
pub use error::{Error, Result};
pub use loc::Loc;
pub use op::{Attr, AttrMap, Mixed, OpKind, Operation, Sym, Visibility};
pub use types::{Dim, FloatKind, Shape, Signedness, Type};

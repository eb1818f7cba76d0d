use snafu::Snafu;

use oriel_ir::{Shape, Type};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // =========================================================================
    // Configuration errors (definition time)
    // =========================================================================
    /// A definition may declare result types through its signature or
    /// through the explicit override, never both.
    #[snafu(display("function {name} declares both signature results and explicit return types"))]
    ReturnTypesConflict { name: String },

    /// A declaration has no body to infer types from.
    #[snafu(display("function declaration {name} requires every parameter to be typed"))]
    DeclarationNeedsTypes { name: String },

    /// Emitting without call-site types requires every parameter typed.
    #[snafu(display("parameter {param} of function {name} has no declared type"))]
    UnannotatedParam { name: String, param: String },

    /// Specialization requires declared generic parameters.
    #[snafu(display("function {name} is not generic and cannot be specialized"))]
    NotGeneric { name: String },

    /// Binding vector length must match the generic parameter list.
    #[snafu(display("function {name} declares {expected} generic parameters, got {got} bindings"))]
    GenericArity { name: String, expected: usize, got: usize },

    /// A generic descriptor must be specialized before emission.
    #[snafu(display("generic parameter {name} must be reified before emission"))]
    UnreifiedGeneric { name: String },

    /// A type variable resolved to a non-type binding.
    #[snafu(display("binding {name} is not a type"))]
    NonTypeBinding { name: String },

    /// A type variable has no binding in the environment.
    #[snafu(display("unbound type variable {name}"))]
    UnboundTypeVar { name: String },

    // =========================================================================
    // Indexing errors (indexing time)
    // =========================================================================
    /// More dimension-consuming entries than the buffer has dimensions.
    #[snafu(display("too many indices for rank-{rank} memref: {got} consuming entries"))]
    TooManyIndices { rank: usize, got: usize },

    /// At most one ellipsis per index expression.
    #[snafu(display("an index expression accepts at most one ellipsis"))]
    MultipleEllipsis,

    /// Only ranked memrefs support slicing/indexing.
    #[snafu(display("only ranked memref slicing/indexing is supported"))]
    UnrankedIndexing,

    /// Dynamic slice bounds outside the recognized tile pattern.
    #[snafu(display("unsupported slice: {detail}"))]
    UnsupportedSlice { detail: String },

    /// Write source shape must equal the destination sub-view shape.
    #[snafu(display("shape mismatch: destination sub-view {dest:?} vs source {src:?}"))]
    ShapeMismatch { dest: Shape, src: Shape },

    /// Unit-axis insertion positions must be distinct result coordinates.
    #[snafu(display("invalid unit-axis positions {positions:?} for result rank {rank}"))]
    InvalidAxisPositions { positions: Vec<usize>, rank: usize },

    /// The indexed value is not a memref.
    #[snafu(display("expected a memref value, got {actual}"))]
    NotAMemRef { actual: Type },

    /// Coordinate writes take a scalar element.
    #[snafu(display("coordinate insert requires a scalar element, got {actual}"))]
    ScalarSourceExpected { actual: Type },

    // =========================================================================
    // Call-construction errors
    // =========================================================================
    /// The callee operation is not a function.
    #[snafu(display("callee is not a function operation"))]
    InvalidCallee,

    // =========================================================================
    // Substrate errors
    // =========================================================================
    /// Error surfaced by the IR substrate.
    #[snafu(context(false), display("{source}"))]
    Ir { source: oriel_ir::Error },
}

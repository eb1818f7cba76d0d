use snafu::Snafu;

use crate::types::Type;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Indexing operands must have Index type.
    #[snafu(display("index operand must have index type, got {actual}"))]
    IndexTypeMismatch { actual: Type },

    /// A memref-typed value was required.
    #[snafu(display("expected a memref value, got {actual}"))]
    NotAMemRef { actual: Type },

    /// A ranked memref was required.
    #[snafu(display("expected a ranked memref, got {actual}"))]
    UnrankedMemRef { actual: Type },

    /// Operand count does not match the memref rank.
    #[snafu(display("expected {rank} indices for rank-{rank} memref, got {got}"))]
    RankMismatch { rank: usize, got: usize },

    /// Binary integer ops require identical operand types.
    #[snafu(display("operand type mismatch: {lhs} vs {rhs}"))]
    OperandTypeMismatch { lhs: Type, rhs: Type },

    /// Integer arithmetic requires integer or index operands.
    #[snafu(display("expected an integer or index operand, got {actual}"))]
    NotAnInteger { actual: Type },

    /// Stored value must match the memref element type.
    #[snafu(display("element type mismatch: memref holds {expected}, value is {actual}"))]
    ElementTypeMismatch { expected: Type, actual: Type },

    /// Number of dynamic size operands must match the dynamic extents.
    #[snafu(display("expected {expected} dynamic size operands, got {got}"))]
    DynamicSizeArity { expected: usize, got: usize },

    /// Subview descriptor lists must all have rank length.
    #[snafu(display("expected {rank} offsets/sizes/strides for rank-{rank} memref, got {got}"))]
    DescriptorArity { rank: usize, got: usize },

    /// A function type was required.
    #[snafu(display("expected a function type, got {actual}"))]
    NotAFunctionType { actual: Type },

    /// Reassociation groups must partition the result dimensions.
    #[snafu(display(
        "invalid reassociation: {groups} groups over rank-{rank} source covering {covered} of {result_rank} result dims"
    ))]
    InvalidReassociation { groups: usize, rank: usize, covered: usize, result_rank: usize },

    /// A block can hold at most one terminator, at the end.
    #[snafu(display("block already has a terminator"))]
    BlockTerminated,
}

//! Property-based tests for the index resolver.

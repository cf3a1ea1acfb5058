//! Error types for the tree's fallible surface.
//!
//! The engine's error taxonomy is deliberately small:
//!
//! - **Key not found** is a normal outcome, modeled as `Option::None` by
//!   [`Tree::get`](crate::Tree::get) and [`Tree::remove`](crate::Tree::remove)
//!   — never an error value.
//! - **Allocation failure** is fatal by design. Recovering mid-rebalance is
//!   rejected: a half-completed rotation would corrupt the black-height
//!   invariant, so exhaustion aborts through the global allocator instead of
//!   surfacing as a recoverable error.
//! - **Textual parsing** is the one operation with a recoverable failure
//!   mode, reported through [`ParseError`].

use thiserror::Error;

/// Failure modes of parsing the `[e1,e2,e3]` textual form.
///
/// Produced by the [`FromStr`](std::str::FromStr) implementation on
/// [`Tree`](crate::Tree).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
	/// The input does not start with `[`.
	#[error("expected '[' at the start of a tree literal")]
	MissingOpen,

	/// The input does not end with `]`.
	#[error("expected ']' at the end of a tree literal")]
	MissingClose,

	/// An element between the separators failed to parse.
	///
	/// `index` is the zero-based position of the offending element in the
	/// comma-separated sequence.
	#[error("element {index} of the tree literal failed to parse")]
	Element {
		/// Zero-based position of the element that failed.
		index: usize,
	},
}

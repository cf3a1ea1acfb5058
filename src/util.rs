//! Test utilities for building trees with an explicit shape.
//!
//! The public API never exposes node colors or placement, which is exactly
//! right for users and exactly wrong for tests that need to start from a
//! known configuration: a specific deletion-fixup case, a clone whose color
//! layout must be compared, or a structure deep enough to punish recursive
//! release. [`Blueprint`] describes a tree shape literally; [`build`] turns
//! it into a [`Tree`] as given (without validating the red-black rules), and
//! [`capture`] snapshots a live tree back into a blueprint.
//!
//! # Example
//!
//! ```
//! use rowantree::util::{build, Blueprint};
//! use rowantree::Color;
//!
//! // A minimal valid tree:      2 (B)
//! //                           /     \
//! //                        1 (R)   3 (R)
//! let tree = build(Blueprint::node(
//!     Color::Black,
//!     2,
//!     Blueprint::leaf(Color::Red, 1),
//!     Blueprint::leaf(Color::Red, 3),
//! ));
//! tree.assert_invariants();
//! assert_eq!(tree.len(), 3);
//! ```

use crate::{child, node_color, set_child, value_of, Color, Link, Node, Side, Tree};

use std::marker::PhantomData;

/// A literal description of a tree shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blueprint<T> {
	/// An absent child position.
	Absent,
	/// A node with a color, a payload, and two subtrees.
	Node {
		/// The node's color.
		color: Color,
		/// The node's payload.
		value: T,
		/// The left subtree.
		left: Box<Blueprint<T>>,
		/// The right subtree.
		right: Box<Blueprint<T>>,
	},
}

impl<T> Blueprint<T> {
	/// A childless node.
	pub fn leaf(color: Color, value: T) -> Blueprint<T> {
		Blueprint::node(color, value, Blueprint::Absent, Blueprint::Absent)
	}

	/// An interior node.
	pub fn node(color: Color, value: T, left: Blueprint<T>, right: Blueprint<T>) -> Blueprint<T> {
		Blueprint::Node {
			color,
			value,
			left: Box::new(left),
			right: Box::new(right),
		}
	}
}

/// Materializes a blueprint into a tree, exactly as described.
///
/// No validation is performed: the result may violate every red-black rule,
/// which is the point — release paths and the invariant checker must be
/// exercisable against arbitrary shapes. Only `len`, `clear`, drop, and
/// iteration are meaningful on an invalid tree.
pub fn build<T>(blueprint: Blueprint<T>) -> Tree<T> {
	let mut len = 0;
	let root = build_link(blueprint, &mut len);
	Tree {
		root,
		len,
		_owns: PhantomData,
	}
}

fn build_link<T>(blueprint: Blueprint<T>, len: &mut usize) -> Link<T> {
	match blueprint {
		Blueprint::Absent => None,
		Blueprint::Node {
			color,
			value,
			left,
			right,
		} => {
			let node = Node::allocate(value, color);
			*len += 1;
			// SAFETY: the fresh node is reachable only from here.
			unsafe {
				set_child(node, Side::Left, build_link(*left, len));
				set_child(node, Side::Right, build_link(*right, len));
			}
			Some(node)
		}
	}
}

/// Snapshots a tree's exact shape, colors included.
///
/// Clones of a tree must capture to the same blueprint as their source; the
/// deep-copy tests rely on this.
pub fn capture<T: Clone>(tree: &Tree<T>) -> Blueprint<T> {
	// SAFETY: read-only walk over nodes alive for the borrow.
	unsafe { capture_link(tree.root) }
}

unsafe fn capture_link<T: Clone>(link: Link<T>) -> Blueprint<T> {
	match link {
		None => Blueprint::Absent,
		Some(node) => Blueprint::Node {
			color: node_color(node),
			value: value_of::<T>(node).clone(),
			left: Box::new(capture_link(child(node, Side::Left))),
			right: Box::new(capture_link(child(node, Side::Right))),
		},
	}
}

/// Builds a degenerate all-left chain directly and iteratively — no
/// recursion at any depth, so arbitrarily deep structures are constructible.
///
/// The result violates the balance invariants on purpose: it exists to
/// prove that release paths tolerate adversarially deep trees. Only `len`,
/// `clear`, and drop are meaningful on it.
pub fn deep_chain<T, I>(values: I) -> Tree<T>
where
	I: IntoIterator<Item = T>,
{
	let mut root: Link<T> = None;
	let mut len = 0;
	for value in values {
		let node = Node::allocate(value, Color::Black);
		// SAFETY: the fresh node takes ownership of the chain built so far.
		unsafe {
			set_child(node, Side::Left, root);
		}
		root = Some(node);
		len += 1;
	}
	Tree {
		root,
		len,
		_owns: PhantomData,
	}
}

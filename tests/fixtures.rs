//! # Fixture-Based Tests
//!
//! These tests start from explicitly described tree shapes — built with
//! `rowantree::util::Blueprint` rather than through the public insertion
//! path — so each deletion-fixup configuration is exercised deliberately
//! instead of hoping a random workload stumbles into it. The same machinery
//! drives the color-layout checks for deep copies, the invariant checker's
//! own failure modes, and the adversarially deep release test.

use rowantree::util::{build, capture, deep_chain, Blueprint};
use rowantree::{Color, Tree};

// ===========================================================================
// Known-Shape Construction
// ===========================================================================

/// A full two-level red-black tree:
///
/// ```text
///          4(B)
///        /      \
///     2(B)      6(B)
///     /  \      /  \
///   1(R) 3(R) 5(R) 7(R)
/// ```
fn full_two_level() -> Tree<i32> {
	build(Blueprint::node(
		Color::Black,
		4,
		Blueprint::node(
			Color::Black,
			2,
			Blueprint::leaf(Color::Red, 1),
			Blueprint::leaf(Color::Red, 3),
		),
		Blueprint::node(
			Color::Black,
			6,
			Blueprint::leaf(Color::Red, 5),
			Blueprint::leaf(Color::Red, 7),
		),
	))
}

#[test]
fn blueprint_builds_a_valid_tree() {
	let tree = full_two_level();
	tree.assert_invariants();
	assert_eq!(tree.len(), 7);
	assert_eq!(tree.iter().copied().collect::<Vec<_>>(), (1..=7).collect::<Vec<_>>());
	assert_eq!(tree.height(), 3);
}

#[test]
fn capture_roundtrips_build() {
	let blueprint = Blueprint::node(
		Color::Black,
		2,
		Blueprint::leaf(Color::Red, 1),
		Blueprint::leaf(Color::Red, 3),
	);
	let tree = build(blueprint.clone());
	assert_eq!(capture(&tree), blueprint);
}

// ===========================================================================
// Deletion Fixup Cases
// ===========================================================================

/// Red sibling: removing 1 leaves a deficit whose sibling (4) is red, which
/// forces the sibling-lift transformation before the local cases apply.
///
/// ```text
///        2(B)
///       /    \
///    1(B)    4(R)
///            /  \
///         3(B)  5(B)
/// ```
#[test]
fn fixup_red_sibling() {
	let mut tree = build(Blueprint::node(
		Color::Black,
		2,
		Blueprint::leaf(Color::Black, 1),
		Blueprint::node(
			Color::Red,
			4,
			Blueprint::leaf(Color::Black, 3),
			Blueprint::leaf(Color::Black, 5),
		),
	));
	tree.assert_invariants();

	assert_eq!(tree.remove(&1), Some(1));
	tree.assert_invariants();
	assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
}

/// Black sibling with black children: the deficit is absorbed by recoloring
/// and, with an all-black surrounding, propagates to the root.
///
/// ```text
///        2(B)
///       /    \
///    1(B)    3(B)
/// ```
#[test]
fn fixup_recolor_propagates_to_root() {
	let mut tree = build(Blueprint::node(
		Color::Black,
		2,
		Blueprint::leaf(Color::Black, 1),
		Blueprint::leaf(Color::Black, 3),
	));
	tree.assert_invariants();

	assert_eq!(tree.remove(&1), Some(1));
	tree.assert_invariants();
	assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
}

/// Black sibling with a far-side red child: a single rotation settles the
/// deficit.
///
/// ```text
///        2(B)
///       /    \
///    1(B)    3(B)
///               \
///               4(R)
/// ```
#[test]
fn fixup_far_red_child() {
	let mut tree = build(Blueprint::node(
		Color::Black,
		2,
		Blueprint::leaf(Color::Black, 1),
		Blueprint::node(
			Color::Black,
			3,
			Blueprint::Absent,
			Blueprint::leaf(Color::Red, 4),
		),
	));
	tree.assert_invariants();

	assert_eq!(tree.remove(&1), Some(1));
	tree.assert_invariants();
	assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
}

/// Black sibling with a near-side red child: two rotations settle the
/// deficit.
///
/// ```text
///        2(B)
///       /    \
///    1(B)    4(B)
///            /
///         3(R)
/// ```
#[test]
fn fixup_near_red_child() {
	let mut tree = build(Blueprint::node(
		Color::Black,
		2,
		Blueprint::leaf(Color::Black, 1),
		Blueprint::node(
			Color::Black,
			4,
			Blueprint::leaf(Color::Red, 3),
			Blueprint::Absent,
		),
	));
	tree.assert_invariants();

	assert_eq!(tree.remove(&1), Some(1));
	tree.assert_invariants();
	assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
}

/// Mirror-image cases: the deficit sits on the right.
#[test]
fn fixup_mirrored_cases() {
	// Red sibling on the left.
	let mut tree = build(Blueprint::node(
		Color::Black,
		4,
		Blueprint::node(
			Color::Red,
			2,
			Blueprint::leaf(Color::Black, 1),
			Blueprint::leaf(Color::Black, 3),
		),
		Blueprint::leaf(Color::Black, 5),
	));
	tree.assert_invariants();
	assert_eq!(tree.remove(&5), Some(5));
	tree.assert_invariants();
	assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);

	// Near-side red child, mirrored.
	let mut tree = build(Blueprint::node(
		Color::Black,
		3,
		Blueprint::node(
			Color::Black,
			1,
			Blueprint::Absent,
			Blueprint::leaf(Color::Red, 2),
		),
		Blueprint::leaf(Color::Black, 4),
	));
	tree.assert_invariants();
	assert_eq!(tree.remove(&4), Some(4));
	tree.assert_invariants();
	assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
}

/// Removing a node with two children transplants its in-order successor
/// while the structural slot keeps its color.
#[test]
fn two_child_removal_preserves_slot_color() {
	let mut tree = full_two_level();
	assert_eq!(tree.remove(&4), Some(4)); // the root: successor is 5
	tree.assert_invariants();
	assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 5, 6, 7]);

	assert_eq!(tree.remove(&2), Some(2)); // interior two-child node
	tree.assert_invariants();
	assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5, 6, 7]);
}

// ===========================================================================
// Color Layout of Deep Copies
// ===========================================================================

/// A clone must reproduce the exact shape and colors, not merely the
/// sequence.
#[test]
fn clone_preserves_color_layout() {
	let tree = full_two_level();
	let copy = tree.clone();
	assert_eq!(capture(&tree), capture(&copy));

	// Also for an organically grown tree.
	let grown: Tree<i32> = (0..333).collect();
	let copy = grown.clone();
	assert_eq!(capture(&grown), capture(&copy));
}

// ===========================================================================
// Invariant Checker Failure Modes
// ===========================================================================

#[test]
#[should_panic(expected = "root must be black")]
fn checker_rejects_red_root() {
	let tree = build(Blueprint::leaf(Color::Red, 1));
	tree.assert_invariants();
}

#[test]
#[should_panic(expected = "red node")]
fn checker_rejects_red_red_edge() {
	let tree = build(Blueprint::node(
		Color::Black,
		3,
		Blueprint::node(
			Color::Red,
			2,
			Blueprint::leaf(Color::Red, 1),
			Blueprint::Absent,
		),
		Blueprint::Absent,
	));
	tree.assert_invariants();
}

#[test]
#[should_panic(expected = "black-height")]
fn checker_rejects_uneven_black_height() {
	let tree = build(Blueprint::node(
		Color::Black,
		2,
		Blueprint::leaf(Color::Black, 1),
		Blueprint::Absent,
	));
	tree.assert_invariants();
}

#[test]
#[should_panic(expected = "in-order")]
fn checker_rejects_misordered_payloads() {
	let tree = build(Blueprint::node(
		Color::Black,
		1,
		Blueprint::leaf(Color::Red, 5),
		Blueprint::Absent,
	));
	tree.assert_invariants();
}

// ===========================================================================
// Adversarially Deep Structures
// ===========================================================================

/// A million-node degenerate chain — far beyond any valid tree's depth —
/// must be releasable without exhausting the call stack, because the
/// release path uses an explicit stack instead of recursion.
#[test]
fn deep_chain_drops_without_stack_overflow() {
	let tree = deep_chain(0..1_000_000u64);
	assert_eq!(tree.len(), 1_000_000);
	drop(tree);
}

/// Same structure through `clear`, and the handle stays usable.
#[test]
fn deep_chain_clears_without_stack_overflow() {
	let mut tree = deep_chain(0..500_000u64);
	tree.clear();
	assert!(tree.is_empty());
	tree.insert(7);
	assert_eq!(tree.len(), 1);
	tree.assert_invariants();
}

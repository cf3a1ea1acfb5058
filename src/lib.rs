//! # Rowantree: An Ordered-Collection Engine
//!
//! This crate provides a generic, embeddable ordered collection built on a
//! red-black binary search tree. Insertion, lookup, ordered iteration, and
//! deletion all run in guaranteed logarithmic time, and nodes store **no
//! parent pointers**: every operation that needs to walk upward reconstructs
//! the ancestor route with an explicit, bounded path cursor instead.
//!
//! ## Design Overview
//!
//! The implementation rests on three pieces:
//!
//! **Nodes**: each node exclusively owns up to two children, carries a
//! one-bit color, and holds one payload value. An absent child is the
//! uniform empty case and counts as black.
//!
//! **Path cursor**: a stack of `(node, branch-taken)` pairs recording the
//! route from the root to a position. Its capacity is bounded by the maximum
//! depth of a valid tree, which is at most `2 × log2(usize::MAX)` — the
//! black-height bound doubled for the alternating-red worst case. The same
//! representation backs insertion, deletion, and the public cursors in
//! [`iter`].
//!
//! **Rebalancing**: insertion runs a two-level recolor loop (amortized O(1)
//! across any insertion sequence) followed by at most one rotation; deletion
//! splices the in-order successor and resolves the resulting double-black
//! deficiency by walking the recorded path upward, performing at most O(1)
//! rotations.
//!
//! ```text
//!                 ┌─────────────┐
//!                 │  Tree root  │  <- owning link + cached length
//!                 └──────┬──────┘
//!                        │
//!                        ▼
//!                 ┌─────────────┐
//!                 │  Node (B)   │  <- color bit + payload
//!                 │ left  right │
//!                 └──┬───────┬──┘
//!            ┌───────┘       └───────┐
//!            ▼                       ▼
//!      ┌───────────┐           ┌───────────┐
//!      │ Node (R)  │           │ Node (R)  │
//!      └───────────┘           └───────────┘
//! ```
//!
//! ## Structural Invariants
//!
//! Whenever no operation is in progress:
//!
//! 1. The root, if present, is black.
//! 2. No red node has a red child.
//! 3. Every path from the root to an absent-child position passes through
//!    the same number of black nodes.
//! 4. In-order traversal yields strictly increasing values.
//! 5. The cached length equals the number of reachable nodes.
//!
//! [`Tree::assert_invariants`] validates all five and is used pervasively by
//! the test suites.
//!
//! ## Basic Usage
//!
//! ```
//! use rowantree::Tree;
//!
//! let mut tree = Tree::new();
//! tree.insert(10);
//! tree.insert(5);
//! tree.insert(15);
//!
//! assert_eq!(tree.get(&5), Some(&5));
//! assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![5, 10, 15]);
//!
//! assert_eq!(tree.remove(&5), Some(5));
//! assert_eq!(tree.get(&5), None);
//! assert_eq!(tree.len(), 2);
//! ```
//!
//! ## Ordering, Capabilities, and Optional Operations
//!
//! The ordering relation is the element's [`Ord`] implementation; lookups
//! accept any borrowed form of the element through [`Borrow`]. Comparator
//! equality always means "update in place" — the tree never holds two
//! elements that compare equal, and [`Tree::insert`] returns the payload it
//! displaced.
//!
//! Optional capabilities of the element type enable additional tree-level
//! operations, and those operations are simply absent otherwise:
//!
//! - `T: PartialEq` — tree equality by in-order sequence (never by shape).
//! - `T: Hash` — order-dependent hashing, consistent with equality.
//! - `T: Display` / `T: FromStr` — the `[e1,e2,e3]` textual form.
//! - `T: Serialize` / `T: Deserialize` — sequence-shaped serialization
//!   behind the `serde` feature flag.
//!
//! ## Thread Safety
//!
//! The tree performs no internal synchronization. `Tree<T>` is `Send` when
//! `T: Send` and `Sync` when `T: Sync`: concurrent shared reads are safe,
//! and mutation requires `&mut`, which encodes external exclusivity.
//!
//! ## Allocation
//!
//! One node is allocated per inserted element and released exactly once when
//! the element is erased or the tree is cleared or dropped. Allocation
//! failure aborts through the global allocator's error path; the tree is
//! never observable in a partially rebalanced state.

use smallvec::SmallVec;

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::str::FromStr;

pub mod alloc;
pub mod error;
pub mod iter;
#[cfg(feature = "serde")]
mod serde;
pub mod util;

pub use crate::error::ParseError;
pub use crate::iter::{IntoIter, Iter, RawCursor, RawCursorMut};

// ---------------------------------------------------------------------------
// Configuration Constants
// ---------------------------------------------------------------------------

/// Maximum depth of a valid tree.
///
/// A tree holding at most `usize::MAX` elements has black-height at most
/// `log2(usize::MAX)`, and red nodes can at worst double the length of a
/// root-to-leaf path. Path cursors and auxiliary stacks reserve this much
/// inline capacity so that operations on valid trees never allocate; only an
/// adversarially constructed structure can spill to the heap.
pub(crate) const MAX_DEPTH: usize = 2 * usize::BITS as usize;

// ---------------------------------------------------------------------------
// Node Primitives
// ---------------------------------------------------------------------------

/// Color of a node.
///
/// Absent children are uniformly treated as black.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
	/// A red node. Freshly inserted nodes start red.
	Red,
	/// A black node. The root is always black.
	Black,
}

/// One of the two child slots of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
	Left = 0,
	Right = 1,
}

impl Side {
	#[inline]
	pub(crate) fn opposite(self) -> Side {
		match self {
			Side::Left => Side::Right,
			Side::Right => Side::Left,
		}
	}
}

/// An owning link to a node, or the absent (black) sentinel.
pub(crate) type Link<T> = Option<NonNull<Node<T>>>;

/// A tree cell: two child slots, a color bit, one payload value.
pub(crate) struct Node<T> {
	pub(crate) children: [Link<T>; 2],
	pub(crate) color: Color,
	pub(crate) value: T,
}

impl<T> Node<T> {
	/// Heap-allocates a childless node.
	///
	/// The returned pointer owns the allocation; it must eventually be
	/// released with `Box::from_raw`, exactly once.
	pub(crate) fn allocate(value: T, color: Color) -> NonNull<Node<T>> {
		let node = Box::new(Node {
			children: [None, None],
			color,
			value,
		});
		NonNull::from(Box::leak(node))
	}
}

// Link accessors. These read and write through raw pointers without forming
// references, so holding several handles to nearby nodes during a rotation
// is sound.

#[inline]
pub(crate) unsafe fn child<T>(node: NonNull<Node<T>>, side: Side) -> Link<T> {
	(*node.as_ptr()).children[side as usize]
}

#[inline]
pub(crate) unsafe fn set_child<T>(node: NonNull<Node<T>>, side: Side, link: Link<T>) {
	(*node.as_ptr()).children[side as usize] = link;
}

#[inline]
pub(crate) unsafe fn node_color<T>(node: NonNull<Node<T>>) -> Color {
	(*node.as_ptr()).color
}

#[inline]
pub(crate) unsafe fn set_color<T>(node: NonNull<Node<T>>, color: Color) {
	(*node.as_ptr()).color = color;
}

/// Absent children count as black.
#[inline]
pub(crate) unsafe fn is_black<T>(link: Link<T>) -> bool {
	link.map_or(true, |node| (*node.as_ptr()).color == Color::Black)
}

/// Colors the node black if the link is present; a no-op on the sentinel.
#[inline]
unsafe fn blacken<T>(link: Link<T>) {
	if let Some(node) = link {
		set_color(node, Color::Black);
	}
}

/// Borrows the payload of a node.
///
/// The caller chooses the result lifetime and must guarantee the node
/// outlives it and is not mutated behind it.
#[inline]
pub(crate) unsafe fn value_of<'a, T>(node: NonNull<Node<T>>) -> &'a T {
	&(*node.as_ptr()).value
}

// ---------------------------------------------------------------------------
// Path Cursor
// ---------------------------------------------------------------------------

/// One step of a root-to-position route: the node visited and the branch
/// taken from it. The topmost entry's `side` is scratch until the route
/// descends further.
pub(crate) struct PathEntry<T> {
	pub(crate) node: NonNull<Node<T>>,
	pub(crate) side: Side,
}

impl<T> Clone for PathEntry<T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for PathEntry<T> {}

/// The ancestor/direction stack substituting for parent pointers.
///
/// An empty path is the "past the end" sentinel shared by every cursor. The
/// inline capacity covers any valid tree; see [`MAX_DEPTH`].
pub(crate) struct Path<T> {
	pub(crate) entries: SmallVec<[PathEntry<T>; MAX_DEPTH]>,
}

impl<T> Clone for Path<T> {
	fn clone(&self) -> Self {
		Path {
			entries: self.entries.clone(),
		}
	}
}

impl<T> Path<T> {
	pub(crate) fn new() -> Path<T> {
		Path {
			entries: SmallVec::new(),
		}
	}

	#[inline]
	pub(crate) fn clear(&mut self) {
		self.entries.clear();
	}

	#[inline]
	pub(crate) fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// The node at the current position, or `None` past the end.
	#[inline]
	pub(crate) fn top(&self) -> Option<NonNull<Node<T>>> {
		self.entries.last().map(|entry| entry.node)
	}

	#[inline]
	fn push(&mut self, node: NonNull<Node<T>>, side: Side) {
		debug_assert!(self.entries.len() < MAX_DEPTH, "valid trees never exceed MAX_DEPTH");
		self.entries.push(PathEntry { node, side });
	}

	#[inline]
	fn set_top_side(&mut self, side: Side) {
		if let Some(entry) = self.entries.last_mut() {
			entry.side = side;
		}
	}

	/// Rebuilds the route to the leftmost (`Side::Left`) or rightmost
	/// (`Side::Right`) position of the tree rooted at `root`.
	pub(crate) fn seek_extreme(&mut self, root: Link<T>, toward: Side) {
		self.entries.clear();
		let Some(mut node) = root else { return };
		self.push(node, toward);
		// SAFETY: every node on the walk is owned by the tree the caller
		// borrowed `root` from.
		unsafe {
			while let Some(next) = child(node, toward) {
				self.push(next, toward);
				node = next;
			}
		}
	}

	/// Rebuilds the route to the smallest element `>= key` (lower-bound
	/// semantics), or to the end sentinel when no such element exists.
	///
	/// The descent records the comparison direction at each node; if the
	/// final comparison was "less than", the landed node is strictly below
	/// the bound and a single advance corrects the position.
	pub(crate) fn seek_lower_bound<Q>(&mut self, root: Link<T>, key: &Q)
	where
		T: Borrow<Q>,
		Q: Ord + ?Sized,
	{
		self.entries.clear();
		let mut cursor = root;
		let mut last = Ordering::Greater;
		// SAFETY: as in `seek_extreme`.
		unsafe {
			while let Some(node) = cursor {
				last = value_of::<T>(node).borrow().cmp(key);
				if last == Ordering::Equal {
					self.push(node, Side::Left);
					break;
				}
				let side = if last == Ordering::Less { Side::Right } else { Side::Left };
				self.push(node, side);
				cursor = child(node, side);
			}
		}
		if last == Ordering::Less {
			self.advance(Side::Left);
		}
	}

	/// Moves one element in order: forward when `descend` is `Side::Left`,
	/// backward when it is `Side::Right`.
	///
	/// If the current node has a child on the stepping side, the next
	/// position is that child's `descend`-most descendant; otherwise the
	/// route pops every ancestor that was exited via the stepping side,
	/// leaving the stack empty at the end of the sequence.
	pub(crate) fn advance(&mut self, descend: Side) {
		let Some(top) = self.top() else { return };
		let step = descend.opposite();
		// SAFETY: as in `seek_extreme`.
		unsafe {
			if let Some(first) = child(top, step) {
				self.set_top_side(step);
				self.push(first, descend);
				let mut node = first;
				while let Some(next) = child(node, descend) {
					self.push(next, descend);
					node = next;
				}
			} else {
				self.entries.pop();
				while self.entries.last().map_or(false, |entry| entry.side == step) {
					self.entries.pop();
				}
			}
		}
	}
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// An ordered collection of elements, stored in a red-black tree.
///
/// See the [crate documentation](crate) for the design overview. In short:
/// at most one element per distinct value under `T`'s ordering, logarithmic
/// insert/lookup/remove, in-order iteration, no parent pointers.
pub struct Tree<T> {
	pub(crate) root: Link<T>,
	pub(crate) len: usize,
	pub(crate) _owns: PhantomData<Box<Node<T>>>,
}

// SAFETY: the tree exclusively owns its nodes; sending it moves that
// ownership wholesale, and shared access only ever reads.
unsafe impl<T: Send> Send for Tree<T> {}
unsafe impl<T: Sync> Sync for Tree<T> {}

impl<T> Tree<T> {
	/// Creates an empty tree. Does not allocate.
	///
	/// # Example
	///
	/// ```
	/// use rowantree::Tree;
	///
	/// let tree: Tree<i32> = Tree::new();
	/// assert!(tree.is_empty());
	/// ```
	pub const fn new() -> Tree<T> {
		Tree {
			root: None,
			len: 0,
			_owns: PhantomData,
		}
	}

	/// Returns the number of elements in the tree.
	///
	/// This is O(1): the count is cached and kept in sync by every mutation.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Returns `true` if the tree contains no elements.
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Removes every element, releasing each node exactly once.
	///
	/// The walk uses an explicit auxiliary stack rather than call-stack
	/// recursion, so even a pathologically deep structure (for instance one
	/// produced by an untrusted deserialization path) cannot exhaust the
	/// call stack.
	///
	/// # Example
	///
	/// ```
	/// use rowantree::Tree;
	///
	/// let mut tree: Tree<i32> = (0..100).collect();
	/// tree.clear();
	/// assert!(tree.is_empty());
	/// ```
	pub fn clear(&mut self) {
		let root = self.root.take();
		self.len = 0;
		// SAFETY: the root link was detached above, so every node under it
		// is released exactly once and never observed again.
		unsafe {
			drop_subtree(root);
		}
	}

	/// Returns the smallest element, or `None` if the tree is empty.
	pub fn first(&self) -> Option<&T> {
		let mut node = self.root?;
		// SAFETY: nodes are owned by the tree and alive for `&self`.
		unsafe {
			while let Some(next) = child(node, Side::Left) {
				node = next;
			}
			Some(value_of(node))
		}
	}

	/// Returns the largest element, or `None` if the tree is empty.
	pub fn last(&self) -> Option<&T> {
		let mut node = self.root?;
		// SAFETY: as in `first`.
		unsafe {
			while let Some(next) = child(node, Side::Right) {
				node = next;
			}
			Some(value_of(node))
		}
	}

	/// Number of nodes on the longest root-to-leaf path; 0 for an empty
	/// tree. For a valid tree this never exceeds `2 × ceil(log2(len + 1))`.
	pub fn height(&self) -> usize {
		// SAFETY: read-only walk over owned nodes.
		unsafe { subtree_height(self.root) }
	}

	/// Returns an in-order iterator over the elements.
	///
	/// # Example
	///
	/// ```
	/// use rowantree::Tree;
	///
	/// let tree: Tree<i32> = [3, 1, 2].into_iter().collect();
	/// let ordered: Vec<i32> = tree.iter().copied().collect();
	/// assert_eq!(ordered, vec![1, 2, 3]);
	/// ```
	pub fn iter(&self) -> Iter<'_, T> {
		Iter::new(self)
	}

	/// Returns a shared cursor, initially past the end.
	///
	/// Cursors expose explicit seeking ([`RawCursor::seek`],
	/// [`RawCursor::seek_to_first`], ...) and stepping, plus the range
	/// probes used for bounded iteration.
	pub fn raw_cursor(&self) -> RawCursor<'_, T> {
		RawCursor::new(self)
	}

	/// Returns an exclusive cursor, initially past the end.
	///
	/// In addition to the shared cursor's surface, an exclusive cursor can
	/// insert elements and remove the element under it.
	pub fn raw_cursor_mut(&mut self) -> RawCursorMut<'_, T> {
		RawCursorMut::new(self)
	}
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

impl<T: Ord> Tree<T> {
	/// Returns a reference to the element comparing equal to `key`.
	///
	/// # Example
	///
	/// ```
	/// use rowantree::Tree;
	///
	/// let tree: Tree<String> = ["b".to_string(), "a".to_string()].into_iter().collect();
	/// assert_eq!(tree.get("a"), Some(&"a".to_string()));
	/// assert_eq!(tree.get("c"), None);
	/// ```
	pub fn get<Q>(&self, key: &Q) -> Option<&T>
	where
		T: Borrow<Q>,
		Q: Ord + ?Sized,
	{
		let mut cursor = self.root;
		while let Some(node) = cursor {
			// SAFETY: nodes are owned by the tree and alive for `&self`.
			let value = unsafe { value_of::<T>(node) };
			cursor = match key.cmp(value.borrow()) {
				Ordering::Equal => return Some(value),
				Ordering::Less => unsafe { child(node, Side::Left) },
				Ordering::Greater => unsafe { child(node, Side::Right) },
			};
		}
		None
	}

	/// Returns `true` if an element comparing equal to `key` is present.
	pub fn contains<Q>(&self, key: &Q) -> bool
	where
		T: Borrow<Q>,
		Q: Ord + ?Sized,
	{
		self.get(key).is_some()
	}

	// -----------------------------------------------------------------------
	// Insertion
	// -----------------------------------------------------------------------

	/// Inserts `value`, or overwrites the element comparing equal to it.
	///
	/// Returns the displaced payload when an equal element was already
	/// present (the tree's shape is untouched in that case), and `None` when
	/// `value` is new. Comparator equality never creates a duplicate.
	///
	/// # Algorithm
	///
	/// 1. Descend from the root recording the route on a path cursor.
	/// 2. On an equal comparison, swap the payload in place and stop.
	/// 3. Otherwise attach a new red node at the absent slot reached.
	/// 4. While the parent and uncle are both red, recolor them black and
	///    the grandparent red, and re-examine two levels higher. This loop
	///    is O(1) amortized across any sequence of insertions.
	/// 5. Force the root black, then perform at most one rotation — single
	///    when the new node and its parent lean the same way, or one
	///    combined double rotation otherwise — and splice the result into
	///    the great-grandparent's slot.
	///
	/// # Example
	///
	/// ```
	/// use rowantree::Tree;
	///
	/// let mut tree = Tree::new();
	/// assert_eq!(tree.insert(7), None);
	/// assert_eq!(tree.insert(7), Some(7));
	/// assert_eq!(tree.len(), 1);
	/// ```
	pub fn insert(&mut self, value: T) -> Option<T> {
		let Some(root) = self.root else {
			self.root = Some(Node::allocate(value, Color::Black));
			self.len = 1;
			return None;
		};

		// Descend, recording every visited node and the branch taken.
		let mut path = Path::new();
		let mut cursor = Some(root);
		while let Some(node) = cursor {
			// SAFETY: nodes are owned by this tree; `&mut self` guarantees
			// exclusive access for the whole operation.
			let ord = unsafe { value.cmp(value_of(node)) };
			match ord {
				Ordering::Equal => {
					// SAFETY: replacing the payload leaves the shape, and
					// therefore every invariant, untouched.
					let old = unsafe { std::mem::replace(&mut (*node.as_ptr()).value, value) };
					return Some(old);
				}
				Ordering::Less => {
					path.push(node, Side::Left);
					cursor = unsafe { child(node, Side::Left) };
				}
				Ordering::Greater => {
					path.push(node, Side::Right);
					cursor = unsafe { child(node, Side::Right) };
				}
			}
		}

		// Attach a fresh red node at the absent slot the descent reached.
		let node = Node::allocate(value, Color::Red);
		let parent = *path
			.entries
			.last()
			.expect("descent from a non-empty root records at least one step");
		// SAFETY: `parent.side` is the branch whose absent slot ended the
		// descent; the new node is not yet reachable from anywhere else.
		unsafe {
			set_child(parent.node, parent.side, Some(node));
			path.push(node, Side::Left);
			self.rebalance_after_insert(&path);
		}
		self.len += 1;
		None
	}

	/// Restores the red-black invariants after attaching a red node at the
	/// top of `path`.
	unsafe fn rebalance_after_insert(&mut self, path: &Path<T>) {
		let entries = &path.entries;
		let mut x = entries.len() - 1;

		// Recolor loop: a red-red conflict whose uncle is also red moves
		// two levels up without touching the shape.
		while x >= 2 {
			let parent = entries[x - 1].node;
			if node_color(parent) != Color::Red {
				break;
			}
			let grand = entries[x - 2].node;
			let toward = entries[x - 2].side;
			let uncle = child(grand, toward.opposite());
			if is_black(uncle) {
				break;
			}
			set_color(parent, Color::Black);
			blacken(uncle);
			set_color(grand, Color::Red);
			x -= 2;
		}

		// The root is black, unconditionally; this also resolves the case
		// where recoloring reached the top.
		set_color(entries[0].node, Color::Black);

		if x <= 1 || node_color(entries[x - 1].node) == Color::Black {
			return;
		}

		// A red parent with a black uncle remains: exactly one rebalancing
		// step, spliced into the great-grandparent (or the root slot).
		let node = entries[x].node;
		let parent = entries[x - 1].node;
		let grand = entries[x - 2].node;
		let toward = entries[x - 2].side;
		let across = toward.opposite();

		let subtree = if toward == entries[x - 1].side {
			// Node and parent lean the same way: single rotation; the
			// parent becomes the subtree root.
			set_child(grand, toward, child(parent, across));
			set_child(parent, across, Some(grand));
			set_color(parent, Color::Black);
			set_color(grand, Color::Red);
			parent
		} else {
			// Opposite sides: one combined pointer rewiring rather than two
			// sequential rotations; the new node becomes the subtree root.
			set_child(grand, toward, child(node, across));
			set_child(parent, across, child(node, toward));
			set_child(node, toward, Some(parent));
			set_child(node, across, Some(grand));
			set_color(node, Color::Black);
			set_color(grand, Color::Red);
			node
		};

		if x == 2 {
			self.root = Some(subtree);
		} else {
			set_child(entries[x - 3].node, entries[x - 3].side, Some(subtree));
		}
	}

	// -----------------------------------------------------------------------
	// Deletion
	// -----------------------------------------------------------------------

	/// Removes the element comparing equal to `key`, yielding its payload.
	///
	/// Absence is the normal `None` outcome, never an error. Cursors
	/// positioned at the removed element are structurally invalidated; the
	/// defined recovery is a fresh lower-bound seek (see
	/// [`RawCursorMut::remove`]).
	///
	/// # Algorithm
	///
	/// 1. Descend recording the route. Not found: stop.
	/// 2. Two children: keep descending to the in-order successor, splice it
	///    out (its single child takes its place), and transplant the
	///    successor node into the located position. The structural slot
	///    keeps its color; the successor's original color is the color that
	///    left the tree.
	/// 3. Zero or one child: splice the located node out directly.
	/// 4. If a black node was removed and replaced by a black (or absent)
	///    child, resolve the double-black deficiency by walking the recorded
	///    path upward; at most O(1) rotations and O(log n) recolorings.
	///
	/// # Example
	///
	/// ```
	/// use rowantree::Tree;
	///
	/// let mut tree: Tree<i32> = [1, 2, 3].into_iter().collect();
	/// assert_eq!(tree.remove(&2), Some(2));
	/// assert_eq!(tree.remove(&2), None);
	/// ```
	pub fn remove<Q>(&mut self, key: &Q) -> Option<T>
	where
		T: Borrow<Q>,
		Q: Ord + ?Sized,
	{
		let mut path = Path::new();
		let mut cursor = self.root;
		let found = loop {
			let node = cursor?;
			// SAFETY: `&mut self` guarantees exclusive access to every node
			// for the whole operation.
			let ord = unsafe { key.cmp(value_of::<T>(node).borrow()) };
			match ord {
				Ordering::Equal => break node,
				Ordering::Less => {
					path.push(node, Side::Left);
					cursor = unsafe { child(node, Side::Left) };
				}
				Ordering::Greater => {
					path.push(node, Side::Right);
					cursor = unsafe { child(node, Side::Right) };
				}
			}
		};

		let found_at = path.entries.len();
		path.push(found, Side::Left);

		// SAFETY: all pointers involved come from the recorded route over
		// nodes this tree owns; each splice below rewires a slot exactly
		// once, and `found` is released exactly once at the end.
		unsafe {
			let (gap, removed_color, replacement) =
				if child(found, Side::Left).is_some() && child(found, Side::Right).is_some() {
					// Two children: splice out the in-order successor and
					// move the successor node itself into the located slot.
					path.entries[found_at].side = Side::Right;
					let mut succ = child(found, Side::Right).expect("two-child case");
					path.push(succ, Side::Left);
					while let Some(next) = child(succ, Side::Left) {
						path.push(next, Side::Left);
						succ = next;
					}
					let succ_at = path.entries.len() - 1;
					let succ_child = child(succ, Side::Right);

					// Detach the successor, attaching its only child in its
					// place. This must happen before the transplant reads
					// the located node's children.
					let above = path.entries[succ_at - 1];
					set_child(above.node, above.side, succ_child);

					// Transplant: the slot keeps its structural color, the
					// successor's own color is the one that leaves.
					let succ_color = node_color(succ);
					self.replace_slot(&path, found_at, Some(succ));
					set_child(succ, Side::Left, child(found, Side::Left));
					set_child(succ, Side::Right, child(found, Side::Right));
					set_color(succ, node_color(found));
					path.entries[found_at].node = succ;

					(succ_at, succ_color, succ_child)
				} else {
					let only = if child(found, Side::Left).is_some() { Side::Left } else { Side::Right };
					let replacement = child(found, only);
					self.replace_slot(&path, found_at, replacement);
					(found_at, node_color(found), replacement)
				};

			if removed_color == Color::Black && is_black(replacement) {
				self.fix_deficit(&mut path, gap);
			} else {
				blacken(replacement);
			}

			self.len -= 1;
			let boxed = Box::from_raw(found.as_ptr());
			Some(boxed.value)
		}
	}

	/// Rewires the slot that holds the node at `path[at]` — either a parent
	/// child link, or the root link when `at` is the top of the route.
	unsafe fn replace_slot(&mut self, path: &Path<T>, at: usize, link: Link<T>) {
		if at == 0 {
			self.root = link;
		} else {
			let parent = path.entries[at - 1];
			set_child(parent.node, parent.side, link);
		}
	}

	/// Resolves a double-black deficiency at position `gap` of the recorded
	/// route, walking upward until the missing blackness is restored.
	///
	/// Cases, per iteration (`parent` is the deficient position's parent,
	/// `sibling` its other child):
	///
	/// - Red sibling: lift it over the parent and recolor, so the remaining
	///   cases see a black sibling.
	/// - Black sibling, both children black: recolor the sibling red; a red
	///   parent absorbs the deficit on the spot, a black parent becomes the
	///   new deficient position.
	/// - Black sibling with a red child: one rotation (red child on the far
	///   side) or two (near side) redistribute blackness locally and the
	///   fixup terminates.
	/// - Root reached: an all-black root absorbs the deficit.
	unsafe fn fix_deficit(&mut self, path: &mut Path<T>, mut gap: usize) {
		let entries = &mut path.entries;
		loop {
			if gap == 0 {
				blacken(self.root);
				return;
			}
			let at = gap - 1;
			let mut above: Link<T> = if at == 0 { None } else { Some(entries[at - 1].node) };
			let parent = entries[at].node;
			let side = entries[at].side;
			let mut sibling = child(parent, side.opposite());

			if !is_black(sibling) {
				// Red sibling: after the lift, the parent sits one level
				// deeper, is itself red, and has a black sibling.
				let lifted = self.rotate(above, parent, side.opposite());
				set_color(lifted, Color::Black);
				entries[at] = PathEntry { node: lifted, side };
				set_color(parent, Color::Red);
				above = Some(lifted);
				sibling = child(parent, side.opposite());
			}

			let sibling = sibling.expect("a black-height deficit implies a sibling");
			if is_black(child(sibling, Side::Left)) && is_black(child(sibling, Side::Right)) {
				set_color(sibling, Color::Red);
				if node_color(parent) == Color::Red {
					set_color(parent, Color::Black);
					return;
				}
				gap = at;
				continue;
			}

			// The sibling has at least one red child: rotate the surplus
			// blackness over to the deficient side and stop.
			let parent_color = node_color(parent);
			let red_side = if !is_black(child(sibling, Side::Right)) { Side::Right } else { Side::Left };
			let subtree = if red_side != side {
				// Far side: a single rotation lifts the sibling.
				self.rotate(above, parent, red_side)
			} else {
				// Near side: lift the red child over the sibling first.
				self.rotate(Some(parent), sibling, red_side);
				self.rotate(above, parent, side.opposite())
			};
			set_color(subtree, parent_color);
			blacken(child(subtree, Side::Left));
			blacken(child(subtree, Side::Right));
			return;
		}
	}

	/// Lifts `pivot`'s child on `side` into `pivot`'s place, preserving the
	/// in-order sequence. `above` is the node whose child slot holds
	/// `pivot`, or `None` when `pivot` is the root. Returns the lifted node.
	unsafe fn rotate(
		&mut self,
		above: Link<T>,
		pivot: NonNull<Node<T>>,
		side: Side,
	) -> NonNull<Node<T>> {
		let lifted = child(pivot, side).expect("rotation requires a child on the rising side");
		set_child(pivot, side, child(lifted, side.opposite()));
		set_child(lifted, side.opposite(), Some(pivot));
		match above {
			None => self.root = Some(lifted),
			Some(node) => {
				let slot = if child(node, Side::Left) == Some(pivot) { Side::Left } else { Side::Right };
				set_child(node, slot, Some(lifted));
			}
		}
		lifted
	}
}

// ---------------------------------------------------------------------------
// Bulk Operations
// ---------------------------------------------------------------------------

/// Releases every node of the subtree behind `root`, iteratively.
///
/// Children are detached as the walk descends, so each node is released
/// exactly once. The auxiliary stack spills to the heap for structures
/// deeper than [`MAX_DEPTH`].
pub(crate) unsafe fn drop_subtree<T>(root: Link<T>) {
	let Some(root) = root else { return };
	let mut stack: SmallVec<[NonNull<Node<T>>; MAX_DEPTH]> = SmallVec::new();
	stack.push(root);
	while let Some(mut node) = stack.last().copied() {
		// Descend to a childless node, detaching links on the way down.
		loop {
			if let Some(left) = child(node, Side::Left) {
				set_child(node, Side::Left, None);
				stack.push(left);
				node = left;
			} else if let Some(right) = child(node, Side::Right) {
				set_child(node, Side::Right, None);
				stack.push(right);
				node = right;
			} else {
				break;
			}
		}
		stack.pop();
		drop(Box::from_raw(node.as_ptr()));
	}
}

/// Deep-copies a subtree, preserving both payload order and color layout.
/// Recursion depth is bounded by the source's depth.
unsafe fn clone_subtree<T: Clone>(link: Link<T>) -> Link<T> {
	link.map(|node| {
		let source = &*node.as_ptr();
		let copy = Node::allocate(source.value.clone(), source.color);
		set_child(copy, Side::Left, clone_subtree(source.children[0]));
		set_child(copy, Side::Right, clone_subtree(source.children[1]));
		copy
	})
}

unsafe fn subtree_height<T>(link: Link<T>) -> usize {
	match link {
		None => 0,
		Some(node) => {
			1 + subtree_height(child(node, Side::Left)).max(subtree_height(child(node, Side::Right)))
		}
	}
}

impl<T> Drop for Tree<T> {
	fn drop(&mut self) {
		self.clear();
	}
}

impl<T> Default for Tree<T> {
	fn default() -> Tree<T> {
		Tree::new()
	}
}

impl<T: Clone> Clone for Tree<T> {
	/// Deep copy: an identical in-order sequence and an identical color
	/// layout, with entirely independent node ownership.
	fn clone(&self) -> Tree<T> {
		Tree {
			// SAFETY: read-only walk over nodes alive for `&self`.
			root: unsafe { clone_subtree(self.root) },
			len: self.len,
			_owns: PhantomData,
		}
	}
}

// ---------------------------------------------------------------------------
// Invariant Validation
// ---------------------------------------------------------------------------

impl<T: Ord> Tree<T> {
	/// Validates every structural invariant, panicking on the first
	/// violation. Intended for tests and debugging.
	///
	/// Checks, in order: black root, no red-red edge, uniform black-height,
	/// strictly increasing in-order sequence, and cached-length consistency.
	pub fn assert_invariants(&self)
	where
		T: fmt::Debug,
	{
		let Some(root) = self.root else {
			assert_eq!(self.len, 0, "empty tree must cache length 0");
			return;
		};
		// SAFETY: read-only walk over nodes alive for `&self`.
		unsafe {
			assert_eq!(node_color(root), Color::Black, "the root must be black");
			let mut count = 0usize;
			validate_subtree(root, None, None, &mut count);
			assert_eq!(
				count, self.len,
				"cached length {} != reachable node count {}",
				self.len, count
			);
		}
	}
}

/// Recursively validates one subtree and returns its black-height.
unsafe fn validate_subtree<T: Ord + fmt::Debug>(
	node: NonNull<Node<T>>,
	lower: Option<&T>,
	upper: Option<&T>,
	count: &mut usize,
) -> usize {
	*count += 1;
	let value = value_of::<T>(node);

	if let Some(low) = lower {
		assert!(value > low, "in-order violation: {:?} is not above {:?}", value, low);
	}
	if let Some(high) = upper {
		assert!(value < high, "in-order violation: {:?} is not below {:?}", value, high);
	}

	if node_color(node) == Color::Red {
		assert!(
			is_black(child(node, Side::Left)) && is_black(child(node, Side::Right)),
			"red node {:?} has a red child",
			value
		);
	}

	let left = match child(node, Side::Left) {
		Some(link) => validate_subtree(link, lower, Some(value), count),
		None => 0,
	};
	let right = match child(node, Side::Right) {
		Some(link) => validate_subtree(link, Some(value), upper, count),
		None => 0,
	};
	assert_eq!(left, right, "black-height mismatch under {:?}: {} vs {}", value, left, right);

	left + (node_color(node) == Color::Black) as usize
}

// ---------------------------------------------------------------------------
// Equality, Hashing, Formatting
// ---------------------------------------------------------------------------

impl<T: PartialEq> PartialEq for Tree<T> {
	/// Trees compare by their in-order sequences, never by shape: distinct
	/// insertion histories that hold the same elements compare equal.
	fn eq(&self, other: &Tree<T>) -> bool {
		self.len == other.len && self.iter().eq(other.iter())
	}
}

impl<T: Eq> Eq for Tree<T> {}

impl<T: Hash> Hash for Tree<T> {
	/// An order-dependent fold over the in-order sequence, consistent with
	/// the sequence-based equality.
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.len.hash(state);
		for value in self {
			value.hash(state);
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for Tree<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.iter()).finish()
	}
}

impl<T: fmt::Display> fmt::Display for Tree<T> {
	/// Formats the in-order sequence as `[e1,e2,e3]`.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[")?;
		let mut first = true;
		for value in self {
			if !first {
				f.write_str(",")?;
			}
			first = false;
			write!(f, "{value}")?;
		}
		f.write_str("]")
	}
}

impl<T: Ord + FromStr> FromStr for Tree<T> {
	type Err = ParseError;

	/// Parses the `[e1,e2,e3]` form produced by the [`fmt::Display`] impl.
	///
	/// Whitespace around elements is tolerated. Elements that themselves
	/// contain `,` or `]` are outside this textual format's domain.
	///
	/// # Example
	///
	/// ```
	/// use rowantree::Tree;
	///
	/// let tree: Tree<i32> = "[3, 1, 2]".parse().unwrap();
	/// assert_eq!(tree.to_string(), "[1,2,3]");
	/// ```
	fn from_str(s: &str) -> Result<Tree<T>, ParseError> {
		let s = s.trim();
		let inner = s.strip_prefix('[').ok_or(ParseError::MissingOpen)?;
		let inner = inner.strip_suffix(']').ok_or(ParseError::MissingClose)?;
		let mut tree = Tree::new();
		if inner.trim().is_empty() {
			return Ok(tree);
		}
		for (index, piece) in inner.split(',').enumerate() {
			let value = piece.trim().parse().map_err(|_| ParseError::Element { index })?;
			tree.insert(value);
		}
		Ok(tree)
	}
}

// ---------------------------------------------------------------------------
// Iteration Glue
// ---------------------------------------------------------------------------

impl<T: Ord> FromIterator<T> for Tree<T> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Tree<T> {
		let mut tree = Tree::new();
		tree.extend(iter);
		tree
	}
}

impl<T: Ord> Extend<T> for Tree<T> {
	fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
		for value in iter {
			self.insert(value);
		}
	}
}

impl<'a, T: Ord + Copy + 'a> Extend<&'a T> for Tree<T> {
	fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
		self.extend(iter.into_iter().copied());
	}
}

impl<'a, T> IntoIterator for &'a Tree<T> {
	type Item = &'a T;
	type IntoIter = Iter<'a, T>;

	fn into_iter(self) -> Iter<'a, T> {
		self.iter()
	}
}

impl<T> IntoIterator for Tree<T> {
	type Item = T;
	type IntoIter = IntoIter<T>;

	/// Consumes the tree, yielding its elements in order. The tree is
	/// dismantled iteratively; dropping the iterator midway releases every
	/// remaining node exactly once.
	fn into_iter(self) -> IntoIter<T> {
		IntoIter::new(self)
	}
}

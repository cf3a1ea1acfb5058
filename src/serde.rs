//! Serde support: the tree serializes as a sequence.
//!
//! Serialization drives the serializer's sequence protocol — begin sequence,
//! one entry per element, end sequence — during a single in-order walk, so
//! the wire form is the sorted element sequence. Deserialization consumes a
//! sequence and rebuilds by repeated insert; element order on the wire is
//! not required to be sorted, and later duplicates overwrite earlier ones
//! exactly as [`Tree::insert`] does.

use crate::Tree;

use serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use std::fmt;
use std::marker::PhantomData;

impl<T: Serialize> Serialize for Tree<T> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut seq = serializer.serialize_seq(Some(self.len()))?;
		for value in self {
			seq.serialize_element(value)?;
		}
		seq.end()
	}
}

struct TreeVisitor<T> {
	marker: PhantomData<T>,
}

impl<'de, T: Deserialize<'de> + Ord> Visitor<'de> for TreeVisitor<T> {
	type Value = Tree<T>;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("a sequence of ordered elements")
	}

	fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Tree<T>, A::Error> {
		let mut tree = Tree::new();
		while let Some(value) = seq.next_element()? {
			tree.insert(value);
		}
		Ok(tree)
	}
}

impl<'de, T: Deserialize<'de> + Ord> Deserialize<'de> for Tree<T> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Tree<T>, D::Error> {
		deserializer.deserialize_seq(TreeVisitor {
			marker: PhantomData,
		})
	}
}

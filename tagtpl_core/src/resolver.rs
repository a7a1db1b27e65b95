use std::collections::HashMap;

use crate::node::NodeId;

/// One candidate body for a named block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Body {
	/// Children that have not been compiled yet.
	Pending(Vec<NodeId>),
	/// Memoized output.
	Compiled(String),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Slot {
	pub cursor: usize,
	pub bodies: Vec<Body>,
}

/// Per block name, the bodies contributed by each file of an extends chain,
/// in the order the files were visited (most concrete first).
///
/// A stack belongs to exactly one compilation and is dropped with it.
#[derive(Debug, Clone, Default)]
pub struct BlockStack {
	slots: HashMap<String, Slot>,
}

impl BlockStack {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append an unresolved body for `name`.
	pub fn push_body(&mut self, name: &str, children: Vec<NodeId>) {
		self.slots
			.entry(name.to_string())
			.or_default()
			.bodies
			.push(Body::Pending(children));
	}

	/// Number of bodies registered for `name`.
	pub(crate) fn depth(&self, name: &str) -> usize {
		self.slots.get(name).map_or(0, |slot| slot.bodies.len())
	}

	pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut Slot> {
		self.slots.get_mut(name)
	}
}

use crate::tokens::Attributes;

/// Index of a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Lifecycle of a block node while the tree is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
	/// Opened and still waiting for its closing tag.
	Open,
	/// Closed by a matching closing tag.
	Closed,
	/// Implicitly closed because a closing tag of an ancestor arrived first.
	/// Its content is dropped.
	Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	Root,
	Text(String),
	Value {
		tag: String,
		attributes: Attributes,
		raw: String,
	},
	/// `{{tpl:parent}}`
	ValueParent,
	Block {
		tag: String,
		attributes: Attributes,
		state: BlockState,
	},
	/// `<tpl:Block name="...">`, an overridable region.
	BlockDefinition {
		name: String,
		attributes: Attributes,
		state: BlockState,
	},
}

#[derive(Debug, Clone)]
pub struct Node {
	pub kind: NodeKind,
	pub parent: Option<NodeId>,
	pub children: Vec<NodeId>,
	/// Byte offset of the token that created the node.
	pub offset: usize,
}

impl Node {
	/// The tag name a closing tag has to match, if this node can be closed.
	pub fn tag(&self) -> Option<&str> {
		match &self.kind {
			NodeKind::Block { tag, .. } => Some(tag.as_str()),
			NodeKind::BlockDefinition { .. } => Some(crate::BLOCK_DEFINITION_TAG),
			_ => None,
		}
	}

	pub fn state(&self) -> Option<BlockState> {
		match &self.kind {
			NodeKind::Block { state, .. } | NodeKind::BlockDefinition { state, .. } => Some(*state),
			_ => None,
		}
	}

	fn set_state(&mut self, new_state: BlockState) {
		if let NodeKind::Block { state, .. } | NodeKind::BlockDefinition { state, .. } =
			&mut self.kind
		{
			*state = new_state;
		}
	}
}

/// Arena holding every node of one compilation. Several roots may live in the
/// same tree, one per file of an extends chain.
#[derive(Debug, Clone, Default)]
pub struct Tree {
	nodes: Vec<Node>,
}

impl Tree {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_root(&mut self) -> NodeId {
		self.insert(NodeKind::Root, None, 0)
	}

	/// Append a new node as the last child of `parent`.
	pub fn append(&mut self, parent: NodeId, kind: NodeKind, offset: usize) -> NodeId {
		let id = self.insert(kind, Some(parent), offset);
		self.nodes[parent.0].children.push(id);
		id
	}

	fn insert(&mut self, kind: NodeKind, parent: Option<NodeId>, offset: usize) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(Node {
			kind,
			parent,
			children: vec![],
			offset,
		});
		id
	}

	pub fn get(&self, id: NodeId) -> &Node {
		&self.nodes[id.0]
	}

	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.nodes[id.0].parent
	}

	pub fn children(&self, id: NodeId) -> &[NodeId] {
		&self.nodes[id.0].children
	}

	pub fn set_state(&mut self, id: NodeId, state: BlockState) {
		self.nodes[id.0].set_state(state);
	}

	/// Detach the children of `id`, leaving it with an empty child list. The
	/// detached nodes stay in the arena.
	pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
		std::mem::take(&mut self.nodes[id.0].children)
	}

	pub(crate) fn len(&self) -> usize {
		self.nodes.len()
	}
}

use std::fmt::Write;

use crate::handlers::HandlerRegistry;
use crate::node::BlockState;
use crate::node::NodeId;
use crate::node::NodeKind;
use crate::node::Tree;
use crate::parser::StructuralError;
use crate::resolver::BlockStack;
use crate::resolver::Body;

/// Turns a built tree into output by dispatching every tag to the registry.
///
/// Children of a block are compiled before the block's handler runs. Named
/// block definitions are compiled through the [`BlockStack`] so that
/// `{{tpl:parent}}` can reach the body one level up.
pub struct Compiler<'a> {
	tree: &'a Tree,
	registry: &'a HandlerRegistry,
	blocks: &'a mut BlockStack,
	/// Names of the block definitions currently being resolved, innermost
	/// last.
	active: Vec<String>,
}

impl<'a> Compiler<'a> {
	pub fn new(tree: &'a Tree, registry: &'a HandlerRegistry, blocks: &'a mut BlockStack) -> Self {
		Self {
			tree,
			registry,
			blocks,
			active: vec![],
		}
	}

	pub fn compile(&mut self, id: NodeId) -> String {
		let tree = self.tree;

		match &tree.get(id).kind {
			NodeKind::Root => self.compile_children(id),
			NodeKind::Text(text) => text.clone(),
			NodeKind::Value {
				tag,
				attributes,
				raw,
			} => self.registry.compile_value(tag, attributes, raw),
			NodeKind::ValueParent => self.render_parent(),
			NodeKind::Block {
				tag,
				attributes,
				state,
			} => {
				if *state != BlockState::Closed {
					return String::new();
				}

				let content = self.compile_children(id);
				self.registry.compile_block(tag, attributes, &content)
			}
			NodeKind::BlockDefinition { name, state, .. } => {
				if *state != BlockState::Closed {
					return String::new();
				}

				self.resolve(name)
			}
		}
	}

	fn compile_children(&mut self, id: NodeId) -> String {
		let tree = self.tree;
		tree.children(id)
			.iter()
			.map(|child| self.compile(*child))
			.collect()
	}

	/// Compile the body of `name` at the current cursor position. The result
	/// is memoized, so resolving the same body again returns the same string
	/// without compiling anything.
	pub fn resolve(&mut self, name: &str) -> String {
		let Some(slot) = self.blocks.slot_mut(name) else {
			return String::new();
		};

		let position = slot.cursor;
		let children = match slot.bodies.get_mut(position) {
			None => return String::new(),
			Some(Body::Compiled(output)) => return output.clone(),
			// Parking an empty result guards against a body reaching itself.
			Some(body) => match std::mem::replace(body, Body::Compiled(String::new())) {
				Body::Pending(children) => children,
				Body::Compiled(output) => return output,
			},
		};

		slot.cursor += 1;
		tracing::trace!(name, position, "resolving block body");

		self.active.push(name.to_string());
		let output: String = children.iter().map(|child| self.compile(*child)).collect();
		self.active.pop();

		if let Some(slot) = self.blocks.slot_mut(name) {
			slot.cursor -= 1;
			slot.bodies[position] = Body::Compiled(output.clone());
		}

		output
	}

	/// Output of the body one level above the block definition currently
	/// being resolved. Empty outside of any block definition.
	pub fn render_parent(&mut self) -> String {
		match self.active.last().cloned() {
			Some(name) => self.resolve(&name),
			None => String::new(),
		}
	}
}

/// The output of compiling one template together with the structural errors
/// recovered along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compilation {
	pub output: String,
	pub diagnostics: Vec<StructuralError>,
}

impl Compilation {
	pub fn has_errors(&self) -> bool {
		!self.diagnostics.is_empty()
	}

	/// The text persisted in the cache: the output followed by a diagnostic
	/// block when errors were recovered. The block is wrapped in a raw region
	/// so rendering prints it verbatim.
	pub fn to_artifact(&self) -> String {
		if self.diagnostics.is_empty() {
			return self.output.clone();
		}

		let mut artifact = self.output.clone();
		let _ = write!(
			artifact,
			"\n{{% raw %}}<!-- tagtpl: {} template error(s)\n",
			self.diagnostics.len()
		);
		for diagnostic in &self.diagnostics {
			let _ = writeln!(artifact, "{diagnostic}");
		}
		artifact.push_str("-->{% endraw %}\n");

		artifact
	}
}

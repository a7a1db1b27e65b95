use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use miette::LabeledSpan;
use miette::Severity;
use serde::Serialize;

use crate::node::BlockState;
use crate::node::NodeId;
use crate::node::NodeKind;
use crate::node::Tree;
use crate::resolver::BlockStack;
use crate::tokens::Tag;
use crate::tokens::Token;
use crate::tokens::TokenKind;

/// Block tag that defines an overridable region: `<tpl:Block name="...">`.
pub const BLOCK_DEFINITION_TAG: &str = "Block";
/// Value tag declaring the template this one extends.
pub const EXTENDS_TAG: &str = "extends";
/// Value tag rendering the overridden ancestor body of the current block.
pub const PARENT_TAG: &str = "parent";
/// Value tag pulling in another template when rendering.
pub const INCLUDE_TAG: &str = "include";
/// `{{tpl:extends parent="__parent__"}}` extends the template with the same
/// name further down the search path.
pub const PARENT_SENTINEL: &str = "__parent__";

/// The kind of a structural problem recovered while building the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum StructuralErrorKind {
	/// A block was still open when an ancestor closed or the input ended.
	MissingClosingTag { tag: String },
	/// A closing tag matched no open block.
	UnexpectedClosingTag { tag: String },
}

/// A structural error. These never stop compilation: the offending subtree
/// compiles to nothing and the error is reported alongside the output.
///
/// As a [`Diagnostic`] it has warning severity and labels the offending tag.
/// Pair it with the preprocessed text of its file to show a source snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralError {
	pub kind: StructuralErrorKind,
	/// The file the error was found in, when compiling from disk.
	pub file: Option<PathBuf>,
	/// 1-indexed line number.
	pub line: usize,
	/// 1-indexed column number.
	pub column: usize,
	/// Byte offset of the offending tag in the preprocessed text.
	pub offset: usize,
}

impl StructuralError {
	/// Human-readable message for this error.
	pub fn message(&self) -> String {
		match &self.kind {
			StructuralErrorKind::MissingClosingTag { tag } => {
				format!("did not find closing tag for block `<tpl:{tag}>`, its content has been ignored")
			}
			StructuralErrorKind::UnexpectedClosingTag { tag } => {
				format!("unexpected closing tag `</tpl:{tag}>`")
			}
		}
	}
}

impl fmt::Display for StructuralError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.file {
			Some(file) => write!(
				f,
				"{}:{}:{}: {}",
				file.display(),
				self.line,
				self.column,
				self.message()
			),
			None => write!(f, "{}:{}: {}", self.line, self.column, self.message()),
		}
	}
}

impl std::error::Error for StructuralError {}

impl Diagnostic for StructuralError {
	fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
		let code = match &self.kind {
			StructuralErrorKind::MissingClosingTag { .. } => "tagtpl::missing_closing_tag",
			StructuralErrorKind::UnexpectedClosingTag { .. } => "tagtpl::unexpected_closing_tag",
		};

		Some(Box::new(code))
	}

	fn severity(&self) -> Option<Severity> {
		Some(Severity::Warning)
	}

	fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
		let help = match &self.kind {
			StructuralErrorKind::MissingClosingTag { tag } => {
				format!("add `</tpl:{tag}>` before the enclosing block closes")
			}
			StructuralErrorKind::UnexpectedClosingTag { tag } => {
				format!("remove this tag or open it with `<tpl:{tag}>`")
			}
		};

		Some(Box::new(help))
	}

	fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
		let label = match &self.kind {
			StructuralErrorKind::MissingClosingTag { .. } => "opened here",
			StructuralErrorKind::UnexpectedClosingTag { .. } => "closes nothing",
		};

		Some(Box::new(std::iter::once(LabeledSpan::at_offset(
			self.offset,
			label,
		))))
	}
}

/// Result of building the tree of one template.
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
	pub root: NodeId,
	/// Value of the first `{{tpl:extends parent="..."}}`, if any.
	pub extends: Option<String>,
	pub errors: Vec<StructuralError>,
}

/// Build the tree for `tokens` into `tree`, pushing the bodies of closed block
/// definitions onto `blocks`.
pub fn build(
	tokens: &[Token],
	source: &str,
	tree: &mut Tree,
	blocks: &mut BlockStack,
) -> ParsedTemplate {
	let mut builder = TreeBuilder::new(source, tree, blocks);
	for token in tokens {
		builder.push(token);
	}
	builder.finish()
}

struct TreeBuilder<'a> {
	source: &'a str,
	tree: &'a mut Tree,
	blocks: &'a mut BlockStack,
	root: NodeId,
	current: NodeId,
	extends: Option<String>,
	errors: Vec<StructuralError>,
}

impl<'a> TreeBuilder<'a> {
	fn new(source: &'a str, tree: &'a mut Tree, blocks: &'a mut BlockStack) -> Self {
		let root = tree.add_root();

		Self {
			source,
			tree,
			blocks,
			root,
			current: root,
			extends: None,
			errors: vec![],
		}
	}

	fn push(&mut self, token: &Token) {
		let offset = token.span.start;

		match &token.kind {
			TokenKind::Text(text) => {
				self.tree
					.append(self.current, NodeKind::Text(text.clone()), offset);
			}
			TokenKind::Value(tag) => self.push_value(tag, offset),
			TokenKind::OpenBlock(tag) => self.open_block(tag, offset),
			TokenKind::CloseBlock(tag) => self.close_block(&tag.name, offset),
		}
	}

	fn push_value(&mut self, tag: &Tag, offset: usize) {
		match tag.name.as_str() {
			EXTENDS_TAG => {
				if self.extends.is_none() {
					self.extends = tag.attributes().value("parent").map(str::to_string);
				}
			}
			PARENT_TAG => {
				self.tree.append(self.current, NodeKind::ValueParent, offset);
			}
			_ => {
				let kind = NodeKind::Value {
					tag: tag.name.clone(),
					attributes: tag.attributes(),
					raw: tag.attrs_raw.clone(),
				};
				self.tree.append(self.current, kind, offset);
			}
		}
	}

	fn open_block(&mut self, tag: &Tag, offset: usize) {
		let attributes = tag.attributes();
		let kind = if tag.name == BLOCK_DEFINITION_TAG {
			NodeKind::BlockDefinition {
				name: attributes.value("name").unwrap_or_default().to_string(),
				attributes,
				state: BlockState::Open,
			}
		} else {
			NodeKind::Block {
				tag: tag.name.clone(),
				attributes,
				state: BlockState::Open,
			}
		};

		let id = self.tree.append(self.current, kind, offset);

		if tag.self_closing {
			self.close(id);
		} else {
			self.current = id;
		}
	}

	fn close_block(&mut self, name: &str, offset: usize) {
		if self.tree.get(self.current).tag() == Some(name) {
			let closed = self.current;
			self.close(closed);
			self.current = self.tree.parent(closed).unwrap_or(self.root);
			return;
		}

		// Look for an open ancestor this closing tag belongs to.
		let mut search = self.tree.parent(self.current);
		while let Some(id) = search {
			if self.tree.get(id).tag() == Some(name) {
				break;
			}
			search = self.tree.parent(id);
		}

		let Some(matched) = search else {
			tracing::warn!(tag = name, "unexpected closing tag");
			self.record(
				StructuralErrorKind::UnexpectedClosingTag {
					tag: name.to_string(),
				},
				offset,
			);
			return;
		};

		let mut abandoned = self.current;
		while abandoned != matched {
			self.tree.set_state(abandoned, BlockState::Abandoned);
			self.record_missing_close(abandoned);
			abandoned = self.tree.parent(abandoned).unwrap_or(self.root);
		}

		self.close(matched);
		self.current = self.tree.parent(matched).unwrap_or(self.root);
	}

	/// Mark `id` closed. A block definition hands its children over to the
	/// block stack so later files of the chain can layer their own bodies.
	fn close(&mut self, id: NodeId) {
		self.tree.set_state(id, BlockState::Closed);

		if let NodeKind::BlockDefinition { name, .. } = &self.tree.get(id).kind {
			let name = name.clone();
			let children = self.tree.take_children(id);
			self.blocks.push_body(&name, children);
			tracing::trace!(
				name = %name,
				depth = self.blocks.depth(&name),
				"block definition closed"
			);
		}
	}

	fn record_missing_close(&mut self, id: NodeId) {
		let node = self.tree.get(id);
		let tag = node.tag().unwrap_or_default().to_string();
		let offset = node.offset;

		tracing::warn!(tag = %tag, "missing closing tag");
		self.record(StructuralErrorKind::MissingClosingTag { tag }, offset);
	}

	fn record(&mut self, kind: StructuralErrorKind, offset: usize) {
		let (line, column) = line_column(self.source, offset);
		self.errors.push(StructuralError {
			kind,
			file: None,
			line,
			column,
			offset,
		});
	}

	fn finish(mut self) -> ParsedTemplate {
		let mut open = self.current;
		while open != self.root {
			self.record_missing_close(open);
			open = self.tree.parent(open).unwrap_or(self.root);
		}

		ParsedTemplate {
			root: self.root,
			extends: self.extends,
			errors: self.errors,
		}
	}
}

/// 1-indexed line and column of a byte offset.
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
	let offset = offset.min(source.len());
	let before = source.get(..offset).unwrap_or(source);
	let line = before.matches('\n').count() + 1;
	let line_start = before.rfind('\n').map_or(0, |index| index + 1);
	let column = before[line_start..].chars().count() + 1;

	(line, column)
}

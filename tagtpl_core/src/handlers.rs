use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::tokens::Attributes;

/// Compiles a block tag from its attributes and its already compiled content.
pub trait BlockHandler: Send + Sync {
	fn compile_block(&self, attributes: &Attributes, content: &str) -> String;
}

/// Compiles a value tag from its attributes and the raw attribute string.
pub trait ValueHandler: Send + Sync {
	fn compile_value(&self, attributes: &Attributes, raw: &str) -> String;
}

/// Fallback for block tags with no registered handler.
pub trait UnknownBlockHandler: Send + Sync {
	fn compile_unknown_block(&self, tag: &str, attributes: &Attributes, content: &str) -> String;
}

/// Fallback for value tags with no registered handler.
pub trait UnknownValueHandler: Send + Sync {
	fn compile_unknown_value(&self, tag: &str, attributes: &Attributes, raw: &str) -> String;
}

impl<F> BlockHandler for F
where
	F: Fn(&Attributes, &str) -> String + Send + Sync,
{
	fn compile_block(&self, attributes: &Attributes, content: &str) -> String {
		self(attributes, content)
	}
}

impl<F> ValueHandler for F
where
	F: Fn(&Attributes, &str) -> String + Send + Sync,
{
	fn compile_value(&self, attributes: &Attributes, raw: &str) -> String {
		self(attributes, raw)
	}
}

impl<F> UnknownBlockHandler for F
where
	F: Fn(&str, &Attributes, &str) -> String + Send + Sync,
{
	fn compile_unknown_block(&self, tag: &str, attributes: &Attributes, content: &str) -> String {
		self(tag, attributes, content)
	}
}

impl<F> UnknownValueHandler for F
where
	F: Fn(&str, &Attributes, &str) -> String + Send + Sync,
{
	fn compile_unknown_value(&self, tag: &str, attributes: &Attributes, raw: &str) -> String {
		self(tag, attributes, raw)
	}
}

/// Maps tag names to the handlers that give them meaning. Dispatch happens at
/// compile time against whatever is registered at that moment.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
	blocks: HashMap<String, Arc<dyn BlockHandler>>,
	values: HashMap<String, Arc<dyn ValueHandler>>,
	unknown_block: Option<Arc<dyn UnknownBlockHandler>>,
	unknown_value: Option<Arc<dyn UnknownValueHandler>>,
}

impl HandlerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a block handler. A later registration for the same name
	/// replaces the earlier one.
	pub fn register_block(&mut self, name: impl Into<String>, handler: impl BlockHandler + 'static) {
		self.blocks.insert(name.into(), Arc::new(handler));
	}

	/// Register a value handler. A later registration for the same name
	/// replaces the earlier one.
	pub fn register_value(&mut self, name: impl Into<String>, handler: impl ValueHandler + 'static) {
		self.values.insert(name.into(), Arc::new(handler));
	}

	pub fn set_unknown_block_handler(&mut self, handler: impl UnknownBlockHandler + 'static) {
		self.unknown_block = Some(Arc::new(handler));
	}

	pub fn set_unknown_value_handler(&mut self, handler: impl UnknownValueHandler + 'static) {
		self.unknown_value = Some(Arc::new(handler));
	}

	pub fn has_block(&self, name: &str) -> bool {
		self.blocks.contains_key(name)
	}

	pub fn has_value(&self, name: &str) -> bool {
		self.values.contains_key(name)
	}

	/// Unknown blocks without a fallback compile to nothing.
	pub fn compile_block(&self, tag: &str, attributes: &Attributes, content: &str) -> String {
		if let Some(handler) = self.blocks.get(tag) {
			return handler.compile_block(attributes, content);
		}

		match &self.unknown_block {
			Some(fallback) => fallback.compile_unknown_block(tag, attributes, content),
			None => {
				tracing::trace!(tag, "no handler for block tag");
				String::new()
			}
		}
	}

	/// Unknown values without a fallback compile to nothing.
	pub fn compile_value(&self, tag: &str, attributes: &Attributes, raw: &str) -> String {
		if let Some(handler) = self.values.get(tag) {
			return handler.compile_value(attributes, raw);
		}

		match &self.unknown_value {
			Some(fallback) => fallback.compile_unknown_value(tag, attributes, raw),
			None => {
				tracing::trace!(tag, "no handler for value tag");
				String::new()
			}
		}
	}
}

impl fmt::Debug for HandlerRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut blocks: Vec<_> = self.blocks.keys().collect();
		blocks.sort();
		let mut values: Vec<_> = self.values.keys().collect();
		values.sort();

		f.debug_struct("HandlerRegistry")
			.field("blocks", &blocks)
			.field("values", &values)
			.field("unknown_block", &self.unknown_block.is_some())
			.field("unknown_value", &self.unknown_value.is_some())
			.finish()
	}
}

/// The built-in `{{tpl:include src="..."}}` handler. The included template is
/// pulled in when the compiled output is rendered.
pub fn include_handler(attributes: &Attributes, _raw: &str) -> String {
	let Some(src) = attributes.value("src") else {
		return String::new();
	};

	match serde_json::to_string(src) {
		Ok(quoted) => format!("{{% include {quoted} %}}"),
		Err(_) => String::new(),
	}
}

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use tempfile::TempDir;

use crate::Attributes;
use crate::Engine;
use crate::TagtplResult;

/// A temporary project with theme directories and a cache root.
pub struct Project {
	dir: TempDir,
}

impl Project {
	pub fn new() -> std::io::Result<Self> {
		let dir = tempfile::tempdir()?;
		fs::create_dir_all(dir.path().join("cache"))?;

		Ok(Self { dir })
	}

	pub fn path(&self) -> &Path {
		self.dir.path()
	}

	pub fn cache_dir(&self) -> PathBuf {
		self.path().join("cache")
	}

	/// Canonical path of a theme directory, created when missing.
	pub fn theme(&self, theme: &str) -> std::io::Result<PathBuf> {
		let dir = self.path().join("themes").join(theme);
		fs::create_dir_all(&dir)?;
		dir.canonicalize()
	}

	/// Write a template and return its canonical path.
	pub fn write(&self, theme: &str, name: &str, contents: &str) -> std::io::Result<PathBuf> {
		let path = self.theme(theme)?.join(name);
		fs::write(&path, contents)?;
		path.canonicalize()
	}

	/// An engine searching `themes` in order, with the test handlers
	/// registered.
	pub fn engine(&self, themes: &[&str]) -> TagtplResult<Engine> {
		let mut engine = Engine::new(self.cache_dir())?;
		let dirs = themes
			.iter()
			.map(|theme| self.theme(theme))
			.collect::<std::io::Result<Vec<_>>>()?;
		engine.set_path(dirs);
		register_test_handlers(&mut engine);

		Ok(engine)
	}
}

/// `<tpl:Wrap as="p">` wraps its content in an element, `div` by default.
pub fn wrap_block(attributes: &Attributes, content: &str) -> String {
	let element = attributes.value("as").unwrap_or("div");
	format!("<{element}>{content}</{element}>")
}

/// `{{tpl:Echo ...}}` prints its raw attribute string in brackets.
pub fn echo_value(_attributes: &Attributes, raw: &str) -> String {
	format!("[{raw}]")
}

/// `{{tpl:Title}}` defers to the render context.
pub fn title_value(_attributes: &Attributes, _raw: &str) -> String {
	"{{ title }}".to_string()
}

pub fn register_test_handlers(engine: &mut Engine) {
	engine.register_block("Wrap", wrap_block);
	engine.register_value("Echo", echo_value);
	engine.register_value("Title", title_value);
}

/// A value handler printing how often it has been invoked.
pub fn counting_value(counter: Arc<AtomicUsize>) -> impl Fn(&Attributes, &str) -> String + Send + Sync {
	move |_: &Attributes, _: &str| {
		let calls = counter.fetch_add(1, Ordering::SeqCst) + 1;
		calls.to_string()
	}
}

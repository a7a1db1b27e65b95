use std::fs;
use std::path::Path;
use std::path::PathBuf;

use miette::NamedSource;
use minijinja::AutoEscape;
use minijinja::Environment;
use minijinja::UndefinedBehavior;
use serde::Serialize;

use crate::BlockHandler;
use crate::Compilation;
use crate::Compiler;
use crate::HandlerRegistry;
use crate::INCLUDE_TAG;
use crate::PARENT_SENTINEL;
use crate::StructuralError;
use crate::TagtplError;
use crate::TagtplResult;
use crate::UnknownBlockHandler;
use crate::UnknownValueHandler;
use crate::ValueHandler;
use crate::cache;
use crate::cache::CompiledCache;
use crate::config::TagtplConfig;
use crate::handlers::include_handler;
use crate::lexer::LexOptions;
use crate::lexer::preprocess;
use crate::lexer::tokenize;
use crate::node::Tree;
use crate::parser;
use crate::resolver::BlockStack;
use crate::search_path::ResolvedTemplate;
use crate::search_path::SearchPath;

/// Compiles templates found on the search path and keeps the results in the
/// on-disk cache.
///
/// Every compilation owns its own tree and block stack, so an `Engine` can be
/// cloned or shared between threads freely. Handlers registered after a
/// template was cached only affect templates compiled afterwards.
#[derive(Debug, Clone)]
pub struct Engine {
	registry: HandlerRegistry,
	search_path: SearchPath,
	cache: CompiledCache,
	use_cache: bool,
	lex_options: LexOptions,
}

impl Engine {
	/// Create an engine caching into `cache_root`, which must exist and be
	/// writable. The `include` value tag is registered.
	pub fn new(cache_root: impl AsRef<Path>) -> TagtplResult<Self> {
		let mut registry = HandlerRegistry::new();
		registry.register_value(INCLUDE_TAG, include_handler);

		Ok(Self {
			registry,
			search_path: SearchPath::default(),
			cache: CompiledCache::new(cache_root)?,
			use_cache: true,
			lex_options: LexOptions::default(),
		})
	}

	/// Create an engine from a loaded config. Relative paths are resolved
	/// against `root` and the cache directory is created when missing.
	pub fn from_config(root: &Path, config: &TagtplConfig) -> TagtplResult<Self> {
		let cache_dir = config.cache_dir(root);
		fs::create_dir_all(&cache_dir).map_err(|e| {
			TagtplError::CacheDirectory {
				path: cache_dir.display().to_string(),
				reason: e.to_string(),
			}
		})?;

		let mut engine = Self::new(&cache_dir)?;
		engine.set_path(config.template_dirs(root));
		engine.set_use_cache(config.cache.enabled);
		engine.lex_options = config.lex_options();

		Ok(engine)
	}

	pub fn search_path(&self) -> &[PathBuf] {
		self.search_path.dirs()
	}

	/// Replace the template search path. Directories that do not exist are
	/// skipped.
	pub fn set_path<I, P>(&mut self, dirs: I)
	where
		I: IntoIterator<Item = P>,
		P: AsRef<Path>,
	{
		self.search_path.set(dirs);
	}

	pub fn prepend_path<I, P>(&mut self, dirs: I)
	where
		I: IntoIterator<Item = P>,
		P: AsRef<Path>,
	{
		self.search_path.prepend(dirs);
	}

	pub fn append_path<I, P>(&mut self, dirs: I)
	where
		I: IntoIterator<Item = P>,
		P: AsRef<Path>,
	{
		self.search_path.append(dirs);
	}

	pub fn cache_root(&self) -> &Path {
		self.cache.root()
	}

	/// When disabled, every request recompiles (and rewrites) the artifact.
	pub fn set_use_cache(&mut self, use_cache: bool) {
		self.use_cache = use_cache;
	}

	pub fn set_strip_host_snippets(&mut self, strip: bool) {
		self.lex_options.strip_host_snippets = strip;
	}

	pub fn set_lex_options(&mut self, options: LexOptions) {
		self.lex_options = options;
	}

	pub fn registry(&self) -> &HandlerRegistry {
		&self.registry
	}

	/// Register the handler for `<tpl:name>` blocks. Registering the same name
	/// again replaces the earlier handler.
	pub fn register_block(&mut self, name: impl Into<String>, handler: impl BlockHandler + 'static) {
		self.registry.register_block(name, handler);
	}

	/// Register the handler for `{{tpl:name}}` values. Registering the same
	/// name again replaces the earlier handler.
	pub fn register_value(&mut self, name: impl Into<String>, handler: impl ValueHandler + 'static) {
		self.registry.register_value(name, handler);
	}

	pub fn set_unknown_block_handler(&mut self, handler: impl UnknownBlockHandler + 'static) {
		self.registry.set_unknown_block_handler(handler);
	}

	pub fn set_unknown_value_handler(&mut self, handler: impl UnknownValueHandler + 'static) {
		self.registry.set_unknown_value_handler(handler);
	}

	pub fn has_block(&self, name: &str) -> bool {
		self.registry.has_block(name)
	}

	pub fn has_value(&self, name: &str) -> bool {
		self.registry.has_value(name)
	}

	/// Absolute path of the first search directory entry containing `name`.
	pub fn resolve_path(&self, name: &str) -> Option<PathBuf> {
		self.search_path.resolve(name).map(|template| template.path)
	}

	/// Like [`Engine::resolve_path`] but only searches the directories after
	/// `previous_dir`.
	pub fn resolve_parent_path(&self, previous_dir: &Path, name: &str) -> Option<PathBuf> {
		self.search_path
			.resolve_parent(previous_dir, name)
			.map(|template| template.path)
	}

	/// Compile in-memory template text. Nothing is cached. `extends` targets
	/// are looked up on the search path; `__parent__` has no meaning here and
	/// fails with [`TagtplError::TemplateNotFound`].
	pub fn compile_source(&self, source: &str) -> TagtplResult<Compilation> {
		self.compile_chain(source.to_string(), None)
	}

	/// Compile the template `name` and its extends chain, bypassing the
	/// cache.
	pub fn compile(&self, name: &str) -> TagtplResult<Compilation> {
		let template = self.find(name)?;
		self.compile_template(&template)
	}

	/// A warning report for `diagnostic`. When its file can be read the
	/// report shows the offending tag in the file's preprocessed text, which
	/// is what the diagnostic's offset refers to.
	pub fn structural_report(&self, diagnostic: &StructuralError) -> miette::Report {
		let report = miette::Report::new(diagnostic.clone());
		let Some(file) = &diagnostic.file else {
			return report;
		};
		let Ok(source) = fs::read_to_string(file) else {
			return report;
		};

		let text = preprocess(&source, &self.lex_options).into_owned();
		report.with_source_code(NamedSource::new(file.display().to_string(), text))
	}

	/// Path of an up-to-date compiled artifact for `name`, compiling it first
	/// when the cached one is missing or stale.
	pub fn compiled_path(&self, name: &str) -> TagtplResult<PathBuf> {
		let template = self.find(name)?;
		let artifact = self.cache.artifact_path(&template.path);

		if self.use_cache && cache::is_fresh(&artifact, &template.path) {
			tracing::trace!(name, "compiled template is fresh");
			return Ok(artifact);
		}

		let compilation = self.compile_template(&template)?;
		self.cache.store(&template.path, &compilation.to_artifact())
	}

	/// The compiled text of `name`, served from the cache when fresh.
	pub fn get_compiled(&self, name: &str) -> TagtplResult<String> {
		let template = self.find(name)?;

		if self.use_cache {
			if let Some(compiled) = self.cache.load(&template.path) {
				tracing::trace!(name, "compiled template served from cache");
				return Ok(compiled);
			}
		}

		let artifact = self.compile_template(&template)?.to_artifact();
		self.cache.store(&template.path, &artifact)?;

		Ok(artifact)
	}

	/// Compile (or load) `name` and evaluate it against `context`.
	pub fn render<S: Serialize>(&self, name: &str, context: S) -> TagtplResult<String> {
		let compiled = self.get_compiled(name)?;
		self.render_compiled(name, compiled, &context)
	}

	/// Compile in-memory template text and evaluate it against `context`.
	pub fn render_source<S: Serialize>(&self, source: &str, context: S) -> TagtplResult<String> {
		let compiled = self.compile_source(source)?.to_artifact();
		self.render_compiled("__source__", compiled, &context)
	}

	fn render_compiled<S: Serialize>(
		&self,
		name: &str,
		compiled: String,
		context: &S,
	) -> TagtplResult<String> {
		let mut env = self.environment();
		env.add_template_owned(name.to_string(), compiled)?;
		let template = env.get_template(name)?;

		Ok(template.render(minijinja::Value::from_serialize(context))?)
	}

	/// A MiniJinja environment whose loader compiles included templates
	/// through this engine.
	fn environment(&self) -> Environment<'static> {
		let mut env = Environment::new();
		env.set_keep_trailing_newline(true);
		env.set_undefined_behavior(UndefinedBehavior::Chainable);
		env.set_auto_escape_callback(|_| AutoEscape::None);

		let engine = self.clone();
		env.set_loader(move |name| {
			match engine.get_compiled(name) {
				Ok(compiled) => Ok(Some(compiled)),
				Err(TagtplError::TemplateNotFound(_)) => Ok(None),
				Err(error) => {
					Err(minijinja::Error::new(
						minijinja::ErrorKind::InvalidOperation,
						error.to_string(),
					))
				}
			}
		});

		env
	}

	fn find(&self, name: &str) -> TagtplResult<ResolvedTemplate> {
		self.search_path
			.resolve(name)
			.ok_or_else(|| TagtplError::TemplateNotFound(name.to_string()))
	}

	fn compile_template(&self, template: &ResolvedTemplate) -> TagtplResult<Compilation> {
		let source = fs::read_to_string(&template.path)?;
		self.compile_chain(source, Some(template.clone()))
	}

	/// Parse `source`, then follow `extends` links parsing each ancestor into
	/// the same tree. Block definitions of every file are layered on the block
	/// stack in visiting order; the last file parsed drives the output.
	fn compile_chain(
		&self,
		mut source: String,
		mut origin: Option<ResolvedTemplate>,
	) -> TagtplResult<Compilation> {
		let mut tree = Tree::new();
		let mut blocks = BlockStack::new();
		let mut visited: Vec<PathBuf> = vec![];
		let mut diagnostics = vec![];

		let root = loop {
			let parsed = {
				let text = preprocess(&source, &self.lex_options);
				let tokens = tokenize(&text);
				parser::build(&tokens, &text, &mut tree, &mut blocks)
			};

			let file = origin.as_ref().map(|template| template.path.clone());
			diagnostics.extend(parsed.errors.into_iter().map(|mut error| {
				error.file.clone_from(&file);
				error
			}));

			let Some(parent) = parsed.extends else {
				break parsed.root;
			};

			let next = if parent == PARENT_SENTINEL {
				origin.as_ref().and_then(|current| {
					self.search_path.resolve_parent(&current.dir, &current.name)
				})
			} else {
				self.search_path.resolve(&parent)
			};
			let next = next.ok_or_else(|| TagtplError::TemplateNotFound(parent.clone()))?;

			if let Some(current) = &origin {
				visited.push(current.path.clone());
			}
			if visited.contains(&next.path) {
				return Err(TagtplError::ExtendsCycle {
					path: next.path.display().to_string(),
				});
			}

			tracing::trace!(parent = %next.path.display(), "following extends");
			source = fs::read_to_string(&next.path)?;
			origin = Some(next);
		};

		let output = Compiler::new(&tree, &self.registry, &mut blocks).compile(root);
		tracing::debug!(
			files = visited.len() + 1,
			nodes = tree.len(),
			errors = diagnostics.len(),
			"compiled template chain"
		);

		Ok(Compilation {
			output,
			diagnostics,
		})
	}
}

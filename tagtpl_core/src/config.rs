use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::TagtplError;
use crate::TagtplResult;
use crate::lexer::LexOptions;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["tagtpl.toml", ".tagtpl.toml", ".config/tagtpl.toml"];

/// Default cache location, relative to the project root.
pub const DEFAULT_CACHE_DIR: &str = ".tagtpl/cache";

/// Configuration loaded from a `tagtpl.toml` file.
///
/// ```toml
/// [templates]
/// paths = ["themes/custom", "themes/default"]
///
/// [cache]
/// dir = ".tagtpl/cache"
/// enabled = true
///
/// [host_snippets]
/// strip = false
/// passthrough_literals = true
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct TagtplConfig {
	/// Template search directories.
	#[serde(default)]
	pub templates: TemplatesConfig,
	/// Where and whether compiled templates are cached.
	#[serde(default)]
	pub cache: CacheConfig,
	/// Treatment of host snippets embedded in source templates.
	#[serde(default)]
	pub host_snippets: HostSnippetsConfig,
}

/// Configuration for the template search path.
#[derive(Debug, Default, Deserialize)]
pub struct TemplatesConfig {
	/// Directories searched in order for a requested template. These are
	/// relative to the project root.
	#[serde(default)]
	pub paths: Vec<PathBuf>,
}

/// Configuration for the compiled template cache.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
	/// Cache root. Created when missing. Defaults to `.tagtpl/cache`.
	#[serde(default)]
	pub dir: Option<PathBuf>,
	/// When `false`, templates are recompiled on every request.
	#[serde(default = "default_true")]
	pub enabled: bool,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			dir: None,
			enabled: true,
		}
	}
}

/// Configuration for host snippets (`{{ expr }}`, `{% stmt %}`, `{# note #}`)
/// found in source templates.
#[derive(Debug, Deserialize)]
pub struct HostSnippetsConfig {
	/// Remove host snippets before compiling.
	#[serde(default)]
	pub strip: bool,
	/// When stripping, keep snippets that do not look like directives as
	/// escaped literal text.
	#[serde(default = "default_true")]
	pub passthrough_literals: bool,
}

impl Default for HostSnippetsConfig {
	fn default() -> Self {
		Self {
			strip: false,
			passthrough_literals: true,
		}
	}
}

fn default_true() -> bool {
	true
}

impl TagtplConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> TagtplResult<Option<TagtplConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::from_toml(&content)?;

		Ok(Some(config))
	}

	pub fn from_toml(content: &str) -> TagtplResult<TagtplConfig> {
		toml::from_str(content).map_err(|e| TagtplError::ConfigParse(e.to_string()))
	}

	/// Template directories resolved against `root`.
	pub fn template_dirs(&self, root: &Path) -> Vec<PathBuf> {
		self.templates
			.paths
			.iter()
			.map(|path| root.join(path))
			.collect()
	}

	/// Cache directory resolved against `root`.
	pub fn cache_dir(&self, root: &Path) -> PathBuf {
		root.join(
			self.cache
				.dir
				.as_deref()
				.unwrap_or(Path::new(DEFAULT_CACHE_DIR)),
		)
	}

	pub fn lex_options(&self) -> LexOptions {
		LexOptions {
			strip_host_snippets: self.host_snippets.strip,
			passthrough_literals: self.host_snippets.passthrough_literals,
		}
	}
}

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TagtplError {
	#[error(transparent)]
	#[diagnostic(code(tagtpl::io_error))]
	Io(#[from] std::io::Error),

	#[error("template not found: `{0}`")]
	#[diagnostic(
		code(tagtpl::template_not_found),
		help("check that `{0}` exists in one of the configured template directories")
	)]
	TemplateNotFound(String),

	#[error("cache directory `{path}` is not usable: {reason}")]
	#[diagnostic(
		code(tagtpl::cache_directory),
		help("create the directory and make sure the current user can write to it")
	)]
	CacheDirectory { path: String, reason: String },

	#[error("failed to write compiled template `{path}`: {reason}")]
	#[diagnostic(code(tagtpl::cache_write))]
	CacheWrite { path: String, reason: String },

	#[error("template `{path}` extends itself through its parent chain")]
	#[diagnostic(
		code(tagtpl::extends_cycle),
		help("remove the `{{{{tpl:extends}}}}` tag that points back into the chain")
	)]
	ExtendsCycle { path: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(tagtpl::config_parse),
		help("check that tagtpl.toml is valid TOML with [templates], [cache] and/or [host_snippets] sections")
	)]
	ConfigParse(String),

	#[error("template rendering failed: {0}")]
	#[diagnostic(code(tagtpl::render))]
	Render(String),
}

impl From<minijinja::Error> for TagtplError {
	fn from(error: minijinja::Error) -> Self {
		Self::Render(error.to_string())
	}
}

pub type TagtplResult<T> = Result<T, TagtplError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;

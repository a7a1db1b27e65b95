use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Compile tag templates into cached MiniJinja templates.",
	long_about = "tagtpl compiles templates written with `<tpl:Name>` block tags and \
	              `{{tpl:Name}}` value tags, following `extends` chains across a search path \
	              of theme directories and caching the compiled output on disk.\n\nQuick \
	              start:\n  tagtpl compile page.html     Print the compiled template\n  \
	              tagtpl render page.html      Render it against JSON data\n  tagtpl check \
	              page.html       Report structural errors\n  tagtpl cache-path page.html  \
	              Print where the compiled template lives"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct TagtplCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Template directory to search, in priority order. Overrides the
	/// `[templates]` paths from `tagtpl.toml` when given.
	#[arg(long = "template-dir", short = 't', global = true)]
	pub template_dirs: Vec<PathBuf>,

	/// Directory holding compiled templates. Defaults to `.tagtpl/cache`.
	#[arg(long, global = true)]
	pub cache_dir: Option<PathBuf>,

	/// Recompile templates even when a fresh compiled copy exists.
	#[arg(long, global = true, default_value_t = false)]
	pub no_cache: bool,

	/// Remove host snippets (`{{ expr }}`, `{% stmt %}`) from the sources
	/// before compiling.
	#[arg(long, global = true, default_value_t = false)]
	pub strip_host_snippets: bool,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Print the compiled form of a template.
	///
	/// The compiled template is served from the cache when it is still
	/// fresh, otherwise the template and its `extends` chain are compiled
	/// and the cache is updated.
	Compile {
		/// Template name, relative to the template directories.
		name: String,
	},
	/// Render a template against JSON data.
	///
	/// The compiled template is evaluated with MiniJinja. Included templates
	/// are compiled on demand through the same search path.
	Render {
		/// Template name, relative to the template directories.
		name: String,

		/// JSON file providing the render context. Defaults to an empty
		/// object.
		#[arg(long)]
		data: Option<PathBuf>,
	},
	/// Compile templates and report structural errors.
	///
	/// Bypasses the cache. Exits with a non-zero status code when any
	/// template contains mismatched or unclosed tags, which makes it suitable
	/// for CI pipelines.
	Check {
		/// Template names, relative to the template directories.
		#[arg(required = true)]
		names: Vec<String>,
	},
	/// Print the path of the compiled template, compiling it if needed.
	CachePath {
		/// Template name, relative to the template directories.
		name: String,
	},
}

use std::error::Error;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use clap::Parser;
use owo_colors::OwoColorize;
use tagtpl_cli::Commands;
use tagtpl_cli::TagtplCli;
use tagtpl_core::Attributes;
use tagtpl_core::Engine;
use tagtpl_core::TagtplConfig;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "TAGTPL_LOG";

static USE_COLOR: AtomicBool = AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

type CliResult = Result<(), Box<dyn Error>>;

fn main() {
	let args = TagtplCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.wrap_lines(false)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Compile { name }) => run_compile(&args, name),
		Some(Commands::Render { name, data }) => run_render(&args, name, data.as_deref()),
		Some(Commands::Check { names }) => run_check(&args, names),
		Some(Commands::CachePath { name }) => run_cache_path(&args, name),
		None => {
			eprintln!("No subcommand specified. Run `tagtpl --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Render library errors through miette for help text and error codes.
		match e.downcast::<tagtpl_core::TagtplError>() {
			Ok(tagtpl_err) => {
				let report: miette::Report = (*tagtpl_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn init_tracing(verbose: bool, use_color: bool) {
	let default_directive = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();
}

fn resolve_root(args: &TagtplCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Build an engine from `tagtpl.toml` (when present) with command line flags
/// taking precedence.
fn build_engine(args: &TagtplCli) -> Result<Engine, Box<dyn Error>> {
	let root = resolve_root(args);
	let mut config = TagtplConfig::load(&root)?.unwrap_or_default();

	if !args.template_dirs.is_empty() {
		config.templates.paths.clone_from(&args.template_dirs);
	}
	if config.templates.paths.is_empty() {
		config.templates.paths.push(PathBuf::from("."));
	}
	if let Some(cache_dir) = &args.cache_dir {
		config.cache.dir = Some(cache_dir.clone());
	}
	if args.no_cache {
		config.cache.enabled = false;
	}
	if args.strip_host_snippets {
		config.host_snippets.strip = true;
	}

	let mut engine = Engine::from_config(&root, &config)?;
	engine.set_unknown_value_handler(context_lookup);
	engine.set_unknown_block_handler(|_: &str, _: &Attributes, content: &str| content.to_string());

	if args.verbose {
		for dir in engine.search_path() {
			eprintln!("searching {}", dir.display());
		}
	}

	Ok(engine)
}

/// `{{tpl:Name}}` without a handler prints the context value `Name`.
fn context_lookup(tag: &str, _attributes: &Attributes, _raw: &str) -> String {
	if tag.starts_with(|c: char| c.is_ascii_digit()) {
		return String::new();
	}

	format!("{{{{ {tag} }}}}")
}

fn run_compile(args: &TagtplCli, name: &str) -> CliResult {
	let engine = build_engine(args)?;
	print!("{}", engine.get_compiled(name)?);

	Ok(())
}

fn run_render(args: &TagtplCli, name: &str, data: Option<&Path>) -> CliResult {
	let engine = build_engine(args)?;
	let context = match data {
		Some(path) => {
			let content = std::fs::read_to_string(path)
				.map_err(|e| format!("failed to read data file `{}`: {e}", path.display()))?;
			serde_json::from_str::<serde_json::Value>(&content)
				.map_err(|e| format!("failed to parse data file `{}`: {e}", path.display()))?
		}
		None => serde_json::Value::Object(serde_json::Map::new()),
	};

	print!("{}", engine.render(name, context)?);

	Ok(())
}

fn run_check(args: &TagtplCli, names: &[String]) -> CliResult {
	let engine = build_engine(args)?;
	let mut error_count = 0;

	for name in names {
		let compilation = engine.compile(name)?;

		if !compilation.has_errors() {
			if args.verbose {
				println!("{} {name}", colored!("ok", green));
			}
			continue;
		}

		error_count += compilation.diagnostics.len();
		println!(
			"{} {}",
			colored!(name, bold),
			colored!(
				format!("{} structural error(s)", compilation.diagnostics.len()),
				red
			)
		);
		// Structural errors are recoverable, so they are reported as warnings.
		for diagnostic in &compilation.diagnostics {
			let report = engine.structural_report(diagnostic);
			eprintln!("{report:?}");
		}
	}

	if error_count > 0 {
		eprintln!(
			"\n{} {error_count} structural error(s) found.",
			colored!("error:", red)
		);
		process::exit(1);
	}

	println!(
		"{}",
		colored!(
			format!("All {} template(s) are well formed.", names.len()),
			green
		)
	);

	Ok(())
}

fn run_cache_path(args: &TagtplCli, name: &str) -> CliResult {
	let engine = build_engine(args)?;
	println!("{}", engine.compiled_path(name)?.display());

	Ok(())
}

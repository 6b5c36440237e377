use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use orchea_cli::Commands;
use orchea_cli::FlavorArg;
use orchea_cli::OrcheaCli;
use orchea_cli::OutputFormat;
use orchea_core::DEFAULT_INDEX_TEMPLATE;
use orchea_core::DOCUMENT_TEMPLATE_FILE;
use orchea_core::FileConfig;
use orchea_core::OrcheaConfig;
use orchea_core::Workspace;
use orchea_core::collect_tags;
use orchea_core::render::render;
use orchea_core::search;
use orchea_core::sidecar_name;
use orchea_core::timestamp;
use orchea_server::ServeOptions;
use orchea_server::bind_listener;
use orchea_server::serve;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

/// Default output of `orchea build`, inside the document directory.
const BUILD_FILE: &str = "build.html";

const SAMPLE_SNIPPET: &str = "welcome.md";

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
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
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
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

fn main() {
	let args = OrcheaCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Serve {
			host,
			port,
			no_fallback,
		}) => run_serve(&args, host.clone(), *port, *no_fallback),
		Some(Commands::Build {
			slug,
			out,
			flavor,
			check,
			watch,
		}) => run_build(&args, slug, out.as_deref(), *flavor, *check, *watch),
		Some(Commands::Render { file, flavor }) => run_render(&args, file, *flavor),
		Some(Commands::List) => run_list(&args),
		Some(Commands::Tags { format }) => run_tags(&args, *format),
		Some(Commands::Search {
			query,
			limit,
			format,
		}) => run_search(&args, query, *limit, *format),
		None => {
			eprintln!("No subcommand specified. Run `orchea --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Render orchea errors through miette for codes and help text.
		match e.downcast::<orchea_core::OrcheaError>() {
			Ok(orchea_err) => {
				let report: miette::Report = (*orchea_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Logs go to stderr. `--verbose` forces `debug`, otherwise `RUST_LOG`
/// applies with `info` as the fallback.
fn init_tracing(verbose: bool, use_color: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();
}

fn resolve_root(args: &OrcheaCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn open_workspace(args: &OrcheaCli) -> Result<Workspace, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	tracing::debug!(root = %root.display(), "opening workspace");

	Ok(Workspace::open(root)?)
}

/// Write `content` unless `path` exists. Returns whether it was written.
fn write_if_missing(path: &Path, content: &str, root: &Path) -> Result<bool, Box<dyn std::error::Error>> {
	let rel = make_relative(path, root);

	if path.exists() {
		println!("Already exists: {rel}");
		return Ok(false);
	}

	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)?;
	println!("Created {rel}");

	Ok(true)
}

fn run_init(args: &OrcheaCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let workspace = open_workspace(args)?;

	std::fs::create_dir_all(workspace.repository().root())?;
	std::fs::create_dir_all(workspace.documents().root())?;

	let config_exists = OrcheaConfig::resolve_path(&root).is_some();
	if !config_exists {
		let sample_config = "# orchea configuration. Every setting is optional.\n\n# \
		                     [server]\n# host = \"127.0.0.1\"\n# port = 3000\n# fallback_ports \
		                     = 10\n# static_dir = \".\"\n\n# [paths]\n# repository = \
		                     \"repository\"\n# documents = \"documents\"\n# templates = \
		                     \"templates\"\n\n# [render]\n# flavor = \"simple\"\n";
		write_if_missing(&root.join("orchea.toml"), sample_config, &root)?;
	}

	write_if_missing(
		&workspace.documents().templates().dir().join(DOCUMENT_TEMPLATE_FILE),
		DEFAULT_INDEX_TEMPLATE,
		&root,
	)?;

	let repository = workspace.repository();
	let created_snippet = write_if_missing(
		&repository.path_of(SAMPLE_SNIPPET),
		"# Welcome\n\nThis snippet lives in the repository. List it under `markdown_files` in a \
		 document's\n`config.yaml` to include it.\n",
		&root,
	)?;

	let sample_config = FileConfig {
		title: "Welcome".to_string(),
		labels: vec!["Guide".to_string()],
		last_update: Some(timestamp()),
	};
	write_if_missing(
		&repository.path_of(&sidecar_name(SAMPLE_SNIPPET)),
		&sample_config.to_yaml(),
		&root,
	)?;

	if created_snippet {
		println!();
		println!("Next steps:");
		println!("  1. Add markdown snippets to {}", make_relative(repository.root(), &root));
		println!("  2. Run `orchea serve` and open the editor to assemble a document");
		println!("  3. Run `orchea build <slug>` to render it to HTML");
	}

	Ok(())
}

fn run_serve(
	args: &OrcheaCli,
	host: Option<String>,
	port: Option<u16>,
	no_fallback: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let mut workspace = open_workspace(args)?;
	workspace
		.config_mut()
		.apply_port_override(std::env::var("PORT").ok().as_deref());

	let mut options = ServeOptions::from(&workspace.config().server);
	if let Some(host) = host {
		options.host = host;
	}
	if let Some(port) = port {
		options.port = port;
	}
	if no_fallback {
		options.fallback_ports = 0;
	}

	let rt = tokio::runtime::Runtime::new()?;
	rt.block_on(async move {
		let listener = match bind_listener(&options.host, options.port, options.fallback_ports).await {
			Ok(listener) => listener,
			Err(error) if error.kind() == IoErrorKind::AddrInUse => {
				eprintln!(
					"{} port {} is already in use. Free it, pass `--port`, or set the PORT \
					 environment variable.",
					colored!("error:", red),
					options.port,
				);
				process::exit(1);
			}
			Err(error) => return Err(error.into()),
		};

		let address = listener.local_addr()?;
		println!("{}", colored!("Orchea Documentation System", bold));
		println!("Server running on http://{address}");
		println!("Repository path: {}", workspace.repository().root().display());
		println!("Press Ctrl+C to stop the server");

		serve(listener, workspace).await?;
		Ok::<(), Box<dyn std::error::Error>>(())
	})
}

fn run_build(
	args: &OrcheaCli,
	slug: &str,
	out: Option<&Path>,
	flavor: Option<FlavorArg>,
	check: bool,
	watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let is_stale = run_build_once(args, slug, out, flavor, check)?;

	if !watch {
		if is_stale {
			process::exit(1);
		}
		return Ok(());
	}

	// Watch mode
	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let workspace = open_workspace(args)?;
	let output_name = out
		.and_then(Path::file_name)
		.unwrap_or(std::ffi::OsStr::new(BUILD_FILE))
		.to_os_string();
	let (tx, rx) = mpsc::channel();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				let relevant = matches!(
					event.kind,
					notify::EventKind::Modify(_)
						| notify::EventKind::Create(_)
						| notify::EventKind::Remove(_)
				) && event
					.paths
					.iter()
					.any(|path| path.file_name() != Some(output_name.as_os_str()));
				if relevant {
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(workspace.repository().root(), notify::RecursiveMode::Recursive)?;
	watcher.watch(&workspace.documents().dir(slug), notify::RecursiveMode::Recursive)?;

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nFile change detected, rebuilding...");
		if let Err(e) = run_build_once(args, slug, out, flavor, check) {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

/// Build once and return whether the existing output is stale (only when
/// checking).
fn run_build_once(
	args: &OrcheaCli,
	slug: &str,
	out: Option<&Path>,
	flavor: Option<FlavorArg>,
	check: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let workspace = open_workspace(args)?;
	let (built, page) = workspace.build_page(slug, flavor.map(Into::into))?;

	for missing in &built.missing {
		eprintln!(
			"{} could not load `{missing}`, an error section was inserted",
			colored!("warning:", yellow)
		);
	}

	let target = match out {
		Some(out) if out == Path::new("-") => out.to_path_buf(),
		Some(out) => root.join(out),
		None => workspace.documents().dir(slug).join(BUILD_FILE),
	};

	if target == Path::new("-") {
		if check {
			return Err("`--check` needs an output file, not stdout".into());
		}
		print!("{page}");
		return Ok(false);
	}

	let rel = make_relative(&target, &root);

	if check {
		let current = match std::fs::read_to_string(&target) {
			Ok(current) => current,
			Err(error) if error.kind() == IoErrorKind::NotFound => String::new(),
			Err(error) => return Err(error.into()),
		};

		if current == page {
			println!("{} {rel} is up to date.", colored!("ok:", green));
			return Ok(false);
		}

		println!("{} {rel} is out of date.", colored!("stale:", red));
		print_diff(&current, &page);
		println!("\nRun `orchea build {slug}` to update it.");
		return Ok(true);
	}

	if let Some(parent) = target.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(&target, &page)?;
	println!("Built `{slug}` into {rel}");

	if args.verbose {
		println!("  {} snippet(s) missing", built.missing.len());
	}

	Ok(false)
}

fn run_render(
	args: &OrcheaCli,
	file: &Path,
	flavor: Option<FlavorArg>,
) -> Result<(), Box<dyn std::error::Error>> {
	let workspace = open_workspace(args)?;
	let flavor = flavor.map_or_else(|| workspace.flavor(), Into::into);
	let content = std::fs::read_to_string(file)?;

	println!("{}", render(&content, flavor)?);

	Ok(())
}

fn run_list(args: &OrcheaCli) -> Result<(), Box<dyn std::error::Error>> {
	let workspace = open_workspace(args)?;
	let documents = workspace.documents().list()?;
	let snippets = workspace.repository().list_files(false)?;

	if documents.is_empty() && snippets.is_empty() {
		println!("No documents or snippets found.");
		return Ok(());
	}

	if !documents.is_empty() {
		println!("{}", colored!("Documents:", bold));
		for document in &documents {
			println!(
				"  {} {} (v{}, {})",
				document.slug, document.title, document.version, document.date
			);
		}
	}

	if !snippets.is_empty() {
		if !documents.is_empty() {
			println!();
		}
		println!("{}", colored!("Snippets:", bold));
		for filename in &snippets {
			match workspace.repository().load_config(filename)? {
				Some(config) => {
					println!("  {filename} {} [{}]", config.title, config.labels.join(", "));
				}
				None => println!("  {filename} [no config]"),
			}
		}
	}

	println!(
		"\n{} document(s), {} snippet(s)",
		documents.len(),
		snippets.len()
	);

	Ok(())
}

fn run_tags(args: &OrcheaCli, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
	let workspace = open_workspace(args)?;
	let report = collect_tags(workspace.repository())?;

	if matches!(format, OutputFormat::Json) {
		println!("{}", serde_json::to_string_pretty(&report)?);
		return Ok(());
	}

	if report.tags.is_empty() {
		println!("No labels found.");
		return Ok(());
	}

	println!("{}", colored!("Labels:", bold));
	for tag in &report.tags {
		println!("  {} ({}): {}", tag.label, tag.count, tag.files.join(", "));
	}

	println!(
		"\n{} label(s) across {} file(s), {} distinct",
		report.stats.total_tags, report.stats.files_processed, report.stats.unique_labels
	);

	Ok(())
}

fn run_search(
	args: &OrcheaCli,
	query: &str,
	limit: Option<usize>,
	format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
	let workspace = open_workspace(args)?;
	let results = search(workspace.repository(), query, limit)?;

	if matches!(format, OutputFormat::Json) {
		println!("{}", serde_json::to_string_pretty(&results)?);
		return Ok(());
	}

	if results.results.is_empty() {
		println!("No snippets match `{}`.", results.query);
		return Ok(());
	}

	for hit in &results.results {
		println!(
			"{} {} (score {}, {})",
			colored!(hit.filename.as_str(), bold),
			hit.title,
			hit.score,
			hit.matched.join(", ")
		);
		if let Some(snippet) = &hit.snippet {
			println!("    {snippet}");
		}
	}

	if results.has_more {
		println!(
			"\nShowing {} of {} matches. Use `--limit` to see more.",
			results.results.len(),
			results.total
		);
	}

	Ok(())
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

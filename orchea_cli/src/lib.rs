use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use orchea_core::Flavor;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Assemble documents from reusable markdown snippets.",
	long_about = "orchea keeps markdown snippets in a repository directory, each with a small YAML \
	              sidecar holding its title and labels. Documents are YAML manifests listing \
	              snippets in order; orchea assembles them into HTML.\n\nQuick start:\n  orchea \
	              init          Create the project layout\n  orchea serve         Start the API \
	              and editor server\n  orchea build <slug>  Render a document to HTML\n  orchea \
	              list          Show documents and snippets"
)]
pub struct OrcheaCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create the project layout.
	///
	/// Creates `repository/`, `documents/` and `templates/` along with a
	/// sample snippet, the default page template and a commented
	/// `orchea.toml`. Existing files are left untouched.
	Init,
	/// Start the HTTP API.
	///
	/// Serves the JSON API under `/api` and static files from the configured
	/// static directory. The port comes from `--port`, then the `PORT`
	/// environment variable, then `orchea.toml`.
	Serve {
		/// Address to bind.
		#[arg(long)]
		host: Option<String>,

		/// Port to bind.
		#[arg(long)]
		port: Option<u16>,

		/// Fail instead of trying the following ports when the port is in
		/// use.
		#[arg(long, default_value_t = false)]
		no_fallback: bool,
	},
	/// Assemble a document and write it as a standalone HTML page.
	///
	/// Snippets that cannot be loaded are replaced by an error section and
	/// reported as warnings.
	Build {
		/// Slug of the document to build.
		slug: String,

		/// Output file, relative to the project root. Use `-` for stdout.
		/// Defaults to `documents/<slug>/build.html`.
		#[arg(long, short)]
		out: Option<PathBuf>,

		/// Markdown renderer. Defaults to the configured flavor.
		#[arg(long, value_enum)]
		flavor: Option<FlavorArg>,

		/// Compare against the existing output instead of writing it. Exits
		/// with a non-zero status code when the output is stale.
		#[arg(long, default_value_t = false)]
		check: bool,

		/// Rebuild whenever the repository or the document changes.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// Render a single markdown file to HTML on stdout.
	Render {
		/// Markdown file to render.
		file: PathBuf,

		/// Markdown renderer. Defaults to the configured flavor.
		#[arg(long, value_enum)]
		flavor: Option<FlavorArg>,
	},
	/// List documents and snippets.
	List,
	/// Show label usage across all snippets.
	Tags {
		/// Output format.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Search snippets by title, label, filename and content.
	Search {
		/// Text to look for. Matching ignores case.
		query: String,

		/// Maximum number of results.
		#[arg(long)]
		limit: Option<usize>,

		/// Output format.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FlavorArg {
	/// The built-in line based renderer.
	Simple,
	/// CommonMark with GitHub extensions.
	Commonmark,
}

impl From<FlavorArg> for Flavor {
	fn from(flavor: FlavorArg) -> Self {
		match flavor {
			FlavorArg::Simple => Flavor::Simple,
			FlavorArg::Commonmark => Flavor::CommonMark,
		}
	}
}
